//! Wire types for the subset of the Keybase chat API this tool drives.
//!
//! Only the fields the backup logic reads are modelled. Everything else the
//! client returns on a message is kept in `extra` maps so that
//! `chat_history.json` is a faithful copy of what `read` produced.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content type that marks a message as carrying a file.
pub const ATTACHMENT_TYPE: &str = "attachment";

/// Result of the `list` method.
///
/// `offline` is required: a listing that does not say whether the client is
/// online must not start a backup.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationList {
    pub offline: bool,
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub channel: Channel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of the `read` method: one page of history.
///
/// Both fields are required. Treating a malformed reply as an empty terminal
/// page would overwrite a good snapshot with nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadPage {
    pub messages: Vec<Message>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub last: bool,
}

/// Where a page sits in a conversation's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    Last,
    Next(String),
}

impl ReadPage {
    /// Resolve the continuation cursor for this page.
    ///
    /// A page flagged `last` is terminal. Returns `None` when the page
    /// claims more history but gives no token.
    pub fn cursor(&self) -> Option<Cursor> {
        match &self.pagination {
            p if p.last => Some(Cursor::Last),
            Pagination {
                next: Some(next), ..
            } if !next.is_empty() => Some(Cursor::Next(next.clone())),
            _ => None,
        }
    }
}

/// A single entry of a conversation's history.
///
/// The client wraps every message in an envelope holding either the
/// decrypted `msg` or an `error` string when it failed to unbox it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<MessageBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    pub content: Content,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentContent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<AttachmentObject>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn id(&self) -> Option<u64> {
        self.msg.as_ref().map(|m| m.id)
    }

    pub fn is_attachment(&self) -> bool {
        self.msg
            .as_ref()
            .is_some_and(|m| m.content.kind == ATTACHMENT_TYPE)
    }

    /// Original filename of an attachment message; `None` for anything else.
    pub fn attachment_filename(&self) -> Option<&str> {
        if !self.is_attachment() {
            return None;
        }
        self.msg
            .as_ref()?
            .content
            .attachment
            .as_ref()?
            .object
            .as_ref()?
            .filename
            .as_deref()
            .filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attachment_filename_only_for_attachments() {
        let attachment: Message = serde_json::from_value(json!({
            "msg": {
                "id": 7,
                "conversation_id": "c1",
                "content": {
                    "type": "attachment",
                    "attachment": { "object": { "filename": "cat.png", "size": 12 } }
                }
            }
        }))
        .unwrap();
        assert!(attachment.is_attachment());
        assert_eq!(attachment.attachment_filename(), Some("cat.png"));
        assert_eq!(attachment.id(), Some(7));

        let text: Message = serde_json::from_value(json!({
            "msg": { "id": 8, "content": { "type": "text", "text": { "body": "hi" } } }
        }))
        .unwrap();
        assert!(!text.is_attachment());
        assert_eq!(text.attachment_filename(), None);
    }

    #[test]
    fn unboxing_errors_are_not_attachments() {
        let broken: Message =
            serde_json::from_value(json!({ "error": "unable to decrypt" })).unwrap();
        assert!(broken.msg.is_none());
        assert!(!broken.is_attachment());
        assert_eq!(broken.id(), None);
    }

    #[test]
    fn unknown_fields_survive_serialization() {
        let raw = json!({
            "msg": {
                "id": 3,
                "sent_at": 1600000000,
                "sender": { "username": "alice" },
                "channel": { "name": "alice,bob", "public": false },
                "content": { "type": "text", "text": { "body": "hello" } }
            }
        });
        let message: Message = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&message).unwrap(), raw);
    }

    #[test]
    fn cursor_resolution() {
        let page = |pagination: Value| -> ReadPage {
            serde_json::from_value(json!({ "messages": [], "pagination": pagination })).unwrap()
        };
        assert_eq!(page(json!({ "last": true })).cursor(), Some(Cursor::Last));
        assert_eq!(
            page(json!({ "next": "abc", "num": 1000 })).cursor(),
            Some(Cursor::Next("abc".into()))
        );
        assert_eq!(page(json!({ "last": false })).cursor(), None);
        assert_eq!(page(json!({})).cursor(), None);
    }

    #[test]
    fn page_fields_are_required() {
        assert!(serde_json::from_value::<ReadPage>(json!({})).is_err());
        assert!(serde_json::from_value::<ReadPage>(json!({ "messages": [] })).is_err());
        assert!(
            serde_json::from_value::<ReadPage>(json!({ "pagination": { "last": true } })).is_err()
        );
    }

    #[test]
    fn listing_requires_offline_flag() {
        let missing = json!({ "conversations": [{ "id": "c1", "channel": { "name": "a,b" } }] });
        assert!(serde_json::from_value::<ConversationList>(missing).is_err());

        let empty: ConversationList = serde_json::from_value(json!({ "offline": false })).unwrap();
        assert!(empty.conversations.is_empty());
    }
}
