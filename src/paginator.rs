use crate::error::{Error, Result};
use crate::model::{Cursor, Message, ReadPage};
use crate::transport::Transport;
use serde_json::{Value, json};
use std::collections::HashSet;
use tracing::debug;

/// Page size requested on every continuation `read`.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy)]
pub struct PageOptions {
    /// `num` sent with continuation requests. The first request sends none
    /// and gets the client's default page size.
    pub page_size: usize,
    /// Abort after this many pages. `None` trusts the client to terminate.
    pub max_pages: Option<usize>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: None,
        }
    }
}

/// Walk a conversation's history from the first page to the terminal one.
///
/// Messages come back in the order the client returned them, page after
/// page. Any failure aborts the walk; a partial history is never returned.
pub fn fetch_history<T: Transport>(
    transport: &T,
    conversation_id: &str,
    opts: &PageOptions,
) -> Result<Vec<Message>> {
    let mut history = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        if let Some(limit) = opts.max_pages
            && pages >= limit
        {
            return Err(Error::PageLimit {
                conversation_id: conversation_id.to_string(),
                limit,
            });
        }

        let page = read_page(transport, conversation_id, cursor.as_deref(), opts.page_size)?;
        pages += 1;

        let next = page.cursor().ok_or_else(|| {
            Error::protocol("read", "page is not last but carries no `next` cursor")
        })?;
        debug!(
            conversation_id,
            page = pages,
            messages = page.messages.len(),
            "read history page"
        );
        history.extend(page.messages);

        match next {
            Cursor::Last => return Ok(history),
            Cursor::Next(token) => {
                if !seen.insert(token.clone()) {
                    return Err(Error::CursorRepeated {
                        conversation_id: conversation_id.to_string(),
                        cursor: token,
                    });
                }
                cursor = Some(token);
            }
        }
    }
}

fn read_page<T: Transport>(
    transport: &T,
    conversation_id: &str,
    cursor: Option<&str>,
    page_size: usize,
) -> Result<ReadPage> {
    let mut options = json!({ "conversation_id": conversation_id });
    if let Some(next) = cursor {
        options["pagination"] = json!({ "next": next, "num": page_size });
    }
    let result = transport.call("read", options)?;
    parse_page(result)
}

fn parse_page(result: Value) -> Result<ReadPage> {
    serde_json::from_value(result)
        .map_err(|e| Error::protocol("read", format!("unexpected page shape: {}", e)))
}
