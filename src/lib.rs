//! # keybase-chat-backup
//!
//! A CLI tool that backs up [Keybase](https://keybase.io) chat history and
//! attachments to local files.
//!
//! ## What it does
//!
//! Keybase exposes its chat through a JSON command interface,
//! `keybase chat api -m <json>`. This tool lists every conversation, walks each
//! conversation's full history page by page, and writes it as
//! `chat_history.json` into a folder named after the channel (commas replaced
//! by underscores). Every attachment is then downloaded next to it as
//! `<message_id>_<filename>`.
//!
//! Nothing is attempted while the client reports itself offline.
//!
//! ## Repeated runs
//!
//! The history snapshot is rewritten in full on every run. Attachments already
//! on disk are never fetched again; downloads go to a temporary file that is
//! only renamed into place once complete, so an interrupted run is simply
//! retried next time.
//!
//! ## Usage
//!
//! ```sh
//! # Back up to ~/Documents/Personal/Backup/Keybase
//! keybase-chat-backup
//!
//! # Custom location, skipping one conversation
//! keybase-chat-backup ~/backups/keybase --exclude 0000f4820d97ad9d...
//! ```
//!
//! Preferences can be persisted in `~/.config/keybase-chat-backup/config.toml`.
pub mod attachments;
pub mod backup;
pub mod config;
pub mod error;
pub mod model;
pub mod paginator;
pub mod storage;
pub mod transport;
