use crate::model::Message;
use eyre::{Context, Result};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Name of the per-conversation history snapshot.
pub const HISTORY_FILE: &str = "chat_history.json";

/// Default backup root: `~/Documents/Personal/Backup/Keybase`.
pub fn default_backup_root() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join("Documents/Personal/Backup/Keybase"))
}

/// Folder name for a channel. Commas separate members in one-on-one and
/// group channel names (`alice,bob`).
pub fn folder_name(channel_name: &str) -> String {
    channel_name.replace(',', "_")
}

/// Resolve the storage folder of a channel and create it if absent.
pub fn ensure_folder(backup_root: &Path, channel_name: &str) -> Result<PathBuf> {
    let folder = backup_root.join(folder_name(channel_name));
    fs::create_dir_all(&folder)
        .wrap_err_with(|| format!("Failed to create folder: {}", folder.display()))?;
    Ok(folder)
}

/// Destination of an attachment: `<folder>/<message_id>_<filename>`.
///
/// Path separators in the filename are replaced so it stays inside `folder`.
pub fn attachment_path(folder: &Path, message_id: u64, filename: &str) -> PathBuf {
    let safe: String = filename
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    folder.join(format!("{}_{}", message_id, safe))
}

/// Write the full history snapshot, replacing any previous one.
///
/// The snapshot is written to a temporary file in the same folder and
/// renamed into place, so an interrupted run keeps the last good copy.
pub fn save_history(folder: &Path, history: &[Message]) -> Result<PathBuf> {
    let path = folder.join(HISTORY_FILE);
    let tmp = NamedTempFile::new_in(folder)
        .wrap_err_with(|| format!("Failed to create temporary file in {}", folder.display()))?;

    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, history).wrap_err("Failed to serialize history")?;
        writer.flush().wrap_err("Failed to flush history")?;
    }

    tmp.persist(&path)
        .wrap_err_with(|| format!("Failed to write: {}", path.display()))?;
    Ok(path)
}
