use crate::model::Message;
use crate::storage::attachment_path;
use crate::transport::Transport;
use eyre::{Context, Result};
use indicatif::ProgressBar;
use serde_json::json;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub downloaded: usize,
    /// Attachments already present on disk.
    pub skipped: usize,
    /// Messages that carry no attachment.
    pub ignored: usize,
}

/// Download every attachment of `history` that is not yet in `folder`.
///
/// A file at the destination path is the only marker of a finished
/// download. Downloads land in a hidden temporary file next to the
/// destination and are renamed into place once the client reports success,
/// so an interrupted download never leaves a file at the final path.
pub fn sync_attachments<T: Transport>(
    transport: &T,
    conversation_id: &str,
    folder: &Path,
    history: &[Message],
    pb: &ProgressBar,
    verbose: bool,
) -> Result<SyncStats> {
    let mut stats = SyncStats::default();

    for message in history {
        let Some(message_id) = message.id().filter(|_| message.is_attachment()) else {
            stats.ignored += 1;
            continue;
        };
        let Some(filename) = message.attachment_filename() else {
            warn!(conversation_id, message_id, "attachment has no filename, skipping");
            stats.ignored += 1;
            continue;
        };

        let dest = attachment_path(folder, message_id, filename);
        if dest.exists() {
            debug!(path = %dest.display(), "attachment already downloaded");
            stats.skipped += 1;
            continue;
        }

        if verbose {
            pb.println(format!("Writing {}", dest.display()));
        }
        download(transport, conversation_id, message_id, folder, &dest)?;
        stats.downloaded += 1;
    }

    Ok(stats)
}

fn download<T: Transport>(
    transport: &T,
    conversation_id: &str,
    message_id: u64,
    folder: &Path,
    dest: &Path,
) -> Result<()> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".").suffix(".part");
    // tempfile defaults to 0600; ask for 0666 so the umask decides, as it
    // would for a file the client created itself.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let partial = builder
        .tempfile_in(folder)
        .wrap_err_with(|| format!("Failed to create temporary file in {}", folder.display()))?
        .into_temp_path();

    transport
        .call(
            "download",
            json!({
                "conversation_id": conversation_id,
                "message_id": message_id,
                "output": partial.to_string_lossy(),
            }),
        )
        .wrap_err_with(|| format!("Failed to download attachment {}", message_id))?;

    partial
        .persist(dest)
        .wrap_err_with(|| format!("Failed to move attachment into {}", dest.display()))?;
    Ok(())
}
