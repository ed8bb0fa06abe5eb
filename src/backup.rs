use crate::attachments::{SyncStats, sync_attachments};
use crate::model::{Conversation, ConversationList};
use crate::paginator::{DEFAULT_PAGE_SIZE, PageOptions, fetch_history};
use crate::storage::{HISTORY_FILE, ensure_folder, save_history};
use crate::transport::Transport;
use eyre::{Context, Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::info;

/// Everything a backup run needs. Decoupled from how it was assembled
/// (CLI flags, config file, defaults).
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub backup_root: PathBuf,
    /// Conversation ids that are never backed up.
    pub exclude: BTreeSet<String>,
    pub keybase_bin: PathBuf,
    pub page_size: usize,
    pub max_pages: Option<usize>,
    pub verbose: bool,
    pub quiet: bool,
}

impl BackupConfig {
    pub fn new(backup_root: impl Into<PathBuf>) -> Self {
        Self {
            backup_root: backup_root.into(),
            exclude: BTreeSet::new(),
            keybase_bin: PathBuf::from("keybase"),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: None,
            verbose: false,
            quiet: true,
        }
    }

    /// Reject settings that would make every conversation fail.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(eyre!("page_size must be at least 1"));
        }
        if self.max_pages == Some(0) {
            return Err(eyre!("max_pages must be at least 1"));
        }
        Ok(())
    }

    fn page_options(&self) -> PageOptions {
        PageOptions {
            page_size: self.page_size,
            max_pages: self.max_pages,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupSummary {
    /// The client reported itself offline; nothing was touched.
    pub offline: bool,
    pub backed_up: usize,
    pub excluded: usize,
    pub failed: usize,
    pub attachments: SyncStats,
}

/// Back up every conversation the client lists.
///
/// A failing `list` aborts the run. A failure inside one conversation is
/// reported and counted, and the run moves on to the next one.
pub fn execute<T: Transport>(config: &BackupConfig, transport: &T) -> Result<BackupSummary> {
    config.validate()?;

    let listing: ConversationList = transport
        .call("list", json!({}))
        .wrap_err("Failed to list conversations")
        .and_then(|result| {
            serde_json::from_value(result).wrap_err("Unexpected conversation list shape")
        })?;

    let mut summary = BackupSummary::default();

    if listing.offline {
        summary.offline = true;
        if !config.quiet {
            eprintln!("Keybase is offline, skipping backup.");
        }
        return Ok(summary);
    }

    let pb = if config.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(listing.conversations.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
        );
        bar.println(format!(
            "Found {} conversations.",
            listing.conversations.len()
        ));
        bar
    };

    for conversation in &listing.conversations {
        if config.exclude.contains(&conversation.id) {
            summary.excluded += 1;
            if config.verbose {
                pb.println(format!("Excluded: {}", conversation.channel.name));
            }
            pb.inc(1);
            continue;
        }

        match backup_conversation(conversation, config, transport, &pb) {
            Ok(stats) => {
                summary.backed_up += 1;
                summary.attachments.downloaded += stats.downloaded;
                summary.attachments.skipped += stats.skipped;
                summary.attachments.ignored += stats.ignored;
            }
            Err(e) => {
                summary.failed += 1;
                pb.println(format!("Error [{}]: {:#}", conversation.channel.name, e));
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        backed_up = summary.backed_up,
        excluded = summary.excluded,
        failed = summary.failed,
        "backup finished"
    );

    if !config.quiet {
        let mut line = format!(
            "Done. {} conversations backed up, {} excluded. {} attachments downloaded, {} already present.",
            summary.backed_up,
            summary.excluded,
            summary.attachments.downloaded,
            summary.attachments.skipped
        );
        if summary.failed > 0 {
            line.push_str(&format!(" Completed with {} error(s).", summary.failed));
        }
        eprintln!("{}", line);
    }

    if summary.failed > 0 {
        return Err(eyre!(
            "{} of {} conversations failed to back up",
            summary.failed,
            listing.conversations.len() - summary.excluded
        ));
    }
    Ok(summary)
}

fn backup_conversation<T: Transport>(
    conversation: &Conversation,
    config: &BackupConfig,
    transport: &T,
    pb: &ProgressBar,
) -> Result<SyncStats> {
    let folder = ensure_folder(&config.backup_root, &conversation.channel.name)?;

    let history = fetch_history(transport, &conversation.id, &config.page_options())
        .wrap_err("Failed to fetch history")?;

    let history_path = folder.join(HISTORY_FILE);
    if config.verbose {
        pb.println(format!("Writing {}", history_path.display()));
    }
    save_history(&folder, &history)?;

    sync_attachments(
        transport,
        &conversation.id,
        &folder,
        &history,
        pb,
        config.verbose,
    )
}
