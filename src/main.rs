use clap::Parser;
use eyre::{Result, eyre};
use keybase_chat_backup::backup::{self, BackupConfig};
use keybase_chat_backup::config::load_file_config;
use keybase_chat_backup::paginator::DEFAULT_PAGE_SIZE;
use keybase_chat_backup::storage::default_backup_root;
use keybase_chat_backup::transport::KeybaseCli;
use std::path::PathBuf;

/// Back up Keybase chat history and attachments.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to write the backup into.
    /// Defaults to ~/Documents/Personal/Backup/Keybase if not set in config.
    #[arg(value_name = "BACKUP_ROOT")]
    backup_root: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/keybase-chat-backup/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Keybase executable. Defaults to `keybase` on PATH.
    #[arg(long, value_name = "PATH")]
    keybase: Option<PathBuf>,

    /// Comma-separated conversation ids to skip, on top of the config file's.
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    exclude: Vec<String>,

    /// Give up on a conversation whose history spans more pages than this.
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Print each file written.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress standard output (progress bars).
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Resolve backup_root (CLI > Config > Default)
    let backup_root = cli
        .backup_root
        .or(file_cfg.backup_root)
        .or_else(default_backup_root)
        .ok_or_else(|| {
            eyre!("Could not determine home directory.\nPass BACKUP_ROOT or set backup_root in config.toml.")
        })?;

    // 3. Exclusions from both sources
    let mut exclude = file_cfg.exclude;
    exclude.extend(cli.exclude.into_iter().filter(|id| !id.is_empty()));

    // 4. Build the Backup Config
    let config = BackupConfig {
        backup_root,
        exclude,
        keybase_bin: cli
            .keybase
            .or(file_cfg.keybase_bin)
            .unwrap_or_else(|| PathBuf::from("keybase")),
        page_size: file_cfg.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        max_pages: cli.max_pages.or(file_cfg.max_pages),
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    config.validate()?;

    // 5. Run the Business Logic
    let transport = KeybaseCli::new(&config.keybase_bin);
    backup::execute(&config, &transport)?;
    Ok(())
}
