use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use siteline_core::models::ImageStatus;

#[derive(Parser)]
#[command(name = "siteline")]
#[command(about = "Offline-first inspection sync from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local data directory
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show connectivity, queue, and store state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one sync cycle now
    Sync,
    /// Keep syncing on a timer until interrupted
    Watch,
    /// List pending outbound operations
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recently resolved sync conflicts
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List tracked photos
    Images {
        /// Filter by upload status
        #[arg(long, value_enum)]
        status: Option<ImageStatusArg>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop other accounts' records and clean up uploaded photo files
    Purge {
        /// Override the retention window for local photo files
        #[arg(long, value_name = "DAYS")]
        images_older_than: Option<u32>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ImageStatusArg {
    Pending,
    Uploading,
    Uploaded,
    Failed,
}

impl From<ImageStatusArg> for ImageStatus {
    fn from(arg: ImageStatusArg) -> Self {
        match arg {
            ImageStatusArg::Pending => Self::Pending,
            ImageStatusArg::Uploading => Self::Uploading,
            ImageStatusArg::Uploaded => Self::Uploaded,
            ImageStatusArg::Failed => Self::Failed,
        }
    }
}
