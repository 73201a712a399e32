/// CLI argument parsing

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use dvm_cli::utils::DEFAULT_TAG;

// Build timestamp injected at compile time
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser)]
#[command(name = "dvm-cli")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub options: RunOptions,
}

/// Flags shared by backup and restore
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Give up on a pull, run or wait that takes longer than this (e.g. 90s, 5m)
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Fail when the archive/extract command exits non-zero
    #[arg(long, global = true)]
    pub check_exit: bool,

    /// Remove the container left behind by a failed step
    #[arg(long, global = true)]
    pub cleanup_on_failure: bool,

    /// Never pull images; use what is present locally
    #[arg(long, global = true)]
    pub no_pull: bool,

    /// Abort on undecodable pull progress instead of skipping it
    #[arg(long, global = true)]
    pub strict_progress: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Snapshot a volume into the image <VOLUME>:<TAG>
    #[command(alias = "b")]
    Backup {
        /// Volume to back up
        volume: String,

        /// Tag of the backup image
        #[arg(short, long, default_value = DEFAULT_TAG)]
        tag: String,
    },

    /// Replace a volume with the contents of its backup image
    #[command(alias = "r")]
    Restore {
        /// Volume to restore
        volume: String,

        /// Tag of the backup image
        #[arg(short, long, default_value = DEFAULT_TAG)]
        tag: String,

        /// Registry namespace (user or organization) the image lives under
        #[arg(short = 'u', long)]
        namespace: Option<String>,
    },
}
