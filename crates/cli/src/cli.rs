use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Drive the RuralCare offline worker from a shell.
#[derive(Parser, Debug)]
#[command(name = "ruralcare", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Cache database path (overrides RURALCARE_DB_PATH).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// App origin (overrides RURALCARE_ORIGIN).
    #[arg(long, global = true)]
    pub origin: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pre-cache the static manifest.
    Install,

    /// Install, then delete stale partitions and take control.
    Activate,

    /// Route one request through the worker.
    Fetch(FetchArgs),

    /// Replay cached API state.
    Sync(SyncArgs),

    /// List cache partitions.
    Caches(CachesArgs),
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Absolute URL or path relative to the origin.
    pub url: String,

    /// Treat as a top-level document load.
    #[arg(long, default_value_t = false)]
    pub navigate: bool,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Sync tag.
    #[arg(long, default_value = "background-sync")]
    pub tag: String,

    /// Deliver as a periodic sync.
    #[arg(long, default_value_t = false)]
    pub periodic: bool,
}

#[derive(Args, Debug)]
pub struct CachesArgs {
    /// Also list the URLs stored in each partition.
    #[arg(long, default_value_t = false)]
    pub entries: bool,
}
