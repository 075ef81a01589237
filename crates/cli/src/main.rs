//! ruralcare: operator CLI for the offline worker.
//!
//! Every invocation is one worker process: it opens the configured cache
//! database, picks up an earlier installation if there is one, delivers a
//! single event, and prints the result as JSON.

mod cli;
mod commands;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use ruralcare_core::{AppConfig, CacheDb};
use ruralcare_worker::{HttpOrigin, OriginConfig, Worker};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(origin) = cli.origin {
        config.origin = origin;
        config.validate()?;
    }

    let db = CacheDb::open(&config.db_path, config.storage_quota_bytes).await?;
    let origin = Arc::new(HttpOrigin::new(OriginConfig::from(&config))?);
    let worker = Worker::new(&config, db, origin)?;

    let output = match &cli.command {
        Command::Install => commands::install(&worker).await?,
        Command::Activate => commands::activate(&worker).await?,
        Command::Fetch(args) => {
            worker.resume().await?;
            commands::fetch(&worker, args).await?
        }
        Command::Sync(args) => commands::sync(&worker, args).await?,
        Command::Caches(args) => commands::caches(&worker, args).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
