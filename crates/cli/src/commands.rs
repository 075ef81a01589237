//! Subcommand handlers. Each returns the JSON document printed on stdout.

use anyhow::{Result, anyhow, bail};
use ruralcare_core::RequestMode;
use ruralcare_worker::{Origin, Worker, WorkerEvent, WorkerOutcome};
use serde::Serialize;
use serde_json::{Value, json};

use crate::cli::{CachesArgs, FetchArgs, SyncArgs};

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn unexpected(outcome: &WorkerOutcome) -> anyhow::Error {
    anyhow!("unexpected worker outcome: {outcome:?}")
}

pub async fn install(worker: &Worker) -> Result<Value> {
    match worker.dispatch(WorkerEvent::Install).await? {
        WorkerOutcome::Installed(report) => to_value(&report),
        other => Err(unexpected(&other)),
    }
}

/// A fresh process starts out installing, so activation installs first.
pub async fn activate(worker: &Worker) -> Result<Value> {
    let installed = install(worker).await?;
    match worker.dispatch(WorkerEvent::Activate).await? {
        WorkerOutcome::Activated(report) => Ok(json!({ "install": installed, "activate": to_value(&report)? })),
        other => Err(unexpected(&other)),
    }
}

pub async fn fetch(worker: &Worker, args: &FetchArgs) -> Result<Value> {
    let mode = if args.navigate { RequestMode::Navigate } else { RequestMode::Subresource };
    let request = worker.request("GET", &args.url, mode)?;

    let (source, response) = match worker.dispatch(WorkerEvent::Fetch(request.clone())).await? {
        WorkerOutcome::Served(served) => (Some(served.source), served.response),
        WorkerOutcome::Passthrough => (None, worker.origin().fetch(&request).await?),
        other => return Err(unexpected(&other)),
    };

    Ok(json!({
        "url": request.url().as_str(),
        "source": source,
        "status": response.status,
        "content_type": response.content_type(),
        "body": response.text(),
    }))
}

pub async fn sync(worker: &Worker, args: &SyncArgs) -> Result<Value> {
    let tag = args.tag.clone();
    let event = if args.periodic { WorkerEvent::PeriodicSync { tag } } else { WorkerEvent::Sync { tag } };
    match worker.dispatch(event).await? {
        WorkerOutcome::Synced(report) => to_value(&report),
        WorkerOutcome::Ignored => bail!("tag {:?} does not trigger a sync", args.tag),
        other => Err(unexpected(&other)),
    }
}

pub async fn caches(worker: &Worker, args: &CachesArgs) -> Result<Value> {
    let db = worker.db();
    let current = worker.lifecycle().names().current();

    let mut partitions = Vec::new();
    for name in db.keys().await? {
        let partition = db.open_partition(&name).await?;
        let mut entry = json!({
            "name": name,
            "current": current.contains(&name),
            "len": partition.len().await?,
        });
        if args.entries {
            entry["urls"] = to_value(&partition.keys().await?)?;
        }
        partitions.push(entry);
    }

    Ok(json!({ "partitions": partitions, "stored_bytes": db.stored_bytes().await? }))
}
