//! sync tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use ruralcare_worker::sync::BACKGROUND_SYNC_TAG;
use ruralcare_worker::{SyncReport, Worker, WorkerEvent, WorkerOutcome};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use super::lifecycle::unexpected;

/// Parameters for the sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    /// Sync tag (default: "background-sync").
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Deliver as a periodic sync event.
    #[serde(default)]
    pub periodic: bool,
}

fn default_tag() -> String {
    BACKGROUND_SYNC_TAG.into()
}

/// Output from the sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncOutput {
    pub tag: String,
    /// False when the tag is not one the worker syncs on.
    pub handled: bool,
    pub report: Option<SyncReport>,
}

/// Implementation of the sync tool.
pub async fn sync_impl(worker: &Worker, params: SyncParams) -> Result<CallToolResult, McpError> {
    let tag = params.tag.clone();
    let event = if params.periodic {
        WorkerEvent::PeriodicSync { tag: params.tag }
    } else {
        WorkerEvent::Sync { tag: params.tag }
    };

    let output = match worker.dispatch(event).await? {
        WorkerOutcome::Synced(report) => SyncOutput { tag, handled: true, report: Some(report) },
        WorkerOutcome::Ignored => SyncOutput { tag, handled: false, report: None },
        other => return Err(unexpected(&other)),
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{output_json, test_origin, test_worker};
    use ruralcare_core::Response;

    #[tokio::test]
    async fn test_sync_replays_cached_records() {
        let worker = test_worker(test_origin()).await;
        let request = worker.request("GET", "/api/health-records", Default::default()).unwrap();
        worker
            .db()
            .open_partition(&worker.status().dynamic_cache)
            .await
            .unwrap()
            .put(&request, &Response::new(200, "OK", r#"{"records":[{"id":1}]}"#))
            .await
            .unwrap();

        let output = output_json(&sync_impl(&worker, SyncParams { tag: default_tag(), periodic: false }).await.unwrap());
        assert_eq!(output["handled"], true);
        let steps = output["report"]["steps"].as_array().unwrap();
        assert_eq!(steps[0]["step"], "health-records");
        assert_eq!(steps[0]["outcome"], "replayed");
        assert_eq!(steps[1]["outcome"], "absent");
    }

    #[tokio::test]
    async fn test_periodic_content_sync() {
        let worker = test_worker(test_origin()).await;
        let params = SyncParams { tag: "content-sync".into(), periodic: true };
        let output = output_json(&sync_impl(&worker, params).await.unwrap());
        assert_eq!(output["handled"], true);
    }

    #[tokio::test]
    async fn test_unknown_tag_ignored() {
        let worker = test_worker(test_origin()).await;
        let params = SyncParams { tag: "news".into(), periodic: false };
        let output = output_json(&sync_impl(&worker, params).await.unwrap());
        assert_eq!(output["handled"], false);
        assert!(output["report"].is_null());
    }
}
