//! push and notification_click tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use ruralcare_worker::{ClickOutcome, Notification, PushPayload, Worker, WorkerEvent, WorkerOutcome};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use super::lifecycle::unexpected;

/// Parameters for the push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    /// Push data; omit for a push without payload.
    #[serde(default)]
    pub data: Option<PushPayload>,
}

/// Output from the push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushOutput {
    pub notification: Option<Notification>,
}

/// Parameters for the notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// Clicked action ("explore", "close"), or none for the body.
    #[serde(default)]
    pub action: Option<String>,
}

pub async fn push_impl(worker: &Worker, params: PushParams) -> Result<CallToolResult, McpError> {
    match worker.dispatch(WorkerEvent::Push(params.data)).await? {
        WorkerOutcome::Notification(notification) => json_result(&PushOutput { notification }),
        other => Err(unexpected(&other)),
    }
}

pub async fn notification_click_impl(
    worker: &Worker, params: NotificationClickParams,
) -> Result<CallToolResult, McpError> {
    match worker.dispatch(WorkerEvent::NotificationClick { action: params.action }).await? {
        WorkerOutcome::Clicked(outcome) => json_result::<ClickOutcome>(&outcome),
        other => Err(unexpected(&other)),
    }
}
