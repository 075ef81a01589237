//! message tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use ruralcare_worker::{ControlMessage, Worker, WorkerEvent};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessageParams {
    /// Posted message, e.g. {"type": "SKIP_WAITING"}.
    pub message: serde_json::Value,
}

/// Output from the message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessageOutput {
    /// False for messages the worker does not understand.
    pub handled: bool,
    pub skip_waiting: bool,
}

/// Implementation of the message tool.
pub async fn message_impl(worker: &Worker, params: MessageParams) -> Result<CallToolResult, McpError> {
    let handled = match ControlMessage::parse(&params.message) {
        Some(message) => {
            worker.dispatch(WorkerEvent::Message(message)).await?;
            true
        }
        None => {
            tracing::debug!(message = %params.message, "ignoring unknown message");
            false
        }
    };

    json_result(&MessageOutput { handled, skip_waiting: worker.status().skip_waiting })
}
