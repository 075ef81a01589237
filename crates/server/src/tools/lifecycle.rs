//! install, activate and status tools.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use ruralcare_worker::{Worker, WorkerEvent, WorkerOutcome};

use super::json_result;

pub async fn install_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    match worker.dispatch(WorkerEvent::Install).await? {
        WorkerOutcome::Installed(report) => json_result(&report),
        other => Err(unexpected(&other)),
    }
}

pub async fn activate_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    match worker.dispatch(WorkerEvent::Activate).await? {
        WorkerOutcome::Activated(report) => json_result(&report),
        other => Err(unexpected(&other)),
    }
}

pub async fn status_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    json_result(&worker.status())
}

/// Internal error for a dispatcher outcome that does not belong to the event.
pub(crate) fn unexpected(outcome: &WorkerOutcome) -> McpError {
    McpError::internal_error(format!("unexpected worker outcome: {outcome:?}"), None)
}
