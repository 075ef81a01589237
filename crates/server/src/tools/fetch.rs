//! fetch tool implementation.
//!
//! Delivers a page request to the worker. When the worker does not intercept
//! it (not yet controlling, or not a GET), a GET is forwarded to the origin
//! directly, as the browser would.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use ruralcare_core::{Error, RequestMode, Response};
use ruralcare_worker::{Label, Origin, ResponseSource, Worker, WorkerEvent, WorkerOutcome};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use super::lifecycle::unexpected;

/// Parameters for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute URL, or a path relative to the app origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are ever intercepted.
    #[serde(default = "default_method")]
    pub method: String,

    /// Whether this is a top-level document load.
    #[serde(default)]
    pub navigate: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// A response as seen by the page.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseView {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub body_bytes: usize,
}

impl From<Response> for ResponseView {
    fn from(response: Response) -> Self {
        let body = response.text();
        let body_bytes = response.body.len();
        Self { status: response.status, status_text: response.status_text, headers: response.headers, body, body_bytes }
    }
}

/// Output from the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchOutput {
    /// Canonical request URL.
    pub url: String,
    /// Whether the worker left the request to the network.
    pub passthrough: bool,
    /// Routing label, when the worker intercepted.
    pub label: Option<Label>,
    /// Where the response came from, when the worker intercepted.
    pub source: Option<ResponseSource>,
    /// Absent for passed-through non-GET requests; the host sends those itself.
    pub response: Option<ResponseView>,
}

/// Implementation of the fetch tool.
pub async fn fetch_impl(worker: &Worker, params: FetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let mode = if params.navigate { RequestMode::Navigate } else { RequestMode::Subresource };
    let request = worker.request(&params.method, &params.url, mode)?;
    let url = request.url().to_string();

    let output = match worker.dispatch(WorkerEvent::Fetch(request.clone())).await? {
        WorkerOutcome::Served(served) => FetchOutput {
            url,
            passthrough: false,
            label: Some(served.label),
            source: Some(served.source),
            response: Some(served.response.into()),
        },
        WorkerOutcome::Passthrough if request.is_get() => {
            let response = worker.origin().fetch(&request).await?;
            FetchOutput { url, passthrough: true, label: None, source: None, response: Some(response.into()) }
        }
        WorkerOutcome::Passthrough => {
            tracing::debug!(method = request.method(), %url, "left to the host");
            FetchOutput { url, passthrough: true, label: None, source: None, response: None }
        }
        other => return Err(unexpected(&other)),
    };

    json_result(&output)
}
