//! MCP server handler implementation.
//!
//! Each worker event the browser would deliver is one tool; the handler only
//! routes tool calls to the implementations in `tools`.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use ruralcare_worker::Worker;

use crate::tools::cache::{CacheKeysParams, keys_impl};
use crate::tools::fetch::{FetchParams, fetch_impl};
use crate::tools::lifecycle::{activate_impl, install_impl, status_impl};
use crate::tools::message::{MessageParams, message_impl};
use crate::tools::push::{NotificationClickParams, PushParams, notification_click_impl, push_impl};
use crate::tools::sync::{SyncParams, sync_impl};

/// The MCP server handler for the offline worker.
#[derive(Clone)]
pub struct WorkerServer {
    worker: Arc<Worker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl WorkerServer {
    /// Create a new server handler around a worker version.
    pub fn new(worker: Arc<Worker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install the worker: pre-cache the static manifest into the static partition.")]
    async fn install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Activate the installed worker: delete stale partitions and take control of open pages.")]
    async fn activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    #[tool(description = "Report the lifecycle state and the current partition names.")]
    async fn status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }

    /// Route a page request through the worker.
    ///
    /// Static assets are served cache-first, API calls network-first with
    /// offline fallbacks. Requests the worker does not intercept go straight
    /// to the origin.
    #[tool(
        description = "Intercept a page request. Returns the response and whether it came from the network, a cache partition, the offline page, a canned fallback, or a synthetic 503."
    )]
    async fn fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Deliver a sync event. Tags 'background-sync' and 'content-sync' (periodic) replay cached health records, pharmacy and symptom data."
    )]
    async fn sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Post a message to the worker. Only {\"type\":\"SKIP_WAITING\"} is understood.")]
    async fn message(&self, params: Parameters<MessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push event. Returns the notification to show, if any.")]
    async fn push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a notification click. Returns whether a window should be opened.")]
    async fn notification_click(
        &self, params: Parameters<NotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.worker, params.0).await
    }

    #[tool(description = "List cache partitions and, optionally, the URLs stored in each.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for WorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "ruralcare-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
