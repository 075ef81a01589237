//! cache_keys tool implementation.
//!
//! Lists partitions in creation order, flagging the ones the current worker
//! version owns.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use ruralcare_worker::Worker;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Include the URLs stored in each partition.
    #[serde(default)]
    pub entries: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionInfo {
    pub name: String,
    /// Owned by the current worker version; stale otherwise.
    pub current: bool,
    pub len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub partitions: Vec<PartitionInfo>,
    /// Body bytes across all partitions.
    pub stored_bytes: u64,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(worker: &Worker, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let db = worker.db();
    let current = worker.lifecycle().names().current();

    let mut partitions = Vec::new();
    for name in db.keys().await? {
        let partition = db.open_partition(&name).await?;
        let len = partition.len().await?;
        let urls = if params.entries { Some(partition.keys().await?) } else { None };
        let is_current = current.contains(&name);
        partitions.push(PartitionInfo { name, current: is_current, len, urls });
    }

    json_result(&CacheKeysOutput { partitions, stored_bytes: db.stored_bytes().await? })
}
