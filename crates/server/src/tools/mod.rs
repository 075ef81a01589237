//! MCP tool implementations.
//!
//! One module per worker event family, plus cache inspection.

pub mod cache;
pub mod fetch;
pub mod lifecycle;
pub mod message;
pub mod push;
pub mod sync;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use ruralcare_core::Error;
use serde::Serialize;

/// Pretty JSON text result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
use {
    ruralcare_core::{AppConfig, CacheDb, Response},
    ruralcare_worker::{MemoryOrigin, Worker},
    std::sync::Arc,
};

/// Worker over an in-memory database with a three-entry manifest.
#[cfg(test)]
pub(crate) async fn test_worker(origin: Arc<MemoryOrigin>) -> Arc<Worker> {
    let config = AppConfig {
        static_manifest: vec!["/".into(), "/index.html".into(), "/styles.css".into()],
        ..Default::default()
    };
    let db = CacheDb::open_in_memory().await.unwrap();
    Arc::new(Worker::new(&config, db, origin).unwrap())
}

/// Origin serving the test manifest.
#[cfg(test)]
pub(crate) fn test_origin() -> Arc<MemoryOrigin> {
    Arc::new(
        MemoryOrigin::new()
            .with_route("http://localhost:8080/", Response::new(200, "OK", "<html>root</html>"))
            .with_route("http://localhost:8080/index.html", Response::new(200, "OK", "<html>index</html>"))
            .with_route("http://localhost:8080/styles.css", Response::new(200, "OK", "body{}")),
    )
}

/// Parsed JSON of the first text content block.
#[cfg(test)]
pub(crate) fn output_json(result: &CallToolResult) -> serde_json::Value {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
