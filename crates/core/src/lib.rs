//! Core types and shared functionality for the RuralCare offline worker.
//!
//! This crate provides:
//! - Request/response value types shared by the cache and the fetch engine
//! - Versioned cache partitions with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod url;

pub use cache::{CacheDb, CacheNames, Partition};
pub use config::AppConfig;
pub use error::Error;
pub use http::{Request, RequestMode, Response};
