//! SQLite-backed cache partitions for intercepted responses.
//!
//! This module provides the persistent cache store using SQLite with async
//! access via tokio-rusqlite. It supports:
//!
//! - Named partitions keyed by request identity (method + canonical URL)
//! - Versioned partition names, the sole invalidation mechanism
//! - Per-entry atomic writes and an all-or-nothing batch write
//! - An optional byte quota over stored bodies
//! - WAL mode for concurrent access

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod names;
pub mod partition;

pub use crate::Error;

pub use connection::CacheDb;
pub use names::CacheNames;
pub use partition::Partition;
