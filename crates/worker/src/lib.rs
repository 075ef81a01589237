//! Offline worker for the RuralCare front end.
//!
//! Routes intercepted requests through versioned cache partitions, falls back
//! to canned payloads when the network is gone, replays cached API state on
//! sync triggers, and runs the install/activate lifecycle.

pub mod classify;
pub mod fallback;
pub mod lifecycle;
pub mod origin;
pub mod push;
pub mod strategy;
pub mod sync;
pub mod worker;

pub use classify::{Classifier, Label};
pub use lifecycle::{ActivateReport, InstallReport, Lifecycle, LifecycleState};
pub use origin::{HttpOrigin, MemoryOrigin, Origin, OriginConfig};
pub use push::{ClickOutcome, Notification, PushPayload};
pub use strategy::{FetchEngine, ResponseSource, Served};
pub use sync::{SyncCoordinator, SyncReport};
pub use worker::{ControlMessage, Worker, WorkerEvent, WorkerOutcome, WorkerStatus};
