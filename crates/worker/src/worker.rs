//! Event dispatcher.
//!
//! One `Worker` per worker version. The host delivers events one at a time
//! or concurrently; every handler takes `&self`.

use std::sync::Arc;

use ruralcare_core::{AppConfig, CacheDb, Error, Request, RequestMode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::classify::Classifier;
use crate::lifecycle::{ActivateReport, InstallReport, Lifecycle, LifecycleState};
use crate::origin::Origin;
use crate::push::{self, ClickOutcome, Notification, PushPayload};
use crate::strategy::{FetchEngine, Served};
use crate::sync::{SyncCoordinator, SyncReport};

/// Message posted to the worker by a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SkipWaiting,
}

impl ControlMessage {
    /// Parse a posted message; anything unrecognized is `None`.
    pub fn parse(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Sync { tag: String },
    PeriodicSync { tag: String },
    Message(ControlMessage),
    Push(Option<PushPayload>),
    NotificationClick { action: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Served(Served),
    /// The worker did not intercept; the request goes straight to the network.
    Passthrough,
    Synced(SyncReport),
    /// Event with a tag this worker does not handle.
    Ignored,
    SkipWaiting,
    Notification(Option<Notification>),
    Clicked(ClickOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatus {
    pub state: LifecycleState,
    pub controlling: bool,
    pub skip_waiting: bool,
    pub static_cache: String,
    pub dynamic_cache: String,
}

pub struct Worker {
    app_origin: Url,
    db: CacheDb,
    origin: Arc<dyn Origin>,
    lifecycle: Lifecycle,
    engine: FetchEngine,
    sync: SyncCoordinator,
}

impl Worker {
    /// Wire up a worker version from configuration.
    pub fn new(config: &AppConfig, db: CacheDb, origin: Arc<dyn Origin>) -> Result<Self, Error> {
        let app_origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let names = config.cache_names();
        let classifier = Classifier::new(&config.static_manifest, &config.api_prefix, &app_origin);
        let lifecycle =
            Lifecycle::new(db.clone(), names.clone(), origin.clone(), &config.static_manifest, &app_origin)?;
        let engine = FetchEngine::new(db.clone(), names.clone(), classifier, origin.clone(), &app_origin)?;
        let sync = SyncCoordinator::new(db.clone(), names, app_origin.clone());
        Ok(Self { app_origin, db, origin, lifecycle, engine, sync })
    }

    /// Build a request the way a page of this app would issue it.
    pub fn request(&self, method: &str, url: &str, mode: RequestMode) -> Result<Request, Error> {
        Request::new(method, url, mode, &self.app_origin)
    }

    pub fn app_origin(&self) -> &Url {
        &self.app_origin
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn origin(&self) -> &Arc<dyn Origin> {
        &self.origin
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn status(&self) -> WorkerStatus {
        let names = self.lifecycle.names();
        WorkerStatus {
            state: self.lifecycle.state(),
            controlling: self.lifecycle.is_controlling(),
            skip_waiting: self.lifecycle.is_skip_waiting(),
            static_cache: names.static_name().to_string(),
            dynamic_cache: names.dynamic_name().to_string(),
        }
    }

    /// Take over from an earlier process if this version is already installed.
    pub async fn resume(&self) -> Result<bool, Error> {
        self.lifecycle.resume().await
    }

    pub async fn dispatch(&self, event: WorkerEvent) -> Result<WorkerOutcome, Error> {
        match event {
            WorkerEvent::Install => Ok(WorkerOutcome::Installed(self.lifecycle.install().await?)),
            WorkerEvent::Activate => Ok(WorkerOutcome::Activated(self.lifecycle.activate().await?)),
            WorkerEvent::Fetch(request) => Ok(self.fetch(&request).await),
            WorkerEvent::Sync { tag } | WorkerEvent::PeriodicSync { tag } => Ok(self.sync(&tag).await),
            WorkerEvent::Message(ControlMessage::SkipWaiting) => {
                self.lifecycle.skip_waiting();
                Ok(WorkerOutcome::SkipWaiting)
            }
            WorkerEvent::Push(payload) => Ok(WorkerOutcome::Notification(push::on_push(payload))),
            WorkerEvent::NotificationClick { action } => {
                Ok(WorkerOutcome::Clicked(push::on_notification_click(action.as_deref())))
            }
        }
    }

    async fn fetch(&self, request: &Request) -> WorkerOutcome {
        if !self.lifecycle.is_controlling() {
            tracing::debug!(url = %request.url(), state = %self.lifecycle.state(), "not controlling, passing through");
            return WorkerOutcome::Passthrough;
        }
        match self.engine.handle(request).await {
            Some(served) => WorkerOutcome::Served(served),
            None => WorkerOutcome::Passthrough,
        }
    }

    async fn sync(&self, tag: &str) -> WorkerOutcome {
        if !SyncCoordinator::handles_tag(tag) {
            tracing::debug!(tag, "ignoring sync tag");
            return WorkerOutcome::Ignored;
        }
        WorkerOutcome::Synced(self.sync.run().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::origin::MemoryOrigin;
    use crate::strategy::ResponseSource;
    use ruralcare_core::Response;

    fn config() -> AppConfig {
        AppConfig {
            static_manifest: vec!["/".into(), "/index.html".into(), "/styles.css".into()],
            ..Default::default()
        }
    }

    fn memory() -> Arc<MemoryOrigin> {
        Arc::new(
            MemoryOrigin::new()
                .with_route("http://localhost:8080/", Response::new(200, "OK", "<html>root</html>"))
                .with_route("http://localhost:8080/index.html", Response::new(200, "OK", "<html>index</html>"))
                .with_route("http://localhost:8080/styles.css", Response::new(200, "OK", "body{}")),
        )
    }

    async fn worker(memory: Arc<MemoryOrigin>) -> Worker {
        let db = CacheDb::open_in_memory().await.unwrap();
        Worker::new(&config(), db, memory).unwrap()
    }

    fn get(path: &str) -> Request {
        Request::get(path, &config().origin_url().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_passes_through_until_active() {
        let memory = memory();
        let worker = worker(memory.clone()).await;

        let outcome = worker.dispatch(WorkerEvent::Fetch(get("/styles.css"))).await.unwrap();
        assert_eq!(outcome, WorkerOutcome::Passthrough);
        assert_eq!(memory.total_calls(), 0);

        worker.dispatch(WorkerEvent::Install).await.unwrap();
        let outcome = worker.dispatch(WorkerEvent::Fetch(get("/styles.css"))).await.unwrap();
        assert_eq!(outcome, WorkerOutcome::Passthrough);

        worker.dispatch(WorkerEvent::Activate).await.unwrap();
        let WorkerOutcome::Served(served) = worker.dispatch(WorkerEvent::Fetch(get("/styles.css"))).await.unwrap()
        else {
            panic!("expected a served response");
        };
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.text(), "body{}");
    }

    #[tokio::test]
    async fn test_full_lifecycle_then_offline() {
        let memory = memory();
        let worker = worker(memory.clone()).await;
        worker.dispatch(WorkerEvent::Install).await.unwrap();
        worker.dispatch(WorkerEvent::Activate).await.unwrap();
        memory.set_online(false);

        let nav = Request::navigate("/consult", &config().origin_url().unwrap()).unwrap();
        let WorkerOutcome::Served(served) = worker.dispatch(WorkerEvent::Fetch(nav)).await.unwrap() else {
            panic!("expected a served response");
        };
        assert_eq!(served.source, ResponseSource::OfflinePage);
        assert_eq!(served.response.text(), "<html>index</html>");
    }

    #[tokio::test]
    async fn test_post_passes_through_when_active() {
        let worker = worker(memory()).await;
        worker.dispatch(WorkerEvent::Install).await.unwrap();
        worker.dispatch(WorkerEvent::Activate).await.unwrap();

        let post = Request::new("POST", "/api/symptoms", RequestMode::Subresource, &config().origin_url().unwrap())
            .unwrap();
        assert_eq!(worker.dispatch(WorkerEvent::Fetch(post)).await.unwrap(), WorkerOutcome::Passthrough);
    }

    #[tokio::test]
    async fn test_sync_tags() {
        let worker = worker(memory()).await;

        let outcome = worker.dispatch(WorkerEvent::Sync { tag: "background-sync".into() }).await.unwrap();
        assert!(matches!(outcome, WorkerOutcome::Synced(report) if report.steps.len() == 3));

        let outcome = worker.dispatch(WorkerEvent::PeriodicSync { tag: "content-sync".into() }).await.unwrap();
        assert!(matches!(outcome, WorkerOutcome::Synced(_)));

        let outcome = worker.dispatch(WorkerEvent::Sync { tag: "other".into() }).await.unwrap();
        assert_eq!(outcome, WorkerOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_skip_waiting_message() {
        let worker = worker(memory()).await;
        let message = ControlMessage::parse(&serde_json::json!({"type": "SKIP_WAITING"})).unwrap();

        assert_eq!(worker.dispatch(WorkerEvent::Message(message)).await.unwrap(), WorkerOutcome::SkipWaiting);
        assert!(worker.status().skip_waiting);
        assert_eq!(worker.status().state, LifecycleState::Installing);
    }

    #[test]
    fn test_unknown_message_is_none() {
        assert!(ControlMessage::parse(&serde_json::json!({"type": "CLAIM"})).is_none());
        assert!(ControlMessage::parse(&serde_json::json!("SKIP_WAITING")).is_none());
    }

    #[tokio::test]
    async fn test_push_and_click() {
        let worker = worker(memory()).await;

        let outcome = worker.dispatch(WorkerEvent::Push(None)).await.unwrap();
        assert_eq!(outcome, WorkerOutcome::Notification(None));

        let payload = PushPayload { title: "Hi".into(), body: "there".into(), primary_key: serde_json::json!(1) };
        let outcome = worker.dispatch(WorkerEvent::Push(Some(payload))).await.unwrap();
        assert!(matches!(outcome, WorkerOutcome::Notification(Some(n)) if n.title == "Hi"));

        let outcome = worker.dispatch(WorkerEvent::NotificationClick { action: Some("explore".into()) }).await.unwrap();
        assert_eq!(outcome, WorkerOutcome::Clicked(ClickOutcome { closed: true, open: Some("/".into()) }));
    }

    #[tokio::test]
    async fn test_status_names() {
        let worker = worker(memory()).await;
        let status = worker.status();
        assert_eq!(status.static_cache, "ruralcare-static-v1.0.0");
        assert_eq!(status.dynamic_cache, "ruralcare-dynamic-v1.0.0");
        assert!(!status.controlling);
    }
}
