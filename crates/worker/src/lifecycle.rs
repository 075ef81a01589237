//! Worker version lifecycle: install, activate, take over open pages.
//!
//! ```text
//! Installing --install()--> Installed --activate()--> Activating --> Active
//! ```
//!
//! There is no way back to `Installing`; a new version starts its own
//! lifecycle with its own partition names.

use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::try_join_all;
use ruralcare_core::{CacheDb, CacheNames, Error, Request, Response};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::origin::Origin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Installing,
    Installed,
    Activating,
    Active,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Installing => write!(f, "installing"),
            LifecycleState::Installed => write!(f, "installed"),
            LifecycleState::Activating => write!(f, "activating"),
            LifecycleState::Active => write!(f, "active"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InstallReport {
    /// Entries written to the static partition.
    pub seeded: usize,
    /// Whether the worker asked to skip the waiting phase.
    pub skip_waiting: bool,
    /// Why seeding was abandoned, if it was.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActivateReport {
    /// Stale partitions removed.
    pub deleted: Vec<String>,
    /// Whether open pages are now controlled by this worker.
    pub claimed: bool,
}

#[derive(Debug)]
struct Status {
    state: LifecycleState,
    skip_waiting: bool,
    controlling: bool,
}

pub struct Lifecycle {
    db: CacheDb,
    names: CacheNames,
    origin: Arc<dyn Origin>,
    manifest: Vec<Request>,
    status: Mutex<Status>,
}

impl Lifecycle {
    /// Resolve the manifest against the app origin and start in `Installing`.
    pub fn new<S: AsRef<str>>(
        db: CacheDb, names: CacheNames, origin: Arc<dyn Origin>, manifest: &[S], app_origin: &Url,
    ) -> Result<Self, Error> {
        let manifest = manifest
            .iter()
            .map(|entry| Request::get(entry.as_ref(), app_origin))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            db,
            names,
            origin,
            manifest,
            status: Mutex::new(Status { state: LifecycleState::Installing, skip_waiting: false, controlling: false }),
        })
    }

    fn status(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> LifecycleState {
        self.status().state
    }

    pub fn names(&self) -> &CacheNames {
        &self.names
    }

    /// Whether open pages are routed through this worker.
    pub fn is_controlling(&self) -> bool {
        self.status().controlling
    }

    /// Activate as soon as installed, without waiting for old pages to close.
    pub fn skip_waiting(&self) {
        self.status().skip_waiting = true;
    }

    pub fn is_skip_waiting(&self) -> bool {
        self.status().skip_waiting
    }

    fn expect(&self, expected: LifecycleState) -> Result<(), Error> {
        let actual = self.state();
        if actual != expected {
            return Err(Error::InvalidState { expected: expected.to_string(), actual: actual.to_string() });
        }
        Ok(())
    }

    fn set_state(&self, state: LifecycleState) {
        self.status().state = state;
    }

    /// Pre-populate the static partition with the whole manifest.
    ///
    /// Seeding is all or nothing: if any asset fails, nothing is written and
    /// the failure is logged and reported. The worker is installed either
    /// way, but only a complete seed asks to skip waiting.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.expect(LifecycleState::Installing)?;
        tracing::info!(partition = self.names.static_name(), "worker installing");

        let report = match self.seed().await {
            Ok(seeded) => {
                tracing::info!(seeded, "static files cached");
                self.skip_waiting();
                InstallReport { seeded, skip_waiting: true, error: None }
            }
            Err(e) => {
                tracing::error!("error caching static files: {}", e);
                InstallReport { seeded: 0, skip_waiting: self.is_skip_waiting(), error: Some(e.to_string()) }
            }
        };

        self.set_state(LifecycleState::Installed);
        Ok(report)
    }

    async fn seed(&self) -> Result<usize, Error> {
        let entries = try_join_all(self.manifest.iter().map(|request| self.fetch_asset(request))).await?;
        let partition = self.db.open_partition(self.names.static_name()).await?;
        partition.put_all(&entries).await?;
        Ok(entries.len())
    }

    async fn fetch_asset(&self, request: &Request) -> Result<(Request, Response), Error> {
        let seed_failure = |reason: String| Error::StaticSeedFailure { url: request.url().to_string(), reason };
        let response = self.origin.fetch(request).await.map_err(|e| seed_failure(e.to_string()))?;
        if !response.is_ok() {
            return Err(seed_failure(format!("status {}", response.status)));
        }
        Ok((request.clone(), response))
    }

    /// Pick up a version installed by an earlier process.
    ///
    /// A seeded static partition under the current name means this version
    /// already went through install and activation, so the worker starts out
    /// active and controlling. Returns whether it did.
    pub async fn resume(&self) -> Result<bool, Error> {
        self.expect(LifecycleState::Installing)?;
        if !self.db.has_partition(self.names.static_name()).await? {
            return Ok(false);
        }
        let seeded = self.db.open_partition(self.names.static_name()).await?.len().await?;
        if seeded == 0 {
            return Ok(false);
        }

        let mut status = self.status();
        status.state = LifecycleState::Active;
        status.controlling = true;
        tracing::info!(partition = self.names.static_name(), seeded, "resumed installed worker");
        Ok(true)
    }

    /// Drop stale partitions, then take control of open pages.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.expect(LifecycleState::Installed)?;
        self.set_state(LifecycleState::Activating);
        tracing::info!("worker activating");

        let deleted = match self.db.delete_all_except(&self.names.current()).await {
            Ok(deleted) => deleted,
            Err(e) => {
                self.set_state(LifecycleState::Installed);
                return Err(e);
            }
        };

        {
            let mut status = self.status();
            status.state = LifecycleState::Active;
            status.controlling = true;
        }
        tracing::info!(deleted = deleted.len(), "worker activated");

        Ok(ActivateReport { deleted, claimed: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::origin::MemoryOrigin;

    const MANIFEST: &[&str] = &["/", "/index.html", "/styles.css", "https://fonts.example.com/poppins.css"];

    fn app_origin() -> Url {
        Url::parse("http://localhost:8080/").unwrap()
    }

    fn names() -> CacheNames {
        CacheNames::from_names("static-v1", "dynamic-v1")
    }

    fn full_origin() -> MemoryOrigin {
        MemoryOrigin::new()
            .with_route("http://localhost:8080/", Response::new(200, "OK", "<html>root</html>"))
            .with_route("http://localhost:8080/index.html", Response::new(200, "OK", "<html>index</html>"))
            .with_route("http://localhost:8080/styles.css", Response::new(200, "OK", "body{}"))
            .with_route("https://fonts.example.com/poppins.css", Response::new(200, "OK", "@font-face{}"))
    }

    async fn lifecycle(origin: MemoryOrigin) -> (Lifecycle, CacheDb) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let lifecycle = Lifecycle::new(db.clone(), names(), Arc::new(origin), MANIFEST, &app_origin()).unwrap();
        (lifecycle, db)
    }

    #[tokio::test]
    async fn test_install_seeds_whole_manifest() {
        let (lifecycle, db) = lifecycle(full_origin()).await;
        assert_eq!(lifecycle.state(), LifecycleState::Installing);

        let report = lifecycle.install().await.unwrap();
        assert_eq!(report, InstallReport { seeded: 4, skip_waiting: true, error: None });
        assert_eq!(lifecycle.state(), LifecycleState::Installed);
        assert!(lifecycle.is_skip_waiting());

        let statics = db.open_partition("static-v1").await.unwrap();
        assert_eq!(statics.len().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let origin = full_origin();
        origin.fail("http://localhost:8080/styles.css");
        let (lifecycle, db) = lifecycle(origin).await;

        let report = lifecycle.install().await.unwrap();
        assert_eq!(report.seeded, 0);
        assert!(!report.skip_waiting);
        assert!(report.error.unwrap().contains("STATIC_SEED_FAILURE"));
        assert_eq!(lifecycle.state(), LifecycleState::Installed);

        let statics = db.open_partition("static-v1").await.unwrap();
        assert!(statics.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_install_rejects_non_ok_asset() {
        let origin = full_origin().with_route("http://localhost:8080/index.html", Response::new(404, "Not Found", ""));
        let (lifecycle, db) = lifecycle(origin).await;

        let report = lifecycle.install().await.unwrap();
        assert!(report.error.unwrap().contains("status 404"));
        assert!(db.open_partition("static-v1").await.unwrap().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_install_twice_is_invalid() {
        let (lifecycle, _db) = lifecycle(full_origin()).await;
        lifecycle.install().await.unwrap();
        assert!(matches!(lifecycle.install().await, Err(Error::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_activate_deletes_only_stale_partitions() {
        let (lifecycle, db) = lifecycle(full_origin()).await;
        for name in ["static-v1", "dynamic-v1", "static-v0"] {
            db.open_partition(name).await.unwrap();
        }

        lifecycle.install().await.unwrap();
        let report = lifecycle.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["static-v0"]);
        assert!(report.claimed);
        assert_eq!(db.keys().await.unwrap(), vec!["static-v1", "dynamic-v1"]);
        assert_eq!(db.open_partition("static-v1").await.unwrap().len().await.unwrap(), 4);
        assert_eq!(lifecycle.state(), LifecycleState::Active);
        assert!(lifecycle.is_controlling());
    }

    #[tokio::test]
    async fn test_activate_before_install_is_invalid() {
        let (lifecycle, _db) = lifecycle(full_origin()).await;
        let result = lifecycle.activate().await;
        assert!(matches!(result, Err(Error::InvalidState { expected, actual }) if expected == "installed" && actual == "installing"));
        assert!(!lifecycle.is_controlling());
    }

    #[tokio::test]
    async fn test_no_transition_back_after_active() {
        let (lifecycle, _db) = lifecycle(full_origin()).await;
        lifecycle.install().await.unwrap();
        lifecycle.activate().await.unwrap();

        assert!(lifecycle.install().await.is_err());
        assert!(lifecycle.activate().await.is_err());
        assert_eq!(lifecycle.state(), LifecycleState::Active);
    }

    #[tokio::test]
    async fn test_failed_install_creates_no_partition() {
        let origin = full_origin();
        origin.set_online(false);
        let (lifecycle, db) = lifecycle(origin).await;

        lifecycle.install().await.unwrap();
        assert!(!db.has_partition("static-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_resume_after_restart() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let first = Lifecycle::new(db.clone(), names(), Arc::new(full_origin()), MANIFEST, &app_origin()).unwrap();
        first.install().await.unwrap();
        first.activate().await.unwrap();

        let second = Lifecycle::new(db, names(), Arc::new(full_origin()), MANIFEST, &app_origin()).unwrap();
        assert!(second.resume().await.unwrap());
        assert_eq!(second.state(), LifecycleState::Active);
        assert!(second.is_controlling());
    }

    #[tokio::test]
    async fn test_resume_without_install() {
        let (lifecycle, _db) = lifecycle(full_origin()).await;
        assert!(!lifecycle.resume().await.unwrap());
        assert_eq!(lifecycle.state(), LifecycleState::Installing);
    }

    #[tokio::test]
    async fn test_failed_seed_keeps_earlier_skip_waiting() {
        let origin = full_origin();
        origin.set_online(false);
        let (lifecycle, _db) = lifecycle(origin).await;
        lifecycle.skip_waiting();

        let report = lifecycle.install().await.unwrap();
        assert!(report.error.is_some());
        assert!(report.skip_waiting);
    }
}
