//! Background sync.
//!
//! There is no separate outbox: a sync replays whatever the dynamic
//! partition currently holds for the three known API endpoints. Each step
//! runs on its own, so one failing step never stops the others, and there is
//! no retry beyond the next trigger.

use ruralcare_core::{CacheDb, CacheNames, Error, Request};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Tag of the one-off sync fired when connectivity returns.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Tag of the periodic sync.
pub const PERIODIC_SYNC_TAG: &str = "content-sync";

/// One replayable API endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStep {
    HealthRecords,
    Pharmacy,
    Symptoms,
}

impl SyncStep {
    /// Steps in the order they run.
    pub const ALL: [SyncStep; 3] = [SyncStep::HealthRecords, SyncStep::Pharmacy, SyncStep::Symptoms];

    pub fn endpoint(&self) -> &'static str {
        match self {
            SyncStep::HealthRecords => "/api/health-records",
            SyncStep::Pharmacy => "/api/pharmacy",
            SyncStep::Symptoms => "/api/symptoms",
        }
    }
}

impl std::fmt::Display for SyncStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStep::HealthRecords => write!(f, "health-records"),
            SyncStep::Pharmacy => write!(f, "pharmacy"),
            SyncStep::Symptoms => write!(f, "symptoms"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum StepOutcome {
    /// Cached entry read and handed to the server.
    Replayed { bytes: usize },
    /// Nothing cached for this endpoint.
    Absent,
    /// The step failed; logged and skipped.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StepReport {
    pub step: SyncStep,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SyncReport {
    pub steps: Vec<StepReport>,
}

impl SyncReport {
    pub fn failures(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Failed { .. }))
            .count()
    }
}

/// Replays cached API state toward the origin server.
pub struct SyncCoordinator {
    db: CacheDb,
    names: CacheNames,
    origin: Url,
}

impl SyncCoordinator {
    pub fn new(db: CacheDb, names: CacheNames, origin: Url) -> Self {
        Self { db, names, origin }
    }

    /// Whether a sync event with this tag should run a sync.
    pub fn handles_tag(tag: &str) -> bool {
        tag == BACKGROUND_SYNC_TAG || tag == PERIODIC_SYNC_TAG
    }

    /// Run every step in order.
    pub async fn run(&self) -> SyncReport {
        tracing::info!("performing background sync");
        let mut steps = Vec::with_capacity(SyncStep::ALL.len());
        for step in SyncStep::ALL {
            let outcome = match self.run_step(step).await {
                Ok(Some(bytes)) => StepOutcome::Replayed { bytes },
                Ok(None) => StepOutcome::Absent,
                Err(e) => {
                    tracing::error!(%step, "sync step failed: {}", e);
                    StepOutcome::Failed { reason: e.to_string() }
                }
            };
            steps.push(StepReport { step, outcome });
        }
        let report = SyncReport { steps };
        tracing::info!(failures = report.failures(), "background sync completed");
        report
    }

    async fn run_step(&self, step: SyncStep) -> Result<Option<usize>, Error> {
        let failure = |reason: String| Error::SyncStepFailure { step: step.to_string(), reason };

        let request = Request::get(step.endpoint(), &self.origin)?;
        let partition = self.db.open_partition(self.names.dynamic_name()).await?;
        let Some(cached) = partition.match_request(&request).await? else {
            return Ok(None);
        };

        let data: serde_json::Value = cached.parse_json().map_err(|e| failure(format!("cached body is not JSON: {e}")))?;
        transmit(step, &data);
        Ok(Some(cached.body.len()))
    }
}

/// Hand-off point toward the origin server.
///
/// The worker never issues non-GET requests, so replayed state is only
/// logged here.
fn transmit(step: SyncStep, data: &serde_json::Value) {
    tracing::info!(%step, payload = %data, "syncing cached entry");
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruralcare_core::Response;

    fn origin() -> Url {
        Url::parse("http://localhost:8080/").unwrap()
    }

    fn names() -> CacheNames {
        CacheNames::from_names("static-v1", "dynamic-v1")
    }

    async fn cache(db: &CacheDb, path: &str, body: &str) {
        db.open_partition("dynamic-v1")
            .await
            .unwrap()
            .put(&Request::get(path, &origin()).unwrap(), &Response::new(200, "OK", body))
            .await
            .unwrap();
    }

    #[test]
    fn test_tags() {
        assert!(SyncCoordinator::handles_tag("background-sync"));
        assert!(SyncCoordinator::handles_tag("content-sync"));
        assert!(!SyncCoordinator::handles_tag("news-sync"));
    }

    #[tokio::test]
    async fn test_empty_cache_completes_without_error() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let report = SyncCoordinator::new(db, names(), origin()).run().await;

        assert_eq!(report.steps.len(), 3);
        assert!(report.steps.iter().all(|s| s.outcome == StepOutcome::Absent));
        assert_eq!(report.failures(), 0);
    }

    #[tokio::test]
    async fn test_replays_cached_entries_in_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        cache(&db, "/api/pharmacy", r#"{"medicines":[]}"#).await;
        cache(&db, "/api/health-records", r#"{"records":[]}"#).await;

        let report = SyncCoordinator::new(db.clone(), names(), origin()).run().await;

        let steps: Vec<SyncStep> = report.steps.iter().map(|s| s.step).collect();
        assert_eq!(steps, SyncStep::ALL.to_vec());
        assert_eq!(report.steps[0].outcome, StepOutcome::Replayed { bytes: 14 });
        assert_eq!(report.steps[1].outcome, StepOutcome::Replayed { bytes: 16 });
        assert_eq!(report.steps[2].outcome, StepOutcome::Absent);

        // sync never deletes what it replays
        assert_eq!(db.open_partition("dynamic-v1").await.unwrap().len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_step_does_not_stop_siblings() {
        let db = CacheDb::open_in_memory().await.unwrap();
        cache(&db, "/api/health-records", "<html>not json</html>").await;
        cache(&db, "/api/symptoms", r#"{"analysis":{}}"#).await;

        let report = SyncCoordinator::new(db, names(), origin()).run().await;

        assert!(matches!(&report.steps[0].outcome, StepOutcome::Failed { reason } if reason.contains("SYNC_STEP_FAILURE")));
        assert_eq!(report.steps[1].outcome, StepOutcome::Absent);
        assert!(matches!(report.steps[2].outcome, StepOutcome::Replayed { .. }));
        assert_eq!(report.failures(), 1);
    }

    #[tokio::test]
    async fn test_only_current_dynamic_partition_is_read() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("dynamic-v0")
            .await
            .unwrap()
            .put(&Request::get("/api/pharmacy", &origin()).unwrap(), &Response::new(200, "OK", "{}"))
            .await
            .unwrap();

        let report = SyncCoordinator::new(db, names(), origin()).run().await;
        assert!(report.steps.iter().all(|s| s.outcome == StepOutcome::Absent));
    }

    #[test]
    fn test_report_serialization() {
        let report = SyncReport {
            steps: vec![StepReport { step: SyncStep::Pharmacy, outcome: StepOutcome::Replayed { bytes: 3 } }],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value, serde_json::json!({"steps": [{"step": "pharmacy", "outcome": "replayed", "bytes": 3}]}));
    }
}
