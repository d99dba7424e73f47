//! Applying the mutation plan and removing workers.
//!
//! Two sequential passes over the ranked candidates: every update first,
//! then every delete. A worker whose update failed is never deleted, and no
//! failure stops the remaining workers from being processed.

use indexmap::IndexMap;

use super::{mutation::MutationPlan, projection::Candidate, report::{FailureRecord, FailureStage}};
use crate::registry::{RegistryClient, RemoteError};

/// Results from the update and delete passes.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Number of candidates handed to the executor.
    pub processed: usize,
    /// Removed worker SIDs, in processing order.
    pub removed: Vec<String>,
    /// Failures keyed by SID; update failures come first.
    pub failures: IndexMap<String, FailureRecord>,
}

impl ExecutionReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn failure_records(&self) -> impl Iterator<Item = &FailureRecord> {
        self.failures.values()
    }
}

/// Run the update pass (unless the plan is a no-op) and the delete pass.
pub async fn execute(
    registry: &dyn RegistryClient,
    candidates: Vec<Candidate>,
    plan: &MutationPlan,
) -> ExecutionReport {
    let mut report = ExecutionReport {
        processed: candidates.len(),
        ..Default::default()
    };

    if plan.is_noop() {
        tracing::debug!("No attribute changes configured, skipping updates");
    } else {
        for candidate in &candidates {
            if let Err(error) = update_one(registry, candidate, plan).await {
                tracing::warn!(sid = %candidate.sid, error = %error, "Failed to update worker");
                record_failure(&mut report, candidate, FailureStage::Update, error);
            } else {
                tracing::debug!(sid = %candidate.sid, "Updated worker attributes");
            }
        }
    }

    for candidate in candidates {
        if report.failures.contains_key(&candidate.sid) {
            tracing::info!(sid = %candidate.sid, "Skipping removal of worker that failed to update");
            continue;
        }

        match registry.delete(&candidate.sid).await {
            Ok(()) => {
                tracing::info!(
                    sid = %candidate.sid,
                    friendly_name = %candidate.friendly_name,
                    "Removed worker"
                );
                report.removed.push(candidate.sid);
            }
            Err(error) => {
                tracing::warn!(sid = %candidate.sid, error = %error, "Failed to remove worker");
                record_failure(&mut report, &candidate, FailureStage::Delete, error);
            }
        }
    }

    report
}

async fn update_one(
    registry: &dyn RegistryClient,
    candidate: &Candidate,
    plan: &MutationPlan,
) -> Result<(), RemoteError> {
    let attributes = plan
        .apply(&candidate.attributes)
        .to_json()
        .map_err(|e| RemoteError::transport(format!("could not serialize attributes: {e}")))?;
    registry.update(&candidate.sid, &attributes).await
}

fn record_failure(
    report: &mut ExecutionReport,
    candidate: &Candidate,
    stage: FailureStage,
    error: RemoteError,
) {
    report.failures.insert(
        candidate.sid.clone(),
        FailureRecord {
            candidate: candidate.clone(),
            stage,
            error,
        },
    );
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::{
        config::{ExportConfig, MutationConfig, PopulateEntry},
        registry::memory::{Call, MemoryRegistry},
        sweep::{projection::project_all, tests::record},
    };

    fn candidates(sids: &[&str]) -> Vec<Candidate> {
        let old = Utc::now() - Duration::days(90);
        let records = sids
            .iter()
            .map(|sid| record(sid, old, r#"{"status":"active","email":"x@example.com"}"#))
            .collect();
        project_all(records, &ExportConfig::default()).unwrap()
    }

    fn populate_plan() -> MutationPlan {
        MutationPlan::new(&MutationConfig {
            populate: vec![PopulateEntry::parse("status:archived").unwrap()],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_updates_then_deletes_in_order() {
        let registry = MemoryRegistry::new(vec![]);
        let report = execute(&registry, candidates(&["WK1", "WK2"]), &populate_plan()).await;

        assert_eq!(
            registry.calls(),
            vec![
                Call::Update {
                    sid: "WK1".into(),
                    attributes: r#"{"status":"archived","email":"x@example.com"}"#.into(),
                },
                Call::Update {
                    sid: "WK2".into(),
                    attributes: r#"{"status":"archived","email":"x@example.com"}"#.into(),
                },
                Call::Delete { sid: "WK1".into() },
                Call::Delete { sid: "WK2".into() },
            ]
        );
        assert_eq!(report.processed, 2);
        assert_eq!(report.removed, vec!["WK1", "WK2"]);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn test_noop_plan_skips_updates() {
        let registry = MemoryRegistry::new(vec![]);
        let report = execute(&registry, candidates(&["WK1"]), &MutationPlan::default()).await;

        assert!(registry.updated_sids().is_empty());
        assert_eq!(registry.deleted_sids(), vec!["WK1"]);
        assert_eq!(report.removed, vec!["WK1"]);
    }

    #[tokio::test]
    async fn test_update_failure_skips_delete() {
        let registry = MemoryRegistry::new(vec![])
            .fail_update("WK2", RemoteError::http(500, "Internal Server Error"));
        let report = execute(&registry, candidates(&["WK1", "WK2", "WK3"]), &populate_plan()).await;

        assert_eq!(registry.updated_sids(), vec!["WK1", "WK2", "WK3"]);
        assert_eq!(registry.deleted_sids(), vec!["WK1", "WK3"]);
        assert_eq!(report.removed, vec!["WK1", "WK3"]);

        let failure = &report.failures["WK2"];
        assert_eq!(failure.stage, FailureStage::Update);
        assert_eq!(failure.error.status, Some(500));
    }

    #[tokio::test]
    async fn test_delete_failure_recorded_once() {
        let registry =
            MemoryRegistry::new(vec![]).fail_delete("WK1", RemoteError::http(404, "Not Found"));
        let report = execute(&registry, candidates(&["WK1", "WK2"]), &populate_plan()).await;

        assert_eq!(report.failed(), 1);
        let failure = &report.failures["WK1"];
        assert_eq!(failure.stage, FailureStage::Delete);
        assert_eq!(failure.candidate.sid, "WK1");
        assert_eq!(report.removed, vec!["WK2"]);
    }

    #[tokio::test]
    async fn test_update_failures_listed_before_delete_failures() {
        let registry = MemoryRegistry::new(vec![])
            .fail_delete("WK1", RemoteError::transport("connection reset"))
            .fail_update("WK3", RemoteError::http(400, "Invalid attributes"));
        let report =
            execute(&registry, candidates(&["WK1", "WK2", "WK3"]), &populate_plan()).await;

        let order: Vec<_> = report
            .failure_records()
            .map(|f| (f.candidate.sid.as_str(), f.stage))
            .collect();
        assert_eq!(
            order,
            vec![("WK3", FailureStage::Update), ("WK1", FailureStage::Delete)]
        );
        assert_eq!(report.removed, vec!["WK2"]);
    }
}
