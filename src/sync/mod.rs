//! Reconciliation between the local cache and the remote store. Catches up
//! everything the fire-and-forget pushes missed. Last writer wins: rows are
//! overwritten with the local values whenever they differ.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::config::SyncConfig;
use crate::progress::local::LocalCacheError;
use crate::progress::remote::{RemoteProgressRow, RemoteStoreError};
use crate::progress::store::{remote_row, ProgressStore};

/// Result of reconciling one learner.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub learner_id: String,
    pub checked: usize,
    pub pushed: usize,
    pub failed: usize,
    pub errors: Vec<ReconcileErrorEntry>,
    pub success: bool,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ReconcileErrorEntry {
    pub term: String,
    pub message: String,
}

/// Result of one full sweep over the learner index.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub learners: usize,
    pub reconciled: usize,
    pub failed: usize,
    pub pushed: usize,
    pub duration_ms: u64,
}

pub struct SyncReconciler {
    store: Arc<ProgressStore>,
    config: SyncConfig,
}

impl SyncReconciler {
    pub fn new(store: Arc<ProgressStore>, config: SyncConfig) -> Self {
        Self { store, config }
    }

    /// Pushes every term whose remote row is missing or differs from the
    /// local record. Individual push failures are collected and do not stop
    /// the run; a failed fetch does, since there is nothing to diff against.
    pub async fn reconcile_one(
        &self,
        learner_id: &str,
    ) -> Result<ReconcileReport, ReconcileError> {
        let started = Instant::now();

        let Some(remote) = self.store.remote() else {
            return Err(ReconcileError::RemoteDisabled);
        };

        let Some(local) = self.store.load_local(learner_id).await? else {
            return Ok(ReconcileReport {
                learner_id: learner_id.to_string(),
                checked: 0,
                pushed: 0,
                failed: 0,
                errors: Vec::new(),
                success: true,
                duration_ms: elapsed_ms(started),
            });
        };

        let remote_rows = remote.fetch(learner_id).await?;
        let existing: BTreeMap<&str, &RemoteProgressRow> = remote_rows
            .iter()
            .map(|row| (row.term.as_str(), row))
            .collect();

        let checked = local.word_scores.len();
        let mut pushed = 0usize;
        let mut errors = Vec::new();

        for (term, score) in &local.word_scores {
            let known = local.known_words.contains(term);
            let is_error = local.incorrect_words.contains(term);

            let up_to_date = existing.get(term.as_str()).is_some_and(|row| {
                row.progress == *score && row.known == known && row.is_error == is_error
            });
            if up_to_date {
                continue;
            }

            let Some(row) = remote_row(learner_id, &local, term) else {
                continue;
            };

            match remote.upsert(&row).await {
                Ok(()) => pushed += 1,
                Err(e) => {
                    tracing::warn!(error = %e, learner_id = %learner_id, term = %term, "reconcile upsert failed");
                    errors.push(ReconcileErrorEntry {
                        term: term.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let failed = errors.len();
        let report = ReconcileReport {
            learner_id: learner_id.to_string(),
            checked,
            pushed,
            failed,
            errors,
            success: failed == 0,
            duration_ms: elapsed_ms(started),
        };

        if report.pushed > 0 || report.failed > 0 {
            tracing::info!(
                learner_id = %learner_id,
                checked = report.checked,
                pushed = report.pushed,
                failed = report.failed,
                duration_ms = report.duration_ms,
                "reconciled learner"
            );
        }

        Ok(report)
    }

    /// Reconciles every learner in the local index. Per-learner failures
    /// are isolated; a failing enumeration is retried with a shorter
    /// backoff before the sweep gives up until its next scheduled run.
    pub async fn sweep(&self) -> SweepReport {
        let started = Instant::now();

        if self.store.remote().is_none() {
            tracing::debug!("remote store not configured, skipping sweep");
            return SweepReport::default();
        }

        let Some(learners) = self.enumerate_learners().await else {
            return SweepReport {
                duration_ms: elapsed_ms(started),
                ..SweepReport::default()
            };
        };

        let mut report = SweepReport {
            learners: learners.len(),
            ..SweepReport::default()
        };

        for learner_id in learners {
            match self.reconcile_one(&learner_id).await {
                Ok(result) => {
                    report.reconciled += 1;
                    report.pushed += result.pushed;
                    if !result.success {
                        report.failed += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, learner_id = %learner_id, "learner reconciliation failed");
                    report.failed += 1;
                }
            }
        }

        report.duration_ms = elapsed_ms(started);
        tracing::info!(
            learners = report.learners,
            reconciled = report.reconciled,
            pushed = report.pushed,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "reconciliation sweep finished"
        );
        report
    }

    async fn enumerate_learners(&self) -> Option<Vec<String>> {
        let mut attempt = 0u32;
        loop {
            match self.store.list_learners().await {
                Ok(learners) => return Some(learners),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.config.enumeration_retries {
                        tracing::error!(error = %e, attempts = attempt, "learner enumeration failed, sweep aborted");
                        return None;
                    }
                    tracing::warn!(error = %e, attempt = attempt, "learner enumeration failed, backing off");
                    tokio::time::sleep(self.config.enumeration_backoff).await;
                }
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("remote store is not configured")]
    RemoteDisabled,
    #[error("local cache error: {0}")]
    Local(#[from] LocalCacheError),
    #[error("remote store error: {0}")]
    Remote(#[from] RemoteStoreError),
}
