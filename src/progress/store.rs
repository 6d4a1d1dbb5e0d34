//! Two-tier progress storage. Loads prefer the remote store and write
//! through to the local cache; saves hit the local cache synchronously and
//! push the touched term to the remote store from a spawned task.

use std::sync::Arc;

use chrono::Utc;

use crate::progress::local::{LocalCacheError, LocalProgressCache};
use crate::progress::remote::{RemoteProgressRow, RemoteProgressStore};
use crate::progress::UserProgress;

pub struct ProgressStore {
    local: LocalProgressCache,
    remote: Option<Arc<dyn RemoteProgressStore>>,
}

impl ProgressStore {
    pub fn new(local: LocalProgressCache, remote: Option<Arc<dyn RemoteProgressStore>>) -> Self {
        Self { local, remote }
    }

    pub fn remote(&self) -> Option<Arc<dyn RemoteProgressStore>> {
        self.remote.clone()
    }

    /// Loads a learner's progress. A non-empty remote record wins;
    /// otherwise the local cache; otherwise a fresh record. Storage trouble
    /// on either tier is logged and absorbed, never returned to the caller.
    pub async fn load(&self, learner_id: &str) -> UserProgress {
        if let Some(remote) = &self.remote {
            match remote.fetch(learner_id).await {
                Ok(rows) if !rows.is_empty() => {
                    let mut progress = UserProgress::from_remote_rows(rows);

                    // The remote tier has no batch cursor; keep the one the
                    // local record holds.
                    match self.local.load(learner_id).await {
                        Ok(Some(local)) => {
                            progress.current_words = local.current_words;
                            progress.current_word_index = local.current_word_index;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, learner_id = %learner_id, "local read failed during remote load");
                        }
                    }

                    progress.repair();

                    if let Err(e) = self.local.save(learner_id, &progress).await {
                        tracing::warn!(error = %e, learner_id = %learner_id, "write-through to local cache failed");
                    }

                    return progress;
                }
                Ok(_) => {
                    tracing::debug!(learner_id = %learner_id, "remote record empty, using local cache");
                }
                Err(e) => {
                    tracing::warn!(error = %e, learner_id = %learner_id, "remote load failed, using local cache");
                }
            }
        }

        match self.local.load(learner_id).await {
            Ok(Some(progress)) => progress,
            Ok(None) => UserProgress::default(),
            Err(e) => {
                tracing::warn!(error = %e, learner_id = %learner_id, "local load failed, starting fresh");
                UserProgress::default()
            }
        }
    }

    /// Persists a learner's progress: local write first (the durable part),
    /// then a fire-and-forget remote push of the touched term. The spawned
    /// push logs failures and is never awaited by the caller.
    pub async fn save(
        &self,
        learner_id: &str,
        progress: &UserProgress,
        touched_term: Option<&str>,
    ) -> Result<(), LocalCacheError> {
        self.local.save(learner_id, progress).await?;

        let (Some(remote), Some(term)) = (&self.remote, touched_term) else {
            return Ok(());
        };

        if let Some(row) = remote_row(learner_id, progress, term) {
            let remote = Arc::clone(remote);
            tokio::spawn(async move {
                if let Err(e) = remote.upsert(&row).await {
                    tracing::warn!(
                        error = %e,
                        learner_id = %row.learner_id,
                        term = %row.term,
                        "remote progress push failed"
                    );
                }
            });
        }

        Ok(())
    }

    /// Reads the local tier only. Used by the reconciler and the stats
    /// endpoint, which must not trigger the remote-wins path.
    pub async fn load_local(
        &self,
        learner_id: &str,
    ) -> Result<Option<UserProgress>, LocalCacheError> {
        self.local.load(learner_id).await
    }

    /// Learner ids known to the local cache.
    pub async fn list_learners(&self) -> Result<Vec<String>, LocalCacheError> {
        self.local.list_learners().await
    }
}

/// Projects one term of a progress record into its remote row.
pub fn remote_row(
    learner_id: &str,
    progress: &UserProgress,
    term: &str,
) -> Option<RemoteProgressRow> {
    let score = progress.word_scores.get(term)?;
    Some(RemoteProgressRow {
        learner_id: learner_id.to_string(),
        term: term.to_string(),
        progress: *score,
        known: progress.known_words.contains(term),
        is_error: progress.incorrect_words.contains(term),
        updated_at: Utc::now(),
    })
}
