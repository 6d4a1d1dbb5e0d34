//! Durable local tier: one JSON document per learner in SQLite. The
//! primary-key column doubles as the explicit learner index the
//! reconciliation sweep enumerates.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

use crate::progress::UserProgress;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS learner_progress (
    learner_id TEXT PRIMARY KEY,
    payload    TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

#[derive(Clone)]
pub struct LocalProgressCache {
    pool: SqlitePool,
}

impl LocalProgressCache {
    pub async fn open(path: &Path) -> Result<Self, LocalCacheError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db_url = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// In-memory database for tests. A single connection, since every
    /// `:memory:` connection gets its own database.
    pub async fn open_in_memory() -> Result<Self, LocalCacheError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Loads one learner's record. An undecodable payload is discarded so
    /// the learner restarts from a fresh record; a decodable but
    /// inconsistent one is repaired in place.
    pub async fn load(&self, learner_id: &str) -> Result<Option<UserProgress>, LocalCacheError> {
        let row = sqlx::query("SELECT payload FROM learner_progress WHERE learner_id = ?")
            .bind(learner_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String = row.try_get("payload")?;
        match serde_json::from_str::<UserProgress>(&payload) {
            Ok(mut progress) => {
                if progress.repair() {
                    tracing::warn!(learner_id = %learner_id, "repaired inconsistent progress record");
                }
                Ok(Some(progress))
            }
            Err(e) => {
                tracing::warn!(error = %e, learner_id = %learner_id, "discarding undecodable progress record");
                self.delete(learner_id).await?;
                Ok(None)
            }
        }
    }

    pub async fn save(
        &self,
        learner_id: &str,
        progress: &UserProgress,
    ) -> Result<(), LocalCacheError> {
        let payload = serde_json::to_string(progress)?;
        let updated_at = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "
            INSERT INTO learner_progress (learner_id, payload, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(learner_id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            ",
        )
        .bind(learner_id)
        .bind(payload)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Every learner id the local tier holds a record for.
    pub async fn list_learners(&self) -> Result<Vec<String>, LocalCacheError> {
        let learners: Vec<String> =
            sqlx::query_scalar("SELECT learner_id FROM learner_progress ORDER BY learner_id")
                .fetch_all(&self.pool)
                .await?;
        Ok(learners)
    }

    /// Closes the connection pool; every query after this fails. Tests use
    /// it to simulate a broken local tier.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn delete(&self, learner_id: &str) -> Result<(), LocalCacheError> {
        sqlx::query("DELETE FROM learner_progress WHERE learner_id = ?")
            .bind(learner_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum LocalCacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("progress record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_learner_loads_as_none() {
        let cache = LocalProgressCache::open_in_memory().await.unwrap();
        assert!(cache.load("tg:1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let cache = LocalProgressCache::open_in_memory().await.unwrap();

        let mut progress = UserProgress::default();
        progress.word_scores.insert("Hund".to_string(), 300);
        progress.incorrect_words.insert("Hund".to_string());
        progress.current_words = vec!["Hund".to_string()];

        cache.save("tg:1", &progress).await.unwrap();
        let loaded = cache.load("tg:1").await.unwrap().unwrap();
        assert_eq!(loaded, progress);
    }

    #[tokio::test]
    async fn undecodable_payload_is_discarded() {
        let cache = LocalProgressCache::open_in_memory().await.unwrap();

        sqlx::query(
            "INSERT INTO learner_progress (learner_id, payload, updated_at) VALUES (?, ?, ?)",
        )
        .bind("tg:1")
        .bind("{not json")
        .bind("2024-01-01T00:00:00Z")
        .execute(&cache.pool)
        .await
        .unwrap();

        assert!(cache.load("tg:1").await.unwrap().is_none());
        // the row is gone, not just skipped
        assert!(cache.list_learners().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inconsistent_payload_is_repaired_on_load() {
        let cache = LocalProgressCache::open_in_memory().await.unwrap();

        let payload = r#"{"wordScores":{"Hund":600},"currentWords":["Hund"],"currentWordIndex":5}"#;
        sqlx::query(
            "INSERT INTO learner_progress (learner_id, payload, updated_at) VALUES (?, ?, ?)",
        )
        .bind("tg:1")
        .bind(payload)
        .bind("2024-01-01T00:00:00Z")
        .execute(&cache.pool)
        .await
        .unwrap();

        let loaded = cache.load("tg:1").await.unwrap().unwrap();
        assert!(loaded.is_known("Hund"));
        assert_eq!(loaded.current_word_index, 1);
    }

    #[tokio::test]
    async fn closed_pool_fails_every_query() {
        let cache = LocalProgressCache::open_in_memory().await.unwrap();
        cache.save("tg:1", &UserProgress::default()).await.unwrap();

        cache.close().await;
        assert!(cache.load("tg:1").await.is_err());
        assert!(cache.list_learners().await.is_err());
    }

    #[tokio::test]
    async fn list_learners_returns_sorted_index() {
        let cache = LocalProgressCache::open_in_memory().await.unwrap();
        let progress = UserProgress::default();

        cache.save("tg:2", &progress).await.unwrap();
        cache.save("tg:1", &progress).await.unwrap();
        cache.save("tg:2", &progress).await.unwrap();

        assert_eq!(
            cache.list_learners().await.unwrap(),
            vec!["tg:1".to_string(), "tg:2".to_string()]
        );
    }
}
