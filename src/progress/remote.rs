//! Remote progress tier: the row shape shared with the backend and the
//! client that talks to it. The store is injected as a trait object so
//! tests can substitute [`crate::progress::memory::MemoryRemoteStore`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One per-term progress row, keyed by (learnerId, term). Upserts are
/// idempotent, so retrying a failed push is always safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProgressRow {
    pub learner_id: String,
    pub term: String,
    pub progress: u32,
    pub known: bool,
    pub is_error: bool,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait RemoteProgressStore: Send + Sync {
    /// All rows for one learner. An empty result means the learner has no
    /// remote record yet.
    async fn fetch(&self, learner_id: &str) -> Result<Vec<RemoteProgressRow>, RemoteStoreError>;

    /// Idempotent upsert keyed by (learnerId, term).
    async fn upsert(&self, row: &RemoteProgressRow) -> Result<(), RemoteStoreError>;
}

/// HTTP client for the remote store. Rows for a learner live under
/// `{base}/progress/{learnerId}`; upserts PUT the row to `{base}/progress`
/// and the server keys it by (learnerId, term) from the body.
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            token,
            timeout,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteProgressStore for HttpRemoteStore {
    async fn fetch(&self, learner_id: &str) -> Result<Vec<RemoteProgressRow>, RemoteStoreError> {
        let url = format!("{}/progress/{}", self.base_url, learner_id);
        let request = self.authorize(self.client.get(&url)).timeout(self.timeout);

        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(RemoteStoreError::Status(response.status()));
        }

        match response.json::<Vec<RemoteProgressRow>>().await {
            Ok(rows) => Ok(rows),
            Err(e) if e.is_decode() => Err(RemoteStoreError::Decode(e.to_string())),
            Err(e) => Err(RemoteStoreError::Request(e)),
        }
    }

    async fn upsert(&self, row: &RemoteProgressRow) -> Result<(), RemoteStoreError> {
        let url = format!("{}/progress", self.base_url);
        let request = self
            .authorize(self.client.put(&url))
            .timeout(self.timeout)
            .json(row);

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RemoteStoreError::Status(response.status()));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum RemoteStoreError {
    #[error("remote request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("remote store returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("remote payload could not be decoded: {0}")]
    Decode(String),
    #[error("remote store unavailable: {0}")]
    Unavailable(String),
}

impl RemoteStoreError {
    /// Decoding failures mean the payload was malformed rather than the
    /// store being unreachable. Callers surface these instead of silently
    /// falling back.
    pub fn is_decode(&self) -> bool {
        matches!(self, RemoteStoreError::Decode(_))
    }
}
