use std::sync::Arc;
use std::time::Instant;

use crate::progress::store::ProgressStore;

/// Shared state of the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    store: Arc<ProgressStore>,
    bank_size: usize,
    remote_configured: bool,
}

impl AppState {
    pub fn new(store: Arc<ProgressStore>, bank_size: usize) -> Self {
        let remote_configured = store.remote().is_some();
        Self {
            started_at: Instant::now(),
            store,
            bank_size,
            remote_configured,
        }
    }

    pub fn store(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.store)
    }

    pub fn bank_size(&self) -> usize {
        self.bank_size
    }

    pub fn remote_configured(&self) -> bool {
        self.remote_configured
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
