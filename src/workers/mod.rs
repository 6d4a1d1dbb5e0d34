//! Background jobs. A single cron-driven worker runs the reconciliation
//! sweep; the broadcast channel lets shutdown interrupt a sweep in flight.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::sync::SyncReconciler;

pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    shutdown_tx: broadcast::Sender<()>,
    reconciler: Arc<SyncReconciler>,
    config: SyncConfig,
}

impl WorkerManager {
    pub async fn new(
        reconciler: Arc<SyncReconciler>,
        config: SyncConfig,
    ) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await.map_err(WorkerError::Scheduler)?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            scheduler: Mutex::new(scheduler),
            shutdown_tx,
            reconciler,
            config,
        })
    }

    pub async fn start(&self) -> Result<(), WorkerError> {
        if !self.config.sweep_enabled {
            info!("sync sweep disabled, skipping worker startup");
            return Ok(());
        }

        let scheduler = self.scheduler.lock().await;

        let reconciler = Arc::clone(&self.reconciler);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let job = Job::new_async(self.config.sweep_schedule.as_str(), move |_uuid, _lock| {
            let reconciler = Arc::clone(&reconciler);
            let mut rx = shutdown_rx.resubscribe();
            Box::pin(async move {
                tokio::select! {
                    _ = rx.recv() => {}
                    _ = reconciler.sweep() => {}
                }
            })
        })
        .map_err(WorkerError::Scheduler)?;

        scheduler.add(job).await.map_err(WorkerError::Scheduler)?;
        info!(schedule = %self.config.sweep_schedule, "sync sweep worker scheduled");

        scheduler.start().await.map_err(WorkerError::Scheduler)?;
        info!("workers started");

        Ok(())
    }

    pub async fn stop(&self) {
        info!("stopping workers...");
        let _ = self.shutdown_tx.send(());

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "error shutting down scheduler");
        }

        info!("workers stopped");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}
