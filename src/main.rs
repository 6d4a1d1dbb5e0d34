use std::sync::Arc;

use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use wortbot::bank::WordBank;
use wortbot::config::Config;
use wortbot::logging;
use wortbot::progress::local::LocalProgressCache;
use wortbot::progress::remote::{HttpRemoteStore, RemoteProgressStore};
use wortbot::progress::store::ProgressStore;
use wortbot::routes;
use wortbot::session::SessionManager;
use wortbot::state::AppState;
use wortbot::sync::SyncReconciler;
use wortbot::transport::{self, telegram::TelegramClient, Dispatcher};
use wortbot::workers::WorkerManager;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config.log_level);

    let local = match LocalProgressCache::open(&config.storage.local_path).await {
        Ok(local) => local,
        Err(err) => {
            tracing::error!(
                error = %err,
                path = %config.storage.local_path.display(),
                "failed to open local progress cache"
            );
            std::process::exit(1);
        }
    };

    let remote: Option<Arc<dyn RemoteProgressStore>> = match &config.storage.remote_url {
        Some(url) => Some(Arc::new(HttpRemoteStore::new(
            url.clone(),
            config.storage.remote_token.clone(),
            config.storage.remote_timeout,
        ))),
        None => {
            tracing::warn!("REMOTE_STORE_URL not set, running with the local cache only");
            None
        }
    };

    let store = Arc::new(ProgressStore::new(local, remote));

    let bank = WordBank::new(&config.bank);
    let words = Arc::new(bank.load_words().await);
    tracing::info!(count = words.len(), "word bank ready");

    let sessions = Arc::new(SessionManager::new(Arc::clone(&store), Arc::clone(&words)));
    let reconciler = Arc::new(SyncReconciler::new(Arc::clone(&store), config.sync.clone()));

    let worker_manager = if store.remote().is_some() {
        match WorkerManager::new(Arc::clone(&reconciler), config.sync.clone()).await {
            Ok(manager) => {
                if let Err(err) = manager.start().await {
                    tracing::error!(error = %err, "failed to start workers");
                }
                Some(manager)
            }
            Err(err) => {
                tracing::warn!(error = %err, "worker manager not initialized");
                None
            }
        }
    } else {
        None
    };

    let (shutdown_tx, _) = broadcast::channel(1);

    let polling_task = match &config.telegram.token {
        Some(token) => {
            let client = TelegramClient::new(
                token,
                config.telegram.api_base.as_deref(),
                config.telegram.poll_timeout,
            );
            let dispatcher = Dispatcher::new(
                Arc::clone(&sessions),
                Arc::clone(&store),
                Arc::clone(&reconciler),
            );
            Some(tokio::spawn(transport::run_polling(
                client,
                dispatcher,
                shutdown_tx.subscribe(),
            )))
        }
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set, chat transport disabled");
            None
        }
    };

    let state = AppState::new(Arc::clone(&store), words.len());
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let addr = config.bind_addr();
    tracing::info!(%addr, "wortbot listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind listener failed");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(err) = server.await {
        tracing::error!(error = %err, "server error");
    }

    tracing::info!("HTTP server stopped, initiating graceful shutdown sequence");

    let _ = shutdown_tx.send(());
    if let Some(task) = polling_task {
        if let Err(err) = task.await {
            tracing::warn!(error = %err, "polling task join failed");
        }
    }

    if let Some(manager) = &worker_manager {
        manager.stop().await;
    }

    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
