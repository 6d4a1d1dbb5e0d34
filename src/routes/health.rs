use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    storage: &'static str,
    #[serde(rename = "bankWords")]
    bank_words: usize,
    #[serde(rename = "remoteConfigured")]
    remote_configured: bool,
    uptime: u64,
    timestamp: String,
}

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
    uptime: u64,
    timestamp: String,
}

pub async fn root(State(state): State<AppState>) -> Response {
    let storage = match state.store().list_learners().await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "health check: local cache unavailable");
            "unavailable"
        }
    };
    let healthy = storage == "ok";

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        storage,
        bank_words: state.bank_size(),
        remote_configured: state.remote_configured(),
        uptime: state.uptime_seconds(),
        timestamp: now_iso(),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

pub async fn live(State(state): State<AppState>) -> Response {
    let response = LivenessResponse {
        status: "alive",
        uptime: state.uptime_seconds(),
        timestamp: now_iso(),
    };
    Json(response).into_response()
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
