use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::progress::ProgressSummary;
use crate::response::AppError;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LearnerStatsResponse {
    learner_id: String,
    #[serde(flatten)]
    summary: ProgressSummary,
}

/// Read-only statistics for one learner. Reads the local tier only so an
/// external consumer polling this endpoint never triggers remote traffic.
pub async fn learner_stats(
    State(state): State<AppState>,
    Path(learner_id): Path<String>,
) -> Response {
    match state.store().load_local(&learner_id).await {
        Ok(Some(progress)) => {
            let response = LearnerStatsResponse {
                learner_id,
                summary: progress.summary(),
            };
            Json(response).into_response()
        }
        Ok(None) => AppError::not_found("learner has no progress record").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, learner_id = %learner_id, "stats read failed");
            AppError::unavailable("local cache unavailable").into_response()
        }
    }
}
