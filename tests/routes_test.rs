use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use wortbot::progress::UserProgress;
use wortbot::routes;
use wortbot::state::AppState;

mod common;

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn health_reports_ok_with_bank_size() {
    let store = common::local_only_store().await;
    let app = routes::router(AppState::new(store, 30));

    let (status, json) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["storage"], "ok");
    assert_eq!(json["bankWords"], 30);
    assert_eq!(json["remoteConfigured"], false);
}

#[tokio::test]
async fn liveness_always_answers() {
    let store = common::local_only_store().await;
    let app = routes::router(AppState::new(store, 0));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/live")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn stats_returns_the_learner_summary() {
    let store = common::local_only_store().await;

    let mut progress = UserProgress::default();
    progress.word_scores.insert("Hund".to_string(), 500);
    progress.word_scores.insert("Katze".to_string(), 100);
    progress.known_words.insert("Hund".to_string());
    progress.incorrect_words.insert("Katze".to_string());
    progress.current_words = vec!["Katze".to_string()];
    store.save("tg:7", &progress, None).await.unwrap();

    let app = routes::router(AppState::new(store, 3));
    let (status, json) = get_json(app, "/stats/tg:7").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["learnerId"], "tg:7");
    assert_eq!(json["wordsSeen"], 2);
    assert_eq!(json["knownWords"], 1);
    assert_eq!(json["errorWords"], 1);
    assert_eq!(json["totalScore"], 600);
    assert_eq!(json["batchSize"], 1);
}

#[tokio::test]
async fn stats_for_unknown_learner_is_404() {
    let store = common::local_only_store().await;
    let app = routes::router(AppState::new(store, 3));

    let (status, json) = get_json(app, "/stats/tg:missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let store = common::local_only_store().await;
    let app = routes::router(AppState::new(store, 3));

    let (status, json) = get_json(app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}
