//! Reconciliation behavior: diffing, idempotence, per-term error isolation
//! and the full sweep over the learner index.

use std::sync::Arc;
use std::time::Duration;

use wortbot::config::SyncConfig;
use wortbot::progress::local::LocalProgressCache;
use wortbot::progress::memory::MemoryRemoteStore;
use wortbot::progress::remote::RemoteProgressStore;
use wortbot::progress::store::ProgressStore;
use wortbot::progress::UserProgress;
use wortbot::sync::{ReconcileError, SyncReconciler};

mod common;

fn reconciler(store: &Arc<ProgressStore>) -> SyncReconciler {
    SyncReconciler::new(Arc::clone(store), SyncConfig::default())
}

async fn seed_learner(store: &Arc<ProgressStore>, learner: &str) {
    let mut progress = UserProgress::default();
    progress.word_scores.insert("Hund".to_string(), 300);
    progress.word_scores.insert("Katze".to_string(), 200);
    progress.word_scores.insert("Haus".to_string(), 500);
    progress.known_words.insert("Haus".to_string());
    progress.incorrect_words.insert("Hund".to_string());
    store.save(learner, &progress, None).await.unwrap();
}

#[tokio::test]
async fn pushes_missing_and_differing_rows() {
    let (store, remote) = common::memory_store().await;
    seed_learner(&store, "tg:1").await;

    // Katze already matches, Haus differs, Hund is missing entirely
    remote.insert(common::remote_progress_row("tg:1", "Katze", 200, false, false));
    remote.insert(common::remote_progress_row("tg:1", "Haus", 400, false, false));

    let report = reconciler(&store).reconcile_one("tg:1").await.unwrap();
    assert_eq!(report.checked, 3);
    assert_eq!(report.pushed, 2);
    assert_eq!(report.failed, 0);
    assert!(report.success);

    let hund = remote.row("tg:1", "Hund").unwrap();
    assert_eq!(hund.progress, 300);
    assert!(hund.is_error);

    let haus = remote.row("tg:1", "Haus").unwrap();
    assert_eq!(haus.progress, 500);
    assert!(haus.known);
}

#[tokio::test]
async fn second_run_pushes_nothing() {
    let (store, remote) = common::memory_store().await;
    seed_learner(&store, "tg:2").await;

    let first = reconciler(&store).reconcile_one("tg:2").await.unwrap();
    assert_eq!(first.pushed, 3);
    let upserts_after_first = remote.upsert_count();

    let second = reconciler(&store).reconcile_one("tg:2").await.unwrap();
    assert_eq!(second.pushed, 0);
    assert!(second.success);
    assert_eq!(remote.upsert_count(), upserts_after_first);
}

#[tokio::test]
async fn a_failing_term_does_not_stop_the_rest() {
    let (store, remote) = common::memory_store().await;
    seed_learner(&store, "tg:3").await;
    remote.fail_upserts_for("Hund");

    let report = reconciler(&store).reconcile_one("tg:3").await.unwrap();
    assert_eq!(report.pushed, 2);
    assert_eq!(report.failed, 1);
    assert!(!report.success);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].term, "Hund");

    assert!(remote.row("tg:3", "Hund").is_none());
    assert!(remote.row("tg:3", "Katze").is_some());
    assert!(remote.row("tg:3", "Haus").is_some());

    // once the term recovers, the next run catches it up
    remote.clear_upsert_failures();
    let report = reconciler(&store).reconcile_one("tg:3").await.unwrap();
    assert_eq!(report.pushed, 1);
    assert!(report.success);
    assert!(remote.row("tg:3", "Hund").is_some());
}

#[tokio::test]
async fn unreachable_remote_surfaces_as_an_error() {
    let (store, remote) = common::memory_store().await;
    seed_learner(&store, "tg:4").await;
    remote.set_fetch_fails(true);

    let result = reconciler(&store).reconcile_one("tg:4").await;
    assert!(matches!(result, Err(ReconcileError::Remote(_))));

    // nothing was pushed before the fetch failed
    assert!(remote.rows_for("tg:4").is_empty());
}

#[tokio::test]
async fn learner_without_local_record_reconciles_to_nothing() {
    let (store, remote) = common::memory_store().await;

    let report = reconciler(&store).reconcile_one("tg:5").await.unwrap();
    assert_eq!(report.checked, 0);
    assert_eq!(report.pushed, 0);
    assert!(report.success);
    assert_eq!(remote.upsert_count(), 0);
}

#[tokio::test]
async fn without_remote_store_reconcile_is_rejected() {
    let store = common::local_only_store().await;
    seed_learner(&store, "tg:6").await;

    let result = reconciler(&store).reconcile_one("tg:6").await;
    assert!(matches!(result, Err(ReconcileError::RemoteDisabled)));
}

#[tokio::test]
async fn sweep_covers_every_learner_and_isolates_failures() {
    let (store, remote) = common::memory_store().await;
    seed_learner(&store, "tg:10").await;

    let mut other = UserProgress::default();
    other.word_scores.insert("Tür".to_string(), 100);
    store.save("tg:11", &other, None).await.unwrap();

    // "Hund" only exists in tg:10's record, so only that learner degrades
    remote.fail_upserts_for("Hund");

    let report = reconciler(&store).sweep().await;
    assert_eq!(report.learners, 2);
    assert_eq!(report.reconciled, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.pushed, 3);

    assert!(remote.row("tg:10", "Katze").is_some());
    assert!(remote.row("tg:11", "Tür").is_some());
    assert!(remote.row("tg:10", "Hund").is_none());
}

#[tokio::test]
async fn sweep_gives_up_after_bounded_enumeration_retries() {
    let local = LocalProgressCache::open_in_memory().await.unwrap();
    let local_handle = local.clone();
    let remote = Arc::new(MemoryRemoteStore::new());
    let store = Arc::new(ProgressStore::new(
        local,
        Some(Arc::clone(&remote) as Arc<dyn RemoteProgressStore>),
    ));
    seed_learner(&store, "tg:13").await;

    // cut the local tier out from under the sweep
    local_handle.close().await;

    let config = SyncConfig {
        enumeration_retries: 1,
        enumeration_backoff: Duration::from_millis(1),
        ..SyncConfig::default()
    };
    let reconciler = SyncReconciler::new(Arc::clone(&store), config);

    let report = reconciler.sweep().await;
    assert_eq!(report.learners, 0);
    assert_eq!(report.reconciled, 0);
    assert_eq!(report.pushed, 0);
    assert_eq!(remote.upsert_count(), 0);
}

#[tokio::test]
async fn sweep_without_remote_is_a_noop() {
    let store = common::local_only_store().await;
    seed_learner(&store, "tg:12").await;

    let report = reconciler(&store).sweep().await;
    assert_eq!(report.learners, 0);
    assert_eq!(report.reconciled, 0);
}
