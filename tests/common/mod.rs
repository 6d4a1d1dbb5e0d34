#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;

use wortbot::bank::{Article, WordEntry};
use wortbot::progress::local::LocalProgressCache;
use wortbot::progress::memory::MemoryRemoteStore;
use wortbot::progress::remote::{RemoteProgressRow, RemoteProgressStore};
use wortbot::progress::store::ProgressStore;

pub fn entry(
    term: &str,
    answer: &str,
    distractors: [&str; 3],
    article: Option<Article>,
) -> WordEntry {
    WordEntry {
        term: term.to_string(),
        correct_answer: answer.to_string(),
        distractors: distractors.map(str::to_string),
        article,
    }
}

pub fn small_bank() -> Vec<WordEntry> {
    vec![
        entry("Hund", "собака", ["кошка", "птица", "лошадь"], Some(Article::Der)),
        entry("Katze", "кошка", ["собака", "мышь", "корова"], Some(Article::Die)),
        entry("Haus", "дом", ["квартира", "улица", "сад"], Some(Article::Das)),
    ]
}

pub fn remote_progress_row(
    learner_id: &str,
    term: &str,
    progress: u32,
    known: bool,
    is_error: bool,
) -> RemoteProgressRow {
    RemoteProgressRow {
        learner_id: learner_id.to_string(),
        term: term.to_string(),
        progress,
        known,
        is_error,
        updated_at: Utc::now(),
    }
}

pub async fn memory_store() -> (Arc<ProgressStore>, Arc<MemoryRemoteStore>) {
    let local = LocalProgressCache::open_in_memory()
        .await
        .expect("open in-memory cache");
    let remote = Arc::new(MemoryRemoteStore::new());
    let store = Arc::new(ProgressStore::new(
        local,
        Some(Arc::clone(&remote) as Arc<dyn RemoteProgressStore>),
    ));
    (store, remote)
}

pub async fn local_only_store() -> Arc<ProgressStore> {
    let local = LocalProgressCache::open_in_memory()
        .await
        .expect("open in-memory cache");
    Arc::new(ProgressStore::new(local, None))
}
