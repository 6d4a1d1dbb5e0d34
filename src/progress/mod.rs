//! Per-learner progress records and the two-tier storage behind them.

pub mod local;
pub mod memory;
pub mod remote;
pub mod store;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::progress::remote::RemoteProgressRow;
use crate::scoring;

/// Upper bound on the active batch drawn for a training round.
pub const MAX_BATCH_SIZE: usize = 10;

/// Durable training state of one learner. The local cache stores this as a
/// single JSON document per learner; the remote tier stores the per-term
/// row projection (see [`remote::RemoteProgressRow`]).
///
/// All fields default, so partially populated documents from older runs
/// still decode. [`UserProgress::repair`] re-establishes the invariants
/// after any decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProgress {
    /// Cumulative score per term. Never decremented.
    pub word_scores: BTreeMap<String, u32>,
    /// Terms whose score crossed the mastery threshold. Grows only.
    pub known_words: BTreeSet<String>,
    /// Terms ever answered incorrectly.
    pub incorrect_words: BTreeSet<String>,
    /// Active batch, at most [`MAX_BATCH_SIZE`] terms.
    pub current_words: Vec<String>,
    /// Cursor into `current_words`, kept within `0..=current_words.len()`.
    pub current_word_index: usize,
}

impl UserProgress {
    pub fn is_empty(&self) -> bool {
        self.word_scores.is_empty()
            && self.known_words.is_empty()
            && self.incorrect_words.is_empty()
            && self.current_words.is_empty()
    }

    pub fn score(&self, term: &str) -> u32 {
        self.word_scores.get(term).copied().unwrap_or(0)
    }

    pub fn is_known(&self, term: &str) -> bool {
        self.known_words.contains(term)
    }

    /// Rebuilds the score-bearing fields from remote rows. The remote tier
    /// does not hold batch state, so `current_words` starts empty here and
    /// the store carries it over from the local record.
    pub fn from_remote_rows(rows: Vec<RemoteProgressRow>) -> Self {
        let mut progress = UserProgress::default();
        for row in rows {
            if row.known {
                progress.known_words.insert(row.term.clone());
            }
            if row.is_error {
                progress.incorrect_words.insert(row.term.clone());
            }
            progress.word_scores.insert(row.term, row.progress);
        }
        progress
    }

    /// Re-establishes the record invariants in place and reports whether
    /// anything had to change. Mastered terms are only ever added to
    /// `known_words`, never removed.
    pub fn repair(&mut self) -> bool {
        let mut changed = false;

        if self.current_words.len() > MAX_BATCH_SIZE {
            self.current_words.truncate(MAX_BATCH_SIZE);
            changed = true;
        }

        if self.current_word_index > self.current_words.len() {
            self.current_word_index = self.current_words.len();
            changed = true;
        }

        for (term, score) in &self.word_scores {
            if scoring::is_mastered(*score) && !self.known_words.contains(term) {
                self.known_words.insert(term.clone());
                changed = true;
            }
        }

        changed
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            words_seen: self.word_scores.len(),
            known_words: self.known_words.len(),
            error_words: self.incorrect_words.len(),
            total_score: self.word_scores.values().map(|score| u64::from(*score)).sum(),
            batch_size: self.current_words.len(),
            batch_position: self.current_word_index,
        }
    }
}

/// Read-only aggregate used by the statistics surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub words_seen: usize,
    pub known_words: usize,
    pub error_words: usize,
    pub total_score: u64,
    pub batch_size: usize,
    pub batch_position: usize,
}
