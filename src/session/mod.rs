//! Per-learner training sessions: batch drawing, question emission and
//! answer scoring. A session is Idle until training starts, then cycles
//! through AwaitingAnswer states until the batch is exhausted.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};

use crate::bank::WordEntry;
use crate::progress::store::ProgressStore;
use crate::progress::{UserProgress, MAX_BATCH_SIZE};
use crate::scoring;

/// Which question form a session drills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMode {
    Vocabulary,
    Article,
}

/// The question a learner is currently expected to answer. Ephemeral: it
/// lives in the session registry only and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuestion {
    pub term: String,
    pub correct_answer: String,
    pub mode: TrainingMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
}

/// What the transport should render after a session call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    Question(Question),
    /// Every word of the active batch has been mastered.
    BatchComplete,
    /// No unmastered words are available to draw from.
    NothingToLearn,
}

/// Outcome of one scored answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub correct: bool,
    pub score_total: u32,
    pub mastered: bool,
    pub correct_answer: String,
}

/// Result of feeding learner text into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Answered { feedback: Feedback, next: SessionSignal },
    /// No question is pending, or the text matches none of the offered
    /// options. The transport falls through to menu handling; nothing is
    /// scored and the pending question survives.
    Unrecognized,
}

struct LearnerSession {
    progress: UserProgress,
    mode: TrainingMode,
    pending: Option<PendingQuestion>,
    options: Vec<String>,
}

/// Drives all learner sessions against one word bank and progress store.
/// Per-learner state is taken out of the registry for the duration of a
/// call; the transport serializes events per learner, so no two calls
/// touch the same learner concurrently.
pub struct SessionManager {
    store: Arc<ProgressStore>,
    bank: Arc<Vec<WordEntry>>,
    sessions: Mutex<HashMap<String, LearnerSession>>,
}

impl SessionManager {
    pub fn new(store: Arc<ProgressStore>, bank: Arc<Vec<WordEntry>>) -> Self {
        Self {
            store,
            bank,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Starts (or resumes) training. A stored batch is resumed as-is
    /// unless `reset` is set, it is empty, or it no longer fits the mode;
    /// in those cases a new batch is drawn excluding known words.
    pub async fn start_training(
        &self,
        learner_id: &str,
        mode: TrainingMode,
        reset: bool,
    ) -> SessionSignal {
        let mut progress = self.store.load(learner_id).await;

        let needs_draw = reset
            || progress.current_words.is_empty()
            || !self.batch_fits_mode(&progress.current_words, mode);

        if needs_draw {
            self.draw_batch(&mut progress, mode);
            if progress.current_words.is_empty() {
                self.drop_session(learner_id);
                return SessionSignal::NothingToLearn;
            }
            if let Err(e) = self.store.save(learner_id, &progress, None).await {
                tracing::error!(error = %e, learner_id = %learner_id, "failed to persist drawn batch");
            }
        }

        let mut session = LearnerSession {
            progress,
            mode,
            pending: None,
            options: Vec::new(),
        };
        let signal = self.emit_question(learner_id, &mut session);
        self.put_session(learner_id, session);
        signal
    }

    /// Feeds learner text in. Scores it when it matches one of the offered
    /// options of the pending question; otherwise reports `Unrecognized`.
    pub async fn submit_answer(&self, learner_id: &str, text: &str) -> AnswerOutcome {
        let Some(mut session) = self.take_session(learner_id) else {
            return AnswerOutcome::Unrecognized;
        };

        let Some(pending) = session.pending.clone() else {
            self.put_session(learner_id, session);
            return AnswerOutcome::Unrecognized;
        };

        let text = text.trim();
        if !session.options.iter().any(|option| option == text) {
            self.put_session(learner_id, session);
            return AnswerOutcome::Unrecognized;
        }

        let correct = text == pending.correct_answer;
        let (score_total, mastered) = apply_answer(&mut session.progress, &pending.term, correct);

        session.pending = None;
        session.options.clear();

        if let Err(e) = self
            .store
            .save(learner_id, &session.progress, Some(pending.term.as_str()))
            .await
        {
            tracing::error!(error = %e, learner_id = %learner_id, "failed to persist progress after answer");
        }

        let next = self.emit_question(learner_id, &mut session);
        self.put_session(learner_id, session);

        AnswerOutcome::Answered {
            feedback: Feedback {
                correct,
                score_total,
                mastered,
                correct_answer: pending.correct_answer,
            },
            next,
        }
    }

    /// Restarts the current batch from the beginning without redrawing.
    pub async fn repeat_batch(&self, learner_id: &str) -> SessionSignal {
        let mut session = match self.take_session(learner_id) {
            Some(session) => session,
            None => LearnerSession {
                progress: self.store.load(learner_id).await,
                mode: TrainingMode::Vocabulary,
                pending: None,
                options: Vec::new(),
            },
        };

        session.progress.current_word_index = 0;
        session.pending = None;
        session.options.clear();

        if let Err(e) = self.store.save(learner_id, &session.progress, None).await {
            tracing::error!(error = %e, learner_id = %learner_id, "failed to persist batch restart");
        }

        let signal = self.emit_question(learner_id, &mut session);
        self.put_session(learner_id, session);
        signal
    }

    /// Draws a fresh batch in the session's current mode, excluding
    /// everything already known.
    pub async fn new_batch(&self, learner_id: &str) -> SessionSignal {
        let mode = self
            .session_mode(learner_id)
            .unwrap_or(TrainingMode::Vocabulary);
        self.start_training(learner_id, mode, true).await
    }

    pub fn session_mode(&self, learner_id: &str) -> Option<TrainingMode> {
        self.sessions
            .lock()
            .get(learner_id)
            .map(|session| session.mode)
    }

    pub fn pending_question(&self, learner_id: &str) -> Option<PendingQuestion> {
        self.sessions
            .lock()
            .get(learner_id)
            .and_then(|session| session.pending.clone())
    }

    /// Emits the question at the cursor, or `BatchComplete` once the batch
    /// has emptied. Terms that vanished from the bank since the batch was
    /// drawn are dropped on the way.
    fn emit_question(&self, learner_id: &str, session: &mut LearnerSession) -> SessionSignal {
        loop {
            let len = session.progress.current_words.len();
            if len == 0 {
                session.pending = None;
                session.options.clear();
                return SessionSignal::BatchComplete;
            }
            if session.progress.current_word_index >= len {
                session.progress.current_word_index = 0;
            }

            let index = session.progress.current_word_index;
            let term = session.progress.current_words[index].clone();

            let Some(entry) = self.bank.iter().find(|entry| entry.term == term) else {
                tracing::warn!(learner_id = %learner_id, term = %term, "batch term missing from word bank, dropping");
                session.progress.current_words.remove(index);
                continue;
            };

            let (prompt, correct_answer, mut options) = match session.mode {
                TrainingMode::Vocabulary => {
                    let mut options = vec![entry.correct_answer.clone()];
                    options.extend(entry.distractors.iter().cloned());
                    (
                        format!("Как переводится слово «{}»?", entry.term),
                        entry.correct_answer.clone(),
                        options,
                    )
                }
                TrainingMode::Article => {
                    let Some(article) = entry.article else {
                        tracing::warn!(learner_id = %learner_id, term = %term, "batch term has no article, dropping");
                        session.progress.current_words.remove(index);
                        continue;
                    };
                    let mut options = vec![article.as_str().to_string()];
                    options.extend(
                        article
                            .distractors()
                            .iter()
                            .map(|article| article.as_str().to_string()),
                    );
                    (
                        format!("Какой артикль у слова «{}»?", entry.term),
                        article.as_str().to_string(),
                        options,
                    )
                }
            };

            options.shuffle(&mut rand::rng());

            session.pending = Some(PendingQuestion {
                term: entry.term.clone(),
                correct_answer,
                mode: session.mode,
            });
            session.options = options.clone();

            return SessionSignal::Question(Question { prompt, options });
        }
    }

    /// True when every batch term is still answerable in the given mode.
    fn batch_fits_mode(&self, terms: &[String], mode: TrainingMode) -> bool {
        terms.iter().all(|term| {
            self.bank.iter().any(|entry| {
                entry.term == *term
                    && (mode == TrainingMode::Vocabulary || entry.article.is_some())
            })
        })
    }

    /// Fills the batch with up to [`MAX_BATCH_SIZE`] random unmastered
    /// words eligible for the mode and resets the cursor.
    fn draw_batch(&self, progress: &mut UserProgress, mode: TrainingMode) {
        let candidates: Vec<&WordEntry> = self
            .bank
            .iter()
            .filter(|entry| match mode {
                TrainingMode::Vocabulary => true,
                TrainingMode::Article => entry.article.is_some(),
            })
            .filter(|entry| !progress.known_words.contains(&entry.term))
            .collect();

        let mut rng = rand::rng();
        let mut batch: Vec<String> = candidates
            .choose_multiple(&mut rng, MAX_BATCH_SIZE)
            .map(|entry| entry.term.clone())
            .collect();
        // choose_multiple preserves no particular order guarantee we want
        // to rely on, so shuffle the result
        batch.shuffle(&mut rng);

        progress.current_words = batch;
        progress.current_word_index = 0;
    }

    fn take_session(&self, learner_id: &str) -> Option<LearnerSession> {
        self.sessions.lock().remove(learner_id)
    }

    fn put_session(&self, learner_id: &str, session: LearnerSession) {
        self.sessions
            .lock()
            .insert(learner_id.to_string(), session);
    }

    fn drop_session(&self, learner_id: &str) {
        self.sessions.lock().remove(learner_id);
    }
}

/// Applies the scoring rule and moves the batch cursor. Returns the new
/// total and whether the term just crossed the mastery threshold.
///
/// A newly mastered term is removed from the batch at the cursor, which
/// already advances it to the next word; otherwise the cursor moves one
/// step and wraps.
fn apply_answer(progress: &mut UserProgress, term: &str, correct: bool) -> (u32, bool) {
    let score = progress
        .score(term)
        .saturating_add(scoring::score_delta(correct));
    progress.word_scores.insert(term.to_string(), score);

    if !correct {
        progress.incorrect_words.insert(term.to_string());
    }

    let newly_mastered =
        scoring::is_mastered(score) && progress.known_words.insert(term.to_string());

    if newly_mastered {
        let index = progress.current_word_index;
        if index < progress.current_words.len() && progress.current_words[index] == term {
            progress.current_words.remove(index);
        } else {
            progress.current_words.retain(|batch_term| batch_term != term);
        }
        if progress.current_word_index >= progress.current_words.len() {
            progress.current_word_index = 0;
        }
    } else {
        let len = progress.current_words.len();
        progress.current_word_index = (progress.current_word_index + 1) % len.max(1);
    }

    (score, newly_mastered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress_with_batch(terms: &[&str]) -> UserProgress {
        UserProgress {
            current_words: terms.iter().map(|term| term.to_string()).collect(),
            ..UserProgress::default()
        }
    }

    #[test]
    fn correct_answer_advances_cursor_with_wraparound() {
        let mut progress = progress_with_batch(&["a", "b", "c"]);
        progress.current_word_index = 2;

        let (score, mastered) = apply_answer(&mut progress, "c", true);
        assert_eq!(score, 100);
        assert!(!mastered);
        assert_eq!(progress.current_word_index, 0);
    }

    #[test]
    fn wrong_answer_records_error_and_advances() {
        let mut progress = progress_with_batch(&["a", "b"]);

        let (score, mastered) = apply_answer(&mut progress, "a", false);
        assert_eq!(score, 0);
        assert!(!mastered);
        assert!(progress.incorrect_words.contains("a"));
        assert_eq!(progress.current_word_index, 1);
    }

    #[test]
    fn mastery_removes_term_without_extra_advance() {
        let mut progress = progress_with_batch(&["a", "b", "c"]);
        progress.word_scores.insert("b".to_string(), 400);
        progress.current_word_index = 1;

        let (score, mastered) = apply_answer(&mut progress, "b", true);
        assert_eq!(score, 500);
        assert!(mastered);
        assert!(progress.is_known("b"));
        assert_eq!(progress.current_words, vec!["a".to_string(), "c".to_string()]);
        // the removal already put "c" under the cursor
        assert_eq!(progress.current_word_index, 1);
    }

    #[test]
    fn mastering_last_batch_word_wraps_cursor_to_start() {
        let mut progress = progress_with_batch(&["a", "b"]);
        progress.word_scores.insert("b".to_string(), 400);
        progress.current_word_index = 1;

        apply_answer(&mut progress, "b", true);
        assert_eq!(progress.current_words, vec!["a".to_string()]);
        assert_eq!(progress.current_word_index, 0);
    }

    #[test]
    fn mastering_only_batch_word_empties_the_batch() {
        let mut progress = progress_with_batch(&["a"]);
        progress.word_scores.insert("a".to_string(), 400);

        apply_answer(&mut progress, "a", true);
        assert!(progress.current_words.is_empty());
        assert_eq!(progress.current_word_index, 0);
    }

    #[test]
    fn repeated_mastery_answer_does_not_report_mastered_again() {
        let mut progress = progress_with_batch(&["a"]);
        progress.word_scores.insert("a".to_string(), 600);
        progress.known_words.insert("a".to_string());

        let (score, mastered) = apply_answer(&mut progress, "a", true);
        assert_eq!(score, 700);
        assert!(!mastered);
    }
}
