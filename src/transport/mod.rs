//! Chat-facing layer: routes incoming text to the session core and renders
//! replies. Answers get first claim on any text; whatever the session does
//! not recognize falls through to the menu.

pub mod telegram;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::progress::store::ProgressStore;
use crate::session::{AnswerOutcome, SessionManager, SessionSignal, TrainingMode};
use crate::sync::SyncReconciler;
use crate::transport::telegram::{ReplyKeyboardMarkup, TelegramClient};

// Menu button labels. They double as match keys for incoming text.
pub const BTN_LEARN_WORDS: &str = "📚 Учить слова";
pub const BTN_LEARN_ARTICLES: &str = "🎯 Учить артикли";
pub const BTN_STATS: &str = "📈 Статистика";
pub const BTN_SETTINGS: &str = "⚙️ Настройки";
pub const BTN_NEW_BATCH: &str = "🆕 Новый батч";
pub const BTN_REPEAT_BATCH: &str = "🔁 Повторить батч";
pub const BTN_SYNC_NOW: &str = "🔄 Синхронизация";
pub const BTN_MAIN_MENU: &str = "⬅️ В меню";

pub const GREETING: &str =
    "Привет! Я твой бот для изучения немецкого языка 🇩🇪\nВыбери действие из меню ниже!";
pub const FALLBACK_PROMPT: &str = "Пожалуйста, выбери действие из меню ниже!";

/// Namespaced learner id as persisted across both storage tiers.
pub fn learner_key(chat_id: i64) -> String {
    format!("tg:{chat_id}")
}

fn main_menu() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup::from_rows(vec![
        vec![BTN_LEARN_WORDS.to_string(), BTN_LEARN_ARTICLES.to_string()],
        vec![BTN_STATS.to_string(), BTN_SETTINGS.to_string()],
    ])
}

// A batch only completes once it has emptied, so offering to repeat it
// would be a dead action. The repeat button stays routable below because
// stale keyboards linger in chat history.
fn batch_complete_menu() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup::from_rows(vec![
        vec![BTN_NEW_BATCH.to_string()],
        vec![BTN_MAIN_MENU.to_string()],
    ])
}

fn settings_menu() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup::from_rows(vec![
        vec![BTN_SYNC_NOW.to_string()],
        vec![BTN_MAIN_MENU.to_string()],
    ])
}

fn options_keyboard(options: &[String]) -> ReplyKeyboardMarkup {
    let rows = options.chunks(2).map(|chunk| chunk.to_vec()).collect();
    ReplyKeyboardMarkup::from_rows(rows)
}

/// One outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<ReplyKeyboardMarkup>,
}

impl Reply {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    fn with_keyboard(text: impl Into<String>, keyboard: ReplyKeyboardMarkup) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// Turns one incoming text into the replies to send back. Pure with
/// respect to the wire: the polling loop owns delivery.
pub struct Dispatcher {
    sessions: Arc<SessionManager>,
    store: Arc<ProgressStore>,
    reconciler: Arc<SyncReconciler>,
}

impl Dispatcher {
    pub fn new(
        sessions: Arc<SessionManager>,
        store: Arc<ProgressStore>,
        reconciler: Arc<SyncReconciler>,
    ) -> Self {
        Self {
            sessions,
            store,
            reconciler,
        }
    }

    pub async fn handle_text(&self, learner_id: &str, text: &str) -> Vec<Reply> {
        let text = text.trim();

        match self.sessions.submit_answer(learner_id, text).await {
            AnswerOutcome::Answered { feedback, next } => {
                let verdict = if feedback.correct {
                    if feedback.mastered {
                        format!("✅ Верно! Слово выучено 🎉 (всего: {})", feedback.score_total)
                    } else {
                        format!("✅ Верно! +100 (всего: {})", feedback.score_total)
                    }
                } else {
                    format!("❌ Неверно. Правильный ответ: {}", feedback.correct_answer)
                };
                return vec![Reply::new(verdict), self.render_signal(next)];
            }
            AnswerOutcome::Unrecognized => {}
        }

        match text {
            "/start" => vec![Reply::with_keyboard(GREETING, main_menu())],
            BTN_LEARN_WORDS => self.start(learner_id, TrainingMode::Vocabulary).await,
            BTN_LEARN_ARTICLES => self.start(learner_id, TrainingMode::Article).await,
            BTN_STATS => vec![self.stats(learner_id).await],
            BTN_SETTINGS => vec![Reply::with_keyboard(
                "⚙️ Настройки: здесь можно вручную синхронизировать прогресс.",
                settings_menu(),
            )],
            BTN_SYNC_NOW => vec![self.sync_now(learner_id).await],
            BTN_NEW_BATCH => {
                let signal = self.sessions.new_batch(learner_id).await;
                vec![self.render_signal(signal)]
            }
            BTN_REPEAT_BATCH => {
                let signal = self.sessions.repeat_batch(learner_id).await;
                vec![self.render_signal(signal)]
            }
            BTN_MAIN_MENU => vec![Reply::with_keyboard("Выбери действие 👇", main_menu())],
            _ => vec![Reply::with_keyboard(FALLBACK_PROMPT, main_menu())],
        }
    }

    async fn start(&self, learner_id: &str, mode: TrainingMode) -> Vec<Reply> {
        let signal = self.sessions.start_training(learner_id, mode, false).await;
        vec![self.render_signal(signal)]
    }

    fn render_signal(&self, signal: SessionSignal) -> Reply {
        match signal {
            SessionSignal::Question(question) => {
                let keyboard = options_keyboard(&question.options);
                Reply::with_keyboard(question.prompt, keyboard)
            }
            SessionSignal::BatchComplete => Reply::with_keyboard(
                "🎉 Батч пройден! Все слова выучены. Взять новый?",
                batch_complete_menu(),
            ),
            SessionSignal::NothingToLearn => Reply::with_keyboard(
                "Все доступные слова уже выучены. Нечего учить 🎓",
                main_menu(),
            ),
        }
    }

    async fn stats(&self, learner_id: &str) -> Reply {
        let progress = self.store.load(learner_id).await;
        let summary = progress.summary();
        Reply::with_keyboard(
            format!(
                "📈 Твоя статистика:\nСлов встречено: {}\nВыучено: {}\nС ошибками: {}\nОчки: {}\nВ текущем батче: {}",
                summary.words_seen,
                summary.known_words,
                summary.error_words,
                summary.total_score,
                summary.batch_size
            ),
            main_menu(),
        )
    }

    async fn sync_now(&self, learner_id: &str) -> Reply {
        match self.reconciler.reconcile_one(learner_id).await {
            Ok(report) if report.success => Reply::with_keyboard(
                format!("🔄 Синхронизация завершена: отправлено {}.", report.pushed),
                main_menu(),
            ),
            Ok(report) => Reply::with_keyboard(
                format!(
                    "⚠️ Синхронизация прошла частично: отправлено {}, с ошибками {}.",
                    report.pushed, report.failed
                ),
                main_menu(),
            ),
            Err(e) => {
                tracing::warn!(error = %e, learner_id = %learner_id, "manual sync failed");
                Reply::with_keyboard("❌ Синхронизация не удалась. Попробуй позже.", main_menu())
            }
        }
    }
}

/// Long-polling loop. Runs until the shutdown channel fires; transport
/// errors back off and retry, handler replies that fail to send are logged
/// and skipped.
pub async fn run_polling(
    client: TelegramClient,
    dispatcher: Dispatcher,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut offset = 0i64;
    tracing::info!("telegram polling started");

    loop {
        let updates = tokio::select! {
            _ = shutdown.recv() => break,
            result = client.get_updates(offset) => match result {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, "getUpdates failed, backing off");
                    tokio::select! {
                        _ = shutdown.recv() => break,
                        _ = tokio::time::sleep(Duration::from_secs(5)) => continue,
                    }
                }
            },
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(message) = update.message else { continue };
            let Some(text) = message.text else { continue };
            let learner_id = learner_key(message.chat.id);

            let replies = dispatcher.handle_text(&learner_id, &text).await;
            for reply in replies {
                if let Err(e) = client
                    .send_message(message.chat.id, &reply.text, reply.keyboard.as_ref())
                    .await
                {
                    tracing::warn!(error = %e, chat_id = message.chat.id, "sendMessage failed");
                }
            }
        }
    }

    tracing::info!("telegram polling stopped");
}
