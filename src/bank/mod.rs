//! Word table loading: remote tabular export first, then the local cached
//! copy, then the compiled-in starter set. Training keeps working offline.

mod builtin;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BankConfig;

/// Grammatical article of a German noun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Article {
    Der,
    Die,
    Das,
}

impl Article {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "der" => Some(Article::Der),
            "die" => Some(Article::Die),
            "das" => Some(Article::Das),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Article::Der => "der",
            Article::Die => "die",
            Article::Das => "das",
        }
    }

    /// The two wrong options shown next to the correct article.
    pub const fn distractors(self) -> [Article; 2] {
        match self {
            Article::Der => [Article::Die, Article::Das],
            Article::Die => [Article::Der, Article::Das],
            Article::Das => [Article::Der, Article::Die],
        }
    }
}

/// One vocabulary item. `term` is unique within a loaded table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordEntry {
    pub term: String,
    pub correct_answer: String,
    pub distractors: [String; 3],
    pub article: Option<Article>,
}

pub struct WordBank {
    source_url: Option<String>,
    cache_path: PathBuf,
    fetch_timeout: Duration,
    client: reqwest::Client,
}

impl WordBank {
    pub fn new(config: &BankConfig) -> Self {
        Self {
            source_url: config.source_url.clone(),
            cache_path: config.cache_path.clone(),
            fetch_timeout: config.fetch_timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Loads the word table. Never fails and never returns an empty table:
    /// source trouble falls through to the cache, cache trouble to the
    /// built-in set.
    pub async fn load_words(&self) -> Vec<WordEntry> {
        if let Some(url) = &self.source_url {
            match self.fetch_remote(url).await {
                Ok(text) => {
                    let entries = parse_word_table(&text);
                    if entries.is_empty() {
                        tracing::warn!(url = %url, "remote word table contained no usable entries");
                    } else {
                        if let Err(e) = self.write_cache(&text).await {
                            tracing::warn!(error = %e, "failed to refresh word table cache");
                        }
                        tracing::info!(count = entries.len(), "loaded word table from remote source");
                        return entries;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, url = %url, "remote word table fetch failed");
                }
            }
        }

        match tokio::fs::read_to_string(&self.cache_path).await {
            Ok(text) => {
                let entries = parse_word_table(&text);
                if !entries.is_empty() {
                    tracing::info!(
                        count = entries.len(),
                        path = %self.cache_path.display(),
                        "loaded word table from cache"
                    );
                    return entries;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, path = %self.cache_path.display(), "word table cache not readable");
            }
        }

        let entries = builtin::builtin_entries();
        tracing::info!(count = entries.len(), "using built-in word table");
        entries
    }

    async fn fetch_remote(&self, url: &str) -> Result<String, BankError> {
        let response = self
            .client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BankError::Status(response.status()));
        }
        Ok(response.text().await?)
    }

    /// Replaces the cache file through a temp file and rename, so a crash
    /// mid-write never leaves a truncated table behind.
    async fn write_cache(&self, text: &str) -> Result<(), BankError> {
        if let Some(parent) = self.cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.cache_path.with_extension("tmp");
        tokio::fs::write(&tmp_path, text).await?;
        tokio::fs::rename(&tmp_path, &self.cache_path).await?;
        Ok(())
    }
}

/// Parses the semicolon-separated word table:
/// `term;translation;distractor;distractor;distractor[;article]`.
/// Malformed lines are skipped with a warning; duplicate terms keep their
/// first occurrence.
pub fn parse_word_table(text: &str) -> Vec<WordEntry> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut entries = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if index == 0 && line.to_lowercase().starts_with("term;") {
            continue;
        }

        let fields: Vec<&str> = line.split(';').map(str::trim).collect();
        if fields.len() < 5 || fields.iter().take(5).any(|field| field.is_empty()) {
            tracing::warn!(line = index + 1, "skipping malformed word table line");
            continue;
        }

        let article = match fields.get(5) {
            Some(value) if !value.is_empty() => match Article::parse(value) {
                Some(article) => Some(article),
                None => {
                    tracing::warn!(line = index + 1, value = %value, "skipping line with unknown article");
                    continue;
                }
            },
            _ => None,
        };

        if !seen.insert(fields[0].to_string()) {
            continue;
        }

        entries.push(WordEntry {
            term: fields[0].to_string(),
            correct_answer: fields[1].to_string(),
            distractors: [
                fields[2].to_string(),
                fields[3].to_string(),
                fields[4].to_string(),
            ],
            article,
        });
    }

    entries
}

#[derive(Debug, Error)]
pub enum BankError {
    #[error("word table request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("word table source returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("word table cache IO failed: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_with_and_without_article() {
        let table = "\
term;translation;d1;d2;d3;article
Hund;собака;кошка;птица;лошадь;der
gehen;идти;бежать;стоять;сидеть
";
        let entries = parse_word_table(table);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].term, "Hund");
        assert_eq!(entries[0].article, Some(Article::Der));
        assert_eq!(entries[1].article, None);
    }

    #[test]
    fn skips_malformed_lines_and_comments() {
        let table = "\
# starter set
Hund;собака;кошка;птица;лошадь;der
broken line without separators
Katze;кошка;собака;мышь
Tisch;стол;стул;шкаф;диван;unknown
Haus;дом;квартира;улица;сад;das
";
        let entries = parse_word_table(table);
        let terms: Vec<&str> = entries.iter().map(|entry| entry.term.as_str()).collect();
        assert_eq!(terms, vec!["Hund", "Haus"]);
    }

    #[test]
    fn duplicate_terms_keep_first_occurrence() {
        let table = "\
Hund;собака;кошка;птица;лошадь;der
Hund;пёс;кот;птица;лошадь;der
";
        let entries = parse_word_table(table);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].correct_answer, "собака");
    }

    #[test]
    fn article_parsing_is_case_insensitive() {
        assert_eq!(Article::parse(" DER "), Some(Article::Der));
        assert_eq!(Article::parse("Die"), Some(Article::Die));
        assert_eq!(Article::parse("den"), None);
    }

    #[test]
    fn article_distractors_cover_the_other_two() {
        for article in [Article::Der, Article::Die, Article::Das] {
            let distractors = article.distractors();
            assert!(!distractors.contains(&article));
            assert_ne!(distractors[0], distractors[1]);
        }
    }

    #[tokio::test]
    async fn remote_fetch_replaces_the_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("wordbank.csv");

        let table = "Hund;собака;кошка;птица;лошадь;der\nKatze;кошка;собака;мышь;корова;die\n";
        let app = axum::Router::new().route("/words", axum::routing::get(move || async move { table }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // a stale cached table that the fetch must replace
        tokio::fs::write(&cache_path, "alt;старый;a;b;c\n")
            .await
            .unwrap();

        let config = BankConfig {
            source_url: Some(format!("http://{addr}/words")),
            cache_path: cache_path.clone(),
            fetch_timeout: Duration::from_secs(5),
        };
        let bank = WordBank::new(&config);

        let entries = bank.load_words().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].term, "Hund");

        // the cache now holds the fetched table, and no temp file is left
        let cached = tokio::fs::read_to_string(&cache_path).await.unwrap();
        assert_eq!(cached, table);
        assert!(!cache_path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn falls_back_to_cache_then_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("wordbank.csv");

        let config = BankConfig {
            source_url: None,
            cache_path: cache_path.clone(),
            fetch_timeout: Duration::from_secs(1),
        };
        let bank = WordBank::new(&config);

        // no cache file yet: the built-in table answers
        let entries = bank.load_words().await;
        assert!(!entries.is_empty());

        tokio::fs::write(&cache_path, "Hund;собака;кошка;птица;лошадь;der\n")
            .await
            .unwrap();
        let entries = bank.load_words().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].term, "Hund");
    }
}
