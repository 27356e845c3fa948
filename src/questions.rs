use rand::RngExt;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::store::{keys, SharedStore};

/// Placeholder in raw question prompts that gets widened for display.
const BLANK_MARKER: &str = "<BLANK>";
const BLANK_DISPLAY: &str = " _______ ";

/// A catalog question as stored on disk and in the category hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub category: String,
    pub question: String,
    pub answer: String,
    pub alternate_spellings: Vec<String>,
    pub suggestions: Vec<String>,
}

/// A question prepared for one round: a chosen answer variant and a
/// shuffled 3-option list, one of which equals the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayableQuestion {
    pub question: String,
    pub answer: String,
    pub options: Vec<String>,
    /// Field id in the source hash, for per-game deduplication.
    pub source_index: u64,
}

impl QuestionRecord {
    /// Convert to playable form: with probability ½ the canonical answer is
    /// kept, otherwise a uniformly-chosen alternate spelling replaces it
    /// (when any exist); two distinct suggestions become the distractors.
    ///
    /// Requires at least two suggestions; the loader enforces that before
    /// any record reaches the store.
    pub fn into_playable<R: RngExt>(self, source_index: u64, rng: &mut R) -> PlayableQuestion {
        let answer = if self.alternate_spellings.is_empty() || rng.random_bool(0.5) {
            self.answer
        } else {
            let idx = rng.random_range(0..self.alternate_spellings.len());
            self.alternate_spellings
                .get(idx)
                .cloned()
                .unwrap_or(self.answer)
        };

        let mut options = sample_two_distinct(&self.suggestions, rng);
        options.push(answer.clone());
        shuffle(&mut options, rng);

        PlayableQuestion {
            question: self.question,
            answer,
            options,
            source_index,
        }
    }
}

/// Two distinct entries sampled uniformly from `pool`.
fn sample_two_distinct<R: RngExt>(pool: &[String], rng: &mut R) -> Vec<String> {
    debug_assert!(pool.len() >= 2, "loader guarantees two or more suggestions");
    let first = rng.random_range(0..pool.len());
    let second = loop {
        let candidate = rng.random_range(0..pool.len());
        if candidate != first {
            break candidate;
        }
    };
    [first, second]
        .into_iter()
        .filter_map(|idx| pool.get(idx).cloned())
        .collect()
}

/// Fisher-Yates shuffle; the list is only ever three entries long.
fn shuffle<R: RngExt>(items: &mut [String], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// The on-disk catalog file: one list per category.
#[derive(Debug, Deserialize)]
struct QuestionFile {
    normal: Vec<QuestionRecord>,
    #[serde(rename = "final")]
    final_round: Vec<QuestionRecord>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read question file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse question file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("invalid record {index} in category {category}: {reason}")]
    InvalidRecord {
        category: String,
        index: usize,
        reason: String,
    },
    #[error("shared store error while loading questions: {0}")]
    Store(#[from] anyhow::Error),
}

/// Count of records loaded per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub normal: usize,
    pub final_round: usize,
}

/// Load the question catalog into the store's category hashes. Runs once at
/// bootstrap; the hashes are read-only afterwards.
pub async fn load_questions(
    path: impl AsRef<Path>,
    store: &dyn SharedStore,
) -> Result<LoadSummary, LoadError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: display.clone(),
        source,
    })?;
    let file: QuestionFile = serde_json::from_str(&raw).map_err(|source| LoadError::Parse {
        path: display,
        source,
    })?;

    let normal = load_category(store, keys::NORMAL_QUESTIONS, "normal", file.normal).await?;
    let final_round =
        load_category(store, keys::FINAL_QUESTIONS, "final", file.final_round).await?;

    Ok(LoadSummary {
        normal,
        final_round,
    })
}

async fn load_category(
    store: &dyn SharedStore,
    hash_key: &str,
    category: &str,
    records: Vec<QuestionRecord>,
) -> Result<usize, LoadError> {
    // Drop whatever an earlier run left behind; otherwise a shrunk catalog
    // would leave stale entries at the high indices.
    store.del(hash_key).await?;

    let count = records.len();
    for (index, mut record) in records.into_iter().enumerate() {
        validate_record(&record).map_err(|reason| LoadError::InvalidRecord {
            category: category.to_owned(),
            index,
            reason,
        })?;
        record.question = record.question.replace(BLANK_MARKER, BLANK_DISPLAY);

        let json = serde_json::to_string(&record).map_err(|source| LoadError::Parse {
            path: hash_key.to_owned(),
            source,
        })?;
        store.hset(hash_key, &index.to_string(), &json).await?;
    }
    Ok(count)
}

fn validate_record(record: &QuestionRecord) -> Result<(), String> {
    if record.question.trim().is_empty() {
        return Err("empty question prompt".to_string());
    }
    if record.answer.trim().is_empty() {
        return Err("empty answer".to_string());
    }
    if record.suggestions.len() < 2 {
        return Err(format!(
            "needs at least 2 suggestions, has {}",
            record.suggestions.len()
        ));
    }
    Ok(())
}
