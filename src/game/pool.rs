use rand::RngExt;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};

use crate::questions::{PlayableQuestion, QuestionRecord};
use crate::store::{keys, SharedStore};

/// One question source: a store hash and how many entries each refill draws.
#[derive(Debug, Clone)]
pub struct PoolSource {
    pub hash_key: String,
    pub draw: usize,
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub sources: Vec<PoolSource>,
    /// A refill is triggered when the queue drops below this length.
    pub min_queue_len: usize,
    /// Refills beyond this count are refused; covers the player who has
    /// seen the whole catalog.
    pub refill_limit: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                PoolSource {
                    hash_key: keys::NORMAL_QUESTIONS.to_owned(),
                    draw: 10,
                },
                PoolSource {
                    hash_key: keys::FINAL_QUESTIONS.to_owned(),
                    draw: 5,
                },
            ],
            min_queue_len: 5,
            refill_limit: 10,
        }
    }
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("question pool is exhausted")]
    Exhausted,
    #[error("shared store error: {0}")]
    Store(#[from] anyhow::Error),
}

struct PoolInner {
    queue: VecDeque<PlayableQuestion>,
    /// Indices already played this game, per source hash.
    seen: HashMap<String, HashSet<u64>>,
    refill_count: u32,
    refill_in_flight: bool,
}

/// Lazy, deduplicating, self-refilling queue of playable questions.
///
/// Construction kicks off the initial refill in the background; the first
/// `pop` waits for it. Later refills run in the background whenever a pop
/// leaves the queue below the low-water mark. Within one game no two
/// questions share a source index, until the refill limit is hit.
pub struct QuestionPool {
    store: Arc<dyn SharedStore>,
    config: PoolConfig,
    inner: Arc<Mutex<PoolInner>>,
    ready: watch::Receiver<bool>,
}

impl QuestionPool {
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>, config: PoolConfig) -> Self {
        let inner = Arc::new(Mutex::new(PoolInner {
            queue: VecDeque::new(),
            seen: HashMap::new(),
            refill_count: 0,
            refill_in_flight: true,
        }));
        let (ready_tx, ready_rx) = watch::channel(false);

        {
            let store = Arc::clone(&store);
            let config = config.clone();
            let inner = Arc::clone(&inner);
            tokio::spawn(async move {
                refill(&store, &config, &inner).await;
                let _ = ready_tx.send(true);
            });
        }

        Self {
            store,
            config,
            inner,
            ready: ready_rx,
        }
    }

    /// Number of queued questions right now.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.queue.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Take the next playable question.
    ///
    /// Waits for the initial refill on first use; afterwards returns
    /// immediately from the queue and triggers a background refill when the
    /// remaining length drops below the configured minimum.
    pub async fn pop(&self) -> Result<PlayableQuestion, PoolError> {
        let mut ready = self.ready.clone();
        while !*ready.borrow() {
            if ready.changed().await.is_err() {
                break;
            }
        }

        let mut inner = self.inner.lock().await;
        let question = inner.queue.pop_front();

        let needs_refill = inner.queue.len() < self.config.min_queue_len
            && inner.refill_count < self.config.refill_limit
            && !inner.refill_in_flight;
        if needs_refill {
            inner.refill_in_flight = true;
            let store = Arc::clone(&self.store);
            let config = self.config.clone();
            let inner_handle = Arc::clone(&self.inner);
            tokio::spawn(async move {
                refill(&store, &config, &inner_handle).await;
            });
        }
        drop(inner);

        question.ok_or(PoolError::Exhausted)
    }
}

/// Draw one batch from every configured source and append the unseen
/// questions to the queue. Runs off the caller's path; store errors are
/// logged, not propagated, so a flaky refill only shrinks the queue.
async fn refill(store: &Arc<dyn SharedStore>, config: &PoolConfig, inner: &Arc<Mutex<PoolInner>>) {
    {
        let mut guard = inner.lock().await;
        if guard.refill_count >= config.refill_limit {
            tracing::error!(
                limit = config.refill_limit,
                "exceeded maximum number of question refills in a game"
            );
            guard.refill_in_flight = false;
            return;
        }
        guard.refill_count += 1;
    }

    for source in &config.sources {
        match draw_from_source(store, source).await {
            Ok(batch) => {
                let mut guard = inner.lock().await;
                for (index, record) in batch {
                    let seen = guard.seen.entry(source.hash_key.clone()).or_default();
                    if !seen.insert(index) {
                        continue;
                    }
                    if record.suggestions.len() < 2 {
                        tracing::warn!(
                            hash_key = %source.hash_key,
                            index,
                            "skipping catalog record with too few suggestions"
                        );
                        continue;
                    }
                    let mut rng = rand::rng();
                    let playable = record.into_playable(index, &mut rng);
                    guard.queue.push_back(playable);
                }
            }
            Err(error) => {
                tracing::error!(%error, hash_key = %source.hash_key, "question refill failed");
            }
        }
    }

    inner.lock().await.refill_in_flight = false;
}

/// Sample `source.draw` distinct indices and fetch them in one multi-get.
async fn draw_from_source(
    store: &Arc<dyn SharedStore>,
    source: &PoolSource,
) -> anyhow::Result<Vec<(u64, QuestionRecord)>> {
    let total = store.hlen(&source.hash_key).await?;
    if total == 0 {
        return Ok(Vec::new());
    }

    let indices = sample_distinct(source.draw.min(total), total as u64);
    let fields: Vec<String> = indices.iter().map(u64::to_string).collect();
    let slots = store.hmget(&source.hash_key, &fields).await?;

    let mut batch = Vec::with_capacity(indices.len());
    for (index, slot) in indices.into_iter().zip(slots) {
        let Some(json) = slot else {
            tracing::warn!(hash_key = %source.hash_key, index, "missing catalog entry");
            continue;
        };
        match serde_json::from_str::<QuestionRecord>(&json) {
            Ok(record) => batch.push((index, record)),
            Err(error) => {
                tracing::warn!(%error, hash_key = %source.hash_key, index, "unparseable catalog entry");
            }
        }
    }
    Ok(batch)
}

/// Rejection-sample `count` distinct values uniformly from `[0, upper)`.
fn sample_distinct(count: usize, upper: u64) -> Vec<u64> {
    let mut rng = rand::rng();
    let mut picked = HashSet::with_capacity(count);
    while picked.len() < count {
        picked.insert(rng.random_range(0..upper));
    }
    picked.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn seed_catalog(store: &MemoryStore, hash_key: &str, count: usize) {
        for index in 0..count {
            let record = QuestionRecord {
                category: "test".into(),
                question: format!("question {index}"),
                answer: format!("answer {index}"),
                alternate_spellings: Vec::new(),
                suggestions: vec!["wrong 1".into(), "wrong 2".into(), "wrong 3".into()],
            };
            store
                .hset(
                    hash_key,
                    &index.to_string(),
                    &serde_json::to_string(&record).unwrap(),
                )
                .await
                .unwrap();
        }
    }

    fn config(sources: Vec<PoolSource>, min_queue_len: usize, refill_limit: u32) -> PoolConfig {
        PoolConfig {
            sources,
            min_queue_len,
            refill_limit,
        }
    }

    #[tokio::test]
    async fn test_first_pop_waits_for_initial_refill() {
        let store = Arc::new(MemoryStore::new());
        seed_catalog(&store, "q", 20).await;
        let pool = QuestionPool::new(
            Arc::clone(&store) as _,
            config(
                vec![PoolSource {
                    hash_key: "q".into(),
                    draw: 10,
                }],
                2,
                10,
            ),
        );

        // No sleeps: pop must block until the constructor's refill lands.
        let question = pool.pop().await.unwrap();
        assert!(question.question.starts_with("question "));
        assert_eq!(question.options.len(), 3);
        assert!(question.options.contains(&question.answer));
    }

    #[tokio::test]
    async fn test_source_indices_are_distinct_within_a_game() {
        let store = Arc::new(MemoryStore::new());
        seed_catalog(&store, "q", 12).await;
        let pool = QuestionPool::new(
            Arc::clone(&store) as _,
            config(
                vec![PoolSource {
                    hash_key: "q".into(),
                    draw: 6,
                }],
                4,
                20,
            ),
        );

        let mut seen = HashSet::new();
        // Drain far more than one refill's worth to cross refill boundaries.
        for _ in 0..12 {
            let question = match pool.pop().await {
                Ok(question) => question,
                Err(PoolError::Exhausted) => break,
                Err(error) => panic!("unexpected pool error: {error}"),
            };
            assert!(
                seen.insert(question.source_index),
                "index {} drawn twice",
                question.source_index
            );
            // Let the background refill catch up between pops.
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        }
        assert!(!seen.is_empty());
    }

    #[tokio::test]
    async fn test_pool_exhaustion_is_a_typed_error() {
        let store = Arc::new(MemoryStore::new());
        seed_catalog(&store, "q", 2).await;
        let pool = QuestionPool::new(
            Arc::clone(&store) as _,
            config(
                vec![PoolSource {
                    hash_key: "q".into(),
                    draw: 2,
                }],
                1,
                1,
            ),
        );

        // Two questions exist; the third pop must report exhaustion.
        pool.pop().await.unwrap();
        pool.pop().await.unwrap();
        let result = pool.pop().await;
        assert!(matches!(result, Err(PoolError::Exhausted)));
    }

    #[tokio::test]
    async fn test_refill_draws_from_every_source() {
        let store = Arc::new(MemoryStore::new());
        seed_catalog(&store, "normal", 10).await;
        seed_catalog(&store, "final", 5).await;
        let pool = QuestionPool::new(
            Arc::clone(&store) as _,
            config(
                vec![
                    PoolSource {
                        hash_key: "normal".into(),
                        draw: 3,
                    },
                    PoolSource {
                        hash_key: "final".into(),
                        draw: 2,
                    },
                ],
                1,
                10,
            ),
        );

        // First pop gates on the initial refill, which draws 3 + 2.
        pool.pop().await.unwrap();
        assert_eq!(pool.len().await, 4);
    }

    #[tokio::test]
    async fn test_empty_catalog_exhausts_immediately() {
        let store = Arc::new(MemoryStore::new());
        let pool = QuestionPool::new(
            Arc::clone(&store) as _,
            config(
                vec![PoolSource {
                    hash_key: "missing".into(),
                    draw: 10,
                }],
                5,
                10,
            ),
        );
        assert!(matches!(pool.pop().await, Err(PoolError::Exhausted)));
    }

    #[test]
    fn test_sample_distinct_stays_in_range() {
        for _ in 0..20 {
            let indices = sample_distinct(5, 8);
            assert_eq!(indices.len(), 5);
            let unique: HashSet<u64> = indices.iter().copied().collect();
            assert_eq!(unique.len(), 5);
            assert!(indices.iter().all(|&i| i < 8));
        }
    }
}
