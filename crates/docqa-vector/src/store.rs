//! The retrieval store: corpus, vector index and the embedder that feeds them.
//!
//! `RetrievalStore` is the one owner of the shared retrieval state. It is
//! constructed once by the composition root and shared as
//! `Arc<RetrievalStore<E>>` with request handlers.
//!
//! Corpus and index live behind a single `RwLock`, so a reader either sees a
//! document's fragments and vectors together or not at all. Ingestions are
//! additionally serialised by an async writer gate held across
//! fragment -> embed -> commit; queries never wait on the embedding stage,
//! only on the short commit.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use docqa_core::config::RetrievalConfig;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::embedding::EmbeddingService;
use crate::error::RetrievalError;
use crate::fragment::{Fragment, Fragmenter};
use crate::index::VectorIndex;

/// Minimum trimmed character count for a document to be indexed.
pub const DEFAULT_MIN_READABLE_CHARS: usize = 50;

/// A retrieved fragment and its squared L2 distance from the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedFragment {
    pub content: String,
    pub distance: f32,
}

/// Point-in-time sizes of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub fragments: usize,
    pub vectors: usize,
    pub dimensions: usize,
}

struct StoreState {
    corpus: Vec<Fragment>,
    index: VectorIndex,
}

/// Corpus + index pair with ingestion and top-k retrieval.
pub struct RetrievalStore<E: EmbeddingService> {
    embedder: E,
    fragmenter: Fragmenter,
    min_readable_chars: usize,
    state: RwLock<StoreState>,
    writer: tokio::sync::Mutex<()>,
}

impl<E: EmbeddingService> RetrievalStore<E> {
    /// Create an empty store. The index dimension comes from the embedder,
    /// which must report a non-zero dimension.
    pub fn new(
        embedder: E,
        fragmenter: Fragmenter,
        min_readable_chars: usize,
    ) -> Result<Self, RetrievalError> {
        let index = VectorIndex::new(embedder.dimensions())?;
        Ok(Self {
            embedder,
            fragmenter,
            min_readable_chars,
            state: RwLock::new(StoreState {
                corpus: Vec::new(),
                index,
            }),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    /// Create a store with 200-character fragments and a 50-character
    /// readability threshold.
    pub fn with_defaults(embedder: E) -> Result<Self, RetrievalError> {
        Self::new(embedder, Fragmenter::default(), DEFAULT_MIN_READABLE_CHARS)
    }

    /// Create a store from the `[retrieval]` config section.
    pub fn from_config(embedder: E, config: &RetrievalConfig) -> Result<Self, RetrievalError> {
        let fragmenter = Fragmenter::new(config.fragment_size)?;
        Self::new(embedder, fragmenter, config.min_readable_chars)
    }

    /// Fragment, embed and index a document's text.
    ///
    /// Returns the number of fragments added. Text whose trimmed length is
    /// below the readability threshold is rejected without touching state.
    /// Ingestion is all-or-nothing: if embedding fails, or the embedder
    /// returns the wrong number or shape of vectors, nothing is stored.
    pub async fn ingest(&self, raw_text: &str) -> Result<usize, RetrievalError> {
        let readable = raw_text.trim().chars().count();
        if raw_text.trim().is_empty() || readable < self.min_readable_chars {
            debug!(
                chars = readable,
                min_chars = self.min_readable_chars,
                "Rejecting document without readable text"
            );
            return Err(RetrievalError::EmptyOrUnreadableInput {
                chars: readable,
                min_chars: self.min_readable_chars,
            });
        }

        let _writer = self.writer.lock().await;

        let fragments = self.fragmenter.fragment(raw_text);
        let texts: Vec<String> = fragments.iter().map(|f| f.as_str().to_string()).collect();

        let vectors = self.embedder.embed(&texts).await.inspect_err(|e| {
            warn!(error = %e, fragments = texts.len(), "Embedding failed; nothing indexed");
        })?;
        if vectors.len() != fragments.len() {
            return Err(RetrievalError::BatchMismatch {
                fragments: fragments.len(),
                vectors: vectors.len(),
            });
        }

        let added = fragments.len();
        let total = {
            let mut state = self.write_state()?;
            // The index validates the whole batch before writing anything,
            // so a rejected add leaves both halves untouched.
            state.index.add(&vectors)?;
            state.corpus.extend(fragments);
            state.corpus.len()
        };

        info!(fragments = added, total, "Document indexed");
        Ok(added)
    }

    /// Fragment texts closest to `question`, nearest first.
    ///
    /// An empty store returns an empty list without calling the embedder.
    pub async fn answer_query(
        &self,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<String>, RetrievalError> {
        Ok(self
            .retrieve(question, top_k)
            .await?
            .into_iter()
            .map(|r| r.content)
            .collect())
    }

    /// Like [`answer_query`](Self::answer_query) but keeps the distances.
    pub async fn retrieve(
        &self,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedFragment>, RetrievalError> {
        if self.is_empty()? {
            debug!("Query against empty store");
            return Ok(Vec::new());
        }

        let query = self.embedder.embed_one(question).await?;

        let state = self.read_state()?;
        let hits = state.index.search(&query, top_k)?;

        // Every position the index returns has a corpus entry: both grow
        // under the same write guard. An out-of-range position is a bug.
        let results = hits
            .into_iter()
            .map(|hit| {
                assert!(
                    hit.position < state.corpus.len(),
                    "index position {} outside corpus of {} fragments",
                    hit.position,
                    state.corpus.len()
                );
                RetrievedFragment {
                    content: state.corpus[hit.position].as_str().to_string(),
                    distance: hit.distance,
                }
            })
            .collect::<Vec<_>>();

        debug!(top_k, returned = results.len(), "Query answered");
        Ok(results)
    }

    /// Number of fragments stored.
    pub fn len(&self) -> Result<usize, RetrievalError> {
        Ok(self.read_state()?.corpus.len())
    }

    pub fn is_empty(&self) -> Result<bool, RetrievalError> {
        Ok(self.read_state()?.corpus.is_empty())
    }

    /// Corpus and index sizes read under one guard.
    pub fn stats(&self) -> Result<StoreStats, RetrievalError> {
        let state = self.read_state()?;
        Ok(StoreStats {
            fragments: state.corpus.len(),
            vectors: state.index.len(),
            dimensions: state.index.dimensions(),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    pub fn fragment_size(&self) -> usize {
        self.fragmenter.size()
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, StoreState>, RetrievalError> {
        self.state.read().map_err(|_| RetrievalError::LockPoisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, StoreState>, RetrievalError> {
        self.state.write().map_err(|_| RetrievalError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::embedding::MockEmbedding;

    /// Embedder that claims one dimension but produces another.
    struct LyingDimensions;

    impl EmbeddingService for LyingDimensions {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
            Ok(texts.iter().map(|_| vec![0.5; 4]).collect())
        }

        fn dimensions(&self) -> usize {
            8
        }
    }

    /// Embedder that drops the last vector of every batch.
    struct DropsOne;

    impl EmbeddingService for DropsOne {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
            Ok(texts
                .iter()
                .skip(1)
                .map(|_| vec![1.0; 4])
                .collect())
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    fn make_store() -> RetrievalStore<MockEmbedding> {
        RetrievalStore::with_defaults(MockEmbedding::new()).unwrap()
    }

    fn assert_consistent<E: EmbeddingService>(store: &RetrievalStore<E>) {
        let stats = store.stats().unwrap();
        assert_eq!(stats.fragments, stats.vectors);
    }

    #[tokio::test]
    async fn test_end_to_end_single_document() {
        let store = make_store();
        let added = store.ingest(&"A".repeat(250)).await.unwrap();
        assert_eq!(added, 2);

        let stats = store.stats().unwrap();
        assert_eq!(stats.fragments, 2);
        assert_eq!(stats.vectors, 2);
        assert_eq!(stats.dimensions, 384);

        let results = store.retrieve("what is in the document?", 3).await.unwrap();
        assert_eq!(results.len(), 2);
        let mut contents: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
        contents.sort_by_key(|c| std::cmp::Reverse(c.len()));
        assert_eq!(contents, vec!["A".repeat(200), "A".repeat(50)]);
        for r in &results {
            assert!(r.distance.is_finite());
            assert!(r.distance >= 0.0);
        }
        assert!(results[0].distance <= results[1].distance);
    }

    #[tokio::test]
    async fn test_empty_and_whitespace_rejected() {
        let store = make_store();
        for text in ["", "  ", "\n\t  \n"] {
            let result = store.ingest(text).await;
            assert!(matches!(
                result,
                Err(RetrievalError::EmptyOrUnreadableInput { .. })
            ));
        }
        assert_eq!(store.len().unwrap(), 0);
        assert_consistent(&store);
    }

    #[tokio::test]
    async fn test_short_text_rejected_after_trimming() {
        let store = make_store();
        let text = format!("   {}   ", "x".repeat(49));
        match store.ingest(&text).await {
            Err(RetrievalError::EmptyOrUnreadableInput { chars, min_chars }) => {
                assert_eq!(chars, 49);
                assert_eq!(min_chars, 50);
            }
            other => panic!("expected EmptyOrUnreadableInput, got {:?}", other),
        }
        assert!(store.is_empty().unwrap());

        assert_eq!(store.ingest(&"x".repeat(50)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_query_on_empty_store_is_empty() {
        // The embedder is never called for an empty store.
        let store = RetrievalStore::with_defaults(MockEmbedding::unavailable()).unwrap();
        let results = store.answer_query("anything at all", 3).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_commits_nothing() {
        let store = RetrievalStore::with_defaults(MockEmbedding::unavailable()).unwrap();
        let result = store.ingest(&"valid readable text ".repeat(10)).await;
        assert!(matches!(result, Err(RetrievalError::EmbeddingUnavailable(_))));
        assert_eq!(store.len().unwrap(), 0);
        assert_consistent(&store);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_commits_nothing() {
        let store = RetrievalStore::with_defaults(LyingDimensions).unwrap();
        let result = store.ingest(&"b".repeat(120)).await;
        assert!(matches!(
            result,
            Err(RetrievalError::DimensionMismatch {
                expected: 8,
                actual: 4
            })
        ));
        assert_eq!(store.stats().unwrap().vectors, 0);
        assert_consistent(&store);
    }

    #[tokio::test]
    async fn test_batch_mismatch_commits_nothing() {
        let store = RetrievalStore::with_defaults(DropsOne).unwrap();
        let result = store.ingest(&"c".repeat(450)).await;
        assert!(matches!(
            result,
            Err(RetrievalError::BatchMismatch {
                fragments: 3,
                vectors: 2
            })
        ));
        assert!(store.is_empty().unwrap());
        assert_consistent(&store);
    }

    #[tokio::test]
    async fn test_exact_fragment_ranks_first() {
        let store = RetrievalStore::new(MockEmbedding::new(), Fragmenter::new(20).unwrap(), 10).unwrap();
        let text = "the cat sat on a mat\
                    rust ownership rules\
                    vector index lookups";
        assert_eq!(store.ingest(text).await.unwrap(), 3);

        let results = store.retrieve("rust ownership rules", 3).await.unwrap();
        assert_eq!(results[0].content, "rust ownership rules");
        assert_eq!(results[0].distance, 0.0);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_top_k_limits_and_clamps() {
        let store = RetrievalStore::new(MockEmbedding::new(), Fragmenter::new(10).unwrap(), 1).unwrap();
        let text: String = (0..8).map(|i| format!("fragment{:02}", i)).collect();
        assert_eq!(store.ingest(&text).await.unwrap(), 8);

        assert_eq!(store.answer_query("q", 3).await.unwrap().len(), 3);
        assert_eq!(store.answer_query("q", 100).await.unwrap().len(), 8);
        assert!(store.answer_query("q", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_queries_are_deterministic() {
        let store = make_store();
        store
            .ingest(&"Determinism keeps retrieval reproducible. ".repeat(20))
            .await
            .unwrap();

        let first = store.retrieve("reproducible?", 3).await.unwrap();
        let second = store.retrieve("reproducible?", 3).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_multiple_documents_append() {
        let store = make_store();
        assert_eq!(store.ingest(&"first ".repeat(50)).await.unwrap(), 2);
        assert_eq!(store.ingest(&"second ".repeat(60)).await.unwrap(), 3);
        assert_eq!(store.len().unwrap(), 5);
        assert_consistent(&store);

        // A rejected document in between changes nothing.
        assert!(store.ingest("tiny").await.is_err());
        assert_eq!(store.len().unwrap(), 5);
    }

    #[tokio::test]
    async fn test_zero_dimension_embedder_rejected() {
        let result = RetrievalStore::with_defaults(MockEmbedding::with_dimensions(0));
        assert!(matches!(result, Err(RetrievalError::InvalidDimensions)));
    }

    #[tokio::test]
    async fn test_from_config() {
        let config = RetrievalConfig {
            fragment_size: 64,
            top_k: 3,
            min_readable_chars: 5,
        };
        let store = RetrievalStore::from_config(MockEmbedding::with_dimensions(16), &config).unwrap();
        assert_eq!(store.fragment_size(), 64);
        assert_eq!(store.dimensions(), 16);
        assert_eq!(store.ingest("hello there").await.unwrap(), 1);

        let bad = RetrievalConfig {
            fragment_size: 0,
            ..config
        };
        assert!(matches!(
            RetrievalStore::from_config(MockEmbedding::new(), &bad),
            Err(RetrievalError::InvalidFragmentSize)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingest_and_query_stay_consistent() {
        let store = Arc::new(make_store());
        let mut handles = Vec::new();

        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let text = format!("document number {} ", i).repeat(30);
                store.ingest(&text).await.unwrap();
            }));
        }
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let results = store.answer_query("document", 3).await.unwrap();
                assert!(results.len() <= 3);
                assert_consistent(&store);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = store.stats().unwrap();
        assert_eq!(stats.fragments, stats.vectors);
        let expected: usize = (0..16)
            .map(|i| format!("document number {} ", i).repeat(30).len().div_ceil(200))
            .sum();
        assert_eq!(stats.fragments, expected);
    }
}
