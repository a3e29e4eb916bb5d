//! Query-time similarity search over a persisted index
//!
//! A missing index is not an error: RAG is optional, so [`search`] answers
//! with no results and the conversation carries on unaugmented. A failing
//! embedding server is reported as [`SearchError::Embedding`] so callers can
//! downgrade it to a warning.

use crate::storage::{EmbeddingStore, SimilarityResult, StoreError, VectorStore};
use budgie_embed::{EmbedError, EmbeddingProvider};
use std::path::PathBuf;
use tracing::debug;

/// Minimum cosine similarity used when none is configured.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub index_path: PathBuf,
    pub threshold: f32,
}

impl SearchConfig {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    /// Sets the minimum score. Zero means "unset" and selects
    /// [`DEFAULT_SIMILARITY_THRESHOLD`].
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = effective_threshold(threshold);
        self
    }
}

fn effective_threshold(threshold: f32) -> f32 {
    if threshold == 0.0 {
        DEFAULT_SIMILARITY_THRESHOLD
    } else {
        threshold
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Failed to load index: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbedError),
}

/// An index loaded once and queried many times.
///
/// The store is read-only after loading, so a `Retriever` can be shared
/// across concurrent queries.
#[derive(Debug, Clone)]
pub struct Retriever {
    store: EmbeddingStore,
    threshold: f32,
}

impl Retriever {
    /// Loads the index named by `config`. Returns `Ok(None)` when no index
    /// has been built yet.
    pub async fn open(config: &SearchConfig) -> Result<Option<Self>, SearchError> {
        match EmbeddingStore::open(&config.index_path).await {
            Ok(store) => Ok(Some(Self::from_store(store, config.threshold))),
            Err(StoreError::NotFound(path)) => {
                debug!("No index at {}, skipping retrieval", path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_store(store: EmbeddingStore, threshold: f32) -> Self {
        Self {
            store,
            threshold: effective_threshold(threshold),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    /// Embeds `query` and returns the records scoring at least the
    /// threshold, best first.
    pub async fn search(
        &self,
        query: &str,
        provider: &dyn EmbeddingProvider,
    ) -> Result<Vec<SimilarityResult>, SearchError> {
        if self.store.is_empty() {
            return Ok(Vec::new());
        }
        let embedding = provider.embed_text(query).await?;
        let results = self.store.search(&embedding, self.threshold);
        debug!(
            "{} of {} records scored at least {}",
            results.len(),
            self.store.len(),
            self.threshold
        );
        Ok(results)
    }
}

/// Loads the index at `config.index_path` and searches it for `query`.
///
/// Returns an empty list, without calling the provider, when the index does
/// not exist.
pub async fn search(
    query: &str,
    provider: &dyn EmbeddingProvider,
    config: &SearchConfig,
) -> Result<Vec<SimilarityResult>, SearchError> {
    match Retriever::open(config).await? {
        Some(retriever) => retriever.search(query, provider).await,
        None => Ok(Vec::new()),
    }
}

/// Like [`search`] but returns only the matched contents, in rank order.
pub async fn search_texts(
    query: &str,
    provider: &dyn EmbeddingProvider,
    config: &SearchConfig,
) -> Result<Vec<String>, SearchError> {
    let results = search(query, provider, config).await?;
    Ok(results.into_iter().map(|r| r.content).collect())
}
