//! Building the embedding index from a documentation directory
//!
//! Every run is a fresh build: the store is reset, every matching file is
//! chunked and embedded, and the result is written out once at the end. A run
//! that is interrupted before that final write leaves the previously saved
//! index untouched.
//!
//! Failures are contained to the smallest unit they affect. An unreadable
//! file is skipped; a chunk whose embedding fails is skipped. Both are
//! logged and listed in the returned [`IndexReport`]. Only a missing docs
//! directory or a failed final write abort the run.

use super::discovery::find_files;
use crate::storage::{EmbeddingStore, StoreError, VectorStore};
use budgie_context::{ChunkStrategy, DEFAULT_EXTENSION, ResolvedChunking, create_chunker_for_path};
use budgie_embed::EmbeddingProvider;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Settings for one indexing run.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Directory searched recursively for documents
    pub docs_path: PathBuf,
    /// Only files ending in this extension are indexed
    pub extension: String,
    /// Applied to every discovered file
    pub strategy: ChunkStrategy,
    /// Where the finished index is written
    pub index_path: PathBuf,
    /// Embedding requests in flight at once for a single file. 1 means
    /// strictly sequential.
    pub max_concurrent_embeddings: usize,
}

impl IndexerConfig {
    /// Markdown files with hierarchy chunking, one embedding call at a time.
    pub fn new(docs_path: impl Into<PathBuf>, index_path: impl Into<PathBuf>) -> Self {
        Self {
            docs_path: docs_path.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            strategy: ChunkStrategy::default(),
            index_path: index_path.into(),
            max_concurrent_embeddings: 1,
        }
    }

    /// Uses the strategy and extension produced by
    /// [`budgie_context::ChunkingOptions::resolve`].
    pub fn with_chunking(mut self, chunking: ResolvedChunking) -> Self {
        self.strategy = chunking.strategy;
        self.extension = chunking.extension;
        self
    }

    pub fn with_strategy(mut self, strategy: ChunkStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_max_concurrent_embeddings(mut self, max: usize) -> Self {
        self.max_concurrent_embeddings = max.max(1);
        self
    }
}

/// A discovered file that could not be read.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// A chunk that was not added to the index.
#[derive(Debug, Clone, Serialize)]
pub struct FailedChunk {
    pub id: String,
    pub reason: String,
}

/// What an indexing run did.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub files_found: usize,
    pub files_indexed: usize,
    pub skipped_files: Vec<SkippedFile>,
    pub chunks_indexed: usize,
    pub failed_chunks: Vec<FailedChunk>,
    pub index_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Docs directory not found: {}", .0.display())]
    DocsNotFound(PathBuf),

    #[error("Error finding files in {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error persisting embeddings: {0}")]
    Persist(#[source] StoreError),
}

/// Turns a docs directory into a persisted [`EmbeddingStore`].
pub struct Indexer {
    config: IndexerConfig,
    provider: Arc<dyn EmbeddingProvider>,
}

impl Indexer {
    pub fn new(config: IndexerConfig, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Rebuilds `store` from the docs directory and persists it to
    /// [`IndexerConfig::index_path`].
    ///
    /// Chunk ids are `<file name>-chunk-<n>`, numbered from 1 within each file.
    /// The embedded and stored text is [`budgie_context::Chunk::render`].
    pub async fn build_index(&self, store: &mut EmbeddingStore) -> Result<IndexReport, IndexError> {
        let docs_path = &self.config.docs_path;
        let is_dir = tokio::fs::metadata(docs_path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(IndexError::DocsNotFound(docs_path.clone()));
        }

        store.reset();

        let files = find_files(docs_path, &self.config.extension)
            .await
            .map_err(|source| IndexError::Discovery {
                path: docs_path.clone(),
                source,
            })?;
        info!(
            "Found {} files with extension {} in {}",
            files.len(),
            self.config.extension,
            docs_path.display()
        );

        let mut report = IndexReport {
            files_found: files.len(),
            files_indexed: 0,
            skipped_files: Vec::new(),
            chunks_indexed: 0,
            failed_chunks: Vec::new(),
            index_path: self.config.index_path.clone(),
        };

        for path in &files {
            self.index_file(path, store, &mut report).await;
        }

        if let Err(e) = store.persist(&self.config.index_path).await {
            error!("Failed to persist index: {}", e);
            return Err(IndexError::Persist(e));
        }

        info!(
            "Indexed {} chunks from {} files into {}",
            report.chunks_indexed,
            report.files_indexed,
            self.config.index_path.display()
        );
        Ok(report)
    }

    async fn index_file(&self, path: &Path, store: &mut EmbeddingStore, report: &mut IndexReport) {
        info!("Processing: {}", path.display());

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read file {}: {}", path.display(), e);
                report.skipped_files.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
                return;
            }
        };
        report.files_indexed += 1;

        let chunker = create_chunker_for_path(path, Some(self.config.strategy.clone()));
        let chunks = chunker.get_chunks(&content);
        debug!("Created {} chunks for {}", chunks.len(), path.display());

        let basename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let pending: Vec<(String, String)> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (format!("{basename}-chunk-{}", i + 1), chunk.render()))
            .collect();

        // Embedding calls may overlap; results come back in chunk order and
        // only this task touches the store.
        let provider = &self.provider;
        let mut embedded = stream::iter(pending)
            .map(|(id, content)| async move {
                let result = provider.embed_text(&content).await;
                (id, content, result)
            })
            .buffered(self.config.max_concurrent_embeddings.max(1));

        while let Some((id, content, result)) = embedded.next().await {
            let outcome = match result {
                Ok(embedding) => store
                    .append(id.clone(), content, embedding)
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match outcome {
                Ok(()) => {
                    debug!("Indexed {}", id);
                    report.chunks_indexed += 1;
                }
                Err(reason) => {
                    warn!("Error creating embedding for chunk {}: {}", id, reason);
                    report.failed_chunks.push(FailedChunk { id, reason });
                }
            }
        }
    }
}
