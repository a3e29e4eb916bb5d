//! budgie-retriever: retrieval-augmented generation over a folder of documents
//!
//! Documents under `.budgie/docs` are chunked, embedded through an
//! OpenAI-compatible server and stored in a flat JSON index. At question time
//! the query is embedded, compared against every stored chunk by cosine
//! similarity, and the best matches are spliced into the chat messages.
//!
//! ## Key Modules
//!
//! - **[`storage`]**: the in-memory vector store and its JSON persistence
//! - **[`retrieval`]**: file discovery, the indexer, similarity search and the
//!   conversation augmenter
//! - **[`config`]**: `budgie.config.json` and the `.budgie/` layout
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use budgie_embed::{EmbedConfig, OpenAiEmbeddingProvider};
//! use budgie_retriever::retrieval::{Indexer, IndexerConfig, SearchConfig, search_texts};
//! use budgie_retriever::storage::EmbeddingStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = Arc::new(OpenAiEmbeddingProvider::new(EmbedConfig::new("ai/mxbai-embed-large"))?);
//!
//! let indexer = Indexer::new(
//!     IndexerConfig::new(".budgie/docs", ".budgie/embeddings.json"),
//!     provider.clone(),
//! );
//! let mut store = EmbeddingStore::new();
//! let report = indexer.build_index(&mut store).await?;
//! println!("indexed {} chunks", report.chunks_indexed);
//!
//! let passages = search_texts(
//!     "how do I configure the server?",
//!     provider.as_ref(),
//!     &SearchConfig::new(".budgie/embeddings.json"),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! docs → find_files → Chunker → EmbeddingProvider → EmbeddingStore → embeddings.json
//!                                                                        ↓
//! question → EmbeddingProvider → Retriever::search → augment → chat messages
//! ```

pub mod config;
pub mod retrieval;
pub mod storage;
