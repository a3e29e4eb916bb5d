//! The indexing and query-time halves of the RAG pipeline
//!
//! ```text
//! docs/ ─ discovery ─ chunking ─ embedding ─ EmbeddingStore ─ embeddings.json
//!                                                                  │
//! question ─ embedding ─ search ─ augment ─ chat messages ◄────────┘
//! ```

pub mod augment;
pub mod discovery;
pub mod indexer;
pub mod search;

pub use augment::{ChatMessage, RagQuery, Role, augment, context_message};
pub use discovery::find_files;
pub use indexer::{FailedChunk, IndexError, IndexReport, Indexer, IndexerConfig, SkippedFile};
pub use search::{
    DEFAULT_SIMILARITY_THRESHOLD, Retriever, SearchConfig, SearchError, search, search_texts,
};
