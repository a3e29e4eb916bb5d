//! # budgie-embed
//!
//! Text embeddings for the budgie retriever, fetched from any server that
//! speaks the OpenAI `/embeddings` protocol (llama.cpp, Ollama, Docker Model
//! Runner, hosted APIs).
//!
//! ## Quick Start
//!
//! ```no_run
//! use budgie_embed::{EmbedConfig, EmbeddingProvider, OpenAiEmbeddingProvider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = EmbedConfig::new("ai/mxbai-embed-large")
//!     .with_base_url("http://localhost:12434/engines/llama.cpp/v1");
//! let provider = OpenAiEmbeddingProvider::new(config)?;
//!
//! let texts = vec!["Hello world".to_string(), "How are you?".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}",
//!          result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`config`]: connection and batching settings
//! - [`provider`]: the [`EmbeddingProvider`] trait and the HTTP implementation
//! - [`error`]: error types and result handling
//!
//! Vectors are plain `f32`. Consumers that index them (see `budgie-retriever`)
//! only rely on the trait, so tests can substitute a deterministic provider.

pub mod config;
pub mod error;
pub mod provider;

pub use config::{DEFAULT_BASE_URL, DEFAULT_BATCH_SIZE, EmbedConfig};
pub use error::{EmbedError, Result};
pub use provider::{EmbeddingProvider, EmbeddingResult, OpenAiEmbeddingProvider};
