//! Error types for the embedding client

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Everything that can go wrong while asking a model server for embeddings.
///
/// Callers in the indexer treat any variant as a per-chunk failure; the
/// search path surfaces it as a degraded query.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// The client configuration is unusable (empty model name, bad URL...)
    #[error("Invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// Transport failure talking to the embedding server
    #[error("Embedding request failed: {source}")]
    Request {
        #[from]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("Embedding server returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The server answered 2xx but the body is not what we asked for
    #[error("Invalid embedding response: {message}")]
    InvalidResponse { message: String },

    /// Error during embedding generation
    #[error("Embedding generation failed: {source}")]
    EmbeddingGeneration {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl EmbedError {
    /// Wraps any error raised while producing an embedding.
    pub fn embedding_gen<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::EmbeddingGeneration {
            source: Box::new(source),
        }
    }

    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
