pub mod chunk;
pub mod markdown;
pub mod strategy;
pub mod text;

// Re-export the main chunking entry points for external use
pub use chunk::{Chunk, HIERARCHY_SEPARATOR};
pub use strategy::{
    ChunkStrategy, ChunkingOptions, DEFAULT_EXTENSION, Delimiter, ResolvedChunking,
    StrategyError, WindowSpec, normalize_extension,
};
pub use text::{Chunker, chunk, create_chunker_for_path, strategy_for_path};
