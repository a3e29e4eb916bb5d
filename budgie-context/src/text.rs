//! This module turns raw document text into [`Chunk`]s ready for embedding,
//! as the first stage of the RAG (Retrieval Augmented Generation) pipeline.
//!
//! The entry points are:
//! - [`chunk`]: split a string with an explicit [`ChunkStrategy`].
//! - [`Chunker`]: a strategy bound to a source file, which also stamps each
//!   chunk with its sequence number and the file's extension.
//! - [`create_chunker_for_path`]: pick the strategy for a path, falling back
//!   to the per-extension default when the caller did not choose one.
//!
//! The plain-text strategies (delimiter, fixed-size window, whole file) live
//! here; the heading-aware ones live in [`crate::markdown`].
//!
//! # Example
//!
//! ```
//! use budgie_context::{ChunkStrategy, chunk};
//!
//! let chunks = chunk("x---y---z", &ChunkStrategy::delimiter("---").unwrap());
//! let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
//! assert_eq!(texts, vec!["x", "y", "z"]);
//!
//! // Overlap-free fixed-size chunks reconstruct the input exactly.
//! let content = "The quick brown fox jumps over the lazy dog";
//! let chunks = chunk(content, &ChunkStrategy::fixed_size(8, 0).unwrap());
//! let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
//! assert_eq!(rebuilt, content);
//! ```

use crate::chunk::Chunk;
use crate::markdown;
use crate::strategy::{ChunkStrategy, Delimiter, WindowSpec, normalize_extension};
use std::path::Path;

/// Splits `content` with the given strategy.
///
/// Empty input never produces a chunk. Sequence numbers are assigned in
/// order; the source extension is left unset.
pub fn chunk(content: &str, strategy: &ChunkStrategy) -> Vec<Chunk> {
    let mut chunks = match strategy {
        ChunkStrategy::MarkdownHierarchy => markdown::hierarchy_chunks(content),
        ChunkStrategy::MarkdownSections => markdown::section_chunks(content),
        ChunkStrategy::Delimiter(delimiter) => delimiter_chunks(content, delimiter),
        ChunkStrategy::FixedSize(window) => fixed_size_chunks(content, *window),
        ChunkStrategy::WholeFile => whole_file_chunks(content),
    };
    for (sequence, chunk) in chunks.iter_mut().enumerate() {
        chunk.sequence = sequence;
    }
    chunks
}

/// Splits on every literal occurrence of the delimiter, trimming each piece
/// and dropping the ones left empty.
fn delimiter_chunks(content: &str, delimiter: &Delimiter) -> Vec<Chunk> {
    content
        .split(delimiter.as_str())
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(Chunk::new)
        .collect()
}

/// Cuts the text into windows of `size` characters. Each window after the
/// first starts `overlap` characters before the end of the previous one. The
/// pass stops with the first window that reaches the end of the text.
fn fixed_size_chunks(content: &str, window: WindowSpec) -> Vec<Chunk> {
    if content.is_empty() {
        return Vec::new();
    }

    // Byte offset of every character, plus the end of the string, so windows
    // never cut a multi-byte character in half.
    let boundaries: Vec<usize> = content
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(content.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + window.size()).min(char_count);
        chunks.push(Chunk::new(&content[boundaries[start]..boundaries[end]]));
        if end == char_count {
            break;
        }
        start += window.step();
    }
    chunks
}

/// The whole content as one chunk, unless there is nothing but whitespace.
fn whole_file_chunks(content: &str) -> Vec<Chunk> {
    if content.trim().is_empty() {
        return Vec::new();
    }
    vec![Chunk::new(content)]
}

/// Strategy to use for `path` when none was chosen explicitly.
///
/// ```
/// use std::path::Path;
/// use budgie_context::{ChunkStrategy, strategy_for_path};
///
/// assert_eq!(strategy_for_path(Path::new("docs/guide.md")), ChunkStrategy::MarkdownHierarchy);
/// assert_eq!(strategy_for_path(Path::new("notes.txt")), ChunkStrategy::WholeFile);
/// ```
pub fn strategy_for_path(path: &Path) -> ChunkStrategy {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(ChunkStrategy::default_for_extension)
        .unwrap_or(ChunkStrategy::WholeFile)
}

/// A chunking strategy bound to one source file.
#[derive(Debug, Clone)]
pub struct Chunker {
    strategy: ChunkStrategy,
    source_extension: Option<String>,
}

impl Chunker {
    /// Creates a chunker that does not know where its content came from.
    pub fn new(strategy: ChunkStrategy) -> Self {
        Self {
            strategy,
            source_extension: None,
        }
    }

    /// Records the extension of the source file on every produced chunk.
    pub fn with_source_extension(mut self, extension: &str) -> Self {
        let normalized = normalize_extension(extension);
        self.source_extension = Some(normalized.trim_start_matches('.').to_string());
        self
    }

    pub fn strategy(&self) -> &ChunkStrategy {
        &self.strategy
    }

    /// Splits `content` into chunks. See [`chunk`].
    pub fn get_chunks(&self, content: &str) -> Vec<Chunk> {
        let mut chunks = chunk(content, &self.strategy);
        if let Some(extension) = &self.source_extension {
            for chunk in &mut chunks {
                chunk.source_extension = Some(extension.clone());
            }
        }
        chunks
    }
}

/// Create a [`Chunker`] for the given file.
///
/// When `strategy` is `None`, the default for the file's extension is used
/// (see [`strategy_for_path`]).
///
/// ```
/// use std::path::Path;
/// use budgie_context::create_chunker_for_path;
///
/// let chunker = create_chunker_for_path(Path::new("docs/intro.md"), None);
/// let chunks = chunker.get_chunks("# Intro\nWelcome");
/// assert_eq!(chunks[0].title.as_deref(), Some("Intro"));
/// assert_eq!(chunks[0].source_extension.as_deref(), Some("md"));
/// ```
pub fn create_chunker_for_path(path: &Path, strategy: Option<ChunkStrategy>) -> Chunker {
    let strategy = strategy.unwrap_or_else(|| strategy_for_path(path));
    let chunker = Chunker::new(strategy);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(extension) => chunker.with_source_extension(extension),
        None => chunker,
    }
}
