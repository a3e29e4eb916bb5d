//! Chunking strategy selection and validation.
//!
//! [`ChunkStrategy`] is the single source of truth for how a document gets
//! split. Parameters are validated when a strategy is constructed, so code
//! holding a `ChunkStrategy` never re-checks them. [`ChunkingOptions`] is the
//! flag-level view used by command-line front ends: it allows several methods
//! to be requested at once and [`ChunkingOptions::resolve`] rejects the
//! conflicting combinations before any file is touched.

use std::fmt;

/// File extension indexed when the strategy does not allow a custom one.
pub const DEFAULT_EXTENSION: &str = ".md";

/// Invalid chunking configuration. These are caller mistakes and are always
/// reported before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    #[error("cannot use multiple chunking methods simultaneously ({})", .0.join(", "))]
    MultipleStrategies(Vec<&'static str>),

    #[error("overlap requires a chunk size to be specified")]
    OverlapWithoutChunkSize,

    #[error("overlap ({overlap}) must be less than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },

    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("delimiter must not be empty")]
    EmptyDelimiter,

    #[error("a custom extension can only be used with delimiter, chunk-size or whole-file chunking")]
    ExtensionNotAllowed,
}

/// A non-empty literal delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiter(String);

impl Delimiter {
    pub fn new(delimiter: impl Into<String>) -> Result<Self, StrategyError> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(StrategyError::EmptyDelimiter);
        }
        Ok(Self(delimiter))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Window parameters for fixed-size chunking. Always satisfies
/// `0 <= overlap < size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    size: usize,
    overlap: usize,
}

impl WindowSpec {
    pub fn new(size: usize, overlap: usize) -> Result<Self, StrategyError> {
        if size == 0 {
            return Err(StrategyError::ZeroChunkSize);
        }
        if overlap >= size {
            return Err(StrategyError::OverlapTooLarge { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    /// Window length in characters.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Characters repeated from the end of the previous window.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// How far the window start moves between consecutive chunks.
    pub fn step(&self) -> usize {
        self.size - self.overlap
    }
}

/// How a document is split into chunks. Exactly one strategy is active per
/// chunking pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChunkStrategy {
    /// One chunk per heading section, annotated with its title and ancestor
    /// headings. The default for markdown sources.
    #[default]
    MarkdownHierarchy,
    /// One chunk per heading section, without heading metadata.
    MarkdownSections,
    /// Split on every occurrence of a literal string.
    Delimiter(Delimiter),
    /// Sliding window of a fixed number of characters.
    FixedSize(WindowSpec),
    /// The whole file is a single chunk.
    WholeFile,
}

impl ChunkStrategy {
    /// Validated delimiter strategy.
    pub fn delimiter(delimiter: impl Into<String>) -> Result<Self, StrategyError> {
        Delimiter::new(delimiter).map(Self::Delimiter)
    }

    /// Validated fixed-size strategy.
    pub fn fixed_size(size: usize, overlap: usize) -> Result<Self, StrategyError> {
        WindowSpec::new(size, overlap).map(Self::FixedSize)
    }

    /// Strategy used when the caller did not pick one for a file with the
    /// given extension: markdown hierarchy for markdown files, whole file for
    /// everything else.
    pub fn default_for_extension(extension: &str) -> Self {
        match normalize_extension(extension).as_str() {
            ".md" | ".markdown" => Self::MarkdownHierarchy,
            _ => Self::WholeFile,
        }
    }

    /// Whether the strategy can be applied to files other than `.md`.
    pub fn accepts_custom_extension(&self) -> bool {
        matches!(self, Self::Delimiter(_) | Self::FixedSize(_) | Self::WholeFile)
    }
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkdownHierarchy => write!(f, "markdown hierarchy chunking"),
            Self::MarkdownSections => write!(f, "markdown sections chunking"),
            Self::Delimiter(d) => write!(f, "delimiter-based chunking with delimiter {:?}", d.as_str()),
            Self::FixedSize(w) if w.overlap() > 0 => write!(
                f,
                "fixed-size text chunking with size: {}, overlap: {}",
                w.size(),
                w.overlap()
            ),
            Self::FixedSize(w) => write!(f, "fixed-size text chunking with size: {}", w.size()),
            Self::WholeFile => write!(f, "whole-file chunking (each file is one chunk)"),
        }
    }
}

/// Lowercases an extension and makes sure it starts with a dot, so that
/// `"md"`, `".md"` and `"MD"` all compare equal.
///
/// ```
/// use budgie_context::normalize_extension;
///
/// assert_eq!(normalize_extension("md"), ".md");
/// assert_eq!(normalize_extension(".TXT"), ".txt");
/// ```
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().trim_start_matches('.');
    format!(".{}", trimmed.to_lowercase())
}

/// Chunking flags as a command line collects them. Several methods may be
/// set at once; [`resolve`](Self::resolve) decides whether that is allowed.
#[derive(Debug, Clone, Default)]
pub struct ChunkingOptions {
    pub markdown_hierarchy: bool,
    pub markdown_sections: bool,
    pub delimiter: Option<String>,
    pub chunk_size: Option<usize>,
    pub overlap: Option<usize>,
    pub extension: Option<String>,
    pub whole_file: bool,
}

/// Outcome of [`ChunkingOptions::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChunking {
    pub strategy: ChunkStrategy,
    /// Normalized extension of the files to index (`".md"` by default).
    pub extension: String,
}

impl ChunkingOptions {
    /// Validates the flag combination and produces the single active
    /// strategy together with the extension of the files to index.
    ///
    /// With no method selected the markdown hierarchy strategy is used.
    ///
    /// ```
    /// use budgie_context::{ChunkStrategy, ChunkingOptions, StrategyError};
    ///
    /// let resolved = ChunkingOptions::default().resolve().unwrap();
    /// assert_eq!(resolved.strategy, ChunkStrategy::MarkdownHierarchy);
    /// assert_eq!(resolved.extension, ".md");
    ///
    /// let conflicting = ChunkingOptions {
    ///     markdown_sections: true,
    ///     whole_file: true,
    ///     ..Default::default()
    /// };
    /// assert!(matches!(conflicting.resolve(), Err(StrategyError::MultipleStrategies(_))));
    /// ```
    pub fn resolve(&self) -> Result<ResolvedChunking, StrategyError> {
        let mut selected = Vec::new();
        if self.markdown_hierarchy {
            selected.push("markdown-hierarchy");
        }
        if self.markdown_sections {
            selected.push("markdown-sections");
        }
        if self.delimiter.is_some() {
            selected.push("delimiter");
        }
        if self.chunk_size.is_some() {
            selected.push("chunk-size");
        }
        if self.whole_file {
            selected.push("files");
        }
        if selected.len() > 1 {
            return Err(StrategyError::MultipleStrategies(selected));
        }

        let overlap = self.overlap.unwrap_or(0);
        if overlap > 0 && self.chunk_size.is_none() {
            return Err(StrategyError::OverlapWithoutChunkSize);
        }

        let strategy = if self.whole_file {
            ChunkStrategy::WholeFile
        } else if let Some(size) = self.chunk_size {
            ChunkStrategy::fixed_size(size, overlap)?
        } else if let Some(delimiter) = &self.delimiter {
            ChunkStrategy::delimiter(delimiter.clone())?
        } else if self.markdown_sections {
            ChunkStrategy::MarkdownSections
        } else {
            ChunkStrategy::MarkdownHierarchy
        };

        let requested_extension = self
            .extension
            .as_deref()
            .map(str::trim)
            .filter(|ext| !ext.is_empty() && *ext != ".");
        let extension = match requested_extension {
            Some(ext) if strategy.accepts_custom_extension() => normalize_extension(ext),
            Some(_) => return Err(StrategyError::ExtensionNotAllowed),
            None => DEFAULT_EXTENSION.to_string(),
        };

        Ok(ResolvedChunking {
            strategy,
            extension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_spec_validation() {
        assert_eq!(WindowSpec::new(0, 0), Err(StrategyError::ZeroChunkSize));
        assert_eq!(
            WindowSpec::new(4, 4),
            Err(StrategyError::OverlapTooLarge { size: 4, overlap: 4 })
        );
        let spec = WindowSpec::new(4, 2).unwrap();
        assert_eq!(spec.step(), 2);
    }

    #[test]
    fn test_empty_delimiter_rejected() {
        assert_eq!(
            ChunkStrategy::delimiter(""),
            Err(StrategyError::EmptyDelimiter)
        );
    }

    #[test]
    fn test_default_for_extension() {
        assert_eq!(
            ChunkStrategy::default_for_extension("MD"),
            ChunkStrategy::MarkdownHierarchy
        );
        assert_eq!(
            ChunkStrategy::default_for_extension(".markdown"),
            ChunkStrategy::MarkdownHierarchy
        );
        assert_eq!(
            ChunkStrategy::default_for_extension("txt"),
            ChunkStrategy::WholeFile
        );
    }

    #[test]
    fn test_resolve_multiple_methods() {
        let options = ChunkingOptions {
            markdown_hierarchy: true,
            delimiter: Some("---".to_string()),
            chunk_size: Some(100),
            ..Default::default()
        };
        assert_eq!(
            options.resolve(),
            Err(StrategyError::MultipleStrategies(vec![
                "markdown-hierarchy",
                "delimiter",
                "chunk-size"
            ]))
        );
    }

    #[test]
    fn test_resolve_overlap_rules() {
        let without_size = ChunkingOptions {
            overlap: Some(10),
            ..Default::default()
        };
        assert_eq!(
            without_size.resolve(),
            Err(StrategyError::OverlapWithoutChunkSize)
        );

        let too_large = ChunkingOptions {
            chunk_size: Some(10),
            overlap: Some(10),
            ..Default::default()
        };
        assert_eq!(
            too_large.resolve(),
            Err(StrategyError::OverlapTooLarge {
                size: 10,
                overlap: 10
            })
        );

        // A zero overlap on its own is the same as no overlap.
        let zero_overlap = ChunkingOptions {
            overlap: Some(0),
            ..Default::default()
        };
        assert!(zero_overlap.resolve().is_ok());
    }

    #[test]
    fn test_resolve_extension_rules() {
        let markdown_with_extension = ChunkingOptions {
            markdown_sections: true,
            extension: Some("txt".to_string()),
            ..Default::default()
        };
        assert_eq!(
            markdown_with_extension.resolve(),
            Err(StrategyError::ExtensionNotAllowed)
        );

        let delimiter_with_extension = ChunkingOptions {
            delimiter: Some("---".to_string()),
            extension: Some("TXT".to_string()),
            ..Default::default()
        };
        let resolved = delimiter_with_extension.resolve().unwrap();
        assert_eq!(resolved.extension, ".txt");
        assert_eq!(resolved.strategy, ChunkStrategy::delimiter("---").unwrap());

        let whole_file = ChunkingOptions {
            whole_file: true,
            ..Default::default()
        };
        let resolved = whole_file.resolve().unwrap();
        assert_eq!(resolved.strategy, ChunkStrategy::WholeFile);
        assert_eq!(resolved.extension, DEFAULT_EXTENSION);
    }

    #[test]
    fn test_resolve_fixed_size() {
        let options = ChunkingOptions {
            chunk_size: Some(512),
            overlap: Some(64),
            extension: Some(".go".to_string()),
            ..Default::default()
        };
        let resolved = options.resolve().unwrap();
        assert_eq!(resolved.strategy, ChunkStrategy::fixed_size(512, 64).unwrap());
        assert_eq!(resolved.extension, ".go");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ChunkStrategy::fixed_size(100, 10).unwrap().to_string(),
            "fixed-size text chunking with size: 100, overlap: 10"
        );
        assert_eq!(
            ChunkStrategy::fixed_size(100, 0).unwrap().to_string(),
            "fixed-size text chunking with size: 100"
        );
    }
}
