//! The [`Chunk`] type produced by every chunking strategy.
//!
//! A chunk is a transient value: the indexer embeds and persists the output of
//! [`Chunk::render`], never the struct itself.

use serde::{Serialize, Serializer};

/// Separator placed between ancestor titles in the rendered `HIERARCHY:` line.
pub const HIERARCHY_SEPARATOR: &str = " > ";

/// A contiguous, self-contained fragment of a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The fragment content. Never empty.
    pub text: String,
    /// Text of the heading this chunk sits under (markdown hierarchy only).
    pub title: Option<String>,
    /// Ancestor heading titles, root first. Only headings with a strictly
    /// lower level number than [`Chunk::level`] appear here.
    pub hierarchy: Vec<String>,
    /// Level (1-6) of the chunk's own heading, if it has one.
    pub level: Option<usize>,
    /// Position of this chunk within its chunking pass (0-indexed).
    pub sequence: usize,
    /// Normalized extension of the source file (`"md"`), when known.
    pub source_extension: Option<String>,
}

impl Chunk {
    /// Creates an untitled chunk. Sequence and source extension are filled in
    /// by the [`Chunker`](crate::Chunker) once a pass completes.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            title: None,
            hierarchy: Vec::new(),
            level: None,
            sequence: 0,
            source_extension: None,
        }
    }

    /// Attaches heading metadata to the chunk.
    pub fn with_heading(mut self, title: impl Into<String>, level: usize, hierarchy: Vec<String>) -> Self {
        self.title = Some(title.into());
        self.level = Some(level);
        self.hierarchy = hierarchy;
        self
    }

    /// Builds the text that gets embedded and stored for this chunk.
    ///
    /// Chunks carrying a heading are rendered as a labeled record so that
    /// retrieved passages keep their structural provenance:
    ///
    /// ```text
    /// TITLE: Installation
    /// HIERARCHY: Guide > Getting started
    /// CONTENT: Run the installer...
    /// ```
    ///
    /// Untitled chunks render as their raw text.
    ///
    /// # Examples
    ///
    /// ```
    /// use budgie_context::Chunk;
    ///
    /// let chunk = Chunk::new("text2").with_heading("B", 2, vec!["A".to_string()]);
    /// assert_eq!(chunk.render(), "TITLE: B\nHIERARCHY: A\nCONTENT: text2");
    ///
    /// assert_eq!(Chunk::new("plain").render(), "plain");
    /// ```
    pub fn render(&self) -> String {
        match &self.title {
            Some(title) => format!(
                "TITLE: {}\nHIERARCHY: {}\nCONTENT: {}",
                title,
                self.hierarchy.join(HIERARCHY_SEPARATOR),
                self.text
            ),
            None => self.text.clone(),
        }
    }
}

impl Serialize for Chunk {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Chunk", 7)?;
        state.serialize_field("sequence", &self.sequence)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("hierarchy", &self.hierarchy)?;
        state.serialize_field("level", &self.level)?;
        state.serialize_field("source_extension", &self.source_extension)?;
        state.serialize_field("text", &self.text)?;
        state.serialize_field("rendered", &self.render())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_root_heading_has_empty_hierarchy() {
        let chunk = Chunk::new("text1").with_heading("A", 1, Vec::new());
        assert_eq!(chunk.render(), "TITLE: A\nHIERARCHY: \nCONTENT: text1");
    }

    #[test]
    fn test_render_joins_ancestors() {
        let chunk = Chunk::new("body")
            .with_heading("C", 3, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(chunk.render(), "TITLE: C\nHIERARCHY: A > B\nCONTENT: body");
    }

    #[test]
    fn test_serialize_includes_rendered_text() {
        let chunk = Chunk::new("body").with_heading("Intro", 1, Vec::new());
        let value = serde_json::to_value(&chunk).unwrap();

        assert_eq!(value["title"], "Intro");
        assert_eq!(value["level"], 1);
        assert_eq!(value["text"], "body");
        assert_eq!(value["rendered"], "TITLE: Intro\nHIERARCHY: \nCONTENT: body");
    }
}
