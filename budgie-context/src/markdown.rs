//! Heading-aware splitting for Markdown documents.
//!
//! Both markdown strategies share the same line classifier: an ATX heading is
//! one to six `#` characters followed by whitespace (or the end of the line),
//! indented by at most three spaces. Lines inside fenced code blocks are never
//! headings, so a `# comment` in a shell snippet stays part of the body.

use crate::chunk::Chunk;
use regex::Regex;
use std::sync::LazyLock;

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?[ \t]*$").expect("heading pattern is valid")
});

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Heading {
        level: usize,
        title: &'a str,
        raw: &'a str,
    },
    Text(&'a str),
}

/// An open code fence: the fence character and how many of them opened it.
type Fence = (char, usize);

fn fence_marker(line: &str) -> Option<Fence> {
    let trimmed = line.trim_start();
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let count = trimmed.chars().take_while(|c| *c == marker).count();
    (count >= 3).then_some((marker, count))
}

/// Drops an optional closing sequence (`## Title ##`).
fn strip_closing_hashes(title: &str) -> &str {
    let without = title.trim_end_matches('#');
    if without.len() == title.len() {
        title
    } else if without.is_empty() || without.ends_with([' ', '\t']) {
        without.trim_end()
    } else {
        title
    }
}

fn classify_lines(content: &str) -> Vec<Line<'_>> {
    let mut open_fence: Option<Fence> = None;

    content
        .lines()
        .map(|line| {
            if let Some((marker, count)) = open_fence {
                if fence_marker(line).is_some_and(|(m, n)| m == marker && n >= count) {
                    open_fence = None;
                }
                return Line::Text(line);
            }
            if let Some(fence) = fence_marker(line) {
                open_fence = Some(fence);
                return Line::Text(line);
            }
            match HEADING.captures(line) {
                Some(caps) => Line::Heading {
                    level: caps[1].len(),
                    title: strip_closing_hashes(caps.get(2).map_or("", |m| m.as_str())),
                    raw: line,
                },
                None => Line::Text(line),
            }
        })
        .collect()
}

struct OpenSection<'a> {
    title: &'a str,
    level: usize,
    hierarchy: Vec<String>,
}

/// Emits the section as a chunk. A section without body text emits nothing,
/// so a document made only of headings yields no chunks; its titles survive
/// only as hierarchy of sections that do have text.
fn flush_section(chunks: &mut Vec<Chunk>, section: Option<OpenSection<'_>>, body: &[&str]) {
    let text = body.join("\n");
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    let chunk = match section {
        Some(section) => Chunk::new(text).with_heading(section.title, section.level, section.hierarchy),
        None => Chunk::new(text),
    };
    chunks.push(chunk);
}

/// Splits markdown into one chunk per heading section, tracking the chain of
/// ancestor headings.
///
/// A section's body runs from its heading to the next heading of any level.
/// Text before the first heading becomes an untitled chunk. A heading with an
/// empty body produces no chunk of its own but still appears in the hierarchy
/// of the sections nested below it.
pub fn hierarchy_chunks(content: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut ancestors: Vec<(usize, String)> = Vec::new();
    let mut current: Option<OpenSection<'_>> = None;
    let mut body: Vec<&str> = Vec::new();

    for line in classify_lines(content) {
        match line {
            Line::Heading { level, title, .. } => {
                flush_section(&mut chunks, current.take(), &body);
                body.clear();

                while ancestors.last().is_some_and(|(l, _)| *l >= level) {
                    ancestors.pop();
                }
                let hierarchy = ancestors.iter().map(|(_, t)| t.clone()).collect();
                ancestors.push((level, title.to_string()));
                current = Some(OpenSection {
                    title,
                    level,
                    hierarchy,
                });
            }
            Line::Text(text) => body.push(text),
        }
    }
    flush_section(&mut chunks, current, &body);

    chunks
}

/// Splits markdown at every heading. Each chunk is the heading line followed
/// by its body; no heading metadata is attached.
pub fn section_chunks(content: &str) -> Vec<Chunk> {
    let mut sections: Vec<Vec<&str>> = vec![Vec::new()];

    for line in classify_lines(content) {
        match line {
            Line::Heading { raw, .. } => sections.push(vec![raw]),
            Line::Text(text) => {
                if let Some(section) = sections.last_mut() {
                    section.push(text);
                }
            }
        }
    }

    sections
        .into_iter()
        .filter_map(|lines| {
            let text = lines.join("\n");
            let text = text.trim();
            (!text.is_empty()).then(|| Chunk::new(text))
        })
        .collect()
}
