//! Recursive character splitting with overlap
//!
//! Text is split on the coarsest separator that occurs in it (paragraphs, then
//! lines, then words, then single characters). Pieces that are still too large
//! are split again with the finer separators; small pieces are merged back
//! into chunks of at most `chunk_size` characters, with up to `chunk_overlap`
//! characters carried over from the end of one chunk into the next.

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, Page};

/// Recursive character text splitter
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    chunk_overlap: usize,
    /// Separators, coarsest first. An empty string splits into characters.
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    /// Create a splitter with the default separators
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: ChunkingConfig::default().separators,
        }
    }

    /// Create a splitter from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".to_string()));
        }
        if config.chunk_overlap > config.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) is larger than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }

        Ok(Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            separators: config.separators.clone(),
        })
    }

    /// Split every page into chunks, keeping each page's provenance
    pub fn split_pages(&self, pages: &[Page]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in pages {
            // Character offset where the next chunk may begin
            let mut search_from = 0usize;
            for piece in self.split_text(&page.content) {
                let byte_from = byte_offset(&page.content, search_from);
                let char_start = page.content[byte_from..]
                    .find(piece.as_str())
                    .map(|pos| search_from + char_len(&page.content[byte_from..byte_from + pos]))
                    .unwrap_or(search_from);

                let chunk = Chunk::new(piece, page.source.clone(), char_start);
                search_from = (char_start + chunk.char_len())
                    .saturating_sub(self.chunk_overlap)
                    .max(char_start);
                chunks.push(chunk);
            }
        }

        chunks
    }

    /// Split raw text into chunks
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // Pick the first separator present in the text
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                chunks.extend(self.merge(&small));
                small.clear();
            }

            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !small.is_empty() {
            chunks.extend(self.merge(&small));
        }

        chunks
    }

    /// Merge small pieces into chunks no larger than `chunk_size`
    ///
    /// Separators stay attached to the pieces, so pieces are joined directly.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: std::collections::VecDeque<&str> = std::collections::VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window);

                // Keep at most `chunk_overlap` characters, and make room for the new piece
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(dropped) => total -= char_len(dropped),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        push_joined(&mut chunks, &window);
        chunks
    }
}

impl Default for RecursiveCharacterSplitter {
    fn default() -> Self {
        let config = ChunkingConfig::default();
        Self::new(config.chunk_size, config.chunk_overlap)
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn push_joined(chunks: &mut Vec<String>, window: &std::collections::VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Byte index of the `chars`-th character, or the end of `text`
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Split on `separator`, attaching each separator to the piece that follows it
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut last = 0usize;
    for (idx, _) in text.match_indices(separator) {
        if idx > last {
            pieces.push(&text[last..idx]);
        }
        last = idx;
    }
    pieces.push(&text[last..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}
