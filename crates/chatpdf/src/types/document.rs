//! Page, chunk and document types with source tracking

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Text of a single page as extracted by a loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Extracted text
    pub content: String,
    /// Where the page came from
    pub source: ChunkSource,
}

/// Provenance of a page or chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSource {
    /// Path the document was loaded from
    pub path: PathBuf,
    /// Name shown to the user, usually the uploaded filename
    pub filename: String,
    /// Page index (0-based)
    pub page: u32,
    /// Total pages in the document
    pub total_pages: u32,
}

impl ChunkSource {
    /// Create a source reference for one page, named after the path's file name
    pub fn new(path: impl Into<PathBuf>, page: u32, total_pages: u32) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            path,
            filename,
            page,
            total_pages,
        }
    }
}

/// A bounded span of page text, the unit of retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Chunk text
    pub content: String,
    /// Embedding vector (empty until embedded)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Source information
    pub source: ChunkSource,
    /// Start offset within the page, in characters
    pub char_start: usize,
}

impl Chunk {
    /// Create a new chunk without an embedding
    pub fn new(content: String, source: ChunkSource, char_start: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            embedding: Vec::new(),
            source,
            char_start,
        }
    }

    /// Set the embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Number of characters in the chunk
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Summary of a document that has been ingested into a knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedDocument {
    /// Unique document ID
    pub id: Uuid,
    /// Path the document was loaded from
    pub path: PathBuf,
    /// Name shown to the user
    pub filename: String,
    /// SHA-256 of the file bytes
    pub content_hash: String,
    /// Number of pages
    pub total_pages: u32,
    /// Number of chunks added to the index
    pub total_chunks: u32,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}
