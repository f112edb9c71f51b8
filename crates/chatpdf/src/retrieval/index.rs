//! In-memory vector index over embedded chunks

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Search result with chunk and similarity
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity (-1.0 to 1.0, higher is better)
    pub similarity: f32,
}

/// Flat cosine-similarity index
///
/// All chunks must carry embeddings of one dimensionality, fixed by the first
/// insert.
#[derive(Debug, Default)]
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    dimensions: Option<usize>,
}

impl VectorIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from embedded chunks
    pub fn from_chunks(chunks: Vec<Chunk>) -> Result<Self> {
        let mut index = Self::new();
        index.add_chunks(chunks)?;
        Ok(index)
    }

    /// Add embedded chunks
    ///
    /// The batch is validated as a whole; on error nothing is inserted.
    pub fn add_chunks(&mut self, chunks: Vec<Chunk>) -> Result<()> {
        let mut dimensions = self.dimensions;

        for chunk in &chunks {
            if chunk.embedding.is_empty() {
                return Err(Error::vector_db(format!("Chunk {} has no embedding", chunk.id)));
            }
            match dimensions {
                Some(dim) if dim != chunk.embedding.len() => {
                    return Err(Error::vector_db(format!(
                        "Dimension mismatch: index has {}, chunk {} has {}",
                        dim,
                        chunk.id,
                        chunk.embedding.len()
                    )));
                }
                Some(_) => {}
                None => dimensions = Some(chunk.embedding.len()),
            }
        }

        self.dimensions = dimensions;
        self.chunks.extend(chunks);
        Ok(())
    }

    /// Return the `top_k` chunks most similar to the query vector
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        if let Some(dim) = self.dimensions {
            if dim != query.len() {
                return Err(Error::vector_db(format!(
                    "Query has {} dimensions, index has {}",
                    query.len(),
                    dim
                )));
            }
        }

        let mut results: Vec<SearchResult> = self
            .chunks
            .iter()
            .map(|chunk| SearchResult {
                similarity: cosine_similarity(query, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        Ok(results)
    }

    /// Get chunk count
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterate over indexed chunks in insertion order
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
