//! Document loaders producing page-level text

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{ChunkSource, Page};

/// Pages extracted from one file
#[derive(Debug, Clone)]
pub struct LoadedPages {
    /// One entry per page, in page order
    pub pages: Vec<Page>,
    /// SHA-256 of the file bytes
    pub content_hash: String,
}

impl LoadedPages {
    pub fn total_pages(&self) -> u32 {
        self.pages.len() as u32
    }
}

/// Trait for turning a file on disk into page text
///
/// Implementations:
/// - `PdfLoader`: PDF files via lopdf, with pdf-extract as fallback
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load all pages of the file at `path`
    async fn load(&self, path: &Path) -> Result<LoadedPages>;

    /// Get loader name for logging
    fn name(&self) -> &str;
}

/// PDF loader emitting one page of text per PDF page
#[derive(Debug, Clone, Default)]
pub struct PdfLoader;

impl PdfLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse PDF bytes into pages
    pub fn parse(path: &Path, data: &[u8]) -> Result<Vec<Page>> {
        let filename = display_name(path);

        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(&filename, e.to_string()))?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let total_pages = page_numbers.len() as u32;
        let mut pages = Vec::with_capacity(page_numbers.len());

        for (index, number) in page_numbers.iter().enumerate() {
            match doc.extract_text(&[*number]) {
                Ok(content) => pages.push(Page {
                    content,
                    source: ChunkSource::new(path, index as u32, total_pages),
                }),
                Err(e) => {
                    tracing::warn!(
                        "Page {} of {} could not be extracted ({}), falling back to whole-document extraction",
                        number,
                        filename,
                        e
                    );
                    return Self::parse_whole(path, data, total_pages);
                }
            }
        }

        Ok(pages)
    }

    /// Extract the whole document as a single page
    fn parse_whole(path: &Path, data: &[u8], total_pages: u32) -> Result<Vec<Page>> {
        let content = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::file_parse(display_name(path), e.to_string()))?;

        Ok(vec![Page {
            content,
            source: ChunkSource::new(path, 0, total_pages.max(1)),
        }])
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    async fn load(&self, path: &Path) -> Result<LoadedPages> {
        let data = tokio::fs::read(path).await?;
        let content_hash = hash_bytes(&data);

        // PDF parsing is CPU-bound
        let owned_path: PathBuf = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || Self::parse(&owned_path, &data))
            .await
            .map_err(|e| Error::internal(format!("Task join error: {}", e)))??;

        tracing::debug!("Extracted {} pages from {}", pages.len(), path.display());

        Ok(LoadedPages {
            pages,
            content_hash,
        })
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

/// SHA-256 hex digest
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
