//! Document ingestion: page extraction and chunking

mod loader;
mod splitter;

pub use loader::{hash_bytes, DocumentLoader, LoadedPages, PdfLoader};
pub use splitter::RecursiveCharacterSplitter;

/// Whether a filename names a PDF
pub fn is_pdf(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
