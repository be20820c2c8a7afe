//! PDF access layer
//!
//! This module is the boundary between raw PDF files and the matching/writing
//! stages. Everything downstream sees a document only through [`PageSource`]
//! (page count + per-page text) and [`PdfDocument::save_pages`].
//!
//! ```text
//! SourceDocument (path)
//!     ↓
//! PdfDocument::load (lopdf)
//!     ↓
//! PageSource ──→ PageMatcher ──→ MatchSet
//!     ↓
//! DocumentWriter ──→ OutputArtifacts
//! ```

pub mod document;

#[cfg(test)]
pub(crate) mod fixtures;

pub use document::PdfDocument;

/// Read-only, page-indexed view of a document's text
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Extracted text of the zero-based page, or `None` when the page has no
    /// extractable text (image-only scan, broken content stream).
    fn page_text(&self, index: usize) -> Option<String>;
}
