//! Error taxonomy for the extraction pipeline
//!
//! Only the upfront variants (`ArchiveRootMissing`, `YearParentMissing`,
//! `EmptyEmployeeName`, `OutputDirectory`, `InvalidSuffixTag`, `ThreadPool`)
//! ever escape a run.
//! Everything else is caught per document or per file and recorded in the
//! run summary.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("archive root not found: {}", .0.display())]
    ArchiveRootMissing(PathBuf),

    #[error("year folder parent '{name}' not found under {}", .root.display())]
    YearParentMissing { root: PathBuf, name: String },

    #[error("employee name must not be empty")]
    EmptyEmployeeName,

    #[error("failed to prepare output directory {}: {source}", .path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load {}: {source}", .path.display())]
    DocumentLoad {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("{} is encrypted", .0.display())]
    Encrypted(PathBuf),

    #[error("failed to write {}: {source}", .path.display())]
    PageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list {}: {source}", .path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("worker task for {} panicked: {message}", .path.display())]
    TaskPanicked { path: PathBuf, message: String },

    #[error("invalid page suffix tag: {0}")]
    InvalidSuffixTag(#[from] regex::Error),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ExtractError {
    /// True for failures scoped to a single source document.
    pub fn is_document_scoped(&self) -> bool {
        matches!(
            self,
            Self::DocumentLoad { .. } | Self::Encrypted(_) | Self::TaskPanicked { .. }
        )
    }
}
