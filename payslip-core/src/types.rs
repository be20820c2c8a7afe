use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

// ===== RUN INPUT =====

/// Inclusive employment window, in calendar years.
///
/// Bounds are not required to be ordered; an inverted window is simply empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub admission: i32,
    pub dismissal: i32,
}

impl YearRange {
    pub fn new(admission: i32, dismissal: i32) -> Self {
        Self {
            admission,
            dismissal,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.admission > self.dismissal
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.admission..=self.dismissal).contains(&year)
    }

    /// True if `name` contains the decimal form of any year in the window.
    ///
    /// Cost depends on the length of `name`, not on the width of the window:
    /// every substring that is the canonical form of an `i32` is checked
    /// against the bounds.
    pub fn matches_folder_name(&self, name: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        // "-2147483648" is the longest canonical i32
        const MAX_LEN: usize = 11;
        (0..name.len()).any(|start| {
            (start + 1..=name.len().min(start + MAX_LEN)).any(|end| {
                name.get(start..end)
                    .and_then(|candidate| {
                        let year: i32 = candidate.parse().ok()?;
                        (year.to_string() == candidate).then_some(year)
                    })
                    .map_or(false, |year| self.contains(year))
            })
        })
    }
}

/// Everything one run needs from the (external) upload layer
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub archive_root: PathBuf,
    pub employee_name: String,
    pub years: YearRange,
    pub output_dir: PathBuf,
}

// ===== DOCUMENT MODEL =====

/// One PDF under a selected year folder
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceDocument {
    pub path: PathBuf,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Filename with extension, e.g. `folha_2020_01.pdf`
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Filename without extension; the document's identity in the output directory
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Output stem assigned to one source document, unique within a run.
///
/// Equal to the source stem unless another candidate document shares it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPlan {
    pub source: SourceDocument,
    pub stem: String,
}

impl OutputPlan {
    pub fn new(source: SourceDocument) -> Self {
        let stem = source.stem();
        Self { source, stem }
    }

    pub fn with_stem(source: SourceDocument, stem: impl Into<String>) -> Self {
        Self {
            source,
            stem: stem.into(),
        }
    }

    /// True when the stem differs from the source's own
    pub fn is_renamed(&self) -> bool {
        self.stem != self.source.stem()
    }
}

/// Zero-based page indices whose text contains the target name, ascending
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSet {
    pages: Vec<usize>,
}

impl MatchSet {
    /// Indices must be pushed in ascending order
    pub fn push(&mut self, index: usize) {
        debug_assert!(self.pages.last().map_or(true, |&last| last < index));
        self.pages.push(index);
    }

    pub fn pages(&self) -> &[usize] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl From<Vec<usize>> for MatchSet {
    fn from(mut pages: Vec<usize>) -> Self {
        pages.sort_unstable();
        pages.dedup();
        Self { pages }
    }
}

/// A file the document writer produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputArtifact {
    pub path: PathBuf,
    /// Zero-based source page that triggered this write
    pub source_page: usize,
    /// Number of pages persisted in this file
    pub page_count: usize,
}

// ===== RUN REPORTING =====

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Written {
        matched_pages: Vec<usize>,
        artifacts: Vec<OutputArtifact>,
        /// Artifacts whose write failed; the rest of the document still ran
        failed_writes: usize,
    },
    NoMatch,
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub source: SourceDocument,
    pub outcome: DocumentOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRecord {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub deleted: Vec<String>,
    pub renamed: Vec<RenameRecord>,
    /// Bare names claimed by more than one source document, either across
    /// year folders or by a file already in the output directory
    pub collisions: Vec<String>,
    pub failures: Vec<FileFailure>,
}

impl ReconcileReport {
    /// Nothing was touched
    pub fn is_noop(&self) -> bool {
        self.deleted.is_empty()
            && self.renamed.is_empty()
            && self.collisions.is_empty()
            && self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub employee_name: String,
    pub years: YearRange,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub output_dir: PathBuf,
    pub selected_folders: Vec<PathBuf>,
    pub documents: Vec<DocumentReport>,
    pub reconciliation: ReconcileReport,
    /// Final directory listing, sorted
    pub output_files: Vec<String>,
}

impl RunSummary {
    pub fn matched_documents(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| matches!(d.outcome, DocumentOutcome::Written { .. }))
            .count()
    }

    pub fn skipped_documents(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| matches!(d.outcome, DocumentOutcome::Skipped { .. }))
            .count()
    }
}
