//! Year folder selection and candidate document discovery
//!
//! Layout expected under the archive root:
//!
//! ```text
//! <archive_root>/
//!     HOLERITES/          (ExtractionConfig::year_parent_dir)
//!         2019/
//!             jan.pdf
//!         2020_bonus/
//!             dez.pdf
//! ```

use crate::error::{ExtractError, Result};
use crate::types::{SourceDocument, YearRange};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct YearFilter<'a> {
    year_parent_dir: &'a str,
    pdf_extension: &'a str,
}

impl<'a> YearFilter<'a> {
    pub fn new(year_parent_dir: &'a str, pdf_extension: &'a str) -> Self {
        Self {
            year_parent_dir,
            pdf_extension,
        }
    }

    /// Fails only when the archive root or its year folder parent is absent
    pub fn year_parent(&self, archive_root: &Path) -> Result<PathBuf> {
        if !archive_root.is_dir() {
            return Err(ExtractError::ArchiveRootMissing(archive_root.to_path_buf()));
        }
        let parent = archive_root.join(self.year_parent_dir);
        if !parent.is_dir() {
            return Err(ExtractError::YearParentMissing {
                root: archive_root.to_path_buf(),
                name: self.year_parent_dir.to_string(),
            });
        }
        Ok(parent)
    }

    /// Year folders whose name contains any year of `years`, sorted by path
    pub fn select_folders(&self, archive_root: &Path, years: YearRange) -> Result<Vec<PathBuf>> {
        let parent = self.year_parent(archive_root)?;
        if years.is_empty() {
            debug!(
                admission = years.admission,
                dismissal = years.dismissal,
                "inverted year bounds, nothing selected"
            );
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&parent).map_err(|source| ExtractError::Listing {
            path: parent.clone(),
            source,
        })?;

        let mut folders: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter(|e| years.matches_folder_name(&e.file_name().to_string_lossy()))
            .map(|e| e.path())
            .collect();
        folders.sort();
        Ok(folders)
    }

    /// Flatten the PDFs directly inside each folder into one candidate list.
    ///
    /// A folder that cannot be listed is logged and skipped.
    pub fn collect_documents(&self, folders: &[PathBuf]) -> Vec<SourceDocument> {
        let mut documents = Vec::new();
        for folder in folders {
            let entries = match fs::read_dir(folder) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(folder = %folder.display(), error = %e, "skipping unreadable year folder");
                    continue;
                }
            };
            let mut in_folder: Vec<SourceDocument> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && self.supports_file_type(p))
                .map(SourceDocument::new)
                .collect();
            in_folder.sort();
            documents.extend(in_folder);
        }
        documents
    }

    pub(crate) fn supports_file_type(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(self.pdf_extension))
            .unwrap_or(false)
    }
}
