//! Document writer
//!
//! Matched pages go into an accumulator in ascending order, and after every
//! append the *whole* accumulator is persisted under the name of the page just
//! added. For matches `[1, 2]` that yields `A_pag2.pdf` (page 1) and
//! `A_pag3.pdf` (pages 1 and 2). The reconciler relies on this: the highest
//! tagged artifact of a document is always the complete one.

use crate::error::ExtractError;
use crate::naming::ArtifactNaming;
use crate::pdf::PdfDocument;
use crate::types::{MatchSet, OutputArtifact, OutputPlan};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct WriteResult {
    pub artifacts: Vec<OutputArtifact>,
    /// Writes that failed; later pages were still attempted
    pub failures: Vec<ExtractError>,
}

pub struct DocumentWriter<'a> {
    naming: &'a ArtifactNaming,
}

impl<'a> DocumentWriter<'a> {
    pub fn new(naming: &'a ArtifactNaming) -> Self {
        Self { naming }
    }

    pub fn write(
        &self,
        doc: &PdfDocument,
        plan: &OutputPlan,
        matches: &MatchSet,
        output_dir: &Path,
    ) -> WriteResult {
        let mut result = WriteResult::default();
        let mut accumulated: Vec<usize> = Vec::with_capacity(matches.len());

        for &page in matches.pages() {
            accumulated.push(page);

            let file_name = if matches.len() == 1 {
                self.naming.single_name(plan)
            } else {
                self.naming.tagged_name(plan, page)
            };
            let dest = output_dir.join(&file_name);

            match doc.save_pages(&accumulated, &dest) {
                Ok(page_count) => {
                    debug!(file = %file_name, pages = page_count, "artifact written");
                    result.artifacts.push(OutputArtifact {
                        path: dest,
                        source_page: page,
                        page_count,
                    });
                }
                Err(e) => {
                    warn!(file = %file_name, error = %e, "failed to write artifact");
                    result.failures.push(e);
                }
            }
        }

        result
    }
}
