//! Worker pool: one match-and-write task per source document
//!
//! Tasks run on a dedicated rayon pool sized from the config (host CPU count
//! by default). Each task owns only the artifact names derived from its
//! plan's stem, which is unique within the run. A task that errors or panics
//! is reported as skipped; siblings are unaffected. `run` returns only after
//! every task finished.

use crate::error::{ExtractError, Result};
use crate::matcher::PageMatcher;
use crate::naming::ArtifactNaming;
use crate::pdf::PdfDocument;
use crate::types::{DocumentOutcome, DocumentReport, OutputPlan, SourceDocument};
use crate::writer::DocumentWriter;
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{error, info, warn};

pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Match and write every planned document; reports come back in input order.
    pub fn run(
        &self,
        plans: &[OutputPlan],
        matcher: &PageMatcher,
        naming: &ArtifactNaming,
        output_dir: &Path,
    ) -> Result<Vec<DocumentReport>> {
        self.run_with(plans, |plan| {
            process_document(plan, matcher, naming, output_dir)
        })
    }

    /// Run `task` once per plan on the pool, isolating errors and panics.
    pub fn run_with<F>(&self, plans: &[OutputPlan], task: F) -> Result<Vec<DocumentReport>>
    where
        F: Fn(&OutputPlan) -> Result<DocumentOutcome> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("payslip-worker-{i}"))
            .build()?;

        let reports: Vec<DocumentReport> = pool.install(|| {
            plans
                .par_iter()
                .map(|plan| DocumentReport {
                    source: plan.source.clone(),
                    outcome: run_isolated(&plan.source, || task(plan)),
                })
                .collect()
        });

        Ok(reports)
    }
}

/// Match and write one document. Errors here are document-scoped.
pub fn process_document(
    plan: &OutputPlan,
    matcher: &PageMatcher,
    naming: &ArtifactNaming,
    output_dir: &Path,
) -> Result<DocumentOutcome> {
    let doc = PdfDocument::load(plan.source.path())?;
    let matches = matcher.find_matches(&doc);
    if matches.is_empty() {
        return Ok(DocumentOutcome::NoMatch);
    }

    info!(
        document = %plan.source.file_name(),
        stem = %plan.stem,
        pages = ?matches.pages(),
        "employee found"
    );

    let written = DocumentWriter::new(naming).write(&doc, plan, &matches, output_dir);
    Ok(DocumentOutcome::Written {
        matched_pages: matches.pages().to_vec(),
        artifacts: written.artifacts,
        failed_writes: written.failures.len(),
    })
}

fn run_isolated<F>(source: &SourceDocument, task: F) -> DocumentOutcome
where
    F: FnOnce() -> Result<DocumentOutcome>,
{
    let result = panic::catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|payload| {
        Err(ExtractError::TaskPanicked {
            path: source.path.clone(),
            message: panic_message(payload.as_ref()),
        })
    });

    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            if e.is_document_scoped() {
                warn!(document = %source.path.display(), error = %e, "document skipped");
            } else {
                error!(document = %source.path.display(), error = %e, "document task failed");
            }
            DocumentOutcome::Skipped {
                reason: e.to_string(),
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
