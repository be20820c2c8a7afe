use crate::config::ExtractionConfig;
use crate::error::{ExtractError, Result};
use crate::matcher::PageMatcher;
use crate::naming::ArtifactNaming;
use crate::pool::WorkerPool;
use crate::reconciler::Reconciler;
use crate::types::*;
use crate::year_filter::YearFilter;
use chrono::Utc;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        info!(step = step_name, elapsed_ms = elapsed.as_millis() as u64, "step finished");
        self.timings.push((step_name.to_string(), elapsed));

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn log_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            info!(
                step = %step,
                elapsed_ms = duration.as_millis() as u64,
                share = %format!("{percentage:.1}%"),
                "profile"
            );
        }
        info!(total_ms = total.as_millis() as u64, "profile total");
    }
}

/// Runs the whole pipeline for one employee:
/// year filter → worker pool (match + write) → reconciler.
pub struct PayslipProcessor {
    config: ExtractionConfig,
    naming: ArtifactNaming,
}

impl PayslipProcessor {
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        let naming = ArtifactNaming::new(&config.page_suffix_tag)?;
        Ok(Self { config, naming })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn process(&self, request: &ExtractionRequest) -> Result<RunSummary> {
        self.process_with_profiling(request, false)
    }

    /// Upfront checks (name, archive layout, output directory) fail the run.
    /// After that, failures are per document or per file and end up in the
    /// returned summary.
    pub fn process_with_profiling(
        &self,
        request: &ExtractionRequest,
        enable_profiling: bool,
    ) -> Result<RunSummary> {
        let mut profiler = StepProfiler::new(enable_profiling);
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();

        let matcher = PageMatcher::new(&request.employee_name)?;
        let filter = YearFilter::new(&self.config.year_parent_dir, &self.config.pdf_extension);

        // Stage 1: year folders → candidate documents
        let selected_folders = profiler.time_step("1. Year Filter", || {
            filter.select_folders(&request.archive_root, request.years)
        })?;
        let documents = filter.collect_documents(&selected_folders);
        info!(
            %run_id,
            folders = selected_folders.len(),
            documents = documents.len(),
            admission = request.years.admission,
            dismissal = request.years.dismissal,
            "candidates selected"
        );

        fs::create_dir_all(&request.output_dir).map_err(|source| {
            ExtractError::OutputDirectory {
                path: request.output_dir.clone(),
                source,
            }
        })?;
        let cleared = clear_stale_artifacts(&request.output_dir, &filter)?;
        if cleared > 0 {
            warn!(
                dir = %request.output_dir.display(),
                files = cleared,
                "removed PDFs left by an earlier run"
            );
        }

        // Unique output stems, fixed before any task starts
        let assignment = self
            .naming
            .assign_outputs(&documents, self.config.collision_policy);

        // Stage 2: parallel match + write; returns after the join
        let pool = WorkerPool::new(self.config.worker_count());
        let mut reports = profiler.time_step("2. Match + Write", || {
            pool.run(&assignment.plans, &matcher, &self.naming, &request.output_dir)
        })?;
        reports.extend(assignment.displaced.into_iter().map(|(source, reason)| {
            DocumentReport {
                source,
                outcome: DocumentOutcome::Skipped { reason },
            }
        }));
        reports.sort_by(|a, b| a.source.cmp(&b.source));

        // Stage 3: exclusive access to the output directory from here on
        let reconciler = Reconciler::new(&self.naming, self.config.collision_policy);
        let mut reconciliation =
            profiler.time_step("3. Reconcile", || reconciler.reconcile(&request.output_dir))?;
        let mut collisions = assignment.collisions;
        collisions.append(&mut reconciliation.collisions);
        reconciliation.collisions = collisions;

        let output_files = list_output(&request.output_dir)?;
        profiler.log_summary();

        let summary = RunSummary {
            run_id,
            employee_name: request.employee_name.clone(),
            years: request.years,
            started_at,
            finished_at: Utc::now(),
            output_dir: request.output_dir.clone(),
            selected_folders,
            documents: reports,
            reconciliation,
            output_files,
        };

        info!(
            %run_id,
            matched = summary.matched_documents(),
            skipped = summary.skipped_documents(),
            files = summary.output_files.len(),
            "run finished"
        );
        Ok(summary)
    }
}

/// Remove PDFs directly in `dir` so only this run's artifacts get reconciled
fn clear_stale_artifacts(dir: &Path, filter: &YearFilter) -> Result<usize> {
    let output_err = |source: std::io::Error| ExtractError::OutputDirectory {
        path: dir.to_path_buf(),
        source,
    };
    let mut removed = 0;
    for entry in fs::read_dir(dir).map_err(output_err)? {
        let path = entry.map_err(output_err)?.path();
        if path.is_file() && filter.supports_file_type(&path) {
            fs::remove_file(&path).map_err(output_err)?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn list_output(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|source| ExtractError::Listing {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}
