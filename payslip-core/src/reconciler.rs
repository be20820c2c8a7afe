//! Output directory reconciliation
//!
//! Runs single-threaded after the worker pool joined, looking only at the
//! directory listing:
//!
//! 1. Delete pass: remove every artifact tagged with page 1.
//! 2. Rename pass: strip the tag from every remaining tagged artifact so it
//!    becomes `<stem>.pdf`. A document's tagged artifacts are renamed in
//!    ascending page order onto the same target, so the last (largest)
//!    accumulation is the survivor.
//!
//! Per-file I/O failures are recorded in the report and never stop a pass.

use crate::config::CollisionPolicy;
use crate::error::{ExtractError, Result};
use crate::naming::ArtifactNaming;
use crate::types::{FileFailure, ReconcileReport, RenameRecord};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub struct Reconciler<'a> {
    naming: &'a ArtifactNaming,
    policy: CollisionPolicy,
}

impl<'a> Reconciler<'a> {
    pub fn new(naming: &'a ArtifactNaming, policy: CollisionPolicy) -> Self {
        Self { naming, policy }
    }

    pub fn reconcile(&self, output_dir: &Path) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        self.delete_pass(output_dir, &mut report)?;
        self.rename_pass(output_dir, &mut report)?;

        info!(
            deleted = report.deleted.len(),
            renamed = report.renamed.len(),
            collisions = report.collisions.len(),
            failures = report.failures.len(),
            "reconciliation finished"
        );
        Ok(report)
    }

    fn delete_pass(&self, dir: &Path, report: &mut ReconcileReport) -> Result<()> {
        for name in list_files(dir)? {
            let is_first_page = self
                .naming
                .parse(&name)
                .map(|tagged| tagged.page == 1)
                .unwrap_or(false);
            if !is_first_page {
                continue;
            }

            match fs::remove_file(dir.join(&name)) {
                Ok(()) => {
                    debug!(file = %name, "removed first-page artifact");
                    report.deleted.push(name);
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "failed to remove artifact");
                    report.failures.push(FileFailure {
                        file: name,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn rename_pass(&self, dir: &Path, report: &mut ReconcileReport) -> Result<()> {
        let names = list_files(dir)?;

        // Names that exist before any rename belong to other documents
        let mut taken: HashSet<String> = HashSet::new();
        let mut groups: BTreeMap<String, Vec<(u32, String)>> = BTreeMap::new();
        for name in names {
            match self.naming.parse(&name) {
                Some(tagged) => groups.entry(tagged.stem).or_default().push((tagged.page, name)),
                None => {
                    taken.insert(name);
                }
            }
        }

        for (stem, mut members) in groups {
            members.sort();
            let Some(target) = self.resolve_target(&stem, &taken, report) else {
                continue;
            };

            for (_, name) in members {
                match fs::rename(dir.join(&name), dir.join(&target)) {
                    Ok(()) => {
                        debug!(from = %name, to = %target, "renamed artifact");
                        report.renamed.push(RenameRecord {
                            from: name,
                            to: target.clone(),
                        });
                    }
                    Err(e) => {
                        warn!(file = %name, to = %target, error = %e, "failed to rename artifact");
                        report.failures.push(FileFailure {
                            file: name,
                            error: e.to_string(),
                        });
                    }
                }
            }
            taken.insert(target);
        }
        Ok(())
    }

    /// Pick the rename target for `stem`, applying the collision policy when
    /// `<stem>.pdf` is already taken. `None` leaves the group untouched.
    fn resolve_target(
        &self,
        stem: &str,
        taken: &HashSet<String>,
        report: &mut ReconcileReport,
    ) -> Option<String> {
        let bare = self.naming.bare_name(stem);
        if !taken.contains(&bare) {
            return Some(bare);
        }

        report.collisions.push(bare.clone());
        match self.policy {
            CollisionPolicy::Overwrite => {
                warn!(file = %bare, "rename target exists, overwriting");
                Some(bare)
            }
            CollisionPolicy::KeepExisting => {
                warn!(file = %bare, "rename target exists, leaving tagged artifacts in place");
                None
            }
            CollisionPolicy::Disambiguate => {
                let alternative = (2..)
                    .map(|n| self.naming.disambiguated_name(stem, n))
                    .find(|candidate| !taken.contains(candidate));
                if let Some(alt) = &alternative {
                    warn!(file = %bare, to = %alt, "rename target exists, disambiguating");
                }
                alternative
            }
        }
    }
}

/// Regular files directly in `dir`, sorted by name
fn list_files(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|source| ExtractError::Listing {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}
