//! Output artifact naming
//!
//! A document with a single match keeps its source filename. A document with
//! several matches writes `<stem><tag><page>.pdf` per match, where `<page>` is
//! the 1-based source page number. The reconciler parses those names back.
//!
//! Stems are assigned before any task is scheduled, so two candidates named
//! `jan.pdf` in different year folders never write to the same files.

use crate::config::CollisionPolicy;
use crate::error::Result;
use crate::types::{OutputPlan, SourceDocument};
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::warn;

/// A parsed `<stem><tag><page>.pdf` filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedName {
    pub stem: String,
    /// 1-based source page number
    pub page: u32,
}

/// Output stems for one run's candidate documents
#[derive(Debug, Default)]
pub struct OutputAssignment {
    /// Documents to schedule, in candidate order
    pub plans: Vec<OutputPlan>,
    /// Documents left unscheduled by the collision policy, with the reason
    pub displaced: Vec<(SourceDocument, String)>,
    /// Bare names claimed by more than one source document, sorted
    pub collisions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ArtifactNaming {
    tag: String,
    tagged: Regex,
}

impl ArtifactNaming {
    pub fn new(tag: &str) -> Result<Self> {
        // Greedy stem: the last tag occurrence wins, so stems such as
        // `folha_pagamento` survive a `_pag` tag.
        let tagged = Regex::new(&format!(
            r"^(?P<stem>.+){}(?P<page>\d+)(?i:\.pdf)$",
            regex::escape(tag)
        ))?;
        Ok(Self {
            tag: tag.to_string(),
            tagged,
        })
    }

    /// Name for the only artifact of a single-match document
    pub fn single_name(&self, plan: &OutputPlan) -> String {
        if plan.is_renamed() {
            self.bare_name(&plan.stem)
        } else {
            plan.source.file_name()
        }
    }

    /// Name for the artifact triggered by zero-based `page_index`
    pub fn tagged_name(&self, plan: &OutputPlan, page_index: usize) -> String {
        format!("{}{}{}.pdf", plan.stem, self.tag, page_index + 1)
    }

    pub fn parse(&self, file_name: &str) -> Option<TaggedName> {
        let caps = self.tagged.captures(file_name)?;
        let page = caps["page"].parse().ok()?;
        Some(TaggedName {
            stem: caps["stem"].to_string(),
            page,
        })
    }

    pub fn bare_name(&self, stem: &str) -> String {
        format!("{stem}.pdf")
    }

    pub fn disambiguated_stem(&self, stem: &str, n: usize) -> String {
        format!("{stem} ({n})")
    }

    pub fn disambiguated_name(&self, stem: &str, n: usize) -> String {
        self.bare_name(&self.disambiguated_stem(stem, n))
    }

    /// Give every candidate a unique output stem.
    ///
    /// Documents sharing a file stem are resolved with `policy`:
    /// `disambiguate` keeps the first and numbers the rest (`jan (2)`),
    /// `keep-existing` schedules only the first, `overwrite` only the last.
    pub fn assign_outputs(
        &self,
        documents: &[SourceDocument],
        policy: CollisionPolicy,
    ) -> OutputAssignment {
        let mut last_index: HashMap<String, usize> = HashMap::new();
        for (i, doc) in documents.iter().enumerate() {
            last_index.insert(doc.stem(), i);
        }
        let mut taken: HashSet<String> = last_index.keys().cloned().collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut collisions: BTreeSet<String> = BTreeSet::new();
        let mut assignment = OutputAssignment::default();

        for (i, doc) in documents.iter().enumerate() {
            let stem = doc.stem();
            let is_first = seen.insert(stem.clone());
            let is_last = last_index.get(&stem) == Some(&i);
            if is_first && is_last {
                assignment.plans.push(OutputPlan::new(doc.clone()));
                continue;
            }

            let bare = self.bare_name(&stem);
            if collisions.insert(bare.clone()) {
                warn!(file = %bare, policy = ?policy, "several source documents share an output name");
            }

            match policy {
                CollisionPolicy::Disambiguate if is_first => {
                    assignment.plans.push(OutputPlan::new(doc.clone()));
                }
                CollisionPolicy::Disambiguate => {
                    let mut n = 2;
                    let alternative = loop {
                        let candidate = self.disambiguated_stem(&stem, n);
                        if taken.insert(candidate.clone()) {
                            break candidate;
                        }
                        n += 1;
                    };
                    assignment
                        .plans
                        .push(OutputPlan::with_stem(doc.clone(), alternative));
                }
                CollisionPolicy::KeepExisting if is_first => {
                    assignment.plans.push(OutputPlan::new(doc.clone()));
                }
                CollisionPolicy::Overwrite if is_last => {
                    assignment.plans.push(OutputPlan::new(doc.clone()));
                }
                CollisionPolicy::KeepExisting => assignment.displaced.push((
                    doc.clone(),
                    format!("{bare} already assigned to an earlier source document"),
                )),
                CollisionPolicy::Overwrite => assignment.displaced.push((
                    doc.clone(),
                    format!("{bare} replaced by a later source document"),
                )),
            }
        }

        assignment.collisions = collisions.into_iter().collect();
        assignment
    }
}
