//! Reporting sink - collects surviving findings into a final [`Report`]
//!
//! The sink folds mergeable findings, drops duplicates and orders the
//! result; it performs no I/O.

use crate::analysis::{DetectorFailure, Finding};
use crate::issues::Severity;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

/// Final result of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub findings: Vec<Finding>,
    /// Findings per severity
    pub counts: BTreeMap<Severity, usize>,
    pub failures: Vec<DetectorFailure>,
    /// Units analyzed
    pub files: usize,
    /// Findings dropped by suppression or severity filters
    pub suppressed: usize,
    /// The run was cancelled and is incomplete
    pub cancelled: bool,
}

impl Report {
    pub fn count(&self, severity: Severity) -> usize {
        self.counts.get(&severity).copied().unwrap_or(0)
    }

    /// Whether any finding at error severity or above survived
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity.is_error())
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ReportingSink {
    findings: Vec<Finding>,
    failures: Vec<DetectorFailure>,
    files: usize,
    suppressed: usize,
    cancelled: bool,
}

impl ReportingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn record_failure(&mut self, failure: DetectorFailure) {
        self.failures.push(failure);
    }

    pub fn add_files(&mut self, files: usize) {
        self.files += files;
    }

    pub fn add_suppressed(&mut self, suppressed: usize) {
        self.suppressed += suppressed;
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn finish(self) -> Report {
        let merged = merge(self.findings);

        let mut seen = HashSet::new();
        let mut findings: Vec<Finding> = merged
            .into_iter()
            .filter(|f| seen.insert(dedup_key(f)))
            .collect();
        findings.sort_by(|a, b| {
            (&a.location.file, a.location.start, a.issue.id)
                .cmp(&(&b.location.file, b.location.start, b.issue.id))
        });

        let mut counts = BTreeMap::new();
        for finding in &findings {
            *counts.entry(finding.severity).or_insert(0) += 1;
        }

        Report {
            findings,
            counts,
            failures: self.failures,
            files: self.files,
            suppressed: self.suppressed,
            cancelled: self.cancelled,
        }
    }
}

type DedupKey = (&'static str, PathBuf, usize, usize, String);

fn dedup_key(finding: &Finding) -> DedupKey {
    (
        finding.issue.id,
        finding.location.file.clone(),
        finding.location.start,
        finding.location.end,
        finding.message.clone(),
    )
}

/// Fold mergeable findings with the same issue, location and prefix into the
/// first of them; items keep first-seen order and appear once
fn merge(findings: Vec<Finding>) -> Vec<Finding> {
    let mut out: Vec<Finding> = Vec::with_capacity(findings.len());
    let mut groups: HashMap<(&'static str, PathBuf, usize, usize, String), usize> = HashMap::new();

    for finding in findings {
        let Some(group) = &finding.merge else {
            out.push(finding);
            continue;
        };
        let key = (
            finding.issue.id,
            finding.location.file.clone(),
            finding.location.start,
            finding.location.end,
            group.prefix.clone(),
        );
        match groups.get(&key) {
            Some(&index) => {
                let target = &mut out[index];
                if let Some(target_group) = &mut target.merge {
                    for item in &group.items {
                        if !target_group.items.contains(item) {
                            target_group.items.push(item.clone());
                        }
                    }
                    target.message =
                        format!("{}{}", target_group.prefix, target_group.items.join(", "));
                }
            }
            None => {
                groups.insert(key, out.len());
                out.push(finding);
            }
        }
    }
    out
}
