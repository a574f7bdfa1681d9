//! Registration and per-phase dispatch tables

use super::{Detector, Trigger};
use crate::config::Config;
use crate::error::{LintError, Result};
use crate::issues::{IssueRegistry, Scope};
use crate::model::{NodeKind, Phase};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Detectors interested in each node kind and (kind, name) pair of one phase
///
/// Every list is in registration order and holds each detector at most once.
#[derive(Debug, Default)]
pub struct DispatchTable {
    enter: HashMap<NodeKind, Vec<usize>>,
    exit: HashMap<NodeKind, Vec<usize>>,
    named: HashMap<NodeKind, HashMap<String, Vec<usize>>>,
    participants: Vec<usize>,
}

impl DispatchTable {
    fn add(&mut self, index: usize, trigger: &Trigger) {
        let list = match trigger {
            Trigger::Enter(kind) => self.enter.entry(*kind).or_default(),
            Trigger::Exit(kind) => self.exit.entry(*kind).or_default(),
            named => {
                let name = named.name().unwrap_or_default();
                self.named
                    .entry(named.node_kind())
                    .or_default()
                    .entry(name.to_string())
                    .or_default()
            }
        };
        if !list.contains(&index) {
            list.push(index);
        }
        if !self.participants.contains(&index) {
            self.participants.push(index);
        }
    }

    pub fn on_enter(&self, kind: NodeKind) -> &[usize] {
        self.enter.get(&kind).map_or(&[], Vec::as_slice)
    }

    pub fn on_exit(&self, kind: NodeKind) -> &[usize] {
        self.exit.get(&kind).map_or(&[], Vec::as_slice)
    }

    pub fn named(&self, kind: NodeKind, name: &str) -> &[usize] {
        self.named
            .get(&kind)
            .and_then(|by_name| by_name.get(name))
            .map_or(&[], Vec::as_slice)
    }

    /// Detectors registered for an annotation; unqualified names (unresolved
    /// imports) fall back to matching the simple name
    pub fn annotation(&self, name: &str) -> Vec<usize> {
        let exact = self.named(NodeKind::Annotation, name);
        if !exact.is_empty() || name.contains('.') {
            return exact.to_vec();
        }
        let mut out: Vec<usize> = Vec::new();
        if let Some(by_name) = self.named.get(&NodeKind::Annotation) {
            for (qualified, detectors) in by_name {
                if qualified.rsplit('.').next() == Some(name) {
                    out.extend(detectors.iter().copied());
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn has_named(&self, kind: NodeKind) -> bool {
        self.named.contains_key(&kind)
    }

    /// Detectors with any interest in this phase, in registration order
    pub fn participants(&self) -> &[usize] {
        &self.participants
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

/// Validated detector set with its dispatch tables, built once per process
pub struct Registration {
    detectors: Vec<Box<dyn Detector>>,
    tables: [DispatchTable; 4],
    relevant_annotations: HashSet<String>,
}

impl Registration {
    pub fn new(registry: &IssueRegistry, detectors: Vec<Box<dyn Detector>>) -> Result<Self> {
        let mut tables: [DispatchTable; 4] = Default::default();
        let mut relevant_annotations = HashSet::new();
        let mut names = HashSet::new();

        for (index, detector) in detectors.iter().enumerate() {
            let name = detector.name();
            if !names.insert(name) {
                return Err(LintError::Configuration(format!(
                    "detector `{}` is registered twice",
                    name
                )));
            }

            for issue in detector.issues() {
                if !registry.contains(issue) {
                    return Err(LintError::Configuration(format!(
                        "detector `{}` reports unregistered issue `{}`",
                        name, issue.id
                    )));
                }
            }

            for interest in detector.interests() {
                let kind = interest.trigger.node_kind();
                if !kind.occurs_in(interest.phase) {
                    return Err(LintError::Configuration(format!(
                        "detector `{}` declares {:?} in the {:?} phase, where {:?} nodes never occur",
                        name, interest.trigger, interest.phase, kind
                    )));
                }
                if let Trigger::Annotation(annotation) = interest.trigger {
                    relevant_annotations.insert(annotation.to_string());
                }
                tables[interest.phase.index()].add(index, &interest.trigger);
            }
        }

        debug!(
            "Registered {} detectors, {} relevant annotations",
            detectors.len(),
            relevant_annotations.len()
        );

        Ok(Self {
            detectors,
            tables,
            relevant_annotations,
        })
    }

    pub fn detectors(&self) -> &[Box<dyn Detector>] {
        &self.detectors
    }

    pub fn detector(&self, index: usize) -> &dyn Detector {
        self.detectors[index].as_ref()
    }

    pub fn table(&self, phase: Phase) -> &DispatchTable {
        &self.tables[phase.index()]
    }

    /// Annotation names any detector registered for
    pub fn relevant_annotations(&self) -> &HashSet<String> {
        &self.relevant_annotations
    }

    /// Per-detector flags: does the detector run on a unit of this scope
    pub fn active_for(&self, config: &Config, scope: Scope) -> Vec<bool> {
        self.detectors
            .iter()
            .map(|detector| {
                detector
                    .issues()
                    .iter()
                    .any(|issue| issue.applies_to(scope) && config.is_reportable(issue))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field(
                "detectors",
                &self.detectors.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .field("relevant_annotations", &self.relevant_annotations)
            .finish()
    }
}
