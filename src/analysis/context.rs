//! Per-unit traversal context handed to detector callbacks

use super::{CancellationToken, DataValue, DetectorFailure, Finding, ProjectFacts, Registration};
use crate::config::Config;
use crate::evaluator::Evaluator;
use crate::issues::{Issue, IssueRegistry};
use crate::model::{Location, NodeId, Tree};
use crate::suppress::{SuppressionResolver, Verdict};
use crate::versions::{VersionDatabase, VersionLookup};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Read-only environment shared by every callback on one unit
pub struct UnitEnv<'a> {
    pub tree: &'a Tree,
    pub evaluator: Evaluator<'a>,
    pub config: &'a Config,
    pub registry: &'a IssueRegistry,
    pub registration: &'a Registration,
    pub versions: Option<&'a dyn VersionDatabase>,
    pub lookup: Option<&'a dyn VersionLookup>,
    pub suppression: SuppressionResolver<'a>,
    pub cancel: &'a CancellationToken,
}

/// Everything one unit produces
pub struct UnitState {
    pub findings: Vec<Finding>,
    pub facts: ProjectFacts,
    pub failures: Vec<DetectorFailure>,
    /// Findings dropped by suppression or severity
    pub suppressed: usize,
    pub cancelled: bool,
    pub(crate) disabled: Vec<bool>,
    slots: HashMap<(usize, TypeId), Box<dyn Any + Send>>,
}

impl UnitState {
    pub fn new(detectors: usize) -> Self {
        Self {
            findings: Vec::new(),
            facts: ProjectFacts::new(),
            failures: Vec::new(),
            suppressed: 0,
            cancelled: false,
            disabled: vec![false; detectors],
            slots: HashMap::new(),
        }
    }

    /// Run suppression on a finding and keep it if it survives
    pub(crate) fn commit(&mut self, env: &UnitEnv<'_>, mut finding: Finding) {
        match env.suppression.check(finding.issue, env.tree, finding.anchor) {
            Verdict::Keep(severity) => {
                finding.severity = severity;
                self.findings.push(finding);
            }
            Verdict::Drop(reason) => {
                debug!(
                    "Dropped {} at {}: {:?}",
                    finding.issue.id, finding.location, reason
                );
                self.suppressed += 1;
            }
        }
    }
}

/// What a detector sees during a callback
pub struct DetectorContext<'c> {
    env: &'c UnitEnv<'c>,
    state: &'c mut UnitState,
    detector: usize,
}

impl<'c> DetectorContext<'c> {
    pub(crate) fn new(env: &'c UnitEnv<'c>, state: &'c mut UnitState, detector: usize) -> Self {
        Self {
            env,
            state,
            detector,
        }
    }

    pub fn tree(&self) -> &'c Tree {
        self.env.tree
    }

    pub fn evaluator(&self) -> &Evaluator<'c> {
        &self.env.evaluator
    }

    pub fn config(&self) -> &'c Config {
        self.env.config
    }

    pub fn versions(&self) -> Option<&'c dyn VersionDatabase> {
        self.env.versions
    }

    pub fn lookup(&self) -> Option<&'c dyn VersionLookup> {
        self.env.lookup
    }

    pub fn is_cancelled(&self) -> bool {
        self.env.cancel.is_cancelled()
    }

    pub fn location(&self, node: NodeId) -> Location {
        self.env.tree.source_location(node)
    }

    /// A finding anchored at `node`, ready to be refined and reported
    pub fn finding(&self, issue: &'static Issue, node: NodeId, message: impl Into<String>) -> Finding {
        Finding::new(issue, self.location(node), message).anchored(node)
    }

    /// Report a finding anchored at `node`
    pub fn report(&mut self, issue: &'static Issue, node: NodeId, message: impl Into<String>) {
        let finding = self.finding(issue, node, message);
        self.report_finding(finding);
    }

    /// Report a prepared finding; suppression is applied here
    pub fn report_finding(&mut self, mut finding: Finding) {
        let name = self.env.registration.detector(self.detector).name();
        if !self.env.registry.contains(finding.issue) {
            warn!(
                "Detector {} reported unregistered issue {}",
                name, finding.issue.id
            );
            self.state.failures.push(DetectorFailure {
                detector: name,
                file: self.env.tree.file().to_path_buf(),
                message: format!("reported unregistered issue `{}`", finding.issue.id),
            });
            return;
        }
        finding.detector = Some(self.detector);
        self.state.commit(self.env, finding);
    }

    /// Per-unit state private to this detector, created on first use
    pub fn state_mut<T: Default + Send + 'static>(&mut self) -> &mut T {
        let slot = self
            .state
            .slots
            .entry((self.detector, TypeId::of::<T>()))
            .or_insert_with(|| Box::new(T::default()));
        match slot.downcast_mut::<T>() {
            Some(state) => state,
            None => unreachable!("state slots are keyed by their type"),
        }
    }

    /// Record a project-wide fact for deferred filtering
    pub fn record_fact(&mut self, key: &str, value: DataValue) {
        self.state.facts.record(key, value);
    }

    pub fn facts(&self) -> &ProjectFacts {
        &self.state.facts
    }
}
