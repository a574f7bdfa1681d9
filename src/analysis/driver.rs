//! Lint driver - runs a whole project through the engine
//!
//! 1. Discover and parse units (in parallel)
//! 2. Index every unit into the shared symbol table
//! 3. Dispatch each unit on the rayon pool, one traversal per unit
//! 4. Merge project facts and run deferred filters
//! 5. Hand everything to the reporting sink

use super::context::UnitEnv;
use super::detectors::builtin_detectors;
use super::visitor::UnitVisitor;
use super::{facts, CancellationToken, DataValue, Detector, DetectorFailure, Finding, ProjectFacts, Registration, UnitState};
use crate::config::Config;
use crate::discovery::{FileFinder, SourceFile};
use crate::error::{LintError, Result};
use crate::evaluator::Evaluator;
use crate::issues::{IssueRegistry, Scope, LINT_ERROR};
use crate::model::{ClassSymbol, Location, SymbolTable, SymbolTableBuilder, Tree};
use crate::parser::parse_file;
use crate::report::{Report, ReportingSink};
use crate::suppress::SuppressionResolver;
use crate::versions::{MavenCentralLookup, StaticVersionDatabase, VersionDatabase, VersionLookup};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Message of the infrastructure finding for a missing version database
pub const MISSING_DATABASE: &str = "analysis incomplete: API version database unavailable";

const SCOPES: [Scope; 5] = [
    Scope::JavaFile,
    Scope::ClassFile,
    Scope::ResourceFile,
    Scope::Manifest,
    Scope::GradleFile,
];

/// A discovered file that could not be read or parsed
struct Unparsed {
    path: PathBuf,
    error: String,
}

pub struct LintDriver<'r> {
    config: Config,
    registry: &'r IssueRegistry,
    registration: Registration,
    versions: Option<Arc<dyn VersionDatabase>>,
    lookup: Option<Arc<dyn VersionLookup>>,
    cancel: CancellationToken,
    compiled: Vec<ClassSymbol>,
    show_progress: bool,
}

impl<'r> LintDriver<'r> {
    /// Validate the detector set against the registry
    pub fn new(
        config: Config,
        registry: &'r IssueRegistry,
        detectors: Vec<Box<dyn Detector>>,
    ) -> Result<Self> {
        let registration = Registration::new(registry, detectors)?;
        Ok(Self {
            config,
            registry,
            registration,
            versions: None,
            lookup: None,
            cancel: CancellationToken::new(),
            compiled: Vec::new(),
            show_progress: false,
        })
    }

    pub fn with_versions(mut self, versions: Arc<dyn VersionDatabase>) -> Self {
        self.versions = Some(versions);
        self
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn VersionLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Classes known only from compiled input
    pub fn with_compiled_classes(mut self, classes: Vec<ClassSymbol>) -> Self {
        self.compiled = classes;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Discover, parse and analyze everything below `root`
    pub fn analyze_path(&self, root: &Path) -> Result<Report> {
        let files = FileFinder::new(&self.config).find_files(root)?;
        info!("Found {} files to analyze", files.len());
        let (trees, unparsed) = self.parse_files(&files);
        self.run(root, trees, unparsed)
    }

    pub fn analyze_files(&self, files: &[SourceFile]) -> Result<Report> {
        let (trees, unparsed) = self.parse_files(files);
        self.run(Path::new("."), trees, unparsed)
    }

    /// Analyze already-built trees (hosts with their own adapters, tests)
    pub fn analyze_trees(&self, trees: Vec<Tree>) -> Result<Report> {
        self.run(Path::new("."), trees, Vec::new())
    }

    /// Parse files; unreadable or unparsable files come back separately so
    /// the run can report them
    fn parse_files(&self, files: &[SourceFile]) -> (Vec<Tree>, Vec<Unparsed>) {
        let parse = |file: &SourceFile| -> Option<std::result::Result<Tree, Unparsed>> {
            if self.cancel.is_cancelled() {
                return None;
            }
            Some(parse_file(file).map_err(|e| {
                warn!("Skipping {}: {}", file.path.display(), e);
                Unparsed {
                    path: file.path.clone(),
                    error: e.to_string(),
                }
            }))
        };

        let results: Vec<_> = if self.config.parallel {
            files.par_iter().filter_map(parse).collect()
        } else {
            let pb = if self.show_progress {
                let pb = ProgressBar::new(files.len() as u64);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                {
                    pb.set_style(style.progress_chars("#>-"));
                }
                pb
            } else {
                ProgressBar::hidden()
            };

            let mut results = Vec::with_capacity(files.len());
            for file in files {
                pb.set_message(file.path.display().to_string());
                results.extend(parse(file));
                pb.inc(1);
            }
            pb.finish_and_clear();
            results
        };

        let mut trees = Vec::with_capacity(results.len());
        let mut unparsed = Vec::new();
        for result in results {
            match result {
                Ok(tree) => trees.push(tree),
                Err(file) => unparsed.push(file),
            }
        }
        (trees, unparsed)
    }

    /// One infrastructure finding per file that never reached the detectors
    fn report_unparsed(&self, unparsed: Vec<Unparsed>, sink: &mut ReportingSink) {
        let config = &self.config;
        if !self.registry.contains(&LINT_ERROR) || !config.is_reportable(&LINT_ERROR) {
            return;
        }
        for file in unparsed {
            let message = format!("analysis incomplete: {}", file.error);
            let mut finding = Finding::new(&LINT_ERROR, Location::file_start(&file.path), message);
            finding.severity = config.severity_for(&LINT_ERROR);
            sink.accept(finding);
        }
    }

    fn build_symbols(&self, trees: &[Tree]) -> SymbolTable {
        let mut builder = SymbolTableBuilder::new();
        for tree in trees {
            builder.index(tree);
        }
        for class in &self.compiled {
            builder.add_class(class.clone());
        }
        let symbols = builder.build();
        debug!("Indexed {} classes", symbols.len());
        symbols
    }

    fn remote_lookup(&self) -> Option<Arc<dyn VersionLookup>> {
        if let Some(lookup) = &self.lookup {
            return Some(Arc::clone(lookup));
        }
        if !self.config.remote.enabled {
            return None;
        }
        match MavenCentralLookup::new(Duration::from_millis(self.config.remote.timeout_ms)) {
            Ok(lookup) => Some(Arc::new(lookup.with_cancellation(self.cancel.clone()))),
            Err(e) => {
                warn!("Remote version lookups disabled: {}", e);
                None
            }
        }
    }

    fn run(&self, root: &Path, trees: Vec<Tree>, unparsed: Vec<Unparsed>) -> Result<Report> {
        let config = &self.config;
        let registration = &self.registration;
        let mut sink = ReportingSink::new();
        self.report_unparsed(unparsed, &mut sink);

        let symbols = self.build_symbols(&trees);
        let excluded = self.missing_database_check(root, &mut sink);
        let lookup = self.remote_lookup();

        let active: HashMap<Scope, Vec<bool>> = SCOPES
            .iter()
            .map(|&scope| {
                let flags = registration
                    .active_for(config, scope)
                    .into_iter()
                    .zip(&excluded)
                    .map(|(active, &excluded)| active && !excluded)
                    .collect();
                (scope, flags)
            })
            .collect();

        let analyze = |tree: &Tree| -> Option<UnitState> {
            if self.cancel.is_cancelled() {
                return None;
            }
            let flags = active.get(&tree.scope())?;
            let env = UnitEnv {
                tree,
                evaluator: Evaluator::new(tree, &symbols)
                    .with_relevant_annotations(registration.relevant_annotations()),
                config,
                registry: self.registry,
                registration,
                versions: self.versions.as_deref(),
                lookup: lookup.as_deref(),
                suppression: SuppressionResolver::new(config),
                cancel: &self.cancel,
            };
            Some(UnitVisitor::new(&env, flags).run())
        };

        let units: Vec<Option<UnitState>> = if config.parallel {
            trees.par_iter().map(analyze).collect()
        } else {
            trees.iter().map(analyze).collect()
        };

        let mut project_facts = ProjectFacts::new();
        if let Some(min_sdk) = config.min_sdk {
            project_facts.set(facts::MIN_SDK, DataValue::Int(i64::from(min_sdk)));
        }
        for unit in units.iter().flatten().filter(|u| !u.cancelled) {
            project_facts.merge(&unit.facts);
        }

        for unit in units {
            let Some(unit) = unit.filter(|u| !u.cancelled) else {
                sink.mark_cancelled();
                continue;
            };
            sink.add_files(1);
            sink.add_suppressed(unit.suppressed);
            for failure in unit.failures {
                sink.record_failure(failure);
            }
            for finding in unit.findings {
                match self.apply_filter(finding, &project_facts) {
                    Ok(Some(finding)) => sink.accept(finding),
                    Ok(None) => sink.add_suppressed(1),
                    Err(failure) => sink.record_failure(failure),
                }
            }
        }
        if self.cancel.is_cancelled() {
            sink.mark_cancelled();
        }

        let report = sink.finish();
        info!(
            "Analysis complete: {} findings in {} files ({} suppressed)",
            report.findings.len(),
            report.files,
            report.suppressed
        );
        Ok(report)
    }

    /// Detectors that cannot run without a version database, reported once
    fn missing_database_check(&self, root: &Path, sink: &mut ReportingSink) -> Vec<bool> {
        let config = &self.config;
        let detectors = self.registration.detectors();
        if self.versions.is_some() {
            return vec![false; detectors.len()];
        }

        let excluded: Vec<bool> = detectors
            .iter()
            .map(|d| {
                d.needs_version_database() && d.issues().iter().any(|i| config.is_reportable(i))
            })
            .collect();
        if !excluded.contains(&true) {
            return excluded;
        }

        let names: Vec<&str> = detectors
            .iter()
            .zip(&excluded)
            .filter(|(_, &e)| e)
            .map(|(d, _)| d.name())
            .collect();
        warn!("API version database unavailable; skipping {}", names.join(", "));

        if self.registry.contains(&LINT_ERROR) && config.is_reportable(&LINT_ERROR) {
            let mut finding = Finding::new(&LINT_ERROR, Location::project(root), MISSING_DATABASE);
            finding.severity = config.severity_for(&LINT_ERROR);
            sink.accept(finding);
        }
        excluded
    }

    /// Run the originating detector's deferred filter on provisional findings
    fn apply_filter(
        &self,
        mut finding: Finding,
        facts: &ProjectFacts,
    ) -> std::result::Result<Option<Finding>, DetectorFailure> {
        let (Some(_), Some(index)) = (&finding.data, finding.detector) else {
            return Ok(Some(finding));
        };
        let detector = self.registration.detector(index);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| detector.filter(&mut finding, facts)));
        match outcome {
            Ok(true) => Ok(Some(finding)),
            Ok(false) => {
                debug!("Filtered {} at {}", finding.issue.id, finding.location);
                Ok(None)
            }
            Err(_) => {
                warn!("Detector {} panicked while filtering", detector.name());
                Err(DetectorFailure {
                    detector: detector.name(),
                    file: finding.location.file.clone(),
                    message: "panicked in deferred filter".to_string(),
                })
            }
        }
    }
}

impl LintDriver<'static> {
    /// Driver over the built-in issues and detectors
    ///
    /// Loads the configured API database; a database that cannot be read is
    /// logged and treated as missing.
    pub fn builtin(config: Config) -> Result<Self> {
        let registry = IssueRegistry::builtin()?;
        let versions: Option<Arc<dyn VersionDatabase>> = match &config.api_database {
            Some(path) => match StaticVersionDatabase::from_file(path) {
                Ok(db) => Some(Arc::new(db)),
                Err(e) => {
                    warn!("Could not load API database: {}", e);
                    None
                }
            },
            None => None,
        };

        let mut driver = Self::new(config, registry, builtin_detectors())?;
        driver.versions = versions;
        Ok(driver)
    }
}

impl std::fmt::Debug for LintDriver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LintDriver")
            .field("registration", &self.registration)
            .field("has_versions", &self.versions.is_some())
            .field("has_lookup", &self.lookup.is_some())
            .finish()
    }
}

/// Convert a cancelled report into an error for callers that need all-or-nothing
pub fn require_complete(report: Report) -> Result<Report> {
    if report.cancelled {
        Err(LintError::Cancelled)
    } else {
        Ok(report)
    }
}
