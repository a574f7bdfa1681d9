//! lintscan - a fast, parallel lint engine for Android projects
//!
//! Detectors register the issues they can report and the node kinds they
//! care about; the engine walks every file once and calls only the
//! interested detectors.
//!
//! # Architecture
//!
//! The analysis pipeline consists of:
//! 1. **File Discovery** - Find Java sources, XML resources, manifests and version catalogs
//! 2. **Parsing** - Lower each file into a uniform [`model::Tree`] (tree-sitter, quick-xml, toml)
//! 3. **Indexing** - Build the project-wide symbol table used by the [`evaluator`]
//! 4. **Dispatch** - One traversal per file on the rayon pool, invoking interested detectors
//! 5. **Filtering** - Suppression directives, severity overrides and deferred project-fact filters
//! 6. **Reporting** - Merge, deduplicate and print findings in various formats

pub mod analysis;
pub mod config;
pub mod discovery;
pub mod error;
pub mod evaluator;
pub mod issues;
pub mod model;
pub mod parser;
pub mod report;
pub mod suppress;
pub mod versions;

pub use analysis::detectors::{builtin_detectors, builtin_issues};
pub use analysis::{CancellationToken, Detector, Finding, LintDriver};
pub use config::Config;
pub use discovery::FileFinder;
pub use error::{LintError, Result};
pub use issues::{Category, Issue, IssueRegistry, Severity};
pub use report::{Report, ReportFormat, Reporter};
