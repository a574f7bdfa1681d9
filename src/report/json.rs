//! JSON reporter - machine-readable output for CI and tooling

use crate::analysis::{DetectorFailure, Finding};
use crate::error::{LintError, Result};
use crate::issues::Severity;
use crate::report::Report;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Serialize)]
struct JsonReport<'a> {
    tool: &'static str,
    version: &'static str,
    files: usize,
    suppressed: usize,
    cancelled: bool,
    counts: &'a BTreeMap<Severity, usize>,
    findings: &'a [Finding],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    failures: &'a [DetectorFailure],
}

pub struct JsonReporter {
    output_path: Option<PathBuf>,
}

impl JsonReporter {
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self { output_path }
    }

    pub fn render(&self, report: &Report) -> Result<String> {
        let document = JsonReport {
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            files: report.files,
            suppressed: report.suppressed,
            cancelled: report.cancelled,
            counts: &report.counts,
            findings: &report.findings,
            failures: &report.failures,
        };
        serde_json::to_string_pretty(&document)
            .map_err(|e| LintError::Configuration(format!("cannot serialize report: {}", e)))
    }

    /// Write to the output file, or stdout when none is set
    pub fn report(&self, report: &Report) -> Result<()> {
        let json = self.render(report)?;
        match &self.output_path {
            Some(path) => std::fs::write(path, json).map_err(|e| LintError::io(path, e)),
            None => {
                println!("{}", json);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Fix, Finding};
    use crate::issues::{Category, Implementation, Issue, ScopeSet};
    use crate::model::Location;
    use crate::report::ReportingSink;

    static SAMPLE: Issue = Issue::create(
        "Sample",
        "sample",
        "test issue",
        Category::Correctness,
        5,
        Severity::Warning,
        Implementation::new("Test", ScopeSet::ALL),
    );

    fn report() -> Report {
        let mut sink = ReportingSink::new();
        let location = Location {
            file: PathBuf::from("src/A.java"),
            start: 4,
            end: 9,
            line: 2,
            column: 3,
        };
        sink.accept(
            Finding::new(&SAMPLE, location, "Must be one of: A, B")
                .with_fix(Fix::replace("Change to A", "A")),
        );
        sink.add_files(1);
        sink.finish()
    }

    #[test]
    fn test_json_document() {
        let json = JsonReporter::new(None).render(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["tool"], "lintscan");
        assert_eq!(value["files"], 1);
        assert_eq!(value["counts"]["warning"], 1);
        let finding = &value["findings"][0];
        assert_eq!(finding["id"], "Sample");
        assert_eq!(finding["severity"], "warning");
        assert_eq!(finding["message"], "Must be one of: A, B");
        assert_eq!(finding["location"]["line"], 2);
        assert_eq!(finding["fix"]["replacement"], "A");
        assert!(value.get("failures").is_none());
    }

    #[test]
    fn test_json_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        JsonReporter::new(Some(path.clone())).report(&report()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"Sample\""));
    }
}
