//! Compact terminal reporter - minimal output format
//!
//! One line per finding, grouped by file, optimized for scanning large
//! result sets

use crate::analysis::Finding;
use crate::issues::Severity;
use crate::report::colors;
use crate::report::Report;
use colored::Colorize;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Compact reporter for minimal, scannable output
pub struct CompactReporter {
    /// Base path to strip from file paths for shorter display
    base_path: Option<PathBuf>,
    /// Show fix suggestions under each finding
    show_fixes: bool,
    /// Maximum width for file paths (truncate if longer)
    max_path_width: usize,
}

impl CompactReporter {
    pub fn new() -> Self {
        Self {
            base_path: None,
            show_fixes: true,
            max_path_width: 60,
        }
    }

    pub fn with_base_path(mut self, path: PathBuf) -> Self {
        self.base_path = Some(path);
        self
    }

    pub fn with_fixes(mut self, show: bool) -> Self {
        self.show_fixes = show;
        self
    }

    /// Format a path relative to base path if set
    fn format_path(&self, path: &Path) -> String {
        let display = match &self.base_path {
            Some(base) => path.strip_prefix(base).unwrap_or(path).display().to_string(),
            None => path.display().to_string(),
        };

        // Truncate on a char boundary if too long
        let chars = display.chars().count();
        if chars > self.max_path_width {
            let tail: String = display.chars().skip(chars - self.max_path_width + 3).collect();
            format!("...{}", tail)
        } else {
            display
        }
    }

    pub fn render(&self, report: &Report) -> String {
        let mut out = String::new();
        if report.findings.is_empty() {
            let _ = writeln!(out, "{}", "No issues found!".green().bold());
        }

        // Findings arrive sorted by file and offset
        let mut current: Option<&Path> = None;
        for finding in &report.findings {
            let file = finding.location.file.as_path();
            if current != Some(file) {
                if current.is_some() {
                    out.push('\n');
                }
                let _ = writeln!(out, "{}", colors::file_path(&self.format_path(file)));
                current = Some(file);
            }
            self.render_finding(&mut out, finding);
        }
        if current.is_some() {
            out.push('\n');
        }

        for failure in &report.failures {
            let _ = writeln!(
                out,
                "{} {} failed on {}: {}",
                "warning:".yellow().bold(),
                failure.detector,
                failure.file.display(),
                failure.message
            );
        }
        if report.cancelled {
            let _ = writeln!(out, "{}", "Analysis was cancelled; results are incomplete".yellow());
        }

        self.render_summary(&mut out, report);
        out
    }

    pub fn report(&self, report: &Report) {
        print!("{}", self.render(report));
    }

    fn render_finding(&self, out: &mut String, finding: &Finding) {
        let location = format!("{:>5}:{:<3}", finding.location.line, finding.location.column);
        let _ = writeln!(
            out,
            "  {}  {}  {}  {}",
            colors::location(&location),
            colors::severity_symbol(finding.severity),
            colors::issue_id(finding.issue.id),
            finding.message
        );

        for secondary in &finding.secondary {
            let _ = writeln!(
                out,
                "           {} {}",
                "also:".dimmed(),
                colors::location(&format!(
                    "{}:{}",
                    self.format_path(&secondary.file),
                    secondary.line
                ))
            );
        }
        if self.show_fixes {
            if let Some(fix) = &finding.fix {
                let _ = writeln!(out, "           {} {}", "fix:".green(), fix.description);
            }
        }
    }

    fn render_summary(&self, out: &mut String, report: &Report) {
        let errors = report.count(Severity::Error) + report.count(Severity::Fatal);
        let warnings = report.count(Severity::Warning);
        let infos = report.count(Severity::Info);

        let _ = writeln!(out, "{}", colors::rule(50, true).dimmed());

        let mut parts = Vec::new();
        if errors > 0 {
            parts.push(format!("{} {}", errors, "errors".red()));
        }
        if warnings > 0 {
            parts.push(format!("{} {}", warnings, "warnings".yellow()));
        }
        if infos > 0 {
            parts.push(format!("{} {}", infos, "info".blue()));
        }

        let _ = write!(
            out,
            "  {} {}",
            colors::count(report.findings.len()),
            "issues".bold()
        );
        if !parts.is_empty() {
            let _ = write!(out, " ({})", parts.join(", "));
        }
        let _ = writeln!(
            out,
            " in {} files, {} suppressed",
            report.files, report.suppressed
        );
    }
}

impl Default for CompactReporter {
    fn default() -> Self {
        Self::new()
    }
}
