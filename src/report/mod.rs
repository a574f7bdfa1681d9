mod colors;
mod compact;
mod json;
mod sink;
mod summary;

pub use compact::CompactReporter;
pub use json::JsonReporter;
pub use sink::{Report, ReportingSink};
pub use summary::SummaryReporter;

use crate::error::{LintError, Result};
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// One line per finding, grouped by file
    #[default]
    Compact,
    /// Summary statistics only
    Summary,
    /// JSON machine-readable format
    Json,
}

/// Options for report generation
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Output file path; stdout when unset
    pub output_path: Option<PathBuf>,
    /// Base path to strip from file paths for shorter display
    pub base_path: Option<PathBuf>,
    /// Show fix suggestions in compact output
    pub show_fixes: bool,
    /// Number of top issues to show in summary
    pub top_n: usize,
}

impl ReportOptions {
    pub fn new() -> Self {
        Self {
            output_path: None,
            base_path: None,
            show_fixes: true,
            top_n: 10,
        }
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Reporter for writing a finished [`Report`]
pub struct Reporter {
    format: ReportFormat,
    options: ReportOptions,
}

impl Reporter {
    pub fn new(format: ReportFormat, output_path: Option<PathBuf>) -> Self {
        Self {
            format,
            options: ReportOptions {
                output_path,
                ..Default::default()
            },
        }
    }

    pub fn with_options(format: ReportFormat, options: ReportOptions) -> Self {
        Self { format, options }
    }

    pub fn report(&self, report: &Report) -> Result<()> {
        match self.format {
            ReportFormat::Json => JsonReporter::new(self.options.output_path.clone()).report(report),
            ReportFormat::Compact | ReportFormat::Summary => {
                if self.options.output_path.is_some() {
                    // No escape codes in files
                    colored::control::set_override(false);
                }
                let text = self.render_text(report);
                self.write(&text)
            }
        }
    }

    fn render_text(&self, report: &Report) -> String {
        match self.format {
            ReportFormat::Summary => SummaryReporter::new()
                .with_top_n(self.options.top_n)
                .render(report),
            _ => {
                let mut reporter = CompactReporter::new().with_fixes(self.options.show_fixes);
                if let Some(base) = &self.options.base_path {
                    reporter = reporter.with_base_path(base.clone());
                }
                reporter.render(report)
            }
        }
    }

    fn write(&self, text: &str) -> Result<()> {
        match &self.options.output_path {
            Some(path) => std::fs::write(path, text).map_err(|e| LintError::io(path, e)),
            None => {
                print!("{}", text);
                Ok(())
            }
        }
    }
}
