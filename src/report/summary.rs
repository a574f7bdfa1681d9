//! Summary reporter - statistics and overview only
//!
//! High-level view of a run with ASCII charts

use crate::issues::{Category, Issue, Severity};
use crate::report::colors;
use crate::report::Report;
use colored::Colorize;
use std::collections::HashMap;
use std::fmt::Write;

/// Summary-only reporter with statistics and charts
pub struct SummaryReporter {
    /// Width of bar charts
    bar_width: usize,
    /// Number of top issues to show
    top_n: usize,
}

impl SummaryReporter {
    pub fn new() -> Self {
        Self {
            bar_width: 20,
            top_n: 10,
        }
    }

    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }

    pub fn render(&self, report: &Report) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", "Lint Summary".cyan().bold());
        let _ = writeln!(out, "{}", colors::rule(50, true));

        self.render_basic_stats(&mut out, report);
        if report.findings.is_empty() {
            let _ = writeln!(out, "\n{}", "No issues found!".green().bold());
            return out;
        }
        out.push('\n');
        self.render_severity_breakdown(&mut out, report);
        out.push('\n');
        self.render_category_breakdown(&mut out, report);
        out.push('\n');
        self.render_top_issues(&mut out, report);
        let _ = writeln!(out, "{}", colors::rule(50, false).dimmed());
        out
    }

    pub fn report(&self, report: &Report) {
        print!("{}", self.render(report));
    }

    fn render_basic_stats(&self, out: &mut String, report: &Report) {
        let rows = [
            ("Files analyzed:", report.files),
            ("Issues found:", report.findings.len()),
            ("Suppressed:", report.suppressed),
            ("Detector failures:", report.failures.len()),
        ];
        for (label, value) in rows {
            let _ = writeln!(
                out,
                "{:>20}  {}",
                label.dimmed(),
                Self::format_number(value).white().bold()
            );
        }
        if report.cancelled {
            let _ = writeln!(out, "{}", "Analysis was cancelled; results are incomplete".yellow());
        }
    }

    /// Format a number with thousands separators
    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        for (i, c) in s.chars().rev().enumerate() {
            if i > 0 && i % 3 == 0 {
                result.push(',');
            }
            result.push(c);
        }
        result.chars().rev().collect()
    }

    fn render_severity_breakdown(&self, out: &mut String, report: &Report) {
        let _ = writeln!(out, "{}", "By Severity:".white().bold());
        let total = report.findings.len() as f64;

        for severity in Severity::all().into_iter().rev() {
            let count = report.count(severity);
            if count == 0 {
                continue;
            }
            let pct = (count as f64 / total) * 100.0;
            let _ = writeln!(
                out,
                "  {} {:<8} {:>6} ({:>5.1}%)",
                colors::severity_symbol(severity),
                colors::severity_label(severity),
                count,
                pct
            );
        }
    }

    fn render_category_breakdown(&self, out: &mut String, report: &Report) {
        let _ = writeln!(out, "{}", "By Category:".white().bold());
        let total = report.findings.len() as f64;

        let mut by_category: HashMap<Category, usize> = HashMap::new();
        for finding in &report.findings {
            *by_category.entry(finding.issue.category).or_insert(0) += 1;
        }
        let mut categories: Vec<_> = by_category.into_iter().collect();
        categories.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.name().cmp(b.0.name())));

        let width = categories
            .iter()
            .map(|(category, _)| category.name().len())
            .max()
            .unwrap_or(10);

        for (category, count) in categories {
            let pct = (count as f64 / total) * 100.0;
            let bar = colors::category_bar(category, count, report.findings.len(), self.bar_width);
            let _ = writeln!(
                out,
                "  {:width$} │{}│ {:>4} ({:>5.1}%)",
                colors::category(category),
                bar,
                count,
                pct,
                width = width
            );
        }
    }

    fn render_top_issues(&self, out: &mut String, report: &Report) {
        let _ = writeln!(out, "{}", "Top Issues:".white().bold());

        let mut by_issue: HashMap<&'static str, (&'static Issue, usize)> = HashMap::new();
        for finding in &report.findings {
            by_issue.entry(finding.issue.id).or_insert((finding.issue, 0)).1 += 1;
        }
        let mut issues: Vec<_> = by_issue.into_values().collect();
        issues.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.id.cmp(b.0.id)));

        for (i, (issue, count)) in issues.iter().take(self.top_n).enumerate() {
            let _ = writeln!(
                out,
                "  {:>2}. {}  {:>5}  {}",
                i + 1,
                colors::issue_id(issue.id),
                count.to_string().white().bold(),
                issue.brief.dimmed()
            );
        }

        let remaining = issues.len().saturating_sub(self.top_n);
        if remaining > 0 {
            let _ = writeln!(out, "      ... and {} more issue types", remaining.to_string().dimmed());
        }
    }
}

impl Default for SummaryReporter {
    fn default() -> Self {
        Self::new()
    }
}
