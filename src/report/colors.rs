//! Shared styling for terminal reports
//!
//! Severities and categories always render in the same color so compact and
//! summary output read alike.

use crate::issues::{Category, Severity};
use colored::{ColoredString, Colorize};

pub const BAR_FILLED: char = '█';
pub const BAR_EMPTY: char = '░';

/// File path header
pub fn file_path(text: &str) -> ColoredString {
    text.cyan().bold()
}

/// Line/column numbers
pub fn location(text: &str) -> ColoredString {
    text.dimmed()
}

pub fn issue_id(text: &str) -> ColoredString {
    text.magenta()
}

pub fn count(value: usize) -> ColoredString {
    value.to_string().white().bold()
}

/// Glyph shown in front of a finding
pub fn severity_symbol(severity: Severity) -> ColoredString {
    match severity {
        Severity::Fatal => "✖".red().bold().underline(),
        Severity::Error => "✖".red().bold(),
        Severity::Warning => "⚠".yellow(),
        Severity::Info | Severity::Ignore => "ℹ".blue(),
    }
}

pub fn severity_label(severity: Severity) -> ColoredString {
    paint_severity(severity.as_str(), severity)
}

fn paint_severity(text: &str, severity: Severity) -> ColoredString {
    match severity {
        Severity::Fatal | Severity::Error => text.red().bold(),
        Severity::Warning => text.yellow(),
        Severity::Info | Severity::Ignore => text.blue(),
    }
}

/// Category name, bold in the category's color
pub fn category(category: Category) -> ColoredString {
    paint_category(category.name(), category).bold()
}

fn paint_category(text: &str, category: Category) -> ColoredString {
    match category {
        Category::Correctness => text.red(),
        Category::Performance => text.yellow(),
        Category::Security => text.magenta(),
        Category::Internationalization | Category::Bidirectional => text.green(),
        Category::Lint => text.white(),
    }
}

/// Share of `part` in `total` as a fixed-width bar in the category's color
pub fn category_bar(category: Category, part: usize, total: usize, width: usize) -> ColoredString {
    paint_category(&bar(part, total, width), category)
}

pub fn bar(part: usize, total: usize, width: usize) -> String {
    let filled = if total == 0 {
        0
    } else {
        ((part as f64 / total as f64) * width as f64).round() as usize
    }
    .min(width);
    let mut out = String::with_capacity(width * 3);
    out.extend(std::iter::repeat(BAR_FILLED).take(filled));
    out.extend(std::iter::repeat(BAR_EMPTY).take(width - filled));
    out
}

/// Separator line
pub fn rule(width: usize, heavy: bool) -> String {
    if heavy { "━" } else { "─" }.repeat(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar() {
        assert_eq!(bar(5, 10, 10), "█████░░░░░");
        assert_eq!(bar(3, 3, 4), "████");
        assert_eq!(bar(0, 7, 4), "░░░░");
        assert_eq!(bar(1, 0, 3), "░░░");
    }

    #[test]
    fn test_severity_styles() {
        colored::control::set_override(false);
        assert_eq!(severity_symbol(Severity::Error).to_string(), "✖");
        assert_eq!(severity_symbol(Severity::Warning).to_string(), "⚠");
        assert_eq!(severity_label(Severity::Fatal).to_string(), "fatal");
        assert_eq!(category(Category::Bidirectional).to_string(), "Bidirectional Text");
    }

    #[test]
    fn test_rule() {
        assert_eq!(rule(3, true), "━━━");
        assert_eq!(rule(2, false), "──");
    }
}
