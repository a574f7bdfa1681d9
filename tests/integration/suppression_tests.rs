//! Integration tests for suppression directives and severity configuration
//!
//! Every test runs real detectors over in-memory trees so the directives are
//! resolved exactly as they are during a project run.

use lintscan::analysis::detectors::{DependencyVersionDetector, RangeDetector, RtlDetector, TypedefDetector};
use lintscan::analysis::{Detector, LintDriver};
use lintscan::config::Config;
use lintscan::discovery::FileType;
use lintscan::issues::{IssueRegistry, Severity};
use lintscan::model::Tree;
use lintscan::parser::parse_source;
use lintscan::Report;
use std::path::Path;

fn tree(path: &str, file_type: FileType, source: &str) -> Tree {
    parse_source(Path::new(path), file_type, source).expect("Failed to parse fixture")
}

fn java(path: &str, source: &str) -> Tree {
    tree(path, FileType::Java, source)
}

fn sequential() -> Config {
    Config {
        parallel: false,
        ..Config::default()
    }
}

fn run(config: Config, detectors: Vec<Box<dyn Detector>>, trees: Vec<Tree>) -> Report {
    let registry = IssueRegistry::builtin().unwrap();
    LintDriver::new(config, registry, detectors)
        .unwrap()
        .analyze_trees(trees)
        .unwrap()
}

fn ids(report: &Report) -> Vec<&'static str> {
    report.findings.iter().map(|f| f.issue.id).collect()
}

/// Range and typedef violations side by side in `body`
fn settings(body: &str) -> Tree {
    java(
        "src/test/pkg/Settings.java",
        &format!(
            r#"package test.pkg;
import android.annotation.SuppressLint;
import androidx.annotation.IntDef;
import androidx.annotation.IntRange;

public class Settings {{
    public static final int LOW = 0;
    public static final int HIGH = 1;

    @IntDef({{LOW, HIGH}})
    public @interface Level {{}}

    void setPercent(@IntRange(from = 0, to = 100) int percent) {{}}
    void setLevel(@Level int level) {{}}

{}
}}
"#,
            body
        ),
    )
}

fn range_and_typedef() -> Vec<Box<dyn Detector>> {
    vec![Box::new(RangeDetector::new()), Box::new(TypedefDetector::new())]
}

// ============================================================================
// Nearest scope wins
// ============================================================================

mod scope_tests {
    use super::*;

    #[test]
    fn test_method_annotation_suppresses_only_named_issue() {
        let source = settings(
            r#"    @SuppressLint("Range")
    void apply() {
        setPercent(150);
        setLevel(7);
    }"#,
        );
        let report = run(sequential(), range_and_typedef(), vec![source]);

        assert_eq!(ids(&report), vec!["WrongConstant"]);
        assert_eq!(report.suppressed, 1);
    }

    #[test]
    fn test_class_annotation_covers_members() {
        let source = java(
            "src/test/pkg/Quiet.java",
            r#"package test.pkg;
import androidx.annotation.IntRange;

@SuppressWarnings({"Range", "unchecked"})
public class Quiet {
    void setPercent(@IntRange(from = 0, to = 100) int percent) {}

    void apply() {
        setPercent(150);
    }
}
"#,
        );
        let report = run(sequential(), range_and_typedef(), vec![source]);
        assert!(report.findings.is_empty());
        assert_eq!(report.suppressed, 1);
    }

    #[test]
    fn test_unrelated_suppression_keeps_finding() {
        let source = settings(
            r#"    @SuppressLint("NewApi")
    void apply() {
        setPercent(150);
    }"#,
        );
        let report = run(sequential(), range_and_typedef(), vec![source]);
        assert_eq!(ids(&report), vec!["Range"]);
        assert_eq!(report.suppressed, 0);
    }

    #[test]
    fn test_all_and_category_tokens() {
        let all = settings(
            r#"    @SuppressLint("all")
    void apply() {
        setPercent(150);
        setLevel(7);
    }"#,
        );
        assert!(run(sequential(), range_and_typedef(), vec![all]).findings.is_empty());

        let category = settings(
            r#"    @SuppressLint("Correctness")
    void apply() {
        setPercent(150);
    }"#,
        );
        assert!(run(sequential(), range_and_typedef(), vec![category]).findings.is_empty());
    }
}

// ============================================================================
// Comment directives
// ============================================================================

mod comment_tests {
    use super::*;

    const COMMENTED: &str = r#"    void apply() {
        //noinspection Range
        setPercent(150);

        setPercent(200);
        // noinspection AndroidLintRange,WrongConstant
        setPercent(-1);
    }"#;

    #[test]
    fn test_noinspection_comments() {
        let report = run(sequential(), range_and_typedef(), vec![settings(COMMENTED)]);
        let messages: Vec<&str> = report.findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["Value must be ≤ 100 (was 200)"]);
        assert_eq!(report.suppressed, 2);
    }

    #[test]
    fn test_comment_suppression_can_be_disabled() {
        let config = Config {
            comment_suppression: false,
            ..sequential()
        };
        let report = run(config, range_and_typedef(), vec![settings(COMMENTED)]);
        assert_eq!(report.findings.len(), 3);
    }

    #[test]
    fn test_catalog_hash_comment() {
        let catalog = tree(
            "gradle/libs.versions.toml",
            FileType::VersionCatalog,
            r#"[libraries]
#noinspection GradleDynamicVersion
appcompat = "androidx.appcompat:appcompat:1.+"
core = "androidx.core:core:1.+"
"#,
        );
        let report = run(sequential(), vec![Box::new(DependencyVersionDetector::new())], vec![catalog]);
        assert_eq!(report.findings.len(), 1);
        assert!(report.findings[0].message.contains("androidx.core:core:1.+"));
    }
}

// ============================================================================
// XML directives
// ============================================================================

mod xml_tests {
    use super::*;

    #[test]
    fn test_tools_ignore_on_element_and_ancestor() {
        let layout = tree(
            "res/layout/main.xml",
            FileType::Xml,
            r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android"
    xmlns:tools="http://schemas.android.com/tools">
    <TextView android:paddingLeft="8dp" tools:ignore="RtlHardcoded" />
    <FrameLayout tools:ignore="Bidirectional Text,Range">
        <TextView android:gravity="right" />
    </FrameLayout>
    <TextView android:gravity="left" />
</LinearLayout>
"#,
        );
        let manifest = tree(
            "AndroidManifest.xml",
            FileType::Manifest,
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="test.pkg">
    <application android:supportsRtl="true" />
</manifest>
"#,
        );
        let report = run(sequential(), vec![Box::new(RtlDetector::new())], vec![layout, manifest]);

        assert_eq!(report.findings.len(), 1);
        assert_eq!(
            report.findings[0].message,
            "Use \"`start`\" instead of \"`left`\" to ensure correct behavior in right-to-left locales"
        );
        assert_eq!(report.suppressed, 2);
    }
}

// ============================================================================
// Severity configuration
// ============================================================================

mod severity_tests {
    use super::*;

    fn violations() -> Tree {
        settings(
            r#"    void apply() {
        setPercent(150);
        setLevel(7);
    }"#,
        )
    }

    #[test]
    fn test_ignore_disables_issue() {
        let mut config = sequential();
        config.severity.insert("Range".to_string(), Severity::Ignore);
        let report = run(config, range_and_typedef(), vec![violations()]);
        assert_eq!(ids(&report), vec!["WrongConstant"]);
    }

    #[test]
    fn test_enabled_switch_off() {
        let mut config = sequential();
        config.enabled.insert("WrongConstant".to_string(), false);
        let report = run(config, range_and_typedef(), vec![violations()]);
        assert_eq!(ids(&report), vec!["Range"]);
    }

    #[test]
    fn test_severity_override_is_applied() {
        let mut config = sequential();
        config.severity.insert("Range".to_string(), Severity::Warning);
        let report = run(config, range_and_typedef(), vec![violations()]);

        let range = report.findings.iter().find(|f| f.issue.id == "Range").unwrap();
        assert_eq!(range.severity, Severity::Warning);
        assert_eq!(report.count(Severity::Warning), 1);
        assert_eq!(report.count(Severity::Error), 1);
    }

    #[test]
    fn test_fatal_only_mode() {
        let mut config = sequential();
        config.fatal_only = true;
        config.severity.insert("WrongConstant".to_string(), Severity::Fatal);
        let report = run(config, range_and_typedef(), vec![violations()]);

        assert_eq!(ids(&report), vec!["WrongConstant"]);
        assert_eq!(report.findings[0].severity, Severity::Fatal);
        assert!(report.has_errors());
    }
}
