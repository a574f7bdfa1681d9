//! Integration tests for the built-in detectors
//!
//! These run the complete built-in rule set over the fixture project and
//! over small generated projects, the same way the command line does.

use lintscan::analysis::{Finding, LintDriver, MISSING_DATABASE};
use lintscan::config::Config;
use lintscan::error::{LintError, Result};
use lintscan::versions::VersionLookup;
use lintscan::Report;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Get the path to the test fixtures directory
fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn config_with_database() -> Config {
    Config {
        api_database: Some(fixtures_path().join("api-versions.json")),
        ..Config::default()
    }
}

fn analyze_fixture(config: Config) -> Report {
    let driver = LintDriver::builtin(config).expect("Failed to build driver");
    driver
        .analyze_path(&fixtures_path().join("project"))
        .expect("Failed to analyze fixture project")
}

fn findings<'r>(report: &'r Report, id: &str) -> Vec<&'r Finding> {
    report.findings.iter().filter(|f| f.issue.id == id).collect()
}

fn messages(report: &Report, id: &str) -> Vec<String> {
    findings(report, id).into_iter().map(|f| f.message.clone()).collect()
}

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (path, content) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
    dir
}

// ============================================================================
// Fixture project
// ============================================================================

mod fixture_project_tests {
    use super::*;

    #[test]
    fn test_fixture_project_parses_every_file() {
        let report = analyze_fixture(config_with_database());
        // Widget.java, main.xml, AndroidManifest.xml, libs.versions.toml
        assert_eq!(report.files, 4);
        assert!(report.failures.is_empty(), "failures: {:?}", report.failures);
        assert!(!report.cancelled);
    }

    #[test]
    fn test_range_and_typedef_findings() {
        let report = analyze_fixture(config_with_database());

        assert_eq!(messages(&report, "Range"), vec!["Value must be ≤ 100 (was 101)"]);
        assert_eq!(
            messages(&report, "UniqueConstants"),
            vec!["Constants `MODE_C` and `MODE_B` specify the same exact value (1); this is usually a cut & paste or merge error"]
        );

        let wrong = messages(&report, "WrongConstant");
        assert_eq!(wrong.len(), 1);
        assert!(wrong[0].starts_with("Must be one of: Widget.MODE_A, Widget.MODE_B"));

        let switch = messages(&report, "SwitchIntDef");
        assert_eq!(switch.len(), 1);
        assert!(switch[0].contains("`Widget.MODE_B`"));
    }

    #[test]
    fn test_suppressed_range_is_counted() {
        let report = analyze_fixture(config_with_database());
        // setLevel(-5) inside @SuppressLint("Range"), marginLeft under tools:ignore
        assert!(report.suppressed >= 2);
        assert!(!messages(&report, "Range").iter().any(|m| m.contains("-5")));
    }

    #[test]
    fn test_new_api_uses_manifest_min_sdk() {
        let report = analyze_fixture(config_with_database());
        assert_eq!(
            messages(&report, "NewApi"),
            vec!["Call requires API level 21 (current min is 14): `android.view.View#setElevation`"]
        );
    }

    #[test]
    fn test_configured_min_sdk_overrides_manifest() {
        let config = Config {
            min_sdk: Some(21),
            ..config_with_database()
        };
        let report = analyze_fixture(config);
        assert!(messages(&report, "NewApi").is_empty());

        // Left attributes are now replaceable rather than additive
        assert!(messages(&report, "RtlHardcoded")
            .iter()
            .any(|m| m.starts_with("Consider replacing `android:paddingLeft`")));
    }

    #[test]
    fn test_recycle_rtl_and_gradle_findings() {
        let report = analyze_fixture(config_with_database());

        assert_eq!(
            messages(&report, "Recycle"),
            vec!["This `TypedArray` should be recycled after use with `#recycle()`"]
        );
        assert_eq!(
            messages(&report, "RtlHardcoded"),
            vec![
                "Consider adding `android:paddingStart=\"8dp\"` to better support right-to-left layouts",
                "Use \"`start`\" instead of \"`left`\" to ensure correct behavior in right-to-left locales",
            ]
        );
        assert_eq!(
            messages(&report, "GradleDynamicVersion"),
            vec!["Avoid using + in version numbers; can lead to unpredictable and unrepeatable builds (androidx.appcompat:appcompat:1.+)"]
        );
        assert!(messages(&report, "NewerVersionAvailable").is_empty());
    }

    #[test]
    fn test_findings_are_sorted_and_unique() {
        let report = analyze_fixture(config_with_database());
        let keys: Vec<_> = report
            .findings
            .iter()
            .map(|f| (f.location.file.clone(), f.location.start, f.issue.id))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);

        let mut unique = keys.clone();
        unique.dedup();
        assert_eq!(unique.len(), keys.len());
        assert!(report.has_errors());
    }

    #[test]
    fn test_without_database() {
        let report = analyze_fixture(Config::default());
        assert!(messages(&report, "NewApi").is_empty());
        assert_eq!(messages(&report, "LintError"), vec![MISSING_DATABASE]);
        // Detectors that do not need the database still run
        assert_eq!(messages(&report, "Range").len(), 1);
    }
}

// ============================================================================
// Typedef and range interplay
// ============================================================================

mod typedef_range_tests {
    use super::*;

    #[test]
    fn test_int_def_with_int_range_reports_once() {
        let dir = project(&[(
            "src/test/pkg/Widget.java",
            r#"package test.pkg;
import androidx.annotation.IntDef;
import androidx.annotation.IntRange;

public class Widget {
    public static final int MODE_A = 0;
    public static final int MODE_B = 1;

    @IntDef({MODE_A, MODE_B})
    public @interface Mode {}

    public void setMode(@Mode @IntRange(from = 10) int mode) {}

    public void test() {
        setMode(3);
        setMode(MODE_B);
        setMode(12);
    }
}
"#,
        )]);
        let report = LintDriver::builtin(config_with_database())
            .unwrap()
            .analyze_path(dir.path())
            .unwrap();

        assert_eq!(
            messages(&report, "WrongConstant"),
            vec!["Must be one of: Widget.MODE_A, Widget.MODE_B or value must be ≥ 10 (was 3)"]
        );
        assert!(messages(&report, "Range").is_empty());
    }

    #[test]
    fn test_int_shift_constants_fold_at_int_width() {
        let dir = project(&[(
            "src/test/pkg/Bits.java",
            r#"package test.pkg;
import androidx.annotation.IntRange;

public class Bits {
    static final int SHIFTED = 1 << 31;
    static final long WIDE = 1L << 40;

    void small(@IntRange(from = 0, to = 100) int value) {}
    void positive(@IntRange(from = 0) int value) {}
    void positiveLong(@IntRange(from = 0) long value) {}

    void test() {
        small(1 << 32);
        small(-1 >>> 28);
        positive(SHIFTED);
        positive(2147483647 + 1);
        positiveLong(WIDE);
    }
}
"#,
        )]);
        let report = LintDriver::builtin(config_with_database())
            .unwrap()
            .analyze_path(dir.path())
            .unwrap();

        assert_eq!(
            messages(&report, "Range"),
            vec![
                "Value must be ≥ 0 (was -2147483648)",
                "Value must be ≥ 0 (was -2147483648)",
            ]
        );
    }

    #[test]
    fn test_meta_annotated_typedef_across_files() {
        let dir = project(&[
            (
                "src/test/pkg/Gravity.java",
                r#"package test.pkg;
import androidx.annotation.IntDef;

public class Gravity {
    public static final int TOP = 48;
    public static final int BOTTOM = 80;

    @IntDef({TOP, BOTTOM})
    public @interface Vertical {}
}
"#,
            ),
            (
                "src/test/pkg/Panel.java",
                r#"package test.pkg;

public class Panel {
    public void setGravity(@Gravity.Vertical int gravity) {}

    public void test() {
        setGravity(Gravity.TOP);
        setGravity(17);
    }
}
"#,
            ),
        ]);
        let report = LintDriver::builtin(config_with_database())
            .unwrap()
            .analyze_path(dir.path())
            .unwrap();

        assert_eq!(
            messages(&report, "WrongConstant"),
            vec!["Must be one of: Gravity.TOP, Gravity.BOTTOM"]
        );
    }
}

// ============================================================================
// Remote versions
// ============================================================================

mod remote_version_tests {
    use super::*;

    struct PinnedLookup;

    impl VersionLookup for PinnedLookup {
        fn latest_version(&self, group: &str, artifact: &str, _allow_preview: bool) -> Result<Option<String>> {
            match (group, artifact) {
                ("com.squareup.okhttp3", "okhttp") => Ok(Some("5.0.0".to_string())),
                _ => Err(LintError::Remote("not found".to_string())),
            }
        }
    }

    #[test]
    fn test_newer_version_with_lookup() {
        let mut config = config_with_database();
        config.enabled.insert("NewerVersionAvailable".to_string(), true);
        let driver = LintDriver::builtin(config)
            .unwrap()
            .with_lookup(Arc::new(PinnedLookup));
        let report = driver.analyze_path(&fixtures_path().join("project")).unwrap();

        assert_eq!(
            messages(&report, "NewerVersionAvailable"),
            vec!["A newer version of com.squareup.okhttp3:okhttp than 4.12.0 is available: 5.0.0"]
        );
        // Lookup failures never fail the run
        assert!(report.failures.is_empty());
    }
}
