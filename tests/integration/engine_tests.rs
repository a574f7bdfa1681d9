//! Integration tests for the dispatch engine and driver
//!
//! These run whole projects from disk through `LintDriver`, with small
//! purpose-built detectors where the built-in ones would get in the way.

use lintscan::analysis::{
    require_complete, Detector, DetectorContext, Interest, LintDriver, Trigger, MISSING_DATABASE,
};
use lintscan::config::Config;
use lintscan::issues::{Category, Implementation, Issue, IssueRegistry, ScopeSet, Severity, LINT_ERROR};
use lintscan::model::{NodeId, NodeKind};
use lintscan::{CancellationToken, LintError};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

static SAMPLE: Issue = Issue::create(
    "Sample",
    "Sample issue",
    "Reported by test detectors.",
    Category::Correctness,
    5,
    Severity::Warning,
    Implementation::new("SampleDetector", ScopeSet::JAVA_FILE),
);

/// Write `files` below a fresh temporary project root
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

fn registry() -> IssueRegistry {
    IssueRegistry::new([&LINT_ERROR, &SAMPLE]).unwrap()
}

const CALLS: &str = r#"package test.pkg;

public class Calls {
    void a() {}
    void b() {
        a();
        a();
        String s = String.valueOf(1);
    }
}
"#;

const MORE_CALLS: &str = r#"package test.pkg;

public class MoreCalls {
    void c() {
        System.out.println("one");
        new Calls().b();
    }
}
"#;

// ============================================================================
// Detectors used by the tests
// ============================================================================

/// Counts enter and exit callbacks for calls
#[derive(Default)]
struct CallCounter {
    entered: Arc<AtomicUsize>,
    exited: Arc<AtomicUsize>,
}

impl Detector for CallCounter {
    fn name(&self) -> &'static str {
        "CallCounter"
    }

    fn issues(&self) -> Vec<&'static Issue> {
        vec![&SAMPLE]
    }

    fn interests(&self) -> Vec<Interest> {
        vec![
            Interest::source(Trigger::Enter(NodeKind::Call)),
            Interest::source(Trigger::Exit(NodeKind::Call)),
        ]
    }

    fn on_enter(&self, _ctx: &mut DetectorContext<'_>, _node: NodeId) -> anyhow::Result<()> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_exit(&self, _ctx: &mut DetectorContext<'_>, _node: NodeId) -> anyhow::Result<()> {
        self.exited.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Reports every class with a fixed message
struct ClassReporter(&'static str);

impl Detector for ClassReporter {
    fn name(&self) -> &'static str {
        self.0
    }

    fn issues(&self) -> Vec<&'static Issue> {
        vec![&SAMPLE]
    }

    fn interests(&self) -> Vec<Interest> {
        vec![Interest::source(Trigger::Enter(NodeKind::Class))]
    }

    fn on_enter(&self, ctx: &mut DetectorContext<'_>, node: NodeId) -> anyhow::Result<()> {
        ctx.report(&SAMPLE, node, "Class seen");
        Ok(())
    }
}

/// Fails on the first class it sees
struct Broken {
    panics: bool,
}

impl Detector for Broken {
    fn name(&self) -> &'static str {
        if self.panics {
            "PanickingDetector"
        } else {
            "FailingDetector"
        }
    }

    fn issues(&self) -> Vec<&'static Issue> {
        vec![&SAMPLE]
    }

    fn interests(&self) -> Vec<Interest> {
        vec![Interest::source(Trigger::Enter(NodeKind::Class))]
    }

    fn on_enter(&self, _ctx: &mut DetectorContext<'_>, _node: NodeId) -> anyhow::Result<()> {
        if self.panics {
            panic!("unexpected node shape");
        }
        anyhow::bail!("cannot handle this class")
    }
}

fn analyze(config: Config, detectors: Vec<Box<dyn Detector>>, root: &Path) -> lintscan::Report {
    let registry = registry();
    let driver = LintDriver::new(config, &registry, detectors).unwrap();
    driver.analyze_path(root).unwrap()
}

// ============================================================================
// Dispatch
// ============================================================================

mod dispatch_tests {
    use super::*;

    #[test]
    fn test_every_call_dispatched_once_in_parallel() {
        let dir = project(&[
            ("src/test/pkg/Calls.java", CALLS),
            ("src/test/pkg/MoreCalls.java", MORE_CALLS),
        ]);
        let counter = CallCounter::default();
        let entered = Arc::clone(&counter.entered);
        let exited = Arc::clone(&counter.exited);

        let report = analyze(Config::default(), vec![Box::new(counter)], dir.path());

        // a(), a(), String.valueOf(1), System.out.println("one"), .b()
        assert_eq!(entered.load(Ordering::SeqCst), 5);
        assert_eq!(exited.load(Ordering::SeqCst), 5);
        assert_eq!(report.files, 2);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let dir = project(&[
            ("src/test/pkg/Calls.java", CALLS),
            ("src/test/pkg/MoreCalls.java", MORE_CALLS),
        ]);
        let sequential = Config {
            parallel: false,
            ..Config::default()
        };
        let a = analyze(sequential, vec![Box::new(ClassReporter("First"))], dir.path());
        let b = analyze(Config::default(), vec![Box::new(ClassReporter("First"))], dir.path());

        let locations = |r: &lintscan::Report| {
            r.findings
                .iter()
                .map(|f| (f.location.file.clone(), f.location.start))
                .collect::<Vec<_>>()
        };
        assert_eq!(a.findings.len(), 2);
        assert_eq!(locations(&a), locations(&b));
    }

    #[test]
    fn test_duplicate_findings_from_two_detectors_collapse() {
        let dir = project(&[("src/test/pkg/Calls.java", CALLS)]);
        let report = analyze(
            Config::default(),
            vec![Box::new(ClassReporter("First")), Box::new(ClassReporter("Second"))],
            dir.path(),
        );
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].message, "Class seen");
    }

    #[test]
    fn test_non_java_files_are_not_dispatched_to_source_detectors() {
        let dir = project(&[
            ("src/test/pkg/Calls.java", CALLS),
            ("res/layout/main.xml", "<LinearLayout />\n"),
        ]);
        let report = analyze(Config::default(), vec![Box::new(ClassReporter("First"))], dir.path());
        assert_eq!(report.findings.len(), 1);
        assert!(report.findings[0].location.file.ends_with("Calls.java"));
    }
}

// ============================================================================
// Failure containment
// ============================================================================

mod failure_tests {
    use super::*;

    #[test]
    fn test_failing_detector_does_not_blind_the_others() {
        let dir = project(&[("src/test/pkg/Calls.java", CALLS)]);
        let report = analyze(
            Config::default(),
            vec![
                Box::new(Broken { panics: false }),
                Box::new(Broken { panics: true }),
                Box::new(ClassReporter("Survivor")),
            ],
            dir.path(),
        );

        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].detector, "FailingDetector");
        assert!(report.failures[0].message.contains("cannot handle this class"));
        assert_eq!(report.failures[1].detector, "PanickingDetector");
        assert!(report.failures[1].message.contains("unexpected node shape"));

        assert!(report.findings.iter().any(|f| f.issue.id == "Sample"));
        assert_eq!(
            report.findings.iter().filter(|f| f.issue.id == "LintError").count(),
            2
        );
    }

    #[test]
    fn test_unparsable_file_is_reported() {
        let dir = project(&[
            ("src/test/pkg/Calls.java", CALLS),
            ("gradle/libs.versions.toml", "[libraries\nbroken = "),
        ]);
        let report = analyze(Config::default(), vec![Box::new(ClassReporter("First"))], dir.path());
        assert_eq!(report.files, 1);
        assert_eq!(report.findings.len(), 2);

        let incomplete: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.issue.id == "LintError")
            .collect();
        assert_eq!(incomplete.len(), 1);
        assert!(incomplete[0].location.file.ends_with("gradle/libs.versions.toml"));
        assert_eq!(incomplete[0].location.line, 1);
        assert!(incomplete[0].message.starts_with("analysis incomplete: failed to parse "));
        assert!(incomplete[0].message.contains("libs.versions.toml"));
        assert!(report.has_errors());
    }

    #[test]
    fn test_unparsable_file_respects_lint_error_severity() {
        let dir = project(&[
            ("src/test/pkg/Calls.java", CALLS),
            ("res/layout/broken.xml", "<LinearLayout><TextView></LinearLayout>"),
        ]);
        let mut config = Config::default();
        config.severity.insert("LintError".to_string(), Severity::Ignore);
        let report = analyze(config, vec![Box::new(ClassReporter("First"))], dir.path());

        assert_eq!(report.files, 1);
        assert!(report.findings.iter().all(|f| f.issue.id != "LintError"));
    }

    #[test]
    fn test_missing_database_is_reported_once() {
        let dir = project(&[
            ("src/test/pkg/Calls.java", CALLS),
            ("src/test/pkg/MoreCalls.java", MORE_CALLS),
        ]);
        let driver = LintDriver::builtin(Config::default()).unwrap();
        let report = driver.analyze_path(dir.path()).unwrap();

        let incomplete: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.issue.id == "LintError")
            .collect();
        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].message, MISSING_DATABASE);
        assert!(report.has_errors());
    }

    #[test]
    fn test_unreadable_database_counts_as_missing() {
        let dir = project(&[
            ("src/test/pkg/Calls.java", CALLS),
            ("api.json", "{ not json"),
        ]);
        let config = Config {
            api_database: Some(dir.path().join("api.json")),
            ..Config::default()
        };
        let report = LintDriver::builtin(config)
            .unwrap()
            .analyze_path(dir.path())
            .unwrap();
        assert!(report.findings.iter().any(|f| f.message == MISSING_DATABASE));
    }
}

// ============================================================================
// Cancellation and configuration
// ============================================================================

mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_cancelled_run_is_incomplete() {
        let dir = project(&[("src/test/pkg/Calls.java", CALLS)]);
        let token = CancellationToken::new();
        token.cancel();

        let registry = registry();
        let driver = LintDriver::new(Config::default(), &registry, vec![Box::new(ClassReporter("First"))])
            .unwrap()
            .with_cancellation(token);
        let report = driver.analyze_path(dir.path()).unwrap();

        assert!(report.cancelled);
        assert!(report.findings.is_empty());
        assert!(matches!(require_complete(report), Err(LintError::Cancelled)));
    }

    #[test]
    fn test_duplicate_issue_ids_are_fatal() {
        static CLONE: Issue = Issue::create(
            "Sample",
            "Another sample",
            "Same id as the sample issue.",
            Category::Correctness,
            5,
            Severity::Warning,
            Implementation::new("SampleDetector", ScopeSet::JAVA_FILE),
        );
        let err = IssueRegistry::new([&SAMPLE, &CLONE]).unwrap_err();
        assert!(matches!(err, LintError::Configuration(_)));
    }

    #[test]
    fn test_builtin_registry() {
        let registry = IssueRegistry::builtin().unwrap();
        for id in [
            "LintError",
            "Range",
            "InvalidRange",
            "UniqueConstants",
            "WrongConstant",
            "SwitchIntDef",
            "Recycle",
            "NewApi",
            "RtlHardcoded",
            "GradleDynamicVersion",
            "NewerVersionAvailable",
        ] {
            assert!(registry.issue(id).is_some(), "missing built-in issue {}", id);
        }
        assert!(!registry.issue("NewerVersionAvailable").unwrap().enabled_by_default);
        // Built once per process
        assert!(std::ptr::eq(registry, IssueRegistry::builtin().unwrap()));
    }

    #[test]
    fn test_config_file_in_project_root() {
        let dir = project(&[
            ("src/test/pkg/Calls.java", CALLS),
            (
                "lintscan.toml",
                "min_sdk = 21\nparallel = false\n\n[severity]\nSample = \"error\"\n",
            ),
        ]);
        let config = Config::from_default_locations(dir.path()).unwrap();
        assert_eq!(config.min_sdk, Some(21));
        assert!(!config.parallel);

        let report = analyze(config, vec![Box::new(ClassReporter("First"))], dir.path());
        assert_eq!(report.findings[0].severity, Severity::Error);
        assert!(report.has_errors());
    }

    #[test]
    fn test_excluded_directories_are_skipped() {
        let dir = project(&[
            ("src/test/pkg/Calls.java", CALLS),
            ("build/generated/Gen.java", "package gen;\npublic class Gen {}\n"),
        ]);
        let report = analyze(Config::default(), vec![Box::new(ClassReporter("First"))], dir.path());
        assert_eq!(report.files, 1);
    }
}
