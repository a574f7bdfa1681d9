//! Dependency Version Detector
//!
//! Checks library coordinates declared in the Gradle version catalog.
//! Dynamic versions (`1.+`) are always reported. With a version lookup
//! configured, pinned versions older than the latest published release
//! are reported as well.
//!
//! ## Anti-Pattern
//!
//! ```toml
//! [libraries]
//! appcompat = "androidx.appcompat:appcompat:1.+"
//! gson = "com.google.code.gson:gson:2.8.0"
//! ```
//!
//! ## Why It's Bad
//!
//! - A `+` resolves to whatever was published last, so two builds of the
//!   same commit can differ
//! - Old library versions miss bug and security fixes
//!
//! ## Better Alternatives
//!
//! ```toml
//! [libraries]
//! appcompat = "androidx.appcompat:appcompat:1.7.0"
//! ```

use crate::analysis::{Detector, DetectorContext, Interest, Trigger};
use crate::issues::{Category, Implementation, Issue, ScopeSet, Severity};
use crate::model::{NodeId, NodeKind};
use crate::versions::{compare_versions, is_preview};
use std::cmp::Ordering;
use tracing::{debug, warn};

pub static DYNAMIC_VERSION: Issue = Issue::create(
    "GradleDynamicVersion",
    "Gradle Dynamic Version",
    "Using `+` in dependencies lets you automatically pick up the latest available \
     version rather than a specific, named version. However, this is not recommended; \
     your builds are not repeatable; you may have tested with a slightly different \
     version than what the build server used.",
    Category::Correctness,
    4,
    Severity::Warning,
    Implementation::new("DependencyVersionDetector", ScopeSet::GRADLE_FILE),
);

pub static NEWER_VERSION: Issue = Issue::create(
    "NewerVersionAvailable",
    "Newer Library Versions Available",
    "This detector checks with a central repository to see if there are newer \
     versions available for the dependencies used by this project. This check \
     requires network access and is therefore off by default.",
    Category::Correctness,
    4,
    Severity::Warning,
    Implementation::new("DependencyVersionDetector", ScopeSet::GRADLE_FILE),
)
.disabled_by_default();

/// Detector for dynamic and outdated dependency versions
pub struct DependencyVersionDetector;

impl DependencyVersionDetector {
    pub fn new() -> Self {
        Self
    }

    fn check_newer(ctx: &mut DetectorContext<'_>, node: NodeId, group: &str, artifact: &str, current: &str) {
        let Some(lookup) = ctx.lookup() else {
            return;
        };
        // Previews are only suggested to projects already on one
        let allow_preview = is_preview(current);
        let latest = match lookup.latest_version(group, artifact, allow_preview) {
            Ok(Some(latest)) => latest,
            Ok(None) => {
                debug!("No published versions for {}:{}", group, artifact);
                return;
            }
            Err(e) => {
                warn!("Version lookup for {}:{} failed: {}", group, artifact, e);
                return;
            }
        };

        if compare_versions(&latest, current) == Ordering::Greater {
            let message = format!(
                "A newer version of {}:{} than {} is available: {}",
                group, artifact, current, latest
            );
            ctx.report(&NEWER_VERSION, node, message);
        }
    }
}

impl Default for DependencyVersionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for DependencyVersionDetector {
    fn name(&self) -> &'static str {
        "DependencyVersionDetector"
    }

    fn issues(&self) -> Vec<&'static Issue> {
        vec![&DYNAMIC_VERSION, &NEWER_VERSION]
    }

    fn interests(&self) -> Vec<Interest> {
        vec![Interest::build(Trigger::Enter(NodeKind::Dependency))]
    }

    fn on_enter(&self, ctx: &mut DetectorContext<'_>, node: NodeId) -> anyhow::Result<()> {
        let data = ctx.tree().node(node);
        let (Some(group), Some(artifact), Some(version)) =
            (data.prefix.clone(), data.name.clone(), data.value.clone())
        else {
            return Ok(());
        };

        if version.contains('+') {
            let message = format!(
                "Avoid using + in version numbers; can lead to unpredictable and unrepeatable builds ({}:{}:{})",
                group, artifact, version
            );
            ctx.report(&DYNAMIC_VERSION, node, message);
            return Ok(());
        }

        if ctx.config().is_reportable(&NEWER_VERSION) {
            Self::check_newer(ctx, node, &group, &artifact, &version);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::detectors::testing::{catalog, config, messages, run};
    use crate::analysis::LintDriver;
    use crate::error::{LintError, Result};
    use crate::issues::IssueRegistry;
    use crate::versions::VersionLookup;
    use std::sync::Arc;

    const CATALOG: &str = r#"[versions]
gson = "2.8.0"

[libraries]
appcompat = "androidx.appcompat:appcompat:1.+"
gson = { module = "com.google.code.gson:gson", version.ref = "gson" }
okhttp = { group = "com.squareup.okhttp3", name = "okhttp", version = "4.12.0" }
unknown = "org.example:missing:1.0"
"#;

    struct FakeLookup;

    impl VersionLookup for FakeLookup {
        fn latest_version(&self, group: &str, artifact: &str, _allow_preview: bool) -> Result<Option<String>> {
            match (group, artifact) {
                ("com.google.code.gson", "gson") => Ok(Some("2.11.0".to_string())),
                ("com.squareup.okhttp3", "okhttp") => Ok(Some("4.12.0".to_string())),
                ("org.example", "missing") => Err(LintError::Remote("offline".to_string())),
                _ => Ok(None),
            }
        }
    }

    #[test]
    fn test_dynamic_version() {
        let report = run(Box::new(DependencyVersionDetector::new()), vec![catalog(CATALOG)]);
        assert_eq!(
            messages(&report, "GradleDynamicVersion"),
            vec!["Avoid using + in version numbers; can lead to unpredictable and unrepeatable builds (androidx.appcompat:appcompat:1.+)"]
        );
        // No lookup configured and the issue is off by default
        assert!(messages(&report, "NewerVersionAvailable").is_empty());
    }

    #[test]
    fn test_newer_version_available() {
        let mut config = config();
        config.enabled.insert("NewerVersionAvailable".to_string(), true);
        let registry = IssueRegistry::builtin().unwrap();
        let driver = LintDriver::new(config, registry, vec![Box::new(DependencyVersionDetector::new())])
            .unwrap()
            .with_lookup(Arc::new(FakeLookup));
        let report = driver.analyze_trees(vec![catalog(CATALOG)]).unwrap();

        assert_eq!(
            messages(&report, "NewerVersionAvailable"),
            vec!["A newer version of com.google.code.gson:gson than 2.8.0 is available: 2.11.0"]
        );
        assert_eq!(messages(&report, "GradleDynamicVersion").len(), 1);
        assert!(report.failures.is_empty());
    }
}
