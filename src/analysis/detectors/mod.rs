// Built-in detectors
// Each module declares its issues as statics next to the detector that
// reports them; `builtin_issues` and `builtin_detectors` collect them.

mod cleanup;
mod dependency_version;
mod new_api;
mod range;
mod rtl;
mod typedef;

pub use cleanup::CleanupDetector;
pub use dependency_version::DependencyVersionDetector;
pub use new_api::ApiDetector;
pub use range::{get_float_range_error, get_int_range_error, get_size_error, RangeDetector};
pub use rtl::RtlDetector;
pub use typedef::TypedefDetector;

use super::{AnnotationUsage, Detector, DetectorContext, Interest, Trigger, UsageKind};
use crate::issues::Issue;
use crate::model::AnnotationInstance;

/// Every built-in issue except the infrastructure `LintError`
pub fn builtin_issues() -> Vec<&'static Issue> {
    vec![
        &range::RANGE,
        &range::INVALID_RANGE,
        &typedef::UNIQUE,
        &typedef::TYPE_DEF,
        &typedef::SWITCH_TYPE_DEF,
        &cleanup::RECYCLE_RESOURCE,
        &new_api::UNSUPPORTED,
        &rtl::USE_START,
        &dependency_version::DYNAMIC_VERSION,
        &dependency_version::NEWER_VERSION,
    ]
}

/// One instance of every built-in detector, in dispatch order
pub fn builtin_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(RangeDetector::new()),
        Box::new(TypedefDetector::new()),
        Box::new(CleanupDetector::new()),
        Box::new(ApiDetector::new()),
        Box::new(RtlDetector::new()),
        Box::new(DependencyVersionDetector::new()),
    ]
}

/// An annotation under its AndroidX and legacy support library names
pub(crate) type AnnotationNames = [&'static str; 2];

pub(crate) const INT_RANGE: AnnotationNames = [
    "androidx.annotation.IntRange",
    "android.support.annotation.IntRange",
];
pub(crate) const FLOAT_RANGE: AnnotationNames = [
    "androidx.annotation.FloatRange",
    "android.support.annotation.FloatRange",
];
pub(crate) const SIZE: AnnotationNames = [
    "androidx.annotation.Size",
    "android.support.annotation.Size",
];
pub(crate) const INT_DEF: AnnotationNames = [
    "androidx.annotation.IntDef",
    "android.support.annotation.IntDef",
];
pub(crate) const LONG_DEF: AnnotationNames = [
    "androidx.annotation.LongDef",
    "android.support.annotation.LongDef",
];
pub(crate) const STRING_DEF: AnnotationNames = [
    "androidx.annotation.StringDef",
    "android.support.annotation.StringDef",
];
pub(crate) const REQUIRES_API: AnnotationNames = [
    "androidx.annotation.RequiresApi",
    "android.support.annotation.RequiresApi",
];
pub(crate) const TARGET_API: &str = "android.annotation.TargetApi";

pub(crate) fn is_any(annotation: &AnnotationInstance, names: &[&str]) -> bool {
    names.iter().any(|name| annotation.is(name))
}

/// Source-phase annotation interests for every name in `groups`
pub(crate) fn annotation_interests(groups: &[AnnotationNames]) -> Vec<Interest> {
    let mut interests: Vec<Interest> = Vec::new();
    for name in groups.iter().flatten() {
        let interest = Interest::source(Trigger::Annotation(*name));
        if !interests.contains(&interest) {
            interests.push(interest);
        }
    }
    interests
}

/// All annotations in effect at the place a usage was found: the parameter
/// receiving an argument, or the variable being initialized
pub(crate) fn usage_annotations(
    ctx: &DetectorContext<'_>,
    usage: &AnnotationUsage<'_>,
) -> Vec<AnnotationInstance> {
    match usage.kind {
        UsageKind::Argument { index } => usage
            .method
            .map(|method| ctx.evaluator().parameter_annotations(method, index))
            .unwrap_or_default(),
        UsageKind::Initializer => ctx
            .tree()
            .parent(usage.node)
            .map(|variable| ctx.evaluator().node_annotations(variable))
            .unwrap_or_default(),
        UsageKind::MethodCall | UsageKind::Definition => Vec::new(),
    }
}

/// `Outer.Inner.NAME` → `Inner.NAME`
pub(crate) fn short_field_name(owner: &str, name: &str) -> String {
    let class = owner.rsplit('.').next().unwrap_or(owner);
    format!("{}.{}", class, name)
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::analysis::{Detector, LintDriver};
    use crate::config::Config;
    use crate::discovery::FileType;
    use crate::issues::IssueRegistry;
    use crate::model::Tree;
    use crate::parser::parse_source;
    use crate::report::Report;
    use crate::versions::VersionDatabase;
    use std::path::Path;
    use std::sync::Arc;

    pub fn java(path: &str, source: &str) -> Tree {
        parse_source(Path::new(path), FileType::Java, source).unwrap()
    }

    pub fn layout(path: &str, source: &str) -> Tree {
        parse_source(Path::new(path), FileType::Xml, source).unwrap()
    }

    pub fn manifest(source: &str) -> Tree {
        parse_source(Path::new("AndroidManifest.xml"), FileType::Manifest, source).unwrap()
    }

    pub fn catalog(source: &str) -> Tree {
        parse_source(Path::new("gradle/libs.versions.toml"), FileType::VersionCatalog, source).unwrap()
    }

    pub fn config() -> Config {
        Config {
            parallel: false,
            ..Config::default()
        }
    }

    pub fn run(detector: Box<dyn Detector>, trees: Vec<Tree>) -> Report {
        run_with(config(), detector, trees, None)
    }

    pub fn run_with(
        config: Config,
        detector: Box<dyn Detector>,
        trees: Vec<Tree>,
        versions: Option<Arc<dyn VersionDatabase>>,
    ) -> Report {
        let registry = IssueRegistry::builtin().unwrap();
        let mut driver = LintDriver::new(config, registry, vec![detector]).unwrap();
        if let Some(versions) = versions {
            driver = driver.with_versions(versions);
        }
        driver.analyze_trees(trees).unwrap()
    }

    /// Messages of the findings for one issue, in report order
    pub fn messages(report: &Report, id: &str) -> Vec<String> {
        report
            .findings
            .iter()
            .filter(|f| f.issue.id == id)
            .map(|f| f.message.clone())
            .collect()
    }
}
