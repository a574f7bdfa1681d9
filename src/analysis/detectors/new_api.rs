//! New API Detector
//!
//! Flags calls, constructors and field references whose API level is above
//! the project's `minSdkVersion`. The minimum is only known once every unit
//! (and the manifest) has been seen, so findings are reported provisionally
//! with the required level attached and settled in [`Detector::filter`].
//!
//! ## Anti-Pattern
//!
//! ```java
//! // minSdkVersion 14
//! view.setElevation(4f);   // API 21
//! ```
//!
//! ## Why It's Bad
//!
//! - Crashes with `NoSuchMethodError` on older devices
//! - Only shows up on the devices nobody on the team tests with
//!
//! ## Better Alternatives
//!
//! ```java
//! if (Build.VERSION.SDK_INT >= Build.VERSION_CODES.LOLLIPOP) {
//!     view.setElevation(4f);
//! }
//!
//! @RequiresApi(21)
//! void lift(View view) { view.setElevation(4f); }
//! ```

use super::{is_any, REQUIRES_API, TARGET_API};
use crate::analysis::{
    facts, DataValue, Detector, DetectorContext, Finding, FindingData, Interest, ProjectFacts, Trigger,
};
use crate::evaluator::{EvalScope, Evaluator};
use crate::issues::{Category, Implementation, Issue, ScopeSet, Severity};
use crate::model::{AnnotationInstance, Declaration, Expr, NodeId, NodeKind};
use crate::versions::VersionDatabase;
use tracing::debug;

pub static UNSUPPORTED: Issue = Issue::create(
    "NewApi",
    "Calling new methods on older versions",
    "This check scans through all the Android API calls in the application and \
     warns about any calls that are not available on **all** versions targeted by \
     this application (according to its minimum SDK attribute in the manifest). \
     If you really want to use this API and don't need to support older devices \
     just set the `minSdkVersion` higher. If your code is deliberately accessing \
     newer APIs, guard the call with a `Build.VERSION.SDK_INT` check or annotate \
     the surrounding method with `@RequiresApi`.",
    Category::Correctness,
    6,
    Severity::Error,
    Implementation::new("ApiDetector", ScopeSet::JAVA_AND_CLASS.union(ScopeSet::MANIFEST)),
);

/// Finding data key holding the required API level
const REQUIRED_API: &str = "api";

/// Placeholder for the minimum SDK, filled in by the deferred filter
const MIN_PLACEHOLDER: &str = "%s";

/// `Build.VERSION_CODES` names commonly used in guards and annotations
const VERSION_CODES: &[(&str, u32)] = &[
    ("JELLY_BEAN", 16),
    ("JELLY_BEAN_MR1", 17),
    ("JELLY_BEAN_MR2", 18),
    ("KITKAT", 19),
    ("LOLLIPOP", 21),
    ("LOLLIPOP_MR1", 22),
    ("M", 23),
    ("N", 24),
    ("N_MR1", 25),
    ("O", 26),
    ("O_MR1", 27),
    ("P", 28),
    ("Q", 29),
    ("R", 30),
    ("S", 31),
    ("S_V2", 32),
    ("TIRAMISU", 33),
    ("UPSIDE_DOWN_CAKE", 34),
];

/// Detector for API usage above the minimum SDK
pub struct ApiDetector;

impl ApiDetector {
    pub fn new() -> Self {
        Self
    }

    /// Requirement of the API referenced at `node`, with its description
    fn requirement(
        evaluator: &Evaluator<'_>,
        versions: &dyn VersionDatabase,
        node: NodeId,
    ) -> Option<(u32, String)> {
        let tree = evaluator.tree();
        match tree.node_kind(node) {
            NodeKind::Call => {
                let method = evaluator.resolve_call(node)?;
                let owner = method.owner_or_receiver()?.to_string();
                let api = Self::lookup(evaluator, versions, &owner, Some(&method.name))?;
                Some((
                    api,
                    format!(
                        "Call requires API level {} (current min is {}): `{}#{}`",
                        api,
                        MIN_PLACEHOLDER,
                        owner,
                        method.name,
                    ),
                ))
            }
            NodeKind::New => {
                let written = tree.node(node).type_name.as_deref()?;
                if written.ends_with("[]") {
                    return None;
                }
                let class = evaluator.qualify_type(written, node)?;
                let api = Self::lookup(evaluator, versions, &class, Some("<init>"))?;
                Some((
                    api,
                    format!(
                        "Call requires API level {} (current min is {}): `new {}`",
                        api,
                        MIN_PLACEHOLDER,
                        class,
                    ),
                ))
            }
            NodeKind::Select => {
                let Declaration::Field { owner, name } = evaluator.resolve(node)? else {
                    return None;
                };
                let api = Self::lookup(evaluator, versions, &owner, Some(&name))?;
                Some((
                    api,
                    format!(
                        "Field requires API level {} (current min is {}): `{}#{}`",
                        api,
                        MIN_PLACEHOLDER,
                        owner,
                        name,
                    ),
                ))
            }
            _ => None,
        }
    }

    fn lookup(
        evaluator: &Evaluator<'_>,
        versions: &dyn VersionDatabase,
        owner: &str,
        member: Option<&str>,
    ) -> Option<u32> {
        let internal = match evaluator.internal_name(owner) {
            Ok(internal) => internal,
            Err(e) => {
                debug!("No API lookup for {}: {}", owner, e);
                return None;
            }
        };
        if !versions.class_exists(&internal) {
            return None;
        }
        versions
            .min_version_introduced(&internal, member)
            .filter(|&api| api > 1)
    }

    /// Highest level vouched for by `@RequiresApi`/`@TargetApi` on an
    /// enclosing declaration or an enclosing `SDK_INT` check
    fn guaranteed_level(evaluator: &Evaluator<'_>, node: NodeId) -> u32 {
        let tree = evaluator.tree();
        let mut level = 0;
        let mut child = node;
        for ancestor in tree.ancestors(node) {
            match tree.node_kind(ancestor) {
                NodeKind::Method | NodeKind::Class | NodeKind::Field | NodeKind::LocalVariable => {
                    for annotation in tree.annotations(ancestor) {
                        let mut instance =
                            AnnotationInstance::from_node(tree, annotation, evaluator.class_name_of(annotation));
                        if let Some(qualified) = evaluator.qualify_type(&instance.name, annotation) {
                            instance.name = qualified;
                        }
                        if let Some(api) = Self::annotation_level(evaluator, &instance) {
                            level = level.max(api);
                        }
                    }
                }
                NodeKind::If if tree.children(ancestor).get(1) == Some(&child) => {
                    if let Some(&condition) = tree.children(ancestor).first() {
                        if let Some(api) = Self::sdk_check(evaluator, condition) {
                            level = level.max(api);
                        }
                    }
                }
                _ => {}
            }
            child = ancestor;
        }
        level
    }

    fn annotation_level(evaluator: &Evaluator<'_>, annotation: &AnnotationInstance) -> Option<u32> {
        if !is_any(annotation, &REQUIRES_API) && !annotation.is(TARGET_API) {
            return None;
        }
        let expr = annotation.value().or_else(|| annotation.attribute("api"))?;
        Self::level_of(evaluator, expr, &evaluator.annotation_scope(annotation))
    }

    /// `SDK_INT >= N` or `SDK_INT > N`
    fn sdk_check(evaluator: &Evaluator<'_>, condition: NodeId) -> Option<u32> {
        let tree = evaluator.tree();
        let condition = tree.skip_parentheses(condition);
        let Expr::Binary { op, lhs, rhs } = Expr::from_node(tree, condition) else {
            return None;
        };
        if !matches!(lhs.as_ref(), Expr::Reference { name, .. } if name == "SDK_INT") {
            return None;
        }
        let level = Self::level_of(evaluator, &rhs, &EvalScope::Node(condition))?;
        match op.as_str() {
            ">=" => Some(level),
            ">" => level.checked_add(1),
            _ => None,
        }
    }

    fn level_of(evaluator: &Evaluator<'_>, expr: &Expr, scope: &EvalScope) -> Option<u32> {
        if let Some(value) = evaluator.evaluate_expr(expr, scope).and_then(|v| v.as_int()) {
            return u32::try_from(value).ok();
        }
        match expr {
            Expr::Reference { name, .. } => VERSION_CODES
                .iter()
                .find(|(code, _)| *code == name.as_str())
                .map(|&(_, api)| api),
            _ => None,
        }
    }

    fn check(&self, ctx: &mut DetectorContext<'_>, node: NodeId) {
        let Some(versions) = ctx.versions() else {
            return;
        };
        let evaluator = *ctx.evaluator();
        let Some((api, message)) = Self::requirement(&evaluator, versions, node) else {
            return;
        };
        if Self::guaranteed_level(&evaluator, node) >= api {
            return;
        }
        if ctx.config().min_sdk.is_some_and(|min| min >= api) {
            return;
        }
        let finding = ctx
            .finding(&UNSUPPORTED, node, message)
            .with_data(FindingData::new().with_int(REQUIRED_API, i64::from(api)));
        ctx.report_finding(finding);
    }

    /// `<uses-sdk android:minSdkVersion="..." android:targetSdkVersion="...">`
    fn record_sdk(ctx: &mut DetectorContext<'_>, element: NodeId) {
        let tree = ctx.tree();
        for &attribute in tree.children(element) {
            let data = tree.node(attribute);
            let key = match data.name.as_deref() {
                Some("minSdkVersion") => facts::MIN_SDK,
                Some("targetSdkVersion") => facts::TARGET_SDK,
                _ => continue,
            };
            // Codenames ("O") are previews; leave the level unknown
            if let Some(level) = data.value.as_deref().and_then(|v| v.trim().parse::<i64>().ok()) {
                ctx.record_fact(key, DataValue::Int(level));
            }
        }
    }
}

impl Default for ApiDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for ApiDetector {
    fn name(&self) -> &'static str {
        "ApiDetector"
    }

    fn issues(&self) -> Vec<&'static Issue> {
        vec![&UNSUPPORTED]
    }

    fn interests(&self) -> Vec<Interest> {
        vec![
            Interest::source(Trigger::Enter(NodeKind::Call)),
            Interest::source(Trigger::Enter(NodeKind::New)),
            Interest::source(Trigger::Enter(NodeKind::Select)),
            Interest::xml(Trigger::XmlElement("uses-sdk")),
        ]
    }

    fn needs_version_database(&self) -> bool {
        true
    }

    fn on_enter(&self, ctx: &mut DetectorContext<'_>, node: NodeId) -> anyhow::Result<()> {
        self.check(ctx, node);
        Ok(())
    }

    fn on_xml_element(&self, ctx: &mut DetectorContext<'_>, element: NodeId) -> anyhow::Result<()> {
        Self::record_sdk(ctx, element);
        Ok(())
    }

    fn filter(&self, finding: &mut Finding, facts: &ProjectFacts) -> bool {
        let Some(api) = finding.data.as_ref().and_then(|d| d.int(REQUIRED_API)) else {
            return true;
        };
        let min = facts.min_sdk().unwrap_or(1);
        if api <= i64::from(min) {
            return false;
        }
        finding.message = finding.message.replace(MIN_PLACEHOLDER, &min.to_string());
        true
    }
}
