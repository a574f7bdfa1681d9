//! Detector API and the dispatch engine
//!
//! Detectors declare up front which node kinds and names they care about
//! ([`Interest`]); [`Registration`] indexes them once into per-phase tables
//! and [`LintDriver`] walks every unit a single time, invoking only the
//! detectors interested in each node.

mod context;
pub mod detectors;
mod dispatch;
mod driver;
pub mod escape;
mod visitor;

pub use context::{DetectorContext, UnitEnv, UnitState};
pub use dispatch::{DispatchTable, Registration};
pub use driver::{require_complete, LintDriver, MISSING_DATABASE};
pub use escape::{EscapeOutcome, EscapeTracker};

use crate::evaluator::MethodRef;
use crate::issues::{Issue, Severity};
use crate::model::{AnnotationInstance, Location, NodeId, NodeKind, Phase};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What a detector wants to be called for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Pre-order visit of every node of this kind
    Enter(NodeKind),
    /// Post-order visit of every node of this kind
    Exit(NodeKind),
    /// Calls with this method name
    MethodCall(&'static str),
    /// `new` expressions creating this qualified type
    ConstructorCall(&'static str),
    /// Uses of elements carrying this qualified annotation
    Annotation(&'static str),
    /// XML attributes with this local name
    XmlAttribute(&'static str),
    /// XML elements with this tag
    XmlElement(&'static str),
}

impl Trigger {
    /// Node kind the trigger fires on
    pub fn node_kind(&self) -> NodeKind {
        match self {
            Trigger::Enter(kind) | Trigger::Exit(kind) => *kind,
            Trigger::MethodCall(_) => NodeKind::Call,
            Trigger::ConstructorCall(_) => NodeKind::New,
            Trigger::Annotation(_) => NodeKind::Annotation,
            Trigger::XmlAttribute(_) => NodeKind::Attribute,
            Trigger::XmlElement(_) => NodeKind::Element,
        }
    }

    /// Name the trigger is keyed by, if any
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Trigger::Enter(_) | Trigger::Exit(_) => None,
            Trigger::MethodCall(name)
            | Trigger::ConstructorCall(name)
            | Trigger::Annotation(name)
            | Trigger::XmlAttribute(name)
            | Trigger::XmlElement(name) => Some(name),
        }
    }
}

/// A trigger within one traversal phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interest {
    pub phase: Phase,
    pub trigger: Trigger,
}

impl Interest {
    pub fn new(phase: Phase, trigger: Trigger) -> Self {
        Self { phase, trigger }
    }

    pub fn source(trigger: Trigger) -> Self {
        Self::new(Phase::Source, trigger)
    }

    pub fn xml(trigger: Trigger) -> Self {
        Self::new(Phase::Xml, trigger)
    }

    pub fn build(trigger: Trigger) -> Self {
        Self::new(Phase::Build, trigger)
    }
}

/// How an annotated element is being used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageKind {
    /// The annotation as written on a declaration
    Definition,
    /// A call to an annotated method
    MethodCall,
    /// An argument bound to an annotated parameter
    Argument { index: usize },
    /// The initializer of an annotated field or local
    Initializer,
}

/// One annotation usage delivered to `on_annotation`
#[derive(Debug, Clone, Copy)]
pub struct AnnotationUsage<'u> {
    pub annotation: &'u AnnotationInstance,
    pub kind: UsageKind,
    /// The argument, initializer, call or annotation node
    pub node: NodeId,
    /// The call, for call-site usages
    pub method: Option<&'u MethodRef<'u>>,
}

/// A suggested fix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fix {
    pub description: String,
    pub replacement: Option<String>,
}

impl Fix {
    pub fn replace(description: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            replacement: Some(replacement.into()),
        }
    }
}

/// A value kept on a finding or fact for deferred decisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DataValue {
    Int(i64),
    Bool(bool),
    Str(String),
}

/// Key/value data a detector attaches to a provisional finding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindingData(BTreeMap<&'static str, DataValue>);

impl FindingData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_int(mut self, key: &'static str, value: i64) -> Self {
        self.0.insert(key, DataValue::Int(value));
        self
    }

    pub fn with_bool(mut self, key: &'static str, value: bool) -> Self {
        self.0.insert(key, DataValue::Bool(value));
        self
    }

    pub fn with_str(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.0.insert(key, DataValue::Str(value.into()));
        self
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(DataValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(DataValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(DataValue::Str(v)) => Some(v),
            _ => None,
        }
    }
}

/// Findings at the same place that the sink folds into one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroup {
    pub prefix: String,
    pub items: Vec<String>,
}

/// One reportable occurrence of an issue
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    #[serde(rename = "id", serialize_with = "serialize_issue")]
    pub issue: &'static Issue,
    pub severity: Severity,
    pub location: Location,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secondary: Vec<Location>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
    #[serde(skip)]
    pub data: Option<FindingData>,
    #[serde(skip)]
    pub merge: Option<MergeGroup>,
    /// Node the finding is anchored at, for suppression
    #[serde(skip)]
    pub anchor: Option<NodeId>,
    /// Index of the reporting detector in its registration
    #[serde(skip)]
    pub detector: Option<usize>,
}

fn serialize_issue<S: Serializer>(issue: &&'static Issue, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(issue.id)
}

impl Finding {
    pub fn new(issue: &'static Issue, location: Location, message: impl Into<String>) -> Self {
        Self {
            issue,
            severity: issue.severity,
            location,
            secondary: Vec::new(),
            message: message.into(),
            fix: None,
            data: None,
            merge: None,
            anchor: None,
            detector: None,
        }
    }

    pub fn with_secondary(mut self, location: Location) -> Self {
        self.secondary.push(location);
        self
    }

    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }

    /// Mark the finding provisional; the detector's `filter` decides later
    pub fn with_data(mut self, data: FindingData) -> Self {
        self.data = Some(data);
        self
    }

    /// Fold with other findings of the same issue and location
    pub fn mergeable(mut self, prefix: impl Into<String>, item: impl Into<String>) -> Self {
        self.merge = Some(MergeGroup {
            prefix: prefix.into(),
            items: vec![item.into()],
        });
        self
    }

    pub fn anchored(mut self, node: NodeId) -> Self {
        self.anchor = Some(node);
        self
    }
}

/// Well-known fact keys
pub mod facts {
    pub const MIN_SDK: &str = "minSdkVersion";
    pub const TARGET_SDK: &str = "targetSdkVersion";
    pub const SUPPORTS_RTL: &str = "supportsRtl";
}

/// Project-wide facts recorded by detectors, merged after all units
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFacts(BTreeMap<String, DataValue>);

impl ProjectFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fact; the first recorded value for a key wins
    pub fn record(&mut self, key: impl Into<String>, value: DataValue) {
        self.0.entry(key.into()).or_insert(value);
    }

    /// Overwrite a fact (configuration overrides)
    pub fn set(&mut self, key: impl Into<String>, value: DataValue) {
        self.0.insert(key.into(), value);
    }

    pub fn merge(&mut self, other: &ProjectFacts) {
        for (key, value) in &other.0 {
            self.record(key.clone(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.0.get(key)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(DataValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(DataValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn min_sdk(&self) -> Option<u32> {
        self.int(facts::MIN_SDK).and_then(|v| u32::try_from(v).ok())
    }

    pub fn supports_rtl(&self) -> bool {
        self.bool(facts::SUPPORTS_RTL).unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Shared flag for cooperative cancellation
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A detector callback that returned an error or panicked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectorFailure {
    pub detector: &'static str,
    pub file: PathBuf,
    pub message: String,
}

/// A rule implementation
///
/// Detectors are shared by every worker, so they hold no mutable state;
/// per-unit state lives in [`DetectorContext::state_mut`]. Every callback
/// defaults to doing nothing, and only the callbacks matching declared
/// [`Interest`]s are ever invoked.
pub trait Detector: Send + Sync {
    /// Unique detector name
    fn name(&self) -> &'static str;

    /// Issues this detector can report
    fn issues(&self) -> Vec<&'static Issue>;

    fn interests(&self) -> Vec<Interest>;

    /// Whether the detector is useless without a version database
    fn needs_version_database(&self) -> bool {
        false
    }

    fn before_unit(&self, _ctx: &mut DetectorContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_enter(&self, _ctx: &mut DetectorContext<'_>, _node: NodeId) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_exit(&self, _ctx: &mut DetectorContext<'_>, _node: NodeId) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_method_call(
        &self,
        _ctx: &mut DetectorContext<'_>,
        _call: NodeId,
        _method: &MethodRef<'_>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_constructor_call(
        &self,
        _ctx: &mut DetectorContext<'_>,
        _node: NodeId,
        _class: &str,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_annotation(
        &self,
        _ctx: &mut DetectorContext<'_>,
        _usage: &AnnotationUsage<'_>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_xml_element(&self, _ctx: &mut DetectorContext<'_>, _element: NodeId) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_xml_attribute(
        &self,
        _ctx: &mut DetectorContext<'_>,
        _attribute: NodeId,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn after_unit(&self, _ctx: &mut DetectorContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Decide a provisional finding once project facts are known
    ///
    /// Returns `false` to drop it. May rewrite the message.
    fn filter(&self, _finding: &mut Finding, _facts: &ProjectFacts) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_keys() {
        assert_eq!(Trigger::MethodCall("recycle").node_kind(), NodeKind::Call);
        assert_eq!(Trigger::MethodCall("recycle").name(), Some("recycle"));
        assert_eq!(Trigger::Enter(NodeKind::Switch).name(), None);
        assert_eq!(Trigger::XmlAttribute("layout_gravity").node_kind(), NodeKind::Attribute);
    }

    #[test]
    fn test_facts_first_value_wins() {
        let mut first = ProjectFacts::new();
        first.record(facts::MIN_SDK, DataValue::Int(14));
        let mut second = ProjectFacts::new();
        second.record(facts::MIN_SDK, DataValue::Int(21));
        second.record(facts::SUPPORTS_RTL, DataValue::Bool(true));

        first.merge(&second);
        assert_eq!(first.min_sdk(), Some(14));
        assert!(first.supports_rtl());
    }

    #[test]
    fn test_cancellation_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
