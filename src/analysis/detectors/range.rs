//! Range Detector
//!
//! Checks constant arguments and initializers against `@IntRange`,
//! `@FloatRange` and `@Size`, and flags range annotations that no value can
//! satisfy.
//!
//! ## Anti-Pattern
//!
//! ```java
//! void setAlpha(@IntRange(from = 0, to = 255) int alpha) { ... }
//!
//! setAlpha(300);
//! ```
//!
//! ## Why It's Bad
//!
//! - The callee documents a contract the caller silently violates
//! - Out-of-range values are usually clamped or rejected at runtime
//!
//! ## Better Alternatives
//!
//! ```java
//! setAlpha(Math.min(value, 255));
//! ```

use super::{annotation_interests, is_any, usage_annotations, FLOAT_RANGE, INT_DEF, INT_RANGE, LONG_DEF, SIZE};
use crate::analysis::{AnnotationUsage, Detector, DetectorContext, Interest, UsageKind};
use crate::evaluator::Evaluator;
use crate::issues::{Category, Implementation, Issue, ScopeSet, Severity};
use crate::model::{AnnotationInstance, Literal, NodeId, NodeKind, Tree};

const IMPLEMENTATION: Implementation = Implementation::new("RangeDetector", ScopeSet::JAVA_FILE);

pub static RANGE: Issue = Issue::create(
    "Range",
    "Outside Range",
    "Some parameters are required to be in a particular numerical range; this check \
     makes sure that arguments passed fall within the range. For arrays, Strings and \
     collections this refers to the size or length.",
    Category::Correctness,
    6,
    Severity::Error,
    IMPLEMENTATION,
);

pub static INVALID_RANGE: Issue = Issue::create(
    "InvalidRange",
    "Invalid Range Annotation",
    "A range annotation whose lower bound is above its upper bound, or a size \
     annotation with a negative size or a multiple below one, can never be \
     satisfied; every use of the annotated element would be reported.",
    Category::Correctness,
    2,
    Severity::Error,
    IMPLEMENTATION,
);

/// Value must lie in `[from, to]`
pub fn get_int_range_error(value: i64, from: i64, to: i64) -> Option<String> {
    if value < from {
        Some(format!("Value must be ≥ {} (was {})", from, value))
    } else if value > to {
        Some(format!("Value must be ≤ {} (was {})", to, value))
    } else {
        None
    }
}

pub fn get_float_range_error(
    value: f64,
    from: f64,
    to: f64,
    from_inclusive: bool,
    to_inclusive: bool,
) -> Option<String> {
    let below = if from_inclusive { value < from } else { value <= from };
    if below {
        let op = if from_inclusive { "≥" } else { ">" };
        return Some(format!("Value must be {} {:?} (was {:?})", op, from, value));
    }
    let above = if to_inclusive { value > to } else { value >= to };
    if above {
        let op = if to_inclusive { "≤" } else { "<" };
        return Some(format!("Value must be {} {:?} (was {:?})", op, to, value));
    }
    None
}

/// `unit` is `length` for strings and `size` for arrays; an `exact` of -1
/// means unset
pub fn get_size_error(
    actual: i64,
    exact: i64,
    min: i64,
    max: i64,
    multiple: i64,
    unit: &str,
) -> Option<String> {
    if exact != -1 && actual != exact {
        return Some(format!("Expected {} {} (was {})", unit, exact, actual));
    }
    if actual < min {
        return Some(format!("Expected {} ≥ {} (was {})", unit, min, actual));
    }
    if actual > max {
        return Some(format!("Expected {} ≤ {} (was {})", unit, max, actual));
    }
    if multiple > 1 && actual % multiple != 0 {
        let lower = actual / multiple * multiple;
        return Some(format!(
            "Expected {} to be a multiple of {} (was {} and should be either {} or {})",
            unit,
            multiple,
            actual,
            lower,
            lower + multiple
        ));
    }
    None
}

fn int_attribute(evaluator: &Evaluator<'_>, annotation: &AnnotationInstance, name: &str) -> Option<i64> {
    evaluator
        .evaluate_annotation_attribute(annotation, name)
        .and_then(|v| v.as_int())
}

fn float_attribute(evaluator: &Evaluator<'_>, annotation: &AnnotationInstance, name: &str) -> Option<f64> {
    evaluator
        .evaluate_annotation_attribute(annotation, name)
        .and_then(|v| v.as_float())
}

fn bool_attribute(evaluator: &Evaluator<'_>, annotation: &AnnotationInstance, name: &str) -> Option<bool> {
    evaluator
        .evaluate_annotation_attribute(annotation, name)
        .and_then(|v| v.as_bool())
}

/// Range error for `value` under an `@IntRange` annotation
pub(crate) fn int_range_error(
    evaluator: &Evaluator<'_>,
    annotation: &AnnotationInstance,
    value: i64,
) -> Option<String> {
    let from = int_attribute(evaluator, annotation, "from").unwrap_or(i64::MIN);
    let to = int_attribute(evaluator, annotation, "to").unwrap_or(i64::MAX);
    get_int_range_error(value, from, to)
}

/// Elements of an array initializer or `new T[] { ... }`
fn array_elements(tree: &Tree, node: NodeId) -> Option<Vec<NodeId>> {
    match tree.node_kind(node) {
        NodeKind::ArrayInit => Some(tree.children(node).to_vec()),
        NodeKind::New => {
            let init = tree
                .children(node)
                .iter()
                .copied()
                .find(|&c| tree.node_kind(c) == NodeKind::ArrayInit)?;
            Some(tree.children(init).to_vec())
        }
        _ => None,
    }
}

/// Constant values at a usage; array initializers are checked element-wise
fn constant_values(ctx: &DetectorContext<'_>, node: NodeId) -> Vec<(NodeId, Literal)> {
    let tree = ctx.tree();
    let evaluator = ctx.evaluator();
    let node = tree.skip_parentheses(node);
    match array_elements(tree, node) {
        Some(elements) => elements
            .into_iter()
            .filter_map(|e| evaluator.evaluate_constant(e).map(|v| (e, v)))
            .collect(),
        None => evaluator
            .evaluate_constant(node)
            .map(|v| vec![(node, v)])
            .unwrap_or_default(),
    }
}

/// Detector for `@IntRange`, `@FloatRange` and `@Size` contracts
pub struct RangeDetector;

impl RangeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Annotation as declared: is the range satisfiable at all
    fn definition_error(evaluator: &Evaluator<'_>, annotation: &AnnotationInstance) -> Option<&'static str> {
        if is_any(annotation, &INT_RANGE) {
            let from = int_attribute(evaluator, annotation, "from").unwrap_or(i64::MIN);
            let to = int_attribute(evaluator, annotation, "to").unwrap_or(i64::MAX);
            return (from > to)
                .then_some("Invalid range: the `from` attribute must be less than the `to` attribute");
        }
        if is_any(annotation, &FLOAT_RANGE) {
            let from = float_attribute(evaluator, annotation, "from").unwrap_or(f64::NEG_INFINITY);
            let to = float_attribute(evaluator, annotation, "to").unwrap_or(f64::INFINITY);
            return (from > to)
                .then_some("Invalid range: the `from` attribute must be less than the `to` attribute");
        }
        if is_any(annotation, &SIZE) {
            let exact = int_attribute(evaluator, annotation, "value");
            let min = int_attribute(evaluator, annotation, "min");
            let max = int_attribute(evaluator, annotation, "max").unwrap_or(i64::MAX);
            let multiple = int_attribute(evaluator, annotation, "multiple").unwrap_or(1);
            if min.unwrap_or(i64::MIN) > max {
                return Some("Invalid size range: the `min` attribute must be less than the `max` attribute");
            }
            if multiple < 1 {
                return Some("The size multiple must be at least 1");
            }
            if exact.is_some_and(|e| e < 0) || min.is_some_and(|m| m < 0) {
                return Some("The size can't be negative");
            }
        }
        None
    }

    /// Errors for the values flowing into an annotated parameter or variable
    fn usage_errors(ctx: &DetectorContext<'_>, usage: &AnnotationUsage<'_>) -> Vec<(NodeId, String)> {
        let annotation = usage.annotation;
        let evaluator = ctx.evaluator();

        if is_any(annotation, &INT_RANGE) {
            // Typedef checks fold the range into their own message
            let siblings = usage_annotations(ctx, usage);
            if siblings.iter().any(|a| is_any(a, &INT_DEF) || is_any(a, &LONG_DEF)) {
                return Vec::new();
            }
            return constant_values(ctx, usage.node)
                .into_iter()
                .filter_map(|(node, value)| {
                    let value = value.as_int()?;
                    int_range_error(evaluator, annotation, value).map(|e| (node, e))
                })
                .collect();
        }

        if is_any(annotation, &FLOAT_RANGE) {
            let from = float_attribute(evaluator, annotation, "from").unwrap_or(f64::NEG_INFINITY);
            let to = float_attribute(evaluator, annotation, "to").unwrap_or(f64::INFINITY);
            let from_inclusive = bool_attribute(evaluator, annotation, "fromInclusive").unwrap_or(true);
            let to_inclusive = bool_attribute(evaluator, annotation, "toInclusive").unwrap_or(true);
            return constant_values(ctx, usage.node)
                .into_iter()
                .filter_map(|(node, value)| {
                    let value = value.as_float()?;
                    get_float_range_error(value, from, to, from_inclusive, to_inclusive).map(|e| (node, e))
                })
                .collect();
        }

        if is_any(annotation, &SIZE) {
            let tree = ctx.tree();
            let node = tree.skip_parentheses(usage.node);
            let actual = match array_elements(tree, node) {
                Some(elements) => Some((elements.len() as i64, "size")),
                None => match evaluator.evaluate_constant(node) {
                    Some(Literal::Str(s)) => Some((s.chars().count() as i64, "length")),
                    _ => None,
                },
            };
            let Some((actual, unit)) = actual else {
                return Vec::new();
            };
            let exact = int_attribute(evaluator, annotation, "value").unwrap_or(-1);
            let min = int_attribute(evaluator, annotation, "min").unwrap_or(i64::MIN);
            let max = int_attribute(evaluator, annotation, "max").unwrap_or(i64::MAX);
            let multiple = int_attribute(evaluator, annotation, "multiple").unwrap_or(1);
            return get_size_error(actual, exact, min, max, multiple, unit)
                .map(|e| vec![(node, e)])
                .unwrap_or_default();
        }

        Vec::new()
    }
}

impl Default for RangeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for RangeDetector {
    fn name(&self) -> &'static str {
        "RangeDetector"
    }

    fn issues(&self) -> Vec<&'static Issue> {
        vec![&RANGE, &INVALID_RANGE]
    }

    fn interests(&self) -> Vec<Interest> {
        annotation_interests(&[INT_RANGE, FLOAT_RANGE, SIZE])
    }

    fn on_annotation(&self, ctx: &mut DetectorContext<'_>, usage: &AnnotationUsage<'_>) -> anyhow::Result<()> {
        match usage.kind {
            UsageKind::Definition => {
                if let Some(message) = Self::definition_error(ctx.evaluator(), usage.annotation) {
                    ctx.report(&INVALID_RANGE, usage.node, message);
                }
            }
            UsageKind::Argument { .. } | UsageKind::Initializer => {
                for (node, message) in Self::usage_errors(ctx, usage) {
                    ctx.report(&RANGE, node, message);
                }
            }
            UsageKind::MethodCall => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::detectors::testing::{java, messages, run};

    #[test]
    fn test_int_range_bounds_are_inclusive() {
        assert_eq!(get_int_range_error(5, 1, 10), None);
        assert_eq!(get_int_range_error(1, 1, 10), None);
        assert_eq!(get_int_range_error(10, 1, 10), None);

        let below = get_int_range_error(0, 1, 10).unwrap();
        assert!(below.contains("≥ 1"));
        assert_eq!(below, "Value must be ≥ 1 (was 0)");
        let above = get_int_range_error(11, 1, 10).unwrap();
        assert!(above.contains("≤ 10"));
    }

    #[test]
    fn test_float_range_exclusive_bounds() {
        assert_eq!(get_float_range_error(2.5, 2.5, 7.0, true, true), None);
        assert_eq!(
            get_float_range_error(2.5, 2.5, 7.0, false, true).as_deref(),
            Some("Value must be > 2.5 (was 2.5)")
        );
        assert_eq!(
            get_float_range_error(7.0, 2.5, 7.0, true, false).as_deref(),
            Some("Value must be < 7.0 (was 7.0)")
        );
        assert_eq!(
            get_float_range_error(2.49, 2.5, 7.0, true, true).as_deref(),
            Some("Value must be ≥ 2.5 (was 2.49)")
        );
        assert_eq!(get_float_range_error(1e9, f64::NEG_INFINITY, f64::INFINITY, true, true), None);
    }

    #[test]
    fn test_size_errors() {
        assert_eq!(
            get_size_error(4, 5, i64::MIN, i64::MAX, 1, "length").as_deref(),
            Some("Expected length 5 (was 4)")
        );
        assert_eq!(
            get_size_error(3, -1, 4, i64::MAX, 1, "size").as_deref(),
            Some("Expected size ≥ 4 (was 3)")
        );
        assert_eq!(
            get_size_error(7, -1, i64::MIN, i64::MAX, 3, "size").as_deref(),
            Some("Expected size to be a multiple of 3 (was 7 and should be either 6 or 9)")
        );
        assert_eq!(get_size_error(6, -1, i64::MIN, i64::MAX, 3, "size"), None);
    }

    #[test]
    fn test_int_range_arguments() {
        let tree = java(
            "src/test/pkg/RangeTest.java",
            r#"package test.pkg;
import androidx.annotation.IntRange;

public class RangeTest {
    public void setAlpha(@IntRange(from = 0, to = 255) int alpha) {}

    public void test() {
        setAlpha(100);
        setAlpha(300);
        setAlpha(-1);
        setAlpha(255);
    }
}
"#,
        );
        let report = run(Box::new(RangeDetector::new()), vec![tree]);
        assert_eq!(
            messages(&report, "Range"),
            vec!["Value must be ≤ 255 (was 300)", "Value must be ≥ 0 (was -1)"]
        );
        assert!(messages(&report, "InvalidRange").is_empty());
    }

    #[test]
    fn test_range_through_constants_and_initializers() {
        let tree = java(
            "src/test/pkg/Levels.java",
            r#"package test.pkg;
import androidx.annotation.IntRange;

public class Levels {
    private static final int MAX = 8;
    @IntRange(from = 1, to = 10) private int level = 11;

    void setLevel(@IntRange(from = 1, to = MAX) int level) {}

    void test() {
        setLevel(MAX + 1);
        setLevel(MAX);
    }
}
"#,
        );
        let report = run(Box::new(RangeDetector::new()), vec![tree]);
        assert_eq!(
            messages(&report, "Range"),
            vec!["Value must be ≤ 10 (was 11)", "Value must be ≤ 8 (was 9)"]
        );
    }

    #[test]
    fn test_float_range_and_size() {
        let tree = java(
            "src/test/pkg/SizeTest.java",
            r#"package test.pkg;
import androidx.annotation.FloatRange;
import androidx.annotation.Size;

class SizeTest {
    void setScale(@FloatRange(from = 0.0, to = 1.0, toInclusive = false) float scale) {}
    void setCode(@Size(5) String code) {}
    void setPair(@Size(min = 2, max = 2) int[] pair) {}

    void test() {
        setScale(0.5f);
        setScale(1.0f);
        setCode("1234");
        setCode("12345");
        setPair(new int[] {1, 2, 3});
    }
}
"#,
        );
        let report = run(Box::new(RangeDetector::new()), vec![tree]);
        assert_eq!(
            messages(&report, "Range"),
            vec![
                "Value must be < 1.0 (was 1.0)",
                "Expected length 5 (was 4)",
                "Expected size ≤ 2 (was 3)",
            ]
        );
    }

    #[test]
    fn test_invalid_range_declarations() {
        let tree = java(
            "src/test/pkg/WrongUsages.java",
            r#"package test.pkg;
import androidx.annotation.IntRange;
import androidx.annotation.Size;

class WrongUsages {
    void a(@IntRange(from = 10, to = 1) int x) {}
    void b(@Size(min = 5, max = 2) int[] x) {}
    void c(@Size(multiple = 0) int[] x) {}
    void d(@Size(-3) int[] x) {}
    void e(@IntRange(from = 1, to = 10) int x) {}
}
"#,
        );
        let report = run(Box::new(RangeDetector::new()), vec![tree]);
        assert_eq!(
            messages(&report, "InvalidRange"),
            vec![
                "Invalid range: the `from` attribute must be less than the `to` attribute",
                "Invalid size range: the `min` attribute must be less than the `max` attribute",
                "The size multiple must be at least 1",
                "The size can't be negative",
            ]
        );
    }
}
