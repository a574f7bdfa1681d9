//! Typedef Detector
//!
//! `@IntDef`, `@LongDef` and `@StringDef` turn a plain `int`, `long` or
//! `String` into a closed set of named constants. This detector checks the
//! set itself for duplicate values, every argument and initializer flowing
//! into an annotated element, and `switch` statements over such values for
//! missing cases.
//!
//! ## Anti-Pattern
//!
//! ```java
//! @IntDef({MODE_ON, MODE_OFF})
//! @interface Mode {}
//!
//! void setMode(@Mode int mode) { ... }
//!
//! setMode(1);                    // magic number instead of MODE_ON
//! setMode(MODE_ON | MODE_OFF);   // not a flag typedef
//!
//! switch (mode) {
//!     case MODE_ON: ...          // MODE_OFF silently falls through
//! }
//! ```
//!
//! ## Why It's Bad
//!
//! - Literal values break as soon as the constants are renumbered
//! - Values from an unrelated set compile fine but mean something else
//! - A missing case is usually a forgotten branch, not an intended no-op
//!
//! ## Better Alternatives
//!
//! ```java
//! setMode(MODE_ON);
//!
//! switch (mode) {
//!     case MODE_ON: ...
//!     case MODE_OFF: ...
//! }
//! ```

use super::range::int_range_error;
use super::{
    annotation_interests, is_any, short_field_name, usage_annotations, INT_DEF, INT_RANGE, LONG_DEF,
    STRING_DEF,
};
use crate::analysis::{
    AnnotationUsage, Detector, DetectorContext, Finding, Fix, Interest, Trigger, UsageKind,
};
use crate::evaluator::{EvalScope, Evaluator};
use crate::issues::{Category, Implementation, Issue, ScopeSet, Severity};
use crate::model::{AnnotationInstance, ClassKind, Declaration, Expr, Literal, Location, NodeId, NodeKind};

const IMPLEMENTATION: Implementation = Implementation::new("TypedefDetector", ScopeSet::JAVA_FILE);

/// Reference chains followed before giving up
const MAX_DEPTH: usize = 16;

const MISSING_CASE_PREFIX: &str =
    "Switch statement on an `int` with known associated constant missing case ";

pub static UNIQUE: Issue = Issue::create(
    "UniqueConstants",
    "Overlapping Enumeration Constants",
    "The `@IntDef` annotation allows you to create a light-weight \"enum\" or type \
     definition. However, it's possible to accidentally specify the same value for \
     two or more of the values, which can lead to hard-to-detect bugs. This check \
     looks for this scenario and flags any repeated constants.",
    Category::Correctness,
    3,
    Severity::Error,
    IMPLEMENTATION,
);

pub static TYPE_DEF: Issue = Issue::create(
    "WrongConstant",
    "Incorrect constant",
    "Ensures that when a parameter in a method only allows a specific set of \
     constants, calls obey those rules.",
    Category::Correctness,
    6,
    Severity::Error,
    IMPLEMENTATION,
);

pub static SWITCH_TYPE_DEF: Issue = Issue::create(
    "SwitchIntDef",
    "Missing @IntDef in Switch",
    "This check warns if a `switch` statement does not explicitly include all the \
     values declared by the typedef `@IntDef` declaration.",
    Category::Correctness,
    3,
    Severity::Warning,
    IMPLEMENTATION,
);

/// One member of a typedef's allowed set
#[derive(Debug, Clone)]
struct Constant {
    expr: Expr,
    /// Owner class and name, when the member is a field reference
    field: Option<(String, String)>,
    value: Option<Literal>,
}

impl Constant {
    fn display(&self) -> String {
        match &self.field {
            Some((owner, name)) => short_field_name(owner, name),
            None => self.expr.to_string(),
        }
    }

    fn is_field(&self, owner: &str, name: &str) -> bool {
        self.field
            .as_ref()
            .is_some_and(|(o, n)| o == owner && n == name)
    }

    /// Fields compare by identity, literals by value
    fn same_as(&self, other: &Constant) -> bool {
        match (&self.field, &other.field) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.value.is_some() && self.value == other.value,
            _ => false,
        }
    }
}

/// A typedef annotation with its allowed set evaluated
#[derive(Debug, Clone)]
struct TypeDef {
    constants: Vec<Constant>,
    flag: bool,
    open: bool,
}

impl TypeDef {
    fn of(evaluator: &Evaluator<'_>, annotation: &AnnotationInstance) -> Option<Self> {
        let numeric = is_any(annotation, &INT_DEF) || is_any(annotation, &LONG_DEF);
        if !numeric && !is_any(annotation, &STRING_DEF) {
            return None;
        }
        let scope = evaluator.annotation_scope(annotation);
        let items = match annotation.value() {
            Some(Expr::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => Vec::new(),
        };
        let constants = items
            .into_iter()
            .map(|expr| {
                let field = match evaluator.resolve_field(&expr, &scope) {
                    Some(Declaration::Field { owner, name }) => Some((owner, name)),
                    _ => None,
                };
                let value = evaluator.evaluate_expr(&expr, &scope);
                Constant { expr, field, value }
            })
            .collect();
        let flag_of = |name: &str| {
            evaluator
                .evaluate_annotation_attribute(annotation, name)
                .and_then(|v| v.as_bool())
                .unwrap_or(false)
        };
        Some(Self {
            constants,
            flag: numeric && flag_of("flag"),
            open: flag_of("open"),
        })
    }

    /// First typedef among `annotations`
    fn find(evaluator: &Evaluator<'_>, annotations: &[AnnotationInstance]) -> Option<Self> {
        annotations.iter().find_map(|a| Self::of(evaluator, a))
    }

    fn contains_field(&self, owner: &str, name: &str) -> bool {
        self.constants.iter().any(|c| c.is_field(owner, name))
    }

    fn contains_literal(&self, value: &Literal) -> bool {
        self.constants
            .iter()
            .any(|c| c.field.is_none() && c.value.as_ref().is_some_and(|v| v.same_value(value)))
    }

    fn display(&self) -> String {
        self.constants
            .iter()
            .map(Constant::display)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn display_ticked(&self) -> String {
        self.constants
            .iter()
            .map(|c| format!("`{}`", c.display()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Why a value does not belong to the allowed set
#[derive(Debug)]
enum Violation {
    Flag,
    Value {
        value: Option<Literal>,
        /// Members of the value's own typedef outside the allowed set
        unmatched: Vec<String>,
    },
}

/// Checks one expression against one typedef
struct ValueChecker<'e, 'a> {
    evaluator: &'e Evaluator<'a>,
    typedef: &'e TypeDef,
    range: Option<&'e AnnotationInstance>,
}

impl ValueChecker<'_, '_> {
    fn check_node(&self, node: NodeId) -> Result<(), Violation> {
        let tree = self.evaluator.tree();
        let node = tree.skip_parentheses(node);
        if tree.node_kind(node) == NodeKind::Call {
            let Some(method) = self.evaluator.resolve_call(node) else {
                return Ok(());
            };
            return match TypeDef::find(self.evaluator, &self.evaluator.method_annotations(&method)) {
                Some(other) => self.compare(&other),
                None => Ok(()),
            };
        }
        self.check(&Expr::from_node(tree, node), &EvalScope::Node(node), 0)
    }

    fn check(&self, expr: &Expr, scope: &EvalScope, depth: usize) -> Result<(), Violation> {
        if depth > MAX_DEPTH {
            return Ok(());
        }
        let next = depth + 1;
        let flag = self.typedef.flag;
        match expr {
            Expr::Literal(Literal::Null) => Ok(()),
            Expr::Literal(literal) => self.check_literal(literal),
            Expr::Unary { op, operand } => {
                if flag {
                    if op == "-" && operand.literal().and_then(Literal::as_int) == Some(1) {
                        return Ok(());
                    }
                    return self.check(operand, scope, next);
                }
                match op.as_str() {
                    "~" => Err(Violation::Flag),
                    "-" => self.check_folded(expr, scope),
                    _ => self.check(operand, scope, next),
                }
            }
            Expr::Conditional { then, otherwise, .. } => {
                self.check(then, scope, next)?;
                self.check(otherwise, scope, next)
            }
            Expr::Cast { operand, .. } => self.check(operand, scope, next),
            Expr::Binary { op, lhs, rhs } => match op.as_str() {
                "&" | "|" | "^" if flag => {
                    if op == "&" && (is_mask(lhs) || is_mask(rhs)) {
                        return Ok(());
                    }
                    self.check(lhs, scope, next)?;
                    self.check(rhs, scope, next)
                }
                "&" | "|" | "^" => Err(Violation::Flag),
                _ => self.check_folded(expr, scope),
            },
            Expr::Reference { qualifier, name } => {
                self.check_reference(expr, qualifier.as_deref(), name, scope, next)
            }
            Expr::Array(_) | Expr::Unknown => Ok(()),
        }
    }

    /// Arithmetic and negation: judge the folded value, if any
    fn check_folded(&self, expr: &Expr, scope: &EvalScope) -> Result<(), Violation> {
        match self.evaluator.evaluate_expr(expr, scope) {
            Some(value) => self.check_literal(&value),
            None => Ok(()),
        }
    }

    fn check_literal(&self, literal: &Literal) -> Result<(), Violation> {
        if self.typedef.flag && literal.as_int() == Some(0) {
            return Ok(());
        }
        if self.typedef.contains_literal(literal) || self.in_range(Some(literal)) {
            return Ok(());
        }
        Err(Violation::Value {
            value: Some(literal.clone()),
            unmatched: Vec::new(),
        })
    }

    fn in_range(&self, value: Option<&Literal>) -> bool {
        match (self.range, value.and_then(Literal::as_int)) {
            (Some(range), Some(value)) => int_range_error(self.evaluator, range, value).is_none(),
            _ => false,
        }
    }

    fn check_reference(
        &self,
        expr: &Expr,
        qualifier: Option<&str>,
        name: &str,
        scope: &EvalScope,
        depth: usize,
    ) -> Result<(), Violation> {
        let evaluator = self.evaluator;
        let tree = evaluator.tree();

        if let (EvalScope::Node(at), None) = (scope, qualifier) {
            if let Some(decl) = tree.resolve_local(name, *at) {
                let kind = tree.node_kind(decl);
                if matches!(kind, NodeKind::Parameter | NodeKind::LocalVariable) {
                    if let Some(other) = TypeDef::find(evaluator, &evaluator.node_annotations(decl)) {
                        return self.compare(&other);
                    }
                    if kind == NodeKind::LocalVariable {
                        if let Some(init) = tree.initializer(decl) {
                            let init_expr = Expr::from_node(tree, init);
                            return self.check(&init_expr, &EvalScope::Node(init), depth);
                        }
                    }
                    return Ok(());
                }
            }
        }

        let Some(Declaration::Field { owner, name }) = evaluator.resolve_field(expr, scope) else {
            return Ok(());
        };
        if self.typedef.contains_field(&owner, &name) {
            return Ok(());
        }
        let Some((class, field)) = evaluator.symbols().find_field(&owner, &name) else {
            return Ok(());
        };
        if field.type_name.as_deref().is_some_and(|t| t.ends_with("[]")) {
            return Ok(());
        }
        let declaration = Declaration::Field {
            owner: owner.clone(),
            name: name.clone(),
        };
        if let Some(other) = TypeDef::find(evaluator, &evaluator.all_annotations(&declaration, false)) {
            return self.compare(&other);
        }
        let constant = (field.modifiers.is_static && field.modifiers.is_final)
            || class.kind == ClassKind::Interface;
        if !constant {
            return Ok(());
        }

        let value = evaluator.evaluate_expr(expr, scope);
        if self.range.is_some() {
            if self.in_range(value.as_ref()) {
                return Ok(());
            }
        } else if let Some(init) = field
            .initializer
            .as_ref()
            .filter(|i| !matches!(i, Expr::Literal(_)))
        {
            // `static final int MY_MODE = Widget.MODE_ON` is an alias
            return self.check(init, &EvalScope::Class(class.name.clone()), depth);
        }
        Err(Violation::Value {
            value,
            unmatched: Vec::new(),
        })
    }

    /// A value typed by another typedef is fine when its set is a subset
    fn compare(&self, other: &TypeDef) -> Result<(), Violation> {
        let unmatched: Vec<String> = other
            .constants
            .iter()
            .filter(|c| !self.typedef.constants.iter().any(|d| d.same_as(c)))
            .map(Constant::display)
            .collect();
        if unmatched.is_empty() {
            return Ok(());
        }
        let partial = unmatched.len() < other.constants.len();
        Err(Violation::Value {
            value: None,
            unmatched: if partial { unmatched } else { Vec::new() },
        })
    }

    fn message(&self, violation: &Violation) -> String {
        let Violation::Value { value, unmatched } = violation else {
            return "Flag not allowed here".to_string();
        };
        let lead = if self.typedef.flag {
            "Must be one or more of: "
        } else {
            "Must be one of: "
        };
        let mut message = format!("{}{}", lead, self.typedef.display());
        if !unmatched.is_empty() {
            message.push_str(", but could be ");
            message.push_str(&unmatched.join(", "));
        }
        let range_error = match (self.range, value.as_ref().and_then(Literal::as_int)) {
            (Some(range), Some(v)) => int_range_error(self.evaluator, range, v),
            _ => None,
        };
        if let Some(error) = range_error {
            message.push_str(" or ");
            message.push_str(&lowercase_first(&error));
        }
        message
    }

    /// Replace a bare value with the constant that has it
    fn fix(&self, violation: &Violation) -> Option<Fix> {
        let Violation::Value { value: Some(value), .. } = violation else {
            return None;
        };
        let constant = self
            .typedef
            .constants
            .iter()
            .find(|c| c.field.is_some() && c.value.as_ref() == Some(value))?;
        let (owner, name) = constant.field.as_ref()?;
        Some(Fix::replace(
            format!("Change to {}", constant.display()),
            format!("{}.{}", owner, name),
        ))
    }
}

fn is_mask(expr: &Expr) -> bool {
    matches!(expr, Expr::Reference { name, .. } if name.to_lowercase().contains("mask"))
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Value node of an annotation's `value` attribute
fn annotation_value_node(evaluator: &Evaluator<'_>, annotation: NodeId) -> Option<NodeId> {
    let tree = evaluator.tree();
    tree.children(annotation)
        .iter()
        .copied()
        .filter(|&c| tree.node_kind(c) == NodeKind::AnnotationArgument)
        .find(|&c| matches!(tree.name(c), None | Some("value")))
        .and_then(|arg| tree.children(arg).first().copied())
}

/// Detector for `@IntDef`, `@LongDef` and `@StringDef` typedefs
pub struct TypedefDetector;

impl TypedefDetector {
    pub fn new() -> Self {
        Self
    }

    /// First repeated value in the typedef's own list
    fn duplicate(evaluator: &Evaluator<'_>, annotation: NodeId) -> Option<(NodeId, NodeId, String)> {
        let tree = evaluator.tree();
        let array = tree.skip_parentheses(annotation_value_node(evaluator, annotation)?);
        if tree.node_kind(array) != NodeKind::ArrayInit {
            return None;
        }

        let mut seen: Vec<(NodeId, Literal)> = Vec::new();
        for &item in tree.children(array) {
            let item = tree.skip_parentheses(item);
            let Some(value) = evaluator.evaluate_constant(item) else {
                continue;
            };
            let Some(&(previous, _)) = seen.iter().find(|(_, v)| v.same_value(&value)) else {
                seen.push((item, value));
                continue;
            };

            let current_text = tree.source_text(item).unwrap_or_default();
            let previous_text = tree.source_text(previous).unwrap_or_default();
            if current_text == previous_text {
                let message = format!("Constant `{}` has already been included", current_text);
                return Some((item, previous, message));
            }
            // Same constant reached through another class
            if let (Some(Declaration::Field { name: a, .. }), Some(Declaration::Field { name: b, .. })) =
                (evaluator.resolve(item), evaluator.resolve(previous))
            {
                if a == b {
                    return None;
                }
            }
            let message = format!(
                "Constants `{}` and `{}` specify the same exact value ({}); this is usually a cut & paste or merge error",
                current_text, previous_text, value
            );
            return Some((item, previous, message));
        }
        None
    }

    fn check_usage(ctx: &mut DetectorContext<'_>, usage: &AnnotationUsage<'_>) {
        let evaluator = *ctx.evaluator();
        let tree = evaluator.tree();
        let Some(typedef) = TypeDef::of(&evaluator, usage.annotation) else {
            return;
        };
        if typedef.open {
            return;
        }

        if matches!(usage.kind, UsageKind::Initializer) {
            if let Some(variable) = tree.parent(usage.node) {
                // The constants themselves may carry the annotation
                if let Some(Declaration::Field { owner, name }) = evaluator.resolve(variable) {
                    if tree.node_kind(variable) == NodeKind::Field && typedef.contains_field(&owner, &name) {
                        return;
                    }
                }
                let data = tree.node(usage.node);
                if data.kind == NodeKind::Literal && data.literal.as_ref().and_then(Literal::as_int) == Some(0) {
                    return;
                }
            }
        }

        let siblings = usage_annotations(ctx, usage);
        let checker = ValueChecker {
            evaluator: &evaluator,
            typedef: &typedef,
            range: siblings.iter().find(|a| is_any(a, &INT_RANGE)),
        };
        let Err(violation) = checker.check_node(usage.node) else {
            return;
        };

        let mut finding = ctx.finding(&TYPE_DEF, usage.node, checker.message(&violation));
        if let Some(fix) = checker.fix(&violation) {
            finding = finding.with_fix(fix);
        }
        ctx.report_finding(finding);
    }

    /// Typedef carried by the value a switch selects on
    fn selector_typedef(evaluator: &Evaluator<'_>, node: NodeId, depth: usize) -> Option<TypeDef> {
        if depth > MAX_DEPTH {
            return None;
        }
        let tree = evaluator.tree();
        let node = tree.skip_parentheses(node);
        if tree.node_kind(node) == NodeKind::Call {
            let method = evaluator.resolve_call(node)?;
            return TypeDef::find(evaluator, &evaluator.method_annotations(&method));
        }
        match evaluator.resolve(node)? {
            Declaration::Local(decl) => {
                if let Some(typedef) = TypeDef::find(evaluator, &evaluator.node_annotations(decl)) {
                    return Some(typedef);
                }
                if tree.node_kind(decl) != NodeKind::LocalVariable {
                    return None;
                }
                Self::selector_typedef(evaluator, tree.initializer(decl)?, depth + 1)
            }
            declaration => TypeDef::find(evaluator, &evaluator.all_annotations(&declaration, true)),
        }
    }

    fn check_switch(ctx: &mut DetectorContext<'_>, switch: NodeId) {
        let evaluator = *ctx.evaluator();
        let tree = evaluator.tree();
        let Some((&selector, cases)) = tree.children(switch).split_first() else {
            return;
        };
        let Some(typedef) = Self::selector_typedef(&evaluator, selector, 0) else {
            return;
        };
        if typedef.constants.is_empty() {
            return;
        }

        let mut remaining: Vec<&Constant> = typedef.constants.iter().collect();
        let mut seen_values: Vec<Literal> = Vec::new();
        let mut has_default = false;
        let mut reports: Vec<(NodeId, String)> = Vec::new();

        'cases: for &case in cases {
            if tree.node_kind(case) != NodeKind::Case {
                continue;
            }
            has_default |= tree.name(case) == Some("default");
            for &label in tree.children(case) {
                if tree.node_kind(label) == NodeKind::Block {
                    continue;
                }
                let label = tree.skip_parentheses(label);
                match tree.node_kind(label) {
                    NodeKind::Literal => {
                        reports.push((
                            label,
                            format!(
                                "Don't use a constant here; expected one of: {}",
                                typedef.display_ticked()
                            ),
                        ));
                        // Missing cases are meaningless once literals are in play
                        remaining.clear();
                        break 'cases;
                    }
                    NodeKind::Reference | NodeKind::Select => {
                        let expr = Expr::from_node(tree, label);
                        let scope = EvalScope::Node(label);
                        let Some(Declaration::Field { owner, name }) = evaluator.resolve_field(&expr, &scope) else {
                            continue;
                        };
                        if let Some(value) = evaluator.evaluate_expr(&expr, &scope) {
                            seen_values.push(value);
                        }
                        if typedef.contains_field(&owner, &name) {
                            remaining.retain(|c| !c.is_field(&owner, &name));
                        } else if let Some((alias_owner, alias_name)) = Self::alias_of(&evaluator, &owner, &name) {
                            remaining.retain(|c| !c.is_field(&alias_owner, &alias_name));
                        } else {
                            reports.push((
                                label,
                                format!("Unexpected constant; expected one of: {}", typedef.display_ticked()),
                            ));
                        }
                    }
                    _ => {}
                }
            }
        }

        for (node, message) in reports {
            ctx.report(&SWITCH_TYPE_DEF, node, message);
        }
        if has_default {
            return;
        }
        remaining.retain(|c| c.value.as_ref().map_or(true, |v| !seen_values.iter().any(|s| s.same_value(v))));
        if remaining.is_empty() {
            return;
        }

        let full = ctx.location(switch);
        let keyword = Location {
            end: (full.start + "switch".len()).min(full.end),
            ..full
        };
        for constant in remaining {
            let item = format!("`{}`", constant.display());
            let finding = Finding::new(
                &SWITCH_TYPE_DEF,
                keyword.clone(),
                format!("{}{}", MISSING_CASE_PREFIX, item),
            )
            .anchored(switch)
            .mergeable(MISSING_CASE_PREFIX, item);
            ctx.report_finding(finding);
        }
    }

    /// Field whose initializer names another field
    fn alias_of(evaluator: &Evaluator<'_>, owner: &str, name: &str) -> Option<(String, String)> {
        let (class, field) = evaluator.symbols().find_field(owner, name)?;
        let init = field.initializer.as_ref()?;
        match evaluator.resolve_field(init, &EvalScope::Class(class.name.clone()))? {
            Declaration::Field { owner, name } => Some((owner, name)),
            _ => None,
        }
    }
}

impl Default for TypedefDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for TypedefDetector {
    fn name(&self) -> &'static str {
        "TypedefDetector"
    }

    fn issues(&self) -> Vec<&'static Issue> {
        vec![&UNIQUE, &TYPE_DEF, &SWITCH_TYPE_DEF]
    }

    fn interests(&self) -> Vec<Interest> {
        let mut interests = annotation_interests(&[INT_DEF, LONG_DEF, STRING_DEF]);
        interests.push(Interest::source(Trigger::Exit(NodeKind::Switch)));
        interests
    }

    fn on_annotation(&self, ctx: &mut DetectorContext<'_>, usage: &AnnotationUsage<'_>) -> anyhow::Result<()> {
        match usage.kind {
            UsageKind::Definition => {
                let numeric = is_any(usage.annotation, &INT_DEF) || is_any(usage.annotation, &LONG_DEF);
                if !numeric {
                    return Ok(());
                }
                if let Some((item, previous, message)) = Self::duplicate(ctx.evaluator(), usage.node) {
                    let finding = ctx
                        .finding(&UNIQUE, item, message)
                        .with_secondary(ctx.location(previous));
                    ctx.report_finding(finding);
                }
            }
            UsageKind::Argument { .. } | UsageKind::Initializer => Self::check_usage(ctx, usage),
            UsageKind::MethodCall => {}
        }
        Ok(())
    }

    fn on_exit(&self, ctx: &mut DetectorContext<'_>, node: NodeId) -> anyhow::Result<()> {
        Self::check_switch(ctx, node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::detectors::testing::{java, messages, run};

    const WIDGET: &str = r#"package test.pkg;
import androidx.annotation.IntDef;
import java.lang.annotation.Retention;
import java.lang.annotation.RetentionPolicy;

public class Widget {
    public static final int MODE_A = 0;
    public static final int MODE_B = 1;
    public static final int UNRELATED = 5;
    public static final int FLAG_X = 1;
    public static final int FLAG_Y = 2;

    @IntDef({MODE_A, MODE_B})
    @Retention(RetentionPolicy.SOURCE)
    public @interface Mode {}

    @IntDef({MODE_A, UNRELATED})
    public @interface Other {}

    @IntDef(flag = true, value = {FLAG_X, FLAG_Y})
    public @interface Flags {}

    public void setMode(@Mode int mode) {}
    public void setFlags(@Flags int flags) {}

"#;

    fn widget(body: &str) -> crate::model::Tree {
        java("src/test/pkg/Widget.java", &format!("{}{}\n}}\n", WIDGET, body))
    }

    #[test]
    fn test_unique_constants_duplicate_value() {
        let tree = java(
            "src/test/pkg/Kinds.java",
            r#"package test.pkg;
import androidx.annotation.IntDef;

public class Kinds {
    public static final int A = 1;
    public static final int B = 2;
    public static final int C = 2;

    @IntDef({A, B, C})
    public @interface Kind {}
}
"#,
        );
        let report = run(Box::new(TypedefDetector::new()), vec![tree]);
        let unique: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.issue.id == "UniqueConstants")
            .collect();
        assert_eq!(unique.len(), 1);
        assert_eq!(
            unique[0].message,
            "Constants `C` and `B` specify the same exact value (2); this is usually a cut & paste or merge error"
        );
        assert_eq!(unique[0].secondary.len(), 1);
        assert!(unique[0].secondary[0].start < unique[0].location.start);
    }

    #[test]
    fn test_unique_constants_repeated_reference() {
        let tree = java(
            "src/test/pkg/Kinds.java",
            r#"package test.pkg;
import androidx.annotation.IntDef;

public class Kinds {
    public static final int A = 1;
    public static final int B = 2;

    @IntDef({A, B, A})
    public @interface Kind {}
}
"#,
        );
        let report = run(Box::new(TypedefDetector::new()), vec![tree]);
        assert_eq!(
            messages(&report, "UniqueConstants"),
            vec!["Constant `A` has already been included"]
        );
    }

    #[test]
    fn test_wrong_constant_arguments() {
        let tree = widget(
            r#"    public void test() {
        setMode(MODE_A);
        setMode(1);
        setMode(UNRELATED);
        setMode(Widget.MODE_B);
    }"#,
        );
        let report = run(Box::new(TypedefDetector::new()), vec![tree]);
        assert_eq!(
            messages(&report, "WrongConstant"),
            vec![
                "Must be one of: Widget.MODE_A, Widget.MODE_B",
                "Must be one of: Widget.MODE_A, Widget.MODE_B",
            ]
        );
        let literal = report
            .findings
            .iter()
            .find(|f| f.issue.id == "WrongConstant")
            .unwrap();
        let fix = literal.fix.as_ref().unwrap();
        assert_eq!(fix.description, "Change to Widget.MODE_B");
        assert_eq!(fix.replacement.as_deref(), Some("test.pkg.Widget.MODE_B"));
    }

    #[test]
    fn test_flags_and_flag_misuse() {
        let tree = widget(
            r#"    public void test() {
        setFlags(FLAG_X | FLAG_Y);
        setFlags(0);
        setFlags(FLAG_X | 8);
        setMode(MODE_A | MODE_B);
    }"#,
        );
        let report = run(Box::new(TypedefDetector::new()), vec![tree]);
        assert_eq!(
            messages(&report, "WrongConstant"),
            vec![
                "Must be one or more of: Widget.FLAG_X, Widget.FLAG_Y",
                "Flag not allowed here",
            ]
        );
    }

    #[test]
    fn test_values_typed_by_another_typedef() {
        let tree = widget(
            r#"    public void forward(@Mode int mode) {
        setMode(mode);
    }

    public void convert(@Other int other) {
        setMode(other);
    }

    public void local() {
        int mode = MODE_B;
        setMode(mode);
        int wrong = UNRELATED;
        setMode(wrong);
    }"#,
        );
        let report = run(Box::new(TypedefDetector::new()), vec![tree]);
        assert_eq!(
            messages(&report, "WrongConstant"),
            vec![
                "Must be one of: Widget.MODE_A, Widget.MODE_B, but could be Widget.UNRELATED",
                "Must be one of: Widget.MODE_A, Widget.MODE_B",
            ]
        );
    }

    #[test]
    fn test_switch_missing_case() {
        let tree = widget(
            r#"    public void handle(@Mode int mode) {
        switch (mode) {
            case MODE_A:
                break;
        }
    }

    public void complete(@Mode int mode) {
        switch (mode) {
            case MODE_A:
            case MODE_B:
                break;
        }
    }

    public void fallback(@Mode int mode) {
        switch (mode) {
            case MODE_A:
                break;
            default:
                break;
        }
    }"#,
        );
        let report = run(Box::new(TypedefDetector::new()), vec![tree]);
        let missing: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.issue.id == "SwitchIntDef")
            .collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(
            missing[0].message,
            "Switch statement on an `int` with known associated constant missing case `Widget.MODE_B`"
        );
        assert_eq!(missing[0].location.end - missing[0].location.start, 6);
    }

    #[test]
    fn test_switch_literal_label() {
        let tree = widget(
            r#"    public void handle(@Mode int mode) {
        switch (mode) {
            case 5:
                break;
        }
    }"#,
        );
        let report = run(Box::new(TypedefDetector::new()), vec![tree]);
        assert_eq!(
            messages(&report, "SwitchIntDef"),
            vec!["Don't use a constant here; expected one of: `Widget.MODE_A`, `Widget.MODE_B`"]
        );
    }

    #[test]
    fn test_open_typedef_accepts_anything() {
        let tree = java(
            "src/test/pkg/Open.java",
            r#"package test.pkg;
import androidx.annotation.IntDef;

public class Open {
    public static final int A = 0;

    @IntDef(value = {A}, open = true)
    public @interface Kind {}

    void set(@Kind int kind) {}

    void test() {
        set(42);
    }
}
"#,
        );
        let report = run(Box::new(TypedefDetector::new()), vec![tree]);
        assert!(messages(&report, "WrongConstant").is_empty());
    }

    #[test]
    fn test_lowercase_first() {
        assert_eq!(lowercase_first("Value must be ≥ 1 (was 0)"), "value must be ≥ 1 (was 0)");
        assert_eq!(lowercase_first(""), "");
    }
}
