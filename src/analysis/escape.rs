//! Resource escape analysis
//!
//! Starting at an allocation, follow the value through the enclosing method
//! until it is cleaned up, escapes (returned, stored in a field, handed to
//! another method), or the scope ends. Aliases introduced by local
//! assignments are tracked; reassigning an alias does not stop tracking it,
//! which errs towards "escaped" over false leak reports.

use crate::evaluator::{Evaluator, MethodRef};
use crate::model::{Declaration, NodeId, NodeKind};
use std::collections::HashSet;

/// Result of following a tracked value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeOutcome {
    CleanedUp,
    Escaped,
    /// Neither cleaned up nor escaped; worth a finding
    Leaked,
}

type MethodPredicate<'p> = &'p dyn Fn(&MethodRef<'_>) -> bool;

pub struct EscapeTracker<'p, 'a> {
    evaluator: Evaluator<'a>,
    is_cleanup: MethodPredicate<'p>,
    non_escaping: Option<MethodPredicate<'p>>,
}

impl<'p, 'a> EscapeTracker<'p, 'a> {
    pub fn new(evaluator: Evaluator<'a>, is_cleanup: MethodPredicate<'p>) -> Self {
        Self {
            evaluator,
            is_cleanup,
            non_escaping: None,
        }
    }

    /// Calls that receive the value without keeping it
    pub fn with_non_escaping(mut self, non_escaping: MethodPredicate<'p>) -> Self {
        self.non_escaping = Some(non_escaping);
        self
    }

    /// Decide what happens to the value produced at `allocation`
    pub fn analyze_allocation(&self, allocation: NodeId) -> EscapeOutcome {
        let tree = self.evaluator.tree();
        let mut expr = allocation;
        loop {
            let Some(parent) = tree.parent(expr) else {
                return EscapeOutcome::Leaked;
            };
            let data = tree.node(parent);
            match data.kind {
                NodeKind::Parenthesized | NodeKind::Cast => expr = parent,
                NodeKind::Conditional if data.children.first() != Some(&expr) => expr = parent,
                NodeKind::Call if data.qualifier == Some(expr) => {
                    // Chained directly on the allocation
                    let cleaned = self
                        .evaluator
                        .resolve_call(parent)
                        .is_some_and(|m| (self.is_cleanup)(&m));
                    return if cleaned {
                        EscapeOutcome::CleanedUp
                    } else {
                        EscapeOutcome::Leaked
                    };
                }
                NodeKind::Call => {
                    return if self.call_keeps_value(parent) {
                        EscapeOutcome::Escaped
                    } else {
                        EscapeOutcome::Leaked
                    };
                }
                NodeKind::New
                | NodeKind::Return
                | NodeKind::Lambda
                | NodeKind::ArrayInit
                | NodeKind::Field => return EscapeOutcome::Escaped,
                NodeKind::Assignment => {
                    let target = data.children.first().copied();
                    if target == Some(expr) {
                        return EscapeOutcome::Leaked;
                    }
                    return match target.and_then(|t| self.evaluator.resolve(t)) {
                        Some(Declaration::Local(variable)) => self.track(variable),
                        _ => EscapeOutcome::Escaped,
                    };
                }
                NodeKind::LocalVariable => {
                    if tree.parent(parent).map(|p| tree.node_kind(p)) == Some(NodeKind::Try) {
                        return EscapeOutcome::CleanedUp;
                    }
                    return self.track(parent);
                }
                _ => return EscapeOutcome::Leaked,
            }
        }
    }

    /// Follow a local variable (and its aliases) through its enclosing
    /// method, starting after its declaration
    pub fn track(&self, variable: NodeId) -> EscapeOutcome {
        let tree = self.evaluator.tree();
        let scope = tree
            .enclosing_method(variable)
            .or_else(|| tree.parent(variable))
            .unwrap_or_else(|| tree.root());

        let mut aliases: HashSet<NodeId> = HashSet::from([variable]);
        for node in tree.descendants(scope) {
            if node <= variable || tree.node_kind(node) != NodeKind::Reference {
                continue;
            }
            let Some(name) = tree.name(node) else {
                continue;
            };
            let Some(declaration) = tree.resolve_local(name, node) else {
                continue;
            };
            if !aliases.contains(&declaration) {
                continue;
            }

            // Where the tracked reference flows
            let Some(parent) = tree.skip_parentheses_up(node) else {
                continue;
            };
            let data = tree.node(parent);
            let direct = tree.children(parent).iter().any(|&c| tree.skip_parentheses(c) == node);
            match data.kind {
                NodeKind::Call if data.qualifier.is_some_and(|q| tree.skip_parentheses(q) == node) => {
                    if self
                        .evaluator
                        .resolve_call(parent)
                        .is_some_and(|m| (self.is_cleanup)(&m))
                    {
                        return EscapeOutcome::CleanedUp;
                    }
                }
                NodeKind::Call if direct => {
                    if self.call_keeps_value(parent) {
                        return EscapeOutcome::Escaped;
                    }
                }
                NodeKind::New | NodeKind::Return | NodeKind::Field | NodeKind::ArrayInit
                    if direct =>
                {
                    return EscapeOutcome::Escaped;
                }
                NodeKind::Assignment if data.children.get(1).is_some_and(|&v| tree.skip_parentheses(v) == node) => {
                    match data.children.first().and_then(|&t| self.evaluator.resolve(t)) {
                        Some(Declaration::Local(alias)) => {
                            aliases.insert(alias);
                        }
                        _ => return EscapeOutcome::Escaped,
                    }
                }
                NodeKind::LocalVariable if direct => {
                    if tree.parent(parent).map(|p| tree.node_kind(p)) == Some(NodeKind::Try) {
                        return EscapeOutcome::CleanedUp;
                    }
                    aliases.insert(parent);
                }
                _ => {}
            }
        }
        EscapeOutcome::Leaked
    }

    /// Whether passing a value to this call lets it escape
    fn call_keeps_value(&self, call: NodeId) -> bool {
        match (self.non_escaping, self.evaluator.resolve_call(call)) {
            (Some(non_escaping), Some(method)) => !non_escaping(&method),
            _ => true,
        }
    }
}
