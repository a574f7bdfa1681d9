//! Evaluator - the query facade detectors use for semantic questions
//!
//! Answers type hierarchy, annotation, resolution and constant questions for
//! one unit against the shared symbol table. Every query degrades to
//! `None`/`false`/empty when something cannot be resolved; only
//! [`Evaluator::internal_name`] reports failure, because its result is used
//! as a database key.

mod annotations;
mod constant;

pub use constant::EvalScope;

use crate::error::{LintError, Result};
use crate::model::symbols::{is_primitive, strip_type};
use crate::model::{
    AnnotationInstance, Declaration, Expr, Literal, MethodSymbol, NodeId, NodeKind, SymbolTable,
    Tree,
};
use constant::ConstantEvaluator;
use std::collections::HashSet;

/// A call site bound (as far as possible) to a method
#[derive(Debug, Clone)]
pub struct MethodRef<'a> {
    pub name: String,
    /// Number of arguments at the call site
    pub arity: usize,
    /// Static type of the receiver, or the enclosing class for unqualified calls
    pub receiver: Option<String>,
    /// Class declaring the resolved method
    pub owner: Option<String>,
    pub symbol: Option<&'a MethodSymbol>,
}

impl<'a> MethodRef<'a> {
    /// Declaring class if resolved, else the receiver type
    pub fn owner_or_receiver(&self) -> Option<&str> {
        self.owner.as_deref().or(self.receiver.as_deref())
    }

    pub fn declaration(&self) -> Option<Declaration> {
        let symbol = self.symbol?;
        Some(Declaration::Method {
            owner: self.owner.clone()?,
            name: self.name.clone(),
            arity: symbol.arity(),
        })
    }

    /// Whether the call binds to a member of `class` or a subtype
    pub fn is_member_of(&self, evaluator: &Evaluator<'_>, class: &str) -> bool {
        self.owner_or_receiver().is_some_and(|owner| {
            evaluator.extends_class(owner, class, false)
                || evaluator.implements_interface(owner, class, false)
        })
    }
}

/// Per-unit evaluator
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    tree: &'a Tree,
    symbols: &'a SymbolTable,
    relevant: Option<&'a HashSet<String>>,
}

impl<'a> Evaluator<'a> {
    pub fn new(tree: &'a Tree, symbols: &'a SymbolTable) -> Self {
        Self {
            tree,
            symbols,
            relevant: None,
        }
    }

    /// Restrict annotation queries to the names detectors asked for
    pub fn with_relevant_annotations(mut self, relevant: &'a HashSet<String>) -> Self {
        self.relevant = Some(relevant);
        self
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn symbols(&self) -> &'a SymbolTable {
        self.symbols
    }

    /// Qualified name of the class enclosing (or being) `node`
    pub fn class_name_of(&self, node: NodeId) -> Option<String> {
        let class = if self.tree.node_kind(node) == NodeKind::Class {
            Some(node)
        } else {
            self.tree.enclosing_class(node)
        };
        class.and_then(|c| self.tree.qualified_class_name(c))
    }

    /// Qualify a type name written at `context`
    pub fn qualify_type(&self, name: &str, context: NodeId) -> Option<String> {
        let enclosing = self.class_name_of(context);
        self.symbols
            .qualify(self.tree.imports(), enclosing.as_deref(), name)
    }

    /// Whether `type_name` is or extends `qualified` (strict excludes equality)
    pub fn extends_class(&self, type_name: &str, qualified: &str, strict: bool) -> bool {
        let start = strip_type(type_name);
        if !strict && start == qualified {
            return true;
        }
        let mut visited = HashSet::new();
        let mut current = self.symbols.class(start).and_then(|c| c.superclass.clone());
        while let Some(name) = current {
            if name == qualified {
                return true;
            }
            if !visited.insert(name.clone()) {
                return false;
            }
            current = self.symbols.class(&name).and_then(|c| c.superclass.clone());
        }
        false
    }

    /// Whether `type_name` is or implements `qualified` anywhere in its
    /// hierarchy (strict excludes equality)
    pub fn implements_interface(&self, type_name: &str, qualified: &str, strict: bool) -> bool {
        let start = strip_type(type_name);
        if !strict && start == qualified {
            return true;
        }
        self.symbols.hierarchy(start).iter().enumerate().any(|(i, class)| {
            (i > 0 && class.name == qualified) || class.interfaces.iter().any(|n| n == qualified)
        })
    }

    /// Whether a call binds to a method declared in `class` or a subtype
    pub fn is_member_in_class(&self, method: &MethodRef<'_>, class: &str) -> bool {
        method.is_member_of(self, class)
    }

    /// Binary name such as `android/view/View$OnClickListener`
    pub fn internal_name(&self, type_name: &str) -> Result<String> {
        let name = strip_type(type_name);
        if let Some(class) = self.symbols.class(name) {
            return Ok(binary_name(&class.package, &class.name));
        }
        if is_primitive(name) {
            return Err(LintError::UnresolvedType(type_name.to_string()));
        }

        let segments: Vec<&str> = name.split('.').collect();
        let first_type = segments
            .iter()
            .position(|s| s.chars().next().is_some_and(char::is_uppercase));
        match first_type {
            Some(i) if i > 0 => Ok(format!(
                "{}/{}",
                segments[..i].join("/"),
                segments[i..].join("$")
            )),
            _ => Err(LintError::UnresolvedType(type_name.to_string())),
        }
    }

    /// Fold an expression node to a constant, if it is one
    pub fn evaluate_constant(&self, node: NodeId) -> Option<Literal> {
        let expr = Expr::from_node(self.tree, node);
        ConstantEvaluator::new(self).evaluate(&expr, &EvalScope::Node(node), 0)
    }

    pub fn evaluate_expr(&self, expr: &Expr, scope: &EvalScope) -> Option<Literal> {
        ConstantEvaluator::new(self).evaluate(expr, scope, 0)
    }

    /// All constant values of an expression; arrays expand element-wise and
    /// any unresolvable element makes the whole result `None`
    pub fn evaluate_values(&self, expr: &Expr, scope: &EvalScope) -> Option<Vec<Literal>> {
        match expr {
            Expr::Array(items) => items
                .iter()
                .map(|item| self.evaluate_expr(item, scope))
                .collect(),
            other => self.evaluate_expr(other, scope).map(|v| vec![v]),
        }
    }

    /// The field a reference expression (`A`, `Mode.A`) names
    pub fn resolve_field(&self, expr: &Expr, scope: &EvalScope) -> Option<Declaration> {
        ConstantEvaluator::new(self).field_of(expr, scope)
    }

    /// Evaluate a single attribute of an annotation
    pub fn evaluate_annotation_attribute(
        &self,
        annotation: &AnnotationInstance,
        name: &str,
    ) -> Option<Literal> {
        let expr = annotation.attribute(name)?;
        self.evaluate_expr(expr, &self.annotation_scope(annotation))
    }

    pub(crate) fn annotation_scope(&self, annotation: &AnnotationInstance) -> EvalScope {
        match (annotation.node, &annotation.context) {
            (Some(node), _) => EvalScope::Node(node),
            (None, Some(class)) => EvalScope::Class(class.clone()),
            (None, None) => EvalScope::Class(String::new()),
        }
    }

    /// Bind a reference, call, declaration or annotation node
    pub fn resolve(&self, node: NodeId) -> Option<Declaration> {
        let tree = self.tree;
        let data = tree.node(node);
        match data.kind {
            NodeKind::Reference => {
                let name = data.name.as_deref()?;
                if name == "this" {
                    return self.class_name_of(node).map(Declaration::Class);
                }
                if let Some(local) = tree.resolve_local(name, node) {
                    return self.resolve(local);
                }
                if let Some(field) = self.resolve_field_in_scope(node, name) {
                    return Some(field);
                }
                self.qualify_type(name, node).map(Declaration::Class)
            }
            NodeKind::Select => {
                let name = data.name.as_deref()?;
                let qualifier = data.qualifier?;
                match self.resolve(qualifier) {
                    Some(Declaration::Class(owner)) => {
                        let nested = format!("{}.{}", owner, name);
                        if self.symbols.class(&nested).is_some() {
                            return Some(Declaration::Class(nested));
                        }
                        if let Some((class, _)) = self.symbols.find_field(&owner, name) {
                            return Some(Declaration::Field {
                                owner: class.name.clone(),
                                name: name.to_string(),
                            });
                        }
                        if name.chars().next().is_some_and(char::is_uppercase)
                            && name.chars().any(char::is_lowercase)
                        {
                            return Some(Declaration::Class(nested));
                        }
                        Some(Declaration::Field {
                            owner,
                            name: name.to_string(),
                        })
                    }
                    Some(_) => {
                        let owner = self.type_of(qualifier)?;
                        let (class, _) = self.symbols.find_field(&owner, name)?;
                        Some(Declaration::Field {
                            owner: class.name.clone(),
                            name: name.to_string(),
                        })
                    }
                    None => {
                        // Package-qualified type such as android.os.Build
                        let dotted = tree.dotted_name(node)?;
                        let looks_like_type = name.chars().next().is_some_and(char::is_uppercase)
                            && dotted
                                .split('.')
                                .rev()
                                .skip(1)
                                .all(|s| s.chars().next().is_some_and(char::is_lowercase));
                        (looks_like_type || self.symbols.class(&dotted).is_some())
                            .then_some(Declaration::Class(dotted))
                    }
                }
            }
            NodeKind::Call => self.resolve_call(node)?.declaration(),
            NodeKind::New => data
                .type_name
                .as_deref()
                .and_then(|t| self.qualify_type(t, node))
                .map(Declaration::Class),
            NodeKind::Class => tree.qualified_class_name(node).map(Declaration::Class),
            NodeKind::Field => Some(Declaration::Field {
                owner: self.class_name_of(node)?,
                name: data.name.clone()?,
            }),
            NodeKind::Method => Some(Declaration::Method {
                owner: self.class_name_of(node)?,
                name: data.name.clone()?,
                arity: tree.parameters(node).len(),
            }),
            NodeKind::LocalVariable | NodeKind::Parameter => Some(Declaration::Local(node)),
            NodeKind::Annotation => {
                let name = data.name.as_deref()?;
                Some(Declaration::Class(
                    self.qualify_type(name, node)
                        .unwrap_or_else(|| name.to_string()),
                ))
            }
            NodeKind::Parenthesized | NodeKind::Cast => {
                let inner = tree.skip_parentheses(node);
                (inner != node).then(|| self.resolve(inner)).flatten()
            }
            _ => None,
        }
    }

    fn resolve_field_in_scope(&self, node: NodeId, name: &str) -> Option<Declaration> {
        let mut current = self.class_name_of(node);
        while let Some(class) = current {
            if let Some((owner, _)) = self.symbols.find_field(&class, name) {
                return Some(Declaration::Field {
                    owner: owner.name.clone(),
                    name: name.to_string(),
                });
            }
            current = self.symbols.class(&class).and_then(|c| c.outer.clone());
        }

        for import in &self.tree.imports().static_imports {
            if let Some(owner) = import.strip_suffix(&format!(".{}", name)) {
                return Some(Declaration::Field {
                    owner: owner.to_string(),
                    name: name.to_string(),
                });
            }
            if let Some(owner) = import.strip_suffix(".*") {
                if self.symbols.find_field(owner, name).is_some() {
                    return Some(Declaration::Field {
                        owner: owner.to_string(),
                        name: name.to_string(),
                    });
                }
            }
        }
        None
    }

    /// Bind a call to its receiver type and, when known, its method symbol
    pub fn resolve_call(&self, call: NodeId) -> Option<MethodRef<'a>> {
        let tree = self.tree;
        let name = tree.name(call)?.to_string();
        let arity = tree.arguments(call).len();

        let receiver = match tree.qualifier(call) {
            Some(q) => match tree.node(q).name.as_deref() {
                Some("super") if tree.node_kind(q) == NodeKind::Reference => self
                    .class_name_of(call)
                    .and_then(|c| self.symbols.class(&c))
                    .and_then(|c| c.superclass.clone()),
                _ => match self.resolve(q) {
                    Some(Declaration::Class(class)) => Some(class),
                    _ => self.type_of(q),
                },
            },
            None => self.unqualified_receiver(call, &name, arity),
        };

        let mut method = MethodRef {
            name,
            arity,
            receiver,
            owner: None,
            symbol: None,
        };
        if let Some(receiver) = &method.receiver {
            if let Some((class, symbol)) = self.symbols.find_method(receiver, &method.name, arity) {
                method.owner = Some(class.name.clone());
                method.symbol = Some(symbol);
            }
        }
        Some(method)
    }

    fn unqualified_receiver(&self, call: NodeId, name: &str, arity: usize) -> Option<String> {
        let innermost = self.class_name_of(call);
        if name == "super" {
            return innermost
                .and_then(|c| self.symbols.class(&c))
                .and_then(|c| c.superclass.clone());
        }
        if name == "this" {
            return innermost;
        }

        let mut current = innermost.clone();
        while let Some(class) = current {
            if self.symbols.find_method(&class, name, arity).is_some() {
                return Some(class);
            }
            current = self.symbols.class(&class).and_then(|c| c.outer.clone());
        }

        for import in &self.tree.imports().static_imports {
            if let Some(owner) = import.strip_suffix(&format!(".{}", name)) {
                return Some(owner.to_string());
            }
        }
        innermost
    }

    /// Static type of an expression, qualified where possible
    pub fn type_of(&self, node: NodeId) -> Option<String> {
        let tree = self.tree;
        let data = tree.node(node);
        match data.kind {
            NodeKind::Literal => data
                .literal
                .as_ref()
                .filter(|l| **l != Literal::Null)
                .map(|l| l.type_name().to_string()),
            NodeKind::Reference | NodeKind::Select => match self.resolve(node)? {
                Declaration::Local(decl) => self.declared_type(decl),
                Declaration::Field { owner, name } => {
                    if let Some((_, field)) = self.symbols.find_field(&owner, &name) {
                        return field.type_name.clone();
                    }
                    if data.kind == NodeKind::Select && name == "length" {
                        return Some("int".to_string());
                    }
                    None
                }
                Declaration::Class(class) => Some(class),
                _ => None,
            },
            NodeKind::Call => self
                .resolve_call(node)?
                .symbol?
                .return_type
                .clone(),
            NodeKind::New | NodeKind::Cast => data
                .type_name
                .as_deref()
                .and_then(|t| self.qualify_type(t, node)),
            NodeKind::Parenthesized => data.children.last().and_then(|&c| self.type_of(c)),
            NodeKind::Conditional => data.children.get(1).and_then(|&c| self.type_of(c)),
            NodeKind::Assignment => data.children.first().and_then(|&c| self.type_of(c)),
            NodeKind::Binary => {
                let op = data.operator.as_deref()?;
                match op {
                    "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||" | "instanceof" => {
                        Some("boolean".to_string())
                    }
                    _ => {
                        let lhs = data.children.first().and_then(|&c| self.type_of(c));
                        let rhs = data.children.get(1).and_then(|&c| self.type_of(c));
                        let string = "java.lang.String";
                        if op == "+" && (lhs.as_deref() == Some(string) || rhs.as_deref() == Some(string)) {
                            Some(string.to_string())
                        } else {
                            lhs.or(rhs)
                        }
                    }
                }
            }
            NodeKind::Unary => data.children.first().and_then(|&c| self.type_of(c)),
            _ => None,
        }
    }

    /// Declared type of a local, parameter or field node
    fn declared_type(&self, decl: NodeId) -> Option<String> {
        let written = self.tree.node(decl).type_name.as_deref()?;
        if written == "var" {
            return self.tree.initializer(decl).and_then(|i| self.type_of(i));
        }
        self.qualify_type(written, decl)
            .or_else(|| Some(strip_type(written).to_string()))
    }
}

fn binary_name(package: &str, name: &str) -> String {
    let relative = name
        .strip_prefix(package)
        .map(|r| r.trim_start_matches('.'))
        .unwrap_or(name);
    if package.is_empty() {
        relative.replace('.', "$")
    } else {
        format!("{}/{}", package.replace('.', "/"), relative.replace('.', "$"))
    }
}
