//! Conservative constant folding
//!
//! Folds literals, `final` locals and `static final` fields (or interface
//! fields) through arithmetic, string concatenation, casts and conditionals.
//! Integer arithmetic follows Java: `int` and `long` wrap at their own width
//! and shift counts are masked to the width of the left operand. Anything
//! not provably constant yields `None`, division by zero included.

use super::Evaluator;
use crate::model::symbols::strip_type;
use crate::model::{ClassKind, ClassSymbol, Declaration, Expr, FieldSymbol, Literal, NodeId, NodeKind};

const MAX_DEPTH: usize = 32;

/// Where names in an expression are looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalScope {
    /// A node in the unit being analyzed
    Node(NodeId),
    /// The body of a class from the symbol table
    Class(String),
}

pub(super) struct ConstantEvaluator<'e, 'a> {
    evaluator: &'e Evaluator<'a>,
}

impl<'e, 'a> ConstantEvaluator<'e, 'a> {
    pub(super) fn new(evaluator: &'e Evaluator<'a>) -> Self {
        Self { evaluator }
    }

    pub(super) fn evaluate(&self, expr: &Expr, scope: &EvalScope, depth: usize) -> Option<Literal> {
        if depth > MAX_DEPTH {
            return None;
        }
        let next = depth + 1;
        match expr {
            Expr::Literal(literal) => Some(literal.clone()),
            Expr::Reference { qualifier, name } => {
                self.reference(qualifier.as_deref(), name, scope, next)
            }
            Expr::Unary { op, operand } => unary(op, self.evaluate(operand, scope, next)?),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.evaluate(lhs, scope, next)?;
                let rhs = self.evaluate(rhs, scope, next)?;
                binary(op, lhs, rhs)
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => match self.evaluate(condition, scope, next).and_then(|c| c.as_bool()) {
                Some(true) => self.evaluate(then, scope, next),
                Some(false) => self.evaluate(otherwise, scope, next),
                None => {
                    let then = self.evaluate(then, scope, next)?;
                    let otherwise = self.evaluate(otherwise, scope, next)?;
                    (then == otherwise).then_some(then)
                }
            },
            Expr::Cast { type_name, operand } => cast(type_name, self.evaluate(operand, scope, next)?),
            Expr::Array(_) | Expr::Unknown => None,
        }
    }

    fn reference(
        &self,
        qualifier: Option<&str>,
        name: &str,
        scope: &EvalScope,
        depth: usize,
    ) -> Option<Literal> {
        match scope {
            EvalScope::Node(node) => {
                let tree = self.evaluator.tree();
                if qualifier.is_none() {
                    if let Some(decl) = tree.resolve_local(name, *node) {
                        return self.declaration_value(decl, depth);
                    }
                }
                let class = self.evaluator.class_name_of(*node);
                self.class_reference(class.as_deref(), qualifier, name, depth)
            }
            EvalScope::Class(class) => {
                let class = (!class.is_empty()).then_some(class.as_str());
                self.class_reference(class, qualifier, name, depth)
            }
        }
    }

    /// Value of a local or field declared in the current tree
    fn declaration_value(&self, decl: NodeId, depth: usize) -> Option<Literal> {
        let tree = self.evaluator.tree();
        let data = tree.node(decl);
        let constant = match data.kind {
            NodeKind::LocalVariable => data.modifiers.is_final,
            NodeKind::Field => {
                data.modifiers.is_final
                    || tree
                        .enclosing_class(decl)
                        .and_then(|c| tree.node(c).class_kind)
                        == Some(ClassKind::Interface)
            }
            _ => false,
        };
        if !constant {
            return None;
        }
        let init = tree.initializer(decl)?;
        let expr = Expr::from_node(tree, init);
        self.evaluate(&expr, &EvalScope::Node(init), depth)
    }

    /// Field a reference expression names, without folding its value
    pub(super) fn field_of(&self, expr: &Expr, scope: &EvalScope) -> Option<Declaration> {
        let Expr::Reference { qualifier, name } = expr else {
            return None;
        };
        let symbols = self.evaluator.symbols();
        let class = match scope {
            EvalScope::Node(node) => {
                let tree = self.evaluator.tree();
                if qualifier.is_none() {
                    if let Some(decl) = tree.resolve_local(name, *node) {
                        return (tree.node_kind(decl) == NodeKind::Field).then(|| Declaration::Field {
                            owner: self.evaluator.class_name_of(decl).unwrap_or_default(),
                            name: name.clone(),
                        });
                    }
                }
                self.evaluator.class_name_of(*node)
            }
            EvalScope::Class(class) => (!class.is_empty()).then(|| class.clone()),
        };
        let imports = class
            .as_deref()
            .and_then(|c| symbols.class(c))
            .map(|c| &c.imports)
            .unwrap_or(self.evaluator.tree().imports());

        let found = match qualifier {
            Some(qualifier) => {
                let owner = symbols.qualify(imports, class.as_deref(), qualifier)?;
                symbols.find_field(&owner, name)
            }
            None => {
                let mut current = class.clone();
                let mut found = None;
                while let Some(candidate) = current {
                    found = symbols.find_field(&candidate, name);
                    if found.is_some() {
                        break;
                    }
                    current = symbols.class(&candidate).and_then(|c| c.outer.clone());
                }
                found.or_else(|| {
                    imports.static_imports.iter().find_map(|import| {
                        let owner = import
                            .strip_suffix(&format!(".{}", name))
                            .or_else(|| import.strip_suffix(".*"))?;
                        symbols.find_field(owner, name)
                    })
                })
            }
        };
        found.map(|(owner, field)| Declaration::Field {
            owner: owner.name.clone(),
            name: field.name.clone(),
        })
    }

    fn class_reference(
        &self,
        class: Option<&str>,
        qualifier: Option<&str>,
        name: &str,
        depth: usize,
    ) -> Option<Literal> {
        let symbols = self.evaluator.symbols();
        let tree_imports = self.evaluator.tree().imports();
        let imports = class
            .and_then(|c| symbols.class(c))
            .map(|c| &c.imports)
            .unwrap_or(tree_imports);

        if let Some(qualifier) = qualifier {
            let owner = symbols.qualify(imports, class, qualifier)?;
            return self.field_constant(&owner, name, depth);
        }

        let mut current = class.map(str::to_string);
        while let Some(scope) = current {
            if let Some((owner, field)) = symbols.find_field(&scope, name) {
                return self.field_value(owner, field, depth);
            }
            current = symbols.class(&scope).and_then(|c| c.outer.clone());
        }

        for import in &imports.static_imports {
            let owner = import
                .strip_suffix(&format!(".{}", name))
                .or_else(|| import.strip_suffix(".*"));
            if let Some(value) = owner.and_then(|o| self.field_constant(o, name, depth)) {
                return Some(value);
            }
        }
        None
    }

    fn field_constant(&self, owner: &str, name: &str, depth: usize) -> Option<Literal> {
        let (class, field) = self.evaluator.symbols().find_field(owner, name)?;
        self.field_value(class, field, depth)
    }

    fn field_value(&self, class: &ClassSymbol, field: &FieldSymbol, depth: usize) -> Option<Literal> {
        if !field.modifiers.is_final && class.kind != ClassKind::Interface {
            return None;
        }
        let init = field.initializer.as_ref()?;
        self.evaluate(init, &EvalScope::Class(class.name.clone()), depth)
    }
}

fn unary(op: &str, value: Literal) -> Option<Literal> {
    match (op, value) {
        ("-", Literal::Float(v)) => Some(Literal::Float(-v)),
        ("+", Literal::Float(v)) => Some(Literal::Float(v)),
        ("!", Literal::Bool(b)) => Some(Literal::Bool(!b)),
        (op, value) => {
            let value = Integral::of(&value)?;
            Some(match (op, value) {
                ("-", Integral::Int(v)) => Literal::Int(v.wrapping_neg()),
                ("-", Integral::Long(v)) => Literal::Long(v.wrapping_neg()),
                ("~", Integral::Int(v)) => Literal::Int(!v),
                ("~", Integral::Long(v)) => Literal::Long(!v),
                ("+", v) => v.literal(),
                _ => return None,
            })
        }
    }
}

/// Integer operand after unary numeric promotion (`char`, `short`, `byte` → `int`)
#[derive(Debug, Clone, Copy)]
enum Integral {
    Int(i32),
    Long(i64),
}

impl Integral {
    fn of(literal: &Literal) -> Option<Self> {
        match literal {
            Literal::Int(v) => Some(Integral::Int(*v)),
            Literal::Long(v) => Some(Integral::Long(*v)),
            Literal::Char(c) => Some(Integral::Int(u32::from(*c) as i32)),
            _ => None,
        }
    }

    fn wide(self) -> i64 {
        match self {
            Integral::Int(v) => i64::from(v),
            Integral::Long(v) => v,
        }
    }

    fn literal(self) -> Literal {
        match self {
            Integral::Int(v) => Literal::Int(v),
            Integral::Long(v) => Literal::Long(v),
        }
    }
}

fn binary(op: &str, lhs: Literal, rhs: Literal) -> Option<Literal> {
    if op == "+" && (matches!(lhs, Literal::Str(_)) || matches!(rhs, Literal::Str(_))) {
        if lhs == Literal::Null || rhs == Literal::Null {
            return None;
        }
        return Some(Literal::Str(format!("{}{}", lhs, rhs)));
    }

    if let (Literal::Bool(a), Literal::Bool(b)) = (&lhs, &rhs) {
        let (a, b) = (*a, *b);
        return match op {
            "&&" | "&" => Some(Literal::Bool(a && b)),
            "||" | "|" => Some(Literal::Bool(a || b)),
            "^" | "!=" => Some(Literal::Bool(a != b)),
            "==" => Some(Literal::Bool(a == b)),
            _ => None,
        };
    }

    if matches!(lhs, Literal::Float(_)) || matches!(rhs, Literal::Float(_)) {
        let (a, b) = (lhs.as_float()?, rhs.as_float()?);
        return match op {
            "+" => Some(Literal::Float(a + b)),
            "-" => Some(Literal::Float(a - b)),
            "*" => Some(Literal::Float(a * b)),
            "/" if b != 0.0 => Some(Literal::Float(a / b)),
            "%" if b != 0.0 => Some(Literal::Float(a % b)),
            "<" => Some(Literal::Bool(a < b)),
            "<=" => Some(Literal::Bool(a <= b)),
            ">" => Some(Literal::Bool(a > b)),
            ">=" => Some(Literal::Bool(a >= b)),
            "==" => Some(Literal::Bool(a == b)),
            "!=" => Some(Literal::Bool(a != b)),
            _ => None,
        };
    }

    let (a, b) = (Integral::of(&lhs)?, Integral::of(&rhs)?);
    if let Some(result) = compare(op, a.wide(), b.wide()) {
        return Some(result);
    }
    match (op, a, b) {
        // Shifts take the type of the left operand alone
        ("<<" | ">>" | ">>>", Integral::Int(v), count) => {
            let n = (count.wide() & 31) as u32;
            Some(Literal::Int(match op {
                "<<" => v << n,
                ">>" => v >> n,
                _ => ((v as u32) >> n) as i32,
            }))
        }
        ("<<" | ">>" | ">>>", Integral::Long(v), count) => {
            let n = (count.wide() & 63) as u32;
            Some(Literal::Long(match op {
                "<<" => v << n,
                ">>" => v >> n,
                _ => ((v as u64) >> n) as i64,
            }))
        }
        (_, Integral::Int(a), Integral::Int(b)) => int_op(op, a, b).map(Literal::Int),
        (_, a, b) => long_op(op, a.wide(), b.wide()).map(Literal::Long),
    }
}

fn compare(op: &str, a: i64, b: i64) -> Option<Literal> {
    let result = match op {
        "<" => a < b,
        "<=" => a <= b,
        ">" => a > b,
        ">=" => a >= b,
        "==" => a == b,
        "!=" => a != b,
        _ => return None,
    };
    Some(Literal::Bool(result))
}

fn int_op(op: &str, a: i32, b: i32) -> Option<i32> {
    match op {
        "+" => Some(a.wrapping_add(b)),
        "-" => Some(a.wrapping_sub(b)),
        "*" => Some(a.wrapping_mul(b)),
        "/" if b != 0 => Some(a.wrapping_div(b)),
        "%" if b != 0 => Some(a.wrapping_rem(b)),
        "&" => Some(a & b),
        "|" => Some(a | b),
        "^" => Some(a ^ b),
        _ => None,
    }
}

fn long_op(op: &str, a: i64, b: i64) -> Option<i64> {
    match op {
        "+" => Some(a.wrapping_add(b)),
        "-" => Some(a.wrapping_sub(b)),
        "*" => Some(a.wrapping_mul(b)),
        "/" if b != 0 => Some(a.wrapping_div(b)),
        "%" if b != 0 => Some(a.wrapping_rem(b)),
        "&" => Some(a & b),
        "|" => Some(a | b),
        "^" => Some(a ^ b),
        _ => None,
    }
}

fn cast(type_name: &str, value: Literal) -> Option<Literal> {
    let target = strip_type(type_name);
    match target {
        "int" => match value {
            Literal::Float(f) => Some(Literal::Int(f as i32)),
            other => other.as_int().map(|i| Literal::Int(i as i32)),
        },
        "long" => match value {
            Literal::Float(f) => Some(Literal::Long(f as i64)),
            other => other.as_int().map(Literal::Long),
        },
        "short" => value.as_int().map(|i| Literal::Int(i32::from(i as i16))),
        "byte" => value.as_int().map(|i| Literal::Int(i32::from(i as i8))),
        "char" => value
            .as_int()
            .and_then(|i| char::from_u32(u32::from(i as u16)))
            .map(Literal::Char),
        "float" | "double" => value.as_float().map(Literal::Float),
        "boolean" => value.as_bool().map(Literal::Bool),
        "String" | "java.lang.String" => value.as_str().map(|s| Literal::Str(s.to_string())),
        _ => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::Scope;
    use crate::model::{
        ClassSymbol, FieldSymbol, Modifiers, NodeData, Phase, SymbolTable, SymbolTableBuilder,
        Tree, TreeBuilder,
    };

    fn int(v: i32) -> Expr {
        Expr::Literal(Literal::Int(v))
    }

    fn long(v: i64) -> Expr {
        Expr::Literal(Literal::Long(v))
    }

    fn bin(op: &str, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op: op.into(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn eval(expr: &Expr) -> Option<Literal> {
        let tree = TreeBuilder::new("A.java", Phase::Source, Scope::JavaFile).build();
        let table = SymbolTable::empty();
        Evaluator::new(&tree, &table).evaluate_expr(expr, &EvalScope::Class(String::new()))
    }

    #[test]
    fn test_arithmetic_and_overflow() {
        assert_eq!(eval(&bin("*", int(6), int(7))), Some(Literal::Int(42)));
        assert_eq!(eval(&bin("<<", int(1), int(4))), Some(Literal::Int(16)));
        assert_eq!(eval(&bin("/", int(1), int(0))), None);
        assert_eq!(
            eval(&bin("+", int(1), Expr::Literal(Literal::Float(0.5)))),
            Some(Literal::Float(1.5))
        );
    }

    #[test]
    fn test_int_shifts_use_int_width() {
        assert_eq!(eval(&bin("<<", int(1), int(32))), Some(Literal::Int(1)));
        assert_eq!(eval(&bin("<<", int(1), int(31))), Some(Literal::Int(i32::MIN)));
        assert_eq!(eval(&bin(">>", int(-8), int(33))), Some(Literal::Int(-4)));
        assert_eq!(eval(&bin(">>>", int(-1), int(1))), Some(Literal::Int(i32::MAX)));
        assert_eq!(eval(&bin(">>>", int(-1), int(28))), Some(Literal::Int(15)));
    }

    #[test]
    fn test_long_shifts_use_long_width() {
        assert_eq!(eval(&bin("<<", long(1), int(32))), Some(Literal::Long(1 << 32)));
        assert_eq!(eval(&bin("<<", long(1), int(64))), Some(Literal::Long(1)));
        assert_eq!(eval(&bin(">>>", long(-1), int(1))), Some(Literal::Long(i64::MAX)));
        // The count's width does not widen an int shift
        assert_eq!(eval(&bin("<<", int(1), long(32))), Some(Literal::Int(1)));
    }

    #[test]
    fn test_int_overflow_wraps() {
        assert_eq!(eval(&bin("+", int(i32::MAX), int(1))), Some(Literal::Int(i32::MIN)));
        assert_eq!(eval(&bin("*", int(65536), int(65536))), Some(Literal::Int(0)));
        assert_eq!(eval(&bin("/", int(i32::MIN), int(-1))), Some(Literal::Int(i32::MIN)));
        let negated = Expr::Unary {
            op: "-".into(),
            operand: Box::new(int(i32::MIN)),
        };
        assert_eq!(eval(&negated), Some(Literal::Int(i32::MIN)));
    }

    #[test]
    fn test_mixed_width_promotes_to_long() {
        assert_eq!(
            eval(&bin("+", int(i32::MAX), long(1))),
            Some(Literal::Long(i64::from(i32::MAX) + 1))
        );
        assert_eq!(eval(&bin("+", long(i64::MAX), int(1))), Some(Literal::Long(i64::MIN)));
        assert_eq!(eval(&bin("==", int(7), long(7))), Some(Literal::Bool(true)));
        assert_eq!(eval(&bin("%", long(7), int(0))), None);

        let widened = Expr::Cast {
            type_name: "long".into(),
            operand: Box::new(int(1)),
        };
        assert_eq!(eval(&bin("<<", widened, int(40))), Some(Literal::Long(1 << 40)));
        let narrowed = Expr::Cast {
            type_name: "int".into(),
            operand: Box::new(long(1 << 32)),
        };
        assert_eq!(eval(&narrowed), Some(Literal::Int(0)));
    }

    #[test]
    fn test_string_concatenation() {
        let expr = bin("+", Expr::Literal(Literal::Str("v".into())), bin("+", int(1), int(2)));
        assert_eq!(eval(&expr), Some(Literal::Str("v3".into())));
    }

    #[test]
    fn test_conditional_and_cast() {
        let cond = Expr::Conditional {
            condition: Box::new(bin(">", int(2), int(1))),
            then: Box::new(int(10)),
            otherwise: Box::new(Expr::Unknown),
        };
        assert_eq!(eval(&cond), Some(Literal::Int(10)));

        let undecided = Expr::Conditional {
            condition: Box::new(Expr::Unknown),
            then: Box::new(int(3)),
            otherwise: Box::new(int(3)),
        };
        assert_eq!(eval(&undecided), Some(Literal::Int(3)));

        let cast = Expr::Cast {
            type_name: "byte".into(),
            operand: Box::new(int(300)),
        };
        assert_eq!(eval(&cast), Some(Literal::Int(44)));
    }

    #[test]
    fn test_unknown_is_not_constant() {
        assert_eq!(eval(&bin("+", int(1), Expr::Unknown)), None);
        assert_eq!(
            eval(&Expr::Reference {
                qualifier: None,
                name: "missing".into()
            }),
            None
        );
    }

    fn unit_with_locals() -> (Tree, NodeId, NodeId) {
        // class A { static final int BASE = 4; void m() { final int a = BASE * 2; int b = 1; use(a); use(b); } }
        let mut b = TreeBuilder::new("A.java", Phase::Source, Scope::JavaFile);
        b.open(NodeData::new(NodeKind::Class).named("A"));
        b.open(NodeData::new(NodeKind::Field).named("BASE").typed("int").modifiers(Modifiers::static_final()));
        b.leaf(NodeData::new(NodeKind::Literal).literal(Literal::Int(4)));
        b.close();
        b.open(NodeData::new(NodeKind::Method).named("m").typed("void"));
        b.open(NodeData::new(NodeKind::Block));
        let final_mods = Modifiers {
            is_final: true,
            ..Default::default()
        };
        b.open(NodeData::new(NodeKind::LocalVariable).named("a").typed("int").modifiers(final_mods));
        b.open(NodeData::new(NodeKind::Binary).operator("*"));
        b.leaf(NodeData::new(NodeKind::Reference).named("BASE"));
        b.leaf(NodeData::new(NodeKind::Literal).literal(Literal::Int(2)));
        b.close();
        b.close();
        b.open(NodeData::new(NodeKind::LocalVariable).named("b").typed("int"));
        b.leaf(NodeData::new(NodeKind::Literal).literal(Literal::Int(1)));
        b.close();
        b.open(NodeData::new(NodeKind::Call).named("use"));
        let use_a = b.leaf(NodeData::new(NodeKind::Reference).named("a"));
        b.close();
        b.open(NodeData::new(NodeKind::Call).named("use"));
        let use_b = b.leaf(NodeData::new(NodeKind::Reference).named("b"));
        b.close();
        (b.build(), use_a, use_b)
    }

    #[test]
    fn test_final_locals_fold_and_mutable_ones_do_not() {
        let (tree, use_a, use_b) = unit_with_locals();
        let table = SymbolTable::empty();
        let ev = Evaluator::new(&tree, &table);
        assert_eq!(ev.evaluate_constant(use_a), Some(Literal::Int(8)));
        assert_eq!(ev.evaluate_constant(use_b), None);
    }

    #[test]
    fn test_cross_class_constants() {
        let mut limits = ClassSymbol::compiled("com.lib.Limits", ClassKind::Class);
        limits.fields.push(FieldSymbol::constant(
            "MAX",
            "int",
            bin("+", Expr::Reference { qualifier: None, name: "MIN".into() }, int(10)),
        ));
        limits.fields.push(FieldSymbol::constant("MIN", "int", int(5)));
        let mut mutable = FieldSymbol::new("COUNT");
        mutable.initializer = Some(int(1));
        limits.fields.push(mutable);

        let mut builder = SymbolTableBuilder::new();
        builder.add_class(limits);
        let table = builder.build();
        let tree = TreeBuilder::new("A.java", Phase::Source, Scope::JavaFile).build();
        let ev = Evaluator::new(&tree, &table);

        let scope = EvalScope::Class(String::new());
        let max = Expr::Reference {
            qualifier: Some("com.lib.Limits".into()),
            name: "MAX".into(),
        };
        assert_eq!(ev.evaluate_expr(&max, &scope), Some(Literal::Int(15)));
        let count = Expr::Reference {
            qualifier: Some("com.lib.Limits".into()),
            name: "COUNT".into(),
        };
        assert_eq!(ev.evaluate_expr(&count, &scope), None);
    }
}
