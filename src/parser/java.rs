//! Java source adapter
//!
//! Lowers the tree-sitter-java CST into the normalized [`Tree`]. Node kinds
//! the engine has no use for become `Other` with their children lowered, so
//! nothing below them is lost to traversal.

use crate::error::{LintError, Result};
use crate::issues::Scope;
use crate::model::{ClassKind, Literal, Modifiers, NodeData, NodeId, NodeKind, Phase, Tree, TreeBuilder};
use std::path::Path;
use tree_sitter::{Node, Parser};

pub fn parse(path: &Path, source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::language())
        .map_err(|e| LintError::parse(path, e.to_string()))?;
    let cst = parser
        .parse(source, None)
        .ok_or_else(|| LintError::parse(path, "tree-sitter produced no tree"))?;

    let mut lowering = Lowering {
        source,
        builder: TreeBuilder::new(path, Phase::Source, Scope::JavaFile).with_source(source),
    };
    lowering.program(cst.root_node());
    Ok(lowering.builder.build())
}

struct Lowering<'s> {
    source: &'s str,
    builder: TreeBuilder,
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !c.is_extra())
        .collect()
}

fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn is_class_like(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "annotation_type_declaration"
            | "record_declaration"
    )
}

impl<'s> Lowering<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    fn data(&self, kind: NodeKind, node: Node<'_>) -> NodeData {
        NodeData::new(kind).span(node.start_byte(), node.end_byte())
    }

    fn program(&mut self, root: Node<'_>) {
        for child in named_children(root) {
            match child.kind() {
                "package_declaration" => {
                    let package = named_children(child)
                        .into_iter()
                        .find(|c| matches!(c.kind(), "identifier" | "scoped_identifier"))
                        .map(|c| self.text(c).to_string())
                        .unwrap_or_default();
                    self.builder.imports_mut().package = package;
                }
                "import_declaration" => self.import(child),
                kind if is_class_like(kind) => self.class(child),
                _ => {}
            }
        }
    }

    fn import(&mut self, node: Node<'_>) {
        let text = self.text(node);
        let body = text
            .trim()
            .trim_start_matches("import")
            .trim()
            .trim_end_matches(';');
        let (is_static, path) = match body.trim().strip_prefix("static") {
            Some(rest) if rest.starts_with(char::is_whitespace) => (true, rest),
            _ => (false, body),
        };
        let path: String = path.chars().filter(|c| !c.is_whitespace()).collect();
        self.builder.imports_mut().add_import(&path, is_static);
        self.builder.leaf(self.data(NodeKind::Import, node).named(path));
    }

    /// Type as written, without type arguments or annotations
    fn type_name(&self, node: Node<'_>) -> String {
        match node.kind() {
            "annotated_type" => match named_children(node).last() {
                Some(&inner) => self.type_name(inner),
                None => String::new(),
            },
            "generic_type" => match node.named_child(0) {
                Some(raw) => self.type_name(raw),
                None => String::new(),
            },
            "array_type" => {
                let element = node
                    .child_by_field_name("element")
                    .map(|e| self.type_name(e))
                    .unwrap_or_default();
                let dims = node
                    .child_by_field_name("dimensions")
                    .map(|d| self.text(d))
                    .unwrap_or("[]");
                format!("{}{}", element, strip_whitespace(dims))
            }
            _ => strip_whitespace(self.text(node)),
        }
    }

    fn modifiers(&self, declaration: Node<'_>) -> Modifiers {
        let mut modifiers = Modifiers::default();
        let Some(list) = children(declaration).into_iter().find(|c| c.kind() == "modifiers") else {
            return modifiers;
        };
        for child in children(list) {
            match child.kind() {
                "public" => modifiers.is_public = true,
                "protected" => modifiers.is_protected = true,
                "private" => modifiers.is_private = true,
                "static" => modifiers.is_static = true,
                "final" => modifiers.is_final = true,
                "abstract" => modifiers.is_abstract = true,
                _ => {}
            }
        }
        modifiers
    }

    /// Annotations in the modifier list of a declaration
    fn annotations(&mut self, declaration: Node<'_>) {
        let Some(list) = children(declaration).into_iter().find(|c| c.kind() == "modifiers") else {
            return;
        };
        for child in named_children(list) {
            if matches!(child.kind(), "marker_annotation" | "annotation") {
                self.annotation(child);
            }
        }
    }

    fn annotation(&mut self, node: Node<'_>) {
        let name = node
            .child_by_field_name("name")
            .map(|n| strip_whitespace(self.text(n)))
            .unwrap_or_default();
        self.builder.open(self.data(NodeKind::Annotation, node).named(name));
        if let Some(arguments) = node.child_by_field_name("arguments") {
            for argument in named_children(arguments) {
                if argument.kind() == "element_value_pair" {
                    let mut data = self.data(NodeKind::AnnotationArgument, argument);
                    if let Some(key) = argument.child_by_field_name("key") {
                        data = data.named(self.text(key));
                    }
                    self.builder.open(data);
                    if let Some(value) = argument.child_by_field_name("value") {
                        self.lower(value);
                    }
                    self.builder.close();
                } else {
                    self.builder.open(self.data(NodeKind::AnnotationArgument, argument));
                    self.lower(argument);
                    self.builder.close();
                }
            }
        }
        self.builder.close();
    }

    fn class(&mut self, node: Node<'_>) {
        let class_kind = match node.kind() {
            "interface_declaration" => ClassKind::Interface,
            "enum_declaration" => ClassKind::Enum,
            "annotation_type_declaration" => ClassKind::Annotation,
            "record_declaration" => ClassKind::Record,
            _ => ClassKind::Class,
        };
        let mut data = self
            .data(NodeKind::Class, node)
            .class_kind(class_kind)
            .modifiers(self.modifiers(node));
        if let Some(name) = node.child_by_field_name("name") {
            data = data.named(self.text(name));
        }
        if let Some(superclass) = node.child_by_field_name("superclass") {
            if let Some(ty) = superclass.named_child(0) {
                data = data.extends(self.type_name(ty));
            }
        }
        for child in children(node) {
            if !matches!(child.kind(), "super_interfaces" | "extends_interfaces") {
                continue;
            }
            for list in named_children(child) {
                for ty in named_children(list) {
                    data = data.implements(self.type_name(ty));
                }
            }
        }
        let simple = data.name.clone().unwrap_or_default();

        self.builder.open(data);
        self.annotations(node);
        if class_kind == ClassKind::Record {
            if let Some(parameters) = node.child_by_field_name("parameters") {
                for component in named_children(parameters) {
                    self.record_component(component);
                }
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.class_body(body, &simple);
        }
        self.builder.close();
    }

    fn record_component(&mut self, node: Node<'_>) {
        let modifiers = Modifiers {
            is_private: true,
            is_final: true,
            ..Default::default()
        };
        let mut data = self.data(NodeKind::Field, node).modifiers(modifiers);
        if let Some(name) = node.child_by_field_name("name") {
            data = data.named(self.text(name));
        }
        if let Some(ty) = node.child_by_field_name("type") {
            data = data.typed(self.type_name(ty));
        }
        self.builder.open(data);
        self.annotations(node);
        self.builder.close();
    }

    fn class_body(&mut self, body: Node<'_>, class_name: &str) {
        for member in named_children(body) {
            match member.kind() {
                "field_declaration" | "constant_declaration" => self.variables(member, NodeKind::Field),
                "method_declaration" | "annotation_type_element_declaration" => {
                    self.method(member, None)
                }
                "constructor_declaration" | "compact_constructor_declaration" => {
                    self.method(member, Some(class_name))
                }
                "enum_constant" => self.enum_constant(member, class_name),
                "enum_body_declarations" => self.class_body(member, class_name),
                "block" | "static_initializer" => self.lower(member),
                kind if is_class_like(kind) => self.class(member),
                _ => {}
            }
        }
    }

    fn enum_constant(&mut self, node: Node<'_>, enum_name: &str) {
        let modifiers = Modifiers {
            is_public: true,
            ..Modifiers::static_final()
        };
        let mut data = self
            .data(NodeKind::Field, node)
            .modifiers(modifiers)
            .typed(enum_name);
        if let Some(name) = node.child_by_field_name("name") {
            data = data.named(self.text(name));
        }
        self.builder.open(data);
        self.annotations(node);
        self.builder.close();
    }

    /// Field or local variable declarations, one node per declarator
    fn variables(&mut self, node: Node<'_>, kind: NodeKind) {
        let modifiers = self.modifiers(node);
        let base_type = node
            .child_by_field_name("type")
            .map(|t| self.type_name(t))
            .unwrap_or_default();

        let mut cursor = node.walk();
        let declarators: Vec<Node<'_>> = node.children_by_field_name("declarator", &mut cursor).collect();
        for (i, declarator) in declarators.into_iter().enumerate() {
            let start = if i == 0 { node.start_byte() } else { declarator.start_byte() };
            let mut type_name = base_type.clone();
            if let Some(dims) = declarator.child_by_field_name("dimensions") {
                type_name.push_str(&strip_whitespace(self.text(dims)));
            }
            let mut data = NodeData::new(kind)
                .span(start, declarator.end_byte())
                .modifiers(modifiers)
                .typed(type_name);
            if let Some(name) = declarator.child_by_field_name("name") {
                data = data.named(self.text(name));
            }
            self.builder.open(data);
            self.annotations(node);
            if let Some(value) = declarator.child_by_field_name("value") {
                self.lower(value);
            }
            self.builder.close();
        }
    }

    /// Methods and constructors; constructors are named after their class
    /// and have no return type
    fn method(&mut self, node: Node<'_>, constructor_of: Option<&str>) {
        let mut data = self
            .data(NodeKind::Method, node)
            .modifiers(self.modifiers(node));
        match constructor_of {
            Some(class) => data = data.named(class),
            None => {
                if let Some(name) = node.child_by_field_name("name") {
                    data = data.named(self.text(name));
                }
                let ty = node
                    .child_by_field_name("type")
                    .map(|t| self.type_name(t))
                    .unwrap_or_else(|| "void".to_string());
                data = data.typed(ty);
            }
        }

        self.builder.open(data);
        self.annotations(node);
        if let Some(parameters) = node.child_by_field_name("parameters") {
            for parameter in named_children(parameters) {
                self.parameter(parameter);
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.lower(body);
        }
        self.builder.close();
    }

    fn parameter(&mut self, node: Node<'_>) {
        let mut data = self
            .data(NodeKind::Parameter, node)
            .modifiers(self.modifiers(node));
        match node.kind() {
            "formal_parameter" | "catch_formal_parameter" => {
                if let Some(name) = node.child_by_field_name("name") {
                    data = data.named(self.text(name));
                }
                let ty = node.child_by_field_name("type").map(|t| self.type_name(t));
                let ty = ty.or_else(|| {
                    // catch (A | B e)
                    named_children(node)
                        .into_iter()
                        .find(|c| c.kind() == "catch_type")
                        .map(|c| strip_whitespace(self.text(c)))
                });
                if let Some(mut ty) = ty {
                    if let Some(dims) = node.child_by_field_name("dimensions") {
                        ty.push_str(&strip_whitespace(self.text(dims)));
                    }
                    data = data.typed(ty);
                }
            }
            "spread_parameter" => {
                for child in named_children(node) {
                    match child.kind() {
                        "modifiers" => {}
                        "variable_declarator" => {
                            if let Some(name) = child.child_by_field_name("name") {
                                data = data.named(self.text(name));
                            }
                        }
                        _ if data.type_name.is_none() => {
                            data = data.typed(format!("{}...", self.type_name(child)));
                        }
                        _ => {}
                    }
                }
            }
            "identifier" => data = data.named(self.text(node)),
            _ => return,
        }
        self.builder.open(data);
        self.annotations(node);
        self.builder.close();
    }

    /// Generic container: lower every named child
    fn container(&mut self, kind: NodeKind, node: Node<'_>) -> NodeId {
        let id = self.builder.open(self.data(kind, node));
        for child in named_children(node) {
            self.lower(child);
        }
        self.builder.close();
        id
    }

    /// Lower any statement or expression
    fn lower(&mut self, node: Node<'_>) {
        match node.kind() {
            "block" | "constructor_body" | "static_initializer" | "finally_clause" => {
                if node.kind() == "block" || node.kind() == "constructor_body" {
                    self.container(NodeKind::Block, node);
                } else {
                    for child in named_children(node) {
                        self.lower(child);
                    }
                }
            }
            "local_variable_declaration" => self.variables(node, NodeKind::LocalVariable),
            "expression_statement" => {
                self.container(NodeKind::ExpressionStatement, node);
            }
            "return_statement" => {
                self.container(NodeKind::Return, node);
            }
            "throw_statement" => {
                self.container(NodeKind::Throw, node);
            }
            "if_statement" => {
                self.container(NodeKind::If, node);
            }
            "while_statement" | "do_statement" | "for_statement" => {
                self.container(NodeKind::Loop, node);
            }
            "enhanced_for_statement" => self.enhanced_for(node),
            "try_statement" | "try_with_resources_statement" => self.try_statement(node),
            "catch_clause" => {
                self.builder.open(self.data(NodeKind::Other, node));
                for child in named_children(node) {
                    if child.kind() == "catch_formal_parameter" {
                        self.parameter(child);
                    } else {
                        self.lower(child);
                    }
                }
                self.builder.close();
            }
            "switch_expression" | "switch_statement" => self.switch(node),
            "explicit_constructor_invocation" => self.constructor_invocation(node),
            kind if is_class_like(kind) => self.class(node),
            "marker_annotation" | "annotation" => self.annotation(node),

            "identifier" | "this" | "super" => {
                let name = self.text(node);
                self.builder.leaf(self.data(NodeKind::Reference, node).named(name));
            }
            "field_access" | "scoped_identifier" => {
                let (scope_field, name_field) = if node.kind() == "field_access" {
                    ("object", "field")
                } else {
                    ("scope", "name")
                };
                let name = node
                    .child_by_field_name(name_field)
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                let select = self.builder.open(self.data(NodeKind::Select, node).named(name));
                if let Some(object) = node.child_by_field_name(scope_field) {
                    self.lower(object);
                    if let Some(&qualifier) = self.builder_children(select).first() {
                        self.builder.set_qualifier(select, qualifier);
                    }
                }
                self.builder.close();
            }
            "method_invocation" => self.call(node),
            "object_creation_expression" => self.object_creation(node),
            "array_creation_expression" => self.array_creation(node),
            "array_initializer" | "element_value_array_initializer" => {
                self.container(NodeKind::ArrayInit, node);
            }
            "binary_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or_default();
                self.builder.open(self.data(NodeKind::Binary, node).operator(operator));
                for field in ["left", "right"] {
                    if let Some(operand) = node.child_by_field_name(field) {
                        self.lower(operand);
                    }
                }
                self.builder.close();
            }
            "instanceof_expression" => {
                let mut data = self.data(NodeKind::Binary, node).operator("instanceof");
                if let Some(ty) = node.child_by_field_name("right") {
                    data = data.typed(self.type_name(ty));
                }
                self.builder.open(data);
                if let Some(left) = node.child_by_field_name("left") {
                    self.lower(left);
                }
                self.builder.close();
            }
            "unary_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or_default();
                self.builder.open(self.data(NodeKind::Unary, node).operator(operator));
                if let Some(operand) = node.child_by_field_name("operand") {
                    self.lower(operand);
                }
                self.builder.close();
            }
            "update_expression" => {
                let operator = children(node)
                    .into_iter()
                    .find(|c| matches!(c.kind(), "++" | "--"))
                    .map(|c| c.kind())
                    .unwrap_or("++");
                self.builder.open(self.data(NodeKind::Unary, node).operator(operator));
                for child in named_children(node) {
                    self.lower(child);
                }
                self.builder.close();
            }
            "ternary_expression" => {
                self.builder.open(self.data(NodeKind::Conditional, node));
                for field in ["condition", "consequence", "alternative"] {
                    if let Some(part) = node.child_by_field_name(field) {
                        self.lower(part);
                    }
                }
                self.builder.close();
            }
            "cast_expression" => {
                let mut data = self.data(NodeKind::Cast, node);
                if let Some(ty) = node.child_by_field_name("type") {
                    data = data.typed(self.type_name(ty));
                }
                self.builder.open(data);
                if let Some(value) = node.child_by_field_name("value") {
                    self.lower(value);
                }
                self.builder.close();
            }
            "parenthesized_expression" => {
                self.container(NodeKind::Parenthesized, node);
            }
            "assignment_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or("=");
                self.builder.open(self.data(NodeKind::Assignment, node).operator(operator));
                for field in ["left", "right"] {
                    if let Some(side) = node.child_by_field_name(field) {
                        self.lower(side);
                    }
                }
                self.builder.close();
            }
            "lambda_expression" => self.lambda(node),
            "class_literal" => {
                let ty = node
                    .named_child(0)
                    .map(|t| self.type_name(t))
                    .unwrap_or_default();
                self.builder.leaf(self.data(NodeKind::Other, node).typed(ty));
            }

            "decimal_integer_literal" | "hex_integer_literal" | "octal_integer_literal"
            | "binary_integer_literal" => {
                let mut data = self.data(NodeKind::Literal, node);
                if let Some(value) = int_literal(self.text(node)) {
                    data = data.literal(value);
                }
                self.builder.leaf(data);
            }
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                let mut data = self.data(NodeKind::Literal, node);
                if let Some(value) = float_literal(self.text(node)) {
                    data = data.literal(Literal::Float(value));
                }
                self.builder.leaf(data);
            }
            "true" | "false" => {
                let value = node.kind() == "true";
                self.builder
                    .leaf(self.data(NodeKind::Literal, node).literal(Literal::Bool(value)));
            }
            "null_literal" => {
                self.builder
                    .leaf(self.data(NodeKind::Literal, node).literal(Literal::Null));
            }
            "character_literal" => {
                let mut data = self.data(NodeKind::Literal, node);
                let text = self.text(node);
                let inner = text.get(1..text.len().saturating_sub(1)).unwrap_or_default();
                if let Some(c) = unescape(inner).chars().next() {
                    data = data.literal(Literal::Char(c));
                }
                self.builder.leaf(data);
            }
            "string_literal" | "text_block" => {
                let value = string_literal(self.text(node));
                self.builder
                    .leaf(self.data(NodeKind::Literal, node).literal(Literal::Str(value)));
            }
            _ => {
                self.container(NodeKind::Other, node);
            }
        }
    }

    fn builder_children(&mut self, id: NodeId) -> Vec<NodeId> {
        self.builder.node_mut(id).children.clone()
    }

    fn call(&mut self, node: Node<'_>) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default();
        let call = self.builder.open(self.data(NodeKind::Call, node).named(name));
        if let Some(object) = node.child_by_field_name("object") {
            self.lower(object);
            if let Some(&qualifier) = self.builder_children(call).first() {
                self.builder.set_qualifier(call, qualifier);
            }
        }
        if let Some(arguments) = node.child_by_field_name("arguments") {
            for argument in named_children(arguments) {
                self.lower(argument);
            }
        }
        self.builder.close();
    }

    /// `this(...)` and `super(...)` as calls named after the keyword
    fn constructor_invocation(&mut self, node: Node<'_>) {
        let name = node
            .child_by_field_name("constructor")
            .map(|c| self.text(c))
            .unwrap_or("this");
        self.builder.open(self.data(NodeKind::ExpressionStatement, node));
        self.builder.open(self.data(NodeKind::Call, node).named(name));
        if let Some(arguments) = node.child_by_field_name("arguments") {
            for argument in named_children(arguments) {
                self.lower(argument);
            }
        }
        self.builder.close();
        self.builder.close();
    }

    fn object_creation(&mut self, node: Node<'_>) {
        let ty = node
            .child_by_field_name("type")
            .map(|t| self.type_name(t))
            .unwrap_or_default();
        self.builder.open(self.data(NodeKind::New, node).typed(ty.clone()));
        if let Some(arguments) = node.child_by_field_name("arguments") {
            for argument in named_children(arguments) {
                self.lower(argument);
            }
        }
        if let Some(body) = named_children(node).into_iter().find(|c| c.kind() == "class_body") {
            // Anonymous class; unnamed, so it stays out of the symbol table
            self.builder
                .open(self.data(NodeKind::Class, body).class_kind(ClassKind::Class).extends(ty));
            self.class_body(body, "");
            self.builder.close();
        }
        self.builder.close();
    }

    fn array_creation(&mut self, node: Node<'_>) {
        let element = node
            .child_by_field_name("type")
            .map(|t| self.type_name(t))
            .unwrap_or_default();
        let parts = named_children(node);
        let dims = parts
            .iter()
            .filter(|c| matches!(c.kind(), "dimensions_expr" | "dimensions"))
            .map(|c| {
                if c.kind() == "dimensions" {
                    self.text(*c).matches('[').count()
                } else {
                    1
                }
            })
            .sum::<usize>()
            .max(1);
        let ty = format!("{}{}", element, "[]".repeat(dims));
        self.builder.open(self.data(NodeKind::New, node).typed(ty));
        for part in parts {
            match part.kind() {
                "dimensions_expr" => {
                    for size in named_children(part) {
                        self.lower(size);
                    }
                }
                "array_initializer" => self.lower(part),
                _ => {}
            }
        }
        self.builder.close();
    }

    fn enhanced_for(&mut self, node: Node<'_>) {
        self.builder.open(self.data(NodeKind::Loop, node));
        let mut variable = NodeData::new(NodeKind::LocalVariable).modifiers(self.modifiers(node));
        if let Some(name) = node.child_by_field_name("name") {
            variable = variable.named(self.text(name)).span(name.start_byte(), name.end_byte());
        }
        if let Some(ty) = node.child_by_field_name("type") {
            variable = variable.typed(self.type_name(ty));
        }
        self.builder.leaf(variable);
        if let Some(value) = node.child_by_field_name("value") {
            self.lower(value);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.lower(body);
        }
        self.builder.close();
    }

    /// Resource declarations become `LocalVariable` children of the `Try`
    fn try_statement(&mut self, node: Node<'_>) {
        self.builder.open(self.data(NodeKind::Try, node));
        if let Some(resources) = node.child_by_field_name("resources") {
            for resource in named_children(resources) {
                match resource.child_by_field_name("name") {
                    Some(name) => {
                        let mut data = self
                            .data(NodeKind::LocalVariable, resource)
                            .modifiers(self.modifiers(resource))
                            .named(self.text(name));
                        if let Some(ty) = resource.child_by_field_name("type") {
                            data = data.typed(self.type_name(ty));
                        }
                        self.builder.open(data);
                        self.annotations(resource);
                        if let Some(value) = resource.child_by_field_name("value") {
                            self.lower(value);
                        }
                        self.builder.close();
                    }
                    None => {
                        for child in named_children(resource) {
                            self.lower(child);
                        }
                    }
                }
            }
        }
        for child in named_children(node) {
            match child.kind() {
                "resource_specification" => {}
                _ => self.lower(child),
            }
        }
        self.builder.close();
    }

    /// `Switch` children: the selector, then one `Case` per label group.
    /// A `Case` holds its label expressions followed by a `Block` body and
    /// is named `default` when it carries the default label.
    fn switch(&mut self, node: Node<'_>) {
        self.builder.open(self.data(NodeKind::Switch, node));
        if let Some(condition) = node.child_by_field_name("condition") {
            let selector = if condition.kind() == "parenthesized_expression" {
                condition.named_child(0).unwrap_or(condition)
            } else {
                condition
            };
            self.lower(selector);
        }
        if let Some(body) = node.child_by_field_name("body") {
            for group in named_children(body) {
                if matches!(group.kind(), "switch_block_statement_group" | "switch_rule") {
                    self.case(group);
                }
            }
        }
        self.builder.close();
    }

    fn case(&mut self, group: Node<'_>) {
        let case = self.builder.open(self.data(NodeKind::Case, group));
        let parts = named_children(group);
        let mut body_start = None;
        for part in &parts {
            if part.kind() == "switch_label" {
                if self.text(*part).trim_start().starts_with("default") {
                    self.builder.node_mut(case).name = Some("default".to_string());
                }
                for value in named_children(*part) {
                    self.lower(value);
                }
            } else if body_start.is_none() {
                body_start = Some(part.start_byte());
            }
        }

        let start = body_start.unwrap_or(group.end_byte());
        self.builder
            .open(NodeData::new(NodeKind::Block).span(start, group.end_byte()));
        for part in parts.into_iter().filter(|p| p.kind() != "switch_label") {
            self.lower(part);
        }
        self.builder.close();
        self.builder.close();
    }

    fn lambda(&mut self, node: Node<'_>) {
        self.builder.open(self.data(NodeKind::Lambda, node));
        if let Some(parameters) = node.child_by_field_name("parameters") {
            if parameters.kind() == "identifier" {
                self.parameter(parameters);
            } else {
                for parameter in named_children(parameters) {
                    self.parameter(parameter);
                }
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.lower(body);
        }
        self.builder.close();
    }
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Integer literal value; non-`long` hex/octal/binary literals wrap to `int`
/// `int` unless suffixed with `L`. Hex, octal and binary literals use the
/// full bit pattern of their width; the decimal literals one past the
/// maximum only appear negated and fold back to the minimum.
fn int_literal(text: &str) -> Option<Literal> {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    let (digits, long) = match cleaned.strip_suffix(['l', 'L']) {
        Some(rest) => (rest, true),
        None => (cleaned.as_str(), false),
    };
    let lower = digits.to_ascii_lowercase();
    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex.to_string(), 16)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (bin.to_string(), 2)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (lower[1..].to_string(), 8)
    } else {
        (lower, 10)
    };
    let value = u64::from_str_radix(&digits, radix).ok()?;
    if long {
        let limit = if radix == 10 { 1 << 63 } else { u64::MAX };
        return (value <= limit).then_some(Literal::Long(value as i64));
    }
    let limit = if radix == 10 { 1 << 31 } else { u64::from(u32::MAX) };
    (value <= limit).then_some(Literal::Int(value as u32 as i32))
}

fn float_literal(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    cleaned
        .trim_end_matches(['f', 'F', 'd', 'D'])
        .parse()
        .ok()
}

fn string_literal(text: &str) -> String {
    if let Some(block) = text.strip_prefix("\"\"\"").and_then(|t| t.strip_suffix("\"\"\"")) {
        let block = block.strip_prefix('\n').unwrap_or(block);
        return unescape(block);
    }
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    unescape(inner)
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('s') => out.push(' '),
            Some('0') => out.push('\0'),
            Some('u') => {
                let hex: String = chars.by_ref().skip_while(|&c| c == 'u').take(4).collect();
                if let Some(c) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(c);
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
