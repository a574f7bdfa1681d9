//! Normalized program model
//!
//! Every adapter (Java source, XML, version catalog, or a host supplying
//! compiled classes) lowers its input into one arena [`Tree`] per unit.
//! Nodes are addressed by [`NodeId`]; parent links are plain indices, so the
//! tree owns every node and nothing points back into it.

mod builder;
pub mod expr;
pub mod symbols;

pub use builder::TreeBuilder;
pub use expr::{Expr, Literal};
pub use symbols::{
    AnnotationInstance, ClassKind, ClassSymbol, Declaration, FieldSymbol, MethodSymbol, Origin,
    ParameterSymbol, SymbolTable, SymbolTableBuilder,
};

use crate::issues::Scope;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Index of a node inside its [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Traversal phase; each phase walks a different kind of unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Source,
    Bytecode,
    Xml,
    Build,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Source, Phase::Bytecode, Phase::Xml, Phase::Build];

    pub fn index(self) -> usize {
        match self {
            Phase::Source => 0,
            Phase::Bytecode => 1,
            Phase::Xml => 2,
            Phase::Build => 3,
        }
    }

    /// Whether calls, constructors and annotations exist in this phase
    pub fn has_code(self) -> bool {
        matches!(self, Phase::Source | Phase::Bytecode)
    }
}

/// Closed set of node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    Import,
    Class,
    Method,
    Field,
    Parameter,
    LocalVariable,
    Annotation,
    AnnotationArgument,
    Block,
    ExpressionStatement,
    Call,
    New,
    Reference,
    Select,
    Literal,
    Binary,
    Unary,
    Conditional,
    Assignment,
    Return,
    If,
    Switch,
    Case,
    Loop,
    Try,
    Throw,
    ArrayInit,
    Parenthesized,
    Lambda,
    Cast,
    Other,
    Document,
    Element,
    Attribute,
    Dependency,
}

impl NodeKind {
    /// Phases in which this kind can appear
    pub fn phases(self) -> &'static [Phase] {
        match self {
            NodeKind::Document | NodeKind::Element | NodeKind::Attribute => &[Phase::Xml],
            NodeKind::Dependency => &[Phase::Build],
            NodeKind::Other => &Phase::ALL,
            NodeKind::File => &[Phase::Source, Phase::Bytecode],
            _ => &[Phase::Source, Phase::Bytecode],
        }
    }

    pub fn occurs_in(self, phase: Phase) -> bool {
        self.phases().contains(&phase)
    }

    /// Declarations that can carry suppression annotations
    pub fn is_declaration(self) -> bool {
        matches!(
            self,
            NodeKind::Class
                | NodeKind::Method
                | NodeKind::Field
                | NodeKind::Parameter
                | NodeKind::LocalVariable
        )
    }
}

/// Java declaration modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub is_public: bool,
    pub is_protected: bool,
    pub is_private: bool,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
}

impl Modifiers {
    pub fn static_final() -> Self {
        Self {
            is_static: true,
            is_final: true,
            ..Default::default()
        }
    }
}

/// Payload of one node
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Byte offsets into the source
    pub start: usize,
    pub end: usize,
    /// 1-based
    pub line: usize,
    pub column: usize,
    /// Identifier, method name, annotation name, tag or attribute local name
    pub name: Option<String>,
    /// Declared, created or cast-to type, as written
    pub type_name: Option<String>,
    /// Superclass of a class declaration
    pub extends: Option<String>,
    /// Implemented (or, for interfaces, extended) interfaces
    pub implements: Vec<String>,
    pub class_kind: Option<ClassKind>,
    pub operator: Option<String>,
    pub literal: Option<Literal>,
    pub modifiers: Modifiers,
    /// Receiver of a call or qualifier of a select; also a child
    pub qualifier: Option<NodeId>,
    /// XML namespace prefix or dependency group
    pub prefix: Option<String>,
    /// XML attribute value or dependency version
    pub value: Option<String>,
}

impl NodeData {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            start: 0,
            end: 0,
            line: 0,
            column: 0,
            name: None,
            type_name: None,
            extends: None,
            implements: Vec::new(),
            class_kind: None,
            operator: None,
            literal: None,
            modifiers: Modifiers::default(),
            qualifier: None,
            prefix: None,
            value: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn typed(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn span(mut self, start: usize, end: usize) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn literal(mut self, literal: Literal) -> Self {
        self.literal = Some(literal);
        self
    }

    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn class_kind(mut self, kind: ClassKind) -> Self {
        self.class_kind = Some(kind);
        self
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.extends = Some(superclass.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.implements.push(interface.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Names visible to a compilation unit through its package and imports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportContext {
    pub package: String,
    /// Single-type imports, fully qualified
    pub imports: Vec<String>,
    /// Packages imported with `.*`
    pub wildcards: Vec<String>,
    /// `import static a.b.C.NAME` entries, fully qualified
    pub static_imports: Vec<String>,
}

impl ImportContext {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Default::default()
        }
    }

    /// Record an import statement as written (without `import`/`;`)
    pub fn add_import(&mut self, path: &str, is_static: bool) {
        let path = path.trim();
        if let Some(prefix) = path.strip_suffix(".*") {
            if is_static {
                self.static_imports.push(path.to_string());
            } else {
                self.wildcards.push(prefix.to_string());
            }
        } else if is_static {
            self.static_imports.push(path.to_string());
        } else {
            self.imports.push(path.to_string());
        }
    }

    /// Explicit import whose simple name matches
    pub fn explicit(&self, simple: &str) -> Option<&str> {
        self.imports
            .iter()
            .find(|i| i.rsplit('.').next() == Some(simple))
            .map(String::as_str)
    }
}

/// A reportable position
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Location {
    pub file: PathBuf,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Location {
    /// Whole-project location for findings with no anchor
    pub fn project(root: &Path) -> Self {
        Self {
            file: root.to_path_buf(),
            start: 0,
            end: 0,
            line: 0,
            column: 0,
        }
    }

    /// Start of a file, for findings about the file as a whole
    pub fn file_start(path: &Path) -> Self {
        Self {
            file: path.to_path_buf(),
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// One compilation unit
#[derive(Debug, Clone)]
pub struct Tree {
    file: PathBuf,
    phase: Phase,
    scope: Scope,
    source: Option<Arc<str>>,
    imports: Arc<ImportContext>,
    nodes: Vec<NodeData>,
}

impl Tree {
    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Source text; `None` for compiled input
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn imports(&self) -> &Arc<ImportContext> {
        &self.imports
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    pub fn node_kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).name.as_deref()
    }

    /// All node ids in arena order (pre-order for builder-made trees)
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Strict ancestors, innermost first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// The node itself followed by its ancestors
    pub fn self_and_ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&p| self.parent(p))
    }

    /// Pre-order walk of a subtree
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    pub fn enclosing(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.ancestors(id).find(|&a| self.node_kind(a) == kind)
    }

    pub fn enclosing_class(&self, id: NodeId) -> Option<NodeId> {
        self.enclosing(id, NodeKind::Class)
    }

    pub fn enclosing_method(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .take_while(|&a| self.node_kind(a) != NodeKind::Class)
            .find(|&a| matches!(self.node_kind(a), NodeKind::Method | NodeKind::Lambda))
    }

    /// Annotation children of a declaration
    pub fn annotations(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.node_kind(c) == NodeKind::Annotation)
    }

    /// Initializer of a field or local variable
    pub fn initializer(&self, id: NodeId) -> Option<NodeId> {
        match self.node_kind(id) {
            NodeKind::Field | NodeKind::LocalVariable => self
                .children(id)
                .iter()
                .copied()
                .rev()
                .find(|&c| self.node_kind(c) != NodeKind::Annotation),
            _ => None,
        }
    }

    /// Call/new arguments, excluding the receiver
    pub fn arguments(&self, id: NodeId) -> Vec<NodeId> {
        let data = self.node(id);
        data.children
            .iter()
            .copied()
            .filter(|&c| Some(c) != data.qualifier && self.node_kind(c) != NodeKind::Class)
            .collect()
    }

    pub fn qualifier(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).qualifier
    }

    /// Parameters of a method or lambda
    pub fn parameters(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.node_kind(c) == NodeKind::Parameter)
            .collect()
    }

    /// Members of a class declaration
    pub fn members(&self, class: NodeId, kind: NodeKind) -> Vec<NodeId> {
        self.children(class)
            .iter()
            .copied()
            .filter(|&c| self.node_kind(c) == kind)
            .collect()
    }

    /// Skip parentheses and casts
    pub fn skip_parentheses(&self, mut id: NodeId) -> NodeId {
        while matches!(
            self.node_kind(id),
            NodeKind::Parenthesized | NodeKind::Cast
        ) {
            match self.children(id).last() {
                Some(&inner) => id = inner,
                None => break,
            }
        }
        id
    }

    /// Walk parentheses and casts upward
    pub fn skip_parentheses_up(&self, mut id: NodeId) -> Option<NodeId> {
        let mut parent = self.parent(id)?;
        while matches!(
            self.node_kind(parent),
            NodeKind::Parenthesized | NodeKind::Cast
        ) {
            id = parent;
            parent = self.parent(id)?;
        }
        Some(parent)
    }

    pub fn source_text(&self, id: NodeId) -> Option<&str> {
        let data = self.node(id);
        self.source()?.get(data.start..data.end)
    }

    pub fn source_location(&self, id: NodeId) -> Location {
        let data = self.node(id);
        Location {
            file: self.file.clone(),
            start: data.start,
            end: data.end,
            line: data.line,
            column: data.column,
        }
    }

    /// Find the declaration a simple name refers to, by syntactic scope
    ///
    /// Looks at locals and parameters declared before `from` in every
    /// enclosing block, then at fields of enclosing classes.
    pub fn resolve_local(&self, name: &str, from: NodeId) -> Option<NodeId> {
        let mut child = from;
        for scope in self.ancestors(from) {
            let data = self.node(scope);
            match data.kind {
                NodeKind::Class => {
                    if let Some(field) = data.children.iter().copied().find(|&c| {
                        self.node_kind(c) == NodeKind::Field && self.name(c) == Some(name)
                    }) {
                        return Some(field);
                    }
                }
                NodeKind::Method | NodeKind::Lambda => {
                    if let Some(param) = data.children.iter().copied().find(|&c| {
                        self.node_kind(c) == NodeKind::Parameter && self.name(c) == Some(name)
                    }) {
                        return Some(param);
                    }
                }
                _ => {
                    let position = data.children.iter().position(|&c| c == child);
                    let before = &data.children[..position.unwrap_or(0)];
                    if let Some(local) = before.iter().rev().copied().find(|&c| {
                        matches!(self.node_kind(c), NodeKind::LocalVariable | NodeKind::Parameter)
                            && self.name(c) == Some(name)
                    }) {
                        return Some(local);
                    }
                }
            }
            child = scope;
        }
        None
    }

    /// Dotted name of a class declaration, including outer classes
    pub fn qualified_class_name(&self, class: NodeId) -> Option<String> {
        let mut parts = vec![self.name(class)?.to_string()];
        for outer in self.ancestors(class) {
            if self.node_kind(outer) == NodeKind::Class {
                parts.push(self.name(outer)?.to_string());
            }
        }
        parts.reverse();
        let simple = parts.join(".");
        Some(if self.imports.package.is_empty() {
            simple
        } else {
            format!("{}.{}", self.imports.package, simple)
        })
    }

    /// Dotted text of a reference/select chain such as `android.os.Build`
    pub fn dotted_name(&self, id: NodeId) -> Option<String> {
        let data = self.node(id);
        match data.kind {
            NodeKind::Reference => data.name.clone(),
            NodeKind::Select => {
                let name = data.name.as_deref()?;
                match data.qualifier {
                    Some(q) => Some(format!("{}.{}", self.dotted_name(q)?, name)),
                    None => Some(name.to_string()),
                }
            }
            _ => None,
        }
    }
}
