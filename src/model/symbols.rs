//! Shared symbol table
//!
//! Built once from every source unit (plus any compiled classes the host
//! registers) before the dispatch phase starts, then shared read-only across
//! workers. Cross-unit resolution goes through here, never through another
//! worker's tree.

use super::{Expr, ImportContext, Modifiers, NodeId, NodeKind, Tree};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Names resolvable without an import
const JAVA_LANG: &[&str] = &[
    "Object",
    "String",
    "CharSequence",
    "Integer",
    "Long",
    "Short",
    "Byte",
    "Character",
    "Boolean",
    "Float",
    "Double",
    "Number",
    "Math",
    "System",
    "Thread",
    "Runnable",
    "Iterable",
    "Comparable",
    "AutoCloseable",
    "Class",
    "Enum",
    "Exception",
    "RuntimeException",
    "Error",
    "Throwable",
    "Override",
    "Deprecated",
    "SuppressWarnings",
    "FunctionalInterface",
    "SafeVarargs",
    "StringBuilder",
];

const PRIMITIVES: &[&str] = &[
    "int", "long", "short", "byte", "char", "boolean", "float", "double", "void",
];

/// Where a class symbol came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Source,
    Compiled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Annotation,
    Record,
}

/// An annotation as written on a declaration
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationInstance {
    /// Qualified name when resolvable, otherwise as written
    pub name: String,
    /// Attribute values in declaration order; a bare value is named `value`
    pub attributes: Vec<(String, Expr)>,
    /// Annotation node, for annotations in the unit being analyzed
    pub node: Option<NodeId>,
    /// Class whose scope resolves constants in attribute values
    pub context: Option<String>,
}

impl AnnotationInstance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            node: None,
            context: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Expr) -> Self {
        self.attributes.push((name.into(), value));
        self
    }

    pub fn with_context(mut self, class: impl Into<String>) -> Self {
        self.context = Some(class.into());
        self
    }

    pub fn from_node(tree: &Tree, id: NodeId, context: Option<String>) -> Self {
        let mut annotation = Self::new(tree.name(id).unwrap_or_default());
        annotation.node = Some(id);
        annotation.context = context;
        for &arg in tree.children(id) {
            if tree.node_kind(arg) != NodeKind::AnnotationArgument {
                continue;
            }
            let name = tree.name(arg).unwrap_or("value").to_string();
            let value = tree
                .children(arg)
                .first()
                .map(|&v| Expr::from_node(tree, v))
                .unwrap_or(Expr::Unknown);
            annotation.attributes.push((name, value));
        }
        annotation
    }

    pub fn attribute(&self, name: &str) -> Option<&Expr> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn value(&self) -> Option<&Expr> {
        self.attribute("value")
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Matches either the qualified name or, for unresolved annotations,
    /// the simple name
    pub fn is(&self, qualified: &str) -> bool {
        self.name == qualified
            || (!self.name.contains('.') && qualified.rsplit('.').next() == Some(self.name.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSymbol {
    pub name: String,
    pub type_name: Option<String>,
    pub modifiers: Modifiers,
    pub initializer: Option<Expr>,
    pub annotations: Vec<AnnotationInstance>,
}

impl FieldSymbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            modifiers: Modifiers::default(),
            initializer: None,
            annotations: Vec::new(),
        }
    }

    /// A `static final` constant with an initializer
    pub fn constant(name: impl Into<String>, type_name: &str, value: Expr) -> Self {
        Self {
            type_name: Some(type_name.to_string()),
            modifiers: Modifiers::static_final(),
            initializer: Some(value),
            ..Self::new(name)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSymbol {
    pub name: String,
    pub type_name: Option<String>,
    pub annotations: Vec<AnnotationInstance>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodSymbol {
    pub name: String,
    /// `None` for constructors
    pub return_type: Option<String>,
    pub parameters: Vec<ParameterSymbol>,
    pub annotations: Vec<AnnotationInstance>,
    pub modifiers: Modifiers,
}

impl MethodSymbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            return_type: None,
            parameters: Vec::new(),
            annotations: Vec::new(),
            modifiers: Modifiers::default(),
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.return_type.is_none()
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Whether a call with `arity` arguments can bind to this method
    pub fn accepts(&self, arity: usize) -> bool {
        let varargs = self
            .parameters
            .last()
            .and_then(|p| p.type_name.as_deref())
            .is_some_and(|t| t.ends_with("..."));
        if varargs {
            arity + 1 >= self.parameters.len()
        } else {
            arity == self.parameters.len()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassSymbol {
    /// Dotted qualified name; nested classes use `.` as well
    pub name: String,
    pub package: String,
    pub kind: ClassKind,
    pub modifiers: Modifiers,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub annotations: Vec<AnnotationInstance>,
    pub fields: Vec<FieldSymbol>,
    pub methods: Vec<MethodSymbol>,
    pub outer: Option<String>,
    pub imports: Arc<ImportContext>,
    pub origin: Origin,
    pub file: Option<PathBuf>,
}

impl ClassSymbol {
    /// A compiled class known only by name; `package` is taken from the
    /// lower-case prefix of the name
    pub fn compiled(name: impl Into<String>, kind: ClassKind) -> Self {
        let name = name.into();
        let package = name
            .split('.')
            .take_while(|s| s.chars().next().is_some_and(|c| c.is_lowercase()))
            .collect::<Vec<_>>()
            .join(".");
        Self {
            imports: Arc::new(ImportContext::new(package.clone())),
            name,
            package,
            kind,
            modifiers: Modifiers::default(),
            superclass: None,
            interfaces: Vec::new(),
            annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            outer: None,
            origin: Origin::Compiled,
            file: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSymbol> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// A resolved declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Declaration {
    /// Local variable or parameter in the current unit
    Local(NodeId),
    Class(String),
    Field {
        owner: String,
        name: String,
    },
    Method {
        owner: String,
        name: String,
        arity: usize,
    },
    Parameter {
        owner: String,
        method: String,
        arity: usize,
        index: usize,
    },
}

/// Collects class symbols before the table is frozen
#[derive(Default)]
pub struct SymbolTableBuilder {
    classes: Vec<ClassSymbol>,
}

impl SymbolTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every named class declared in a unit
    pub fn index(&mut self, tree: &Tree) {
        if !tree.phase().has_code() {
            return;
        }
        let origin = match tree.phase() {
            super::Phase::Bytecode => Origin::Compiled,
            _ => Origin::Source,
        };

        for id in tree.ids() {
            if tree.node_kind(id) != NodeKind::Class {
                continue;
            }
            let Some(name) = tree.qualified_class_name(id) else {
                continue;
            };
            let data = tree.node(id);
            let outer = tree
                .enclosing_class(id)
                .and_then(|o| tree.qualified_class_name(o));
            let annotations_of = |decl: NodeId| -> Vec<AnnotationInstance> {
                // Symbols outlive the unit, so attribute values resolve by class
                tree.annotations(decl)
                    .map(|a| {
                        let mut annotation = AnnotationInstance::from_node(tree, a, Some(name.clone()));
                        annotation.node = None;
                        annotation
                    })
                    .collect()
            };

            let mut class = ClassSymbol {
                name: name.clone(),
                package: tree.imports().package.clone(),
                kind: data.class_kind.unwrap_or(ClassKind::Class),
                modifiers: data.modifiers,
                superclass: data.extends.clone(),
                interfaces: data.implements.clone(),
                annotations: annotations_of(id),
                fields: Vec::new(),
                methods: Vec::new(),
                outer,
                imports: Arc::clone(tree.imports()),
                origin,
                file: Some(tree.file().to_path_buf()),
            };

            for &member in tree.children(id) {
                let member_data = tree.node(member);
                match member_data.kind {
                    NodeKind::Field => class.fields.push(FieldSymbol {
                        name: member_data.name.clone().unwrap_or_default(),
                        type_name: member_data.type_name.clone(),
                        modifiers: member_data.modifiers,
                        initializer: tree.initializer(member).map(|i| Expr::from_node(tree, i)),
                        annotations: annotations_of(member),
                    }),
                    NodeKind::Method => class.methods.push(MethodSymbol {
                        name: member_data.name.clone().unwrap_or_default(),
                        return_type: member_data.type_name.clone(),
                        parameters: tree
                            .parameters(member)
                            .into_iter()
                            .map(|p| ParameterSymbol {
                                name: tree.name(p).unwrap_or_default().to_string(),
                                type_name: tree.node(p).type_name.clone(),
                                annotations: annotations_of(p),
                            })
                            .collect(),
                        annotations: annotations_of(member),
                        modifiers: member_data.modifiers,
                    }),
                    _ => {}
                }
            }

            self.classes.push(class);
        }
    }

    /// Register a class the host knows from compiled input
    pub fn add_class(&mut self, class: ClassSymbol) {
        self.classes.push(class);
    }

    /// Qualify all type and annotation names and freeze the table
    pub fn build(self) -> SymbolTable {
        let known: HashSet<String> = self.classes.iter().map(|c| c.name.clone()).collect();
        let is_known = |n: &str| known.contains(n);

        let mut classes = HashMap::with_capacity(self.classes.len());
        for mut class in self.classes {
            let ctx = Arc::clone(&class.imports);
            let enclosing = class.name.clone();
            let q = |name: &str| {
                qualify_with(&is_known, &ctx, Some(&enclosing), name)
                    .unwrap_or_else(|| strip_type(name).to_string())
            };

            class.superclass = class.superclass.as_deref().map(q);
            class.interfaces = class.interfaces.iter().map(|i| q(i)).collect();
            qualify_annotations(&mut class.annotations, &q);
            for field in &mut class.fields {
                field.type_name = field.type_name.as_deref().map(q);
                qualify_annotations(&mut field.annotations, &q);
            }
            for method in &mut class.methods {
                method.return_type = method.return_type.as_deref().map(q);
                qualify_annotations(&mut method.annotations, &q);
                for param in &mut method.parameters {
                    // Keep the varargs marker, it drives arity matching
                    param.type_name = param.type_name.as_deref().map(|t| {
                        let qualified = q(t);
                        if t.ends_with("...") {
                            format!("{}...", qualified)
                        } else {
                            qualified
                        }
                    });
                    qualify_annotations(&mut param.annotations, &q);
                }
            }

            if classes.contains_key(&class.name) {
                debug!("Duplicate class symbol {}, keeping the first", class.name);
                continue;
            }
            classes.insert(class.name.clone(), class);
        }

        SymbolTable {
            classes,
            merged: RwLock::new(HashMap::new()),
            merge_count: AtomicUsize::new(0),
        }
    }
}

fn qualify_annotations(annotations: &mut [AnnotationInstance], q: &dyn Fn(&str) -> String) {
    for annotation in annotations {
        annotation.name = q(&annotation.name);
    }
}

/// Read-only class index with memoized meta-annotation merging
#[derive(Debug, Default)]
pub struct SymbolTable {
    classes: HashMap<String, ClassSymbol>,
    merged: RwLock<HashMap<String, Arc<Vec<AnnotationInstance>>>>,
    merge_count: AtomicUsize,
}

impl SymbolTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn class(&self, name: &str) -> Option<&ClassSymbol> {
        self.classes.get(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassSymbol> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Qualify a type name as seen from `enclosing` under `ctx`
    pub fn qualify(&self, ctx: &ImportContext, enclosing: Option<&str>, name: &str) -> Option<String> {
        qualify_with(&|n: &str| self.classes.contains_key(n), ctx, enclosing, name)
    }

    /// The class and its supertypes, breadth first, each once
    pub fn hierarchy(&self, class: &str) -> Vec<&ClassSymbol> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([class.to_string()]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            let Some(symbol) = self.class(&next) else {
                continue;
            };
            out.push(symbol);
            queue.extend(symbol.superclass.iter().cloned());
            queue.extend(symbol.interfaces.iter().cloned());
        }
        out
    }

    /// Field declared in the class or inherited
    pub fn find_field(&self, class: &str, name: &str) -> Option<(&ClassSymbol, &FieldSymbol)> {
        self.hierarchy(class)
            .into_iter()
            .find_map(|c| c.field(name).map(|f| (c, f)))
    }

    /// Most specific method accepting `arity` arguments
    pub fn find_method(
        &self,
        class: &str,
        name: &str,
        arity: usize,
    ) -> Option<(&ClassSymbol, &MethodSymbol)> {
        self.hierarchy(class).into_iter().find_map(|c| {
            c.methods
                .iter()
                .find(|m| m.name == name && m.accepts(arity))
                .map(|m| (c, m))
        })
    }

    /// Same-named, same-arity methods in proper supertypes
    pub fn overridden_methods(&self, class: &str, name: &str, arity: usize) -> Vec<&MethodSymbol> {
        self.hierarchy(class)
            .into_iter()
            .skip(1)
            .flat_map(|c| c.methods.iter())
            .filter(|m| m.name == name && m.arity() == arity && !m.is_constructor())
            .collect()
    }

    /// Meta-annotations of an annotation type, merged transitively
    ///
    /// Computed at most once per annotation type; repeated calls return the
    /// memoized set.
    pub fn merged_annotations(&self, annotation_type: &str) -> Arc<Vec<AnnotationInstance>> {
        if let Ok(memo) = self.merged.read() {
            if let Some(hit) = memo.get(annotation_type) {
                return Arc::clone(hit);
            }
        }

        self.merge_count.fetch_add(1, Ordering::Relaxed);
        let mut merged = Vec::new();
        let mut visited = HashSet::new();
        self.collect_meta_annotations(annotation_type, &mut merged, &mut visited);
        let merged = Arc::new(merged);

        match self.merged.write() {
            Ok(mut memo) => Arc::clone(
                memo.entry(annotation_type.to_string())
                    .or_insert(merged),
            ),
            Err(_) => merged,
        }
    }

    /// Number of merges actually computed
    pub fn merge_count(&self) -> usize {
        self.merge_count.load(Ordering::Relaxed)
    }

    /// Whether the name is a known annotation type
    pub fn is_annotation_type(&self, name: &str) -> bool {
        self.class(name)
            .is_some_and(|c| c.kind == ClassKind::Annotation)
    }

    fn collect_meta_annotations(
        &self,
        annotation_type: &str,
        out: &mut Vec<AnnotationInstance>,
        visited: &mut HashSet<String>,
    ) {
        if !visited.insert(annotation_type.to_string()) {
            return;
        }
        let Some(class) = self.class(annotation_type) else {
            return;
        };
        if class.kind != ClassKind::Annotation {
            return;
        }
        for annotation in &class.annotations {
            if !out.iter().any(|o| o.name == annotation.name) {
                let mut inherited = annotation.clone();
                inherited.node = None;
                out.push(inherited);
            }
            self.collect_meta_annotations(&annotation.name, out, visited);
        }
    }
}

/// Drop generics, array/varargs markers and type annotations
pub(crate) fn strip_type(name: &str) -> &str {
    let mut name = name.trim();
    if let Some(last) = name.split_whitespace().last() {
        name = last;
    }
    if let Some(pos) = name.find('<') {
        name = &name[..pos];
    }
    loop {
        let trimmed = name.trim_end_matches("[]").trim_end_matches("...");
        if trimmed.len() == name.len() {
            break;
        }
        name = trimmed;
    }
    name
}

pub(crate) fn is_primitive(name: &str) -> bool {
    PRIMITIVES.contains(&name)
}

/// Qualifies a type name as written in source. A dotted name qualifies its
/// first segment and appends the rest; when that fails it is taken as already
/// fully qualified.
fn qualify_with(
    known: &dyn Fn(&str) -> bool,
    ctx: &ImportContext,
    enclosing: Option<&str>,
    name: &str,
) -> Option<String> {
    let name = strip_type(name);
    if name.is_empty() {
        return None;
    }
    if is_primitive(name) {
        return Some(name.to_string());
    }
    if let Some((first, rest)) = name.split_once('.') {
        if known(name) {
            return Some(name.to_string());
        }
        if let Some(outer) = qualify_simple(known, ctx, enclosing, first) {
            return Some(format!("{}.{}", outer, rest));
        }
        // Already fully qualified
        return Some(name.to_string());
    }
    qualify_simple(known, ctx, enclosing, name)
}

/// Resolves a simple name in Java scope order: the enclosing class chain and
/// its member classes (innermost first), explicit imports, the same package,
/// wildcard imports of known classes, then well-known `java.lang` names.
fn qualify_simple(
    known: &dyn Fn(&str) -> bool,
    ctx: &ImportContext,
    enclosing: Option<&str>,
    name: &str,
) -> Option<String> {
    if let Some(enclosing) = enclosing {
        let mut scope = enclosing;
        loop {
            if scope.rsplit('.').next() == Some(name) && known(scope) {
                return Some(scope.to_string());
            }
            let nested = format!("{}.{}", scope, name);
            if known(&nested) {
                return Some(nested);
            }
            match scope.rsplit_once('.') {
                Some((outer, _)) if outer.len() > ctx.package.len() => scope = outer,
                _ => break,
            }
        }
    }

    if let Some(explicit) = ctx.explicit(name) {
        return Some(explicit.to_string());
    }

    let same_package = if ctx.package.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", ctx.package, name)
    };
    if known(&same_package) {
        return Some(same_package);
    }

    for wildcard in &ctx.wildcards {
        let candidate = format!("{}.{}", wildcard, name);
        if known(&candidate) {
            return Some(candidate);
        }
    }

    if JAVA_LANG.contains(&name) {
        return Some(format!("java.lang.{}", name));
    }
    None
}
