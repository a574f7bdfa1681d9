//! Suppression resolution
//!
//! A finding anchored at a node is dropped when the configured severity is
//! `ignore`, when fatal-only mode is on and it is not fatal, or when a
//! directive on the node or an enclosing scope names its issue:
//!
//! - `@SuppressLint("Id")` / `@SuppressWarnings("Id")` on a declaration
//! - `tools:ignore="Id"` on an XML element
//! - `//noinspection Id`, `#noinspection Id` or `<!--suppress Id -->` on the
//!   line of a statement or declaration (before it), or on the non-blank
//!   line above it
//!
//! Scopes are checked innermost first; the first matching directive wins.

use crate::config::Config;
use crate::issues::{Issue, Severity};
use crate::model::{Expr, NodeId, NodeKind, Tree};
use once_cell::sync::Lazy;
use regex::Regex;

static COMMENT_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?://|#|<!--)\s*(?:noinspection|suppress)\s+([A-Za-z0-9_:,\- ]+)").unwrap()
});

const SUPPRESS_ANNOTATIONS: &[&str] = &[
    "android.annotation.SuppressLint",
    "java.lang.SuppressWarnings",
];

/// Prefix IDE inspections use for lint ids
const INSPECTION_PREFIX: &str = "AndroidLint";

/// Which directive suppressed a finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suppression {
    Annotation { node: NodeId },
    XmlIgnore { element: NodeId },
    Comment { line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    Disabled,
    NotFatal,
    Suppressed(Suppression),
}

/// Outcome of checking one finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Keep(Severity),
    Drop(DropReason),
}

impl Verdict {
    pub fn is_kept(&self) -> bool {
        matches!(self, Verdict::Keep(_))
    }
}

pub struct SuppressionResolver<'c> {
    config: &'c Config,
}

impl<'c> SuppressionResolver<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self { config }
    }

    /// Decide whether a finding of `issue` at `node` survives
    pub fn check(&self, issue: &Issue, tree: &Tree, node: Option<NodeId>) -> Verdict {
        let severity = self.config.severity_for(issue);
        if severity == Severity::Ignore {
            return Verdict::Drop(DropReason::Disabled);
        }
        if self.config.fatal_only && severity != Severity::Fatal {
            return Verdict::Drop(DropReason::NotFatal);
        }
        if let Some(node) = node {
            if let Some(suppression) = self.suppression_at(issue, tree, node) {
                return Verdict::Drop(DropReason::Suppressed(suppression));
            }
        }
        Verdict::Keep(severity)
    }

    /// Innermost directive suppressing `issue` at `node`
    pub fn suppression_at(&self, issue: &Issue, tree: &Tree, node: NodeId) -> Option<Suppression> {
        let comments = self.config.comment_suppression && tree.source().is_some();
        for scope in tree.self_and_ancestors(node) {
            let kind = tree.node_kind(scope);
            if kind.is_declaration() && annotation_suppresses(tree, scope, issue) {
                return Some(Suppression::Annotation { node: scope });
            }
            if kind == NodeKind::Element && xml_ignore_suppresses(tree, scope, issue) {
                return Some(Suppression::XmlIgnore { element: scope });
            }
            if comments && carries_comments(kind) {
                if let Some(line) = comment_suppresses(tree, scope, issue) {
                    return Some(Suppression::Comment { line });
                }
            }
        }
        None
    }
}

/// Whether a directive token names the issue
pub fn token_matches(token: &str, issue: &Issue) -> bool {
    let token = token.trim();
    let token = token.strip_prefix(INSPECTION_PREFIX).unwrap_or(token);
    if token.is_empty() {
        return false;
    }
    token.eq_ignore_ascii_case(issue.id)
        || token.eq_ignore_ascii_case("all")
        || token.eq_ignore_ascii_case(issue.category.name())
        || issue
            .category
            .parent()
            .is_some_and(|parent| token.eq_ignore_ascii_case(parent.name()))
}

fn carries_comments(kind: NodeKind) -> bool {
    kind.is_declaration()
        || matches!(
            kind,
            NodeKind::ExpressionStatement
                | NodeKind::Return
                | NodeKind::If
                | NodeKind::Loop
                | NodeKind::Switch
                | NodeKind::Try
                | NodeKind::Throw
                | NodeKind::Element
                | NodeKind::Dependency
        )
}

fn annotation_suppresses(tree: &Tree, declaration: NodeId, issue: &Issue) -> bool {
    tree.annotations(declaration).any(|annotation| {
        let name = tree.name(annotation).unwrap_or_default();
        let is_suppress = SUPPRESS_ANNOTATIONS
            .iter()
            .any(|q| name == *q || q.rsplit('.').next() == Some(name));
        is_suppress
            && tree
                .children(annotation)
                .iter()
                .filter(|&&arg| tree.node_kind(arg) == NodeKind::AnnotationArgument)
                .flat_map(|&arg| tree.children(arg).first().copied())
                .flat_map(|value| Expr::from_node(tree, value).string_values())
                .any(|token| token_matches(&token, issue))
    })
}

fn xml_ignore_suppresses(tree: &Tree, element: NodeId, issue: &Issue) -> bool {
    tree.children(element).iter().any(|&attr| {
        let data = tree.node(attr);
        data.kind == NodeKind::Attribute
            && data.prefix.as_deref() == Some("tools")
            && data.name.as_deref() == Some("ignore")
            && data
                .value
                .as_deref()
                .is_some_and(|v| v.split(',').any(|t| token_matches(t, issue)))
    })
}

/// Line number of a matching comment directive before the node on its first
/// line, or on the closest non-blank line above it
fn comment_suppresses(tree: &Tree, node: NodeId, issue: &Issue) -> Option<usize> {
    let source = tree.source()?;
    let data = tree.node(node);
    let offset = data.start.min(source.len());
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);

    if directive_matches(&source[line_start..offset], issue) {
        return Some(data.line);
    }

    let mut line = data.line;
    let mut end = line_start;
    while end > 0 {
        let previous_end = end - 1;
        let previous_start = source[..previous_end].rfind('\n').map_or(0, |i| i + 1);
        line = line.saturating_sub(1);
        let text = &source[previous_start..previous_end];
        if !text.trim().is_empty() {
            return directive_matches(text, issue).then_some(line);
        }
        end = previous_start;
    }
    None
}

fn directive_matches(line: &str, issue: &Issue) -> bool {
    COMMENT_DIRECTIVE.captures_iter(line).any(|caps| {
        caps.get(1).is_some_and(|ids| {
            ids.as_str()
                .split([',', ' '])
                .any(|token| token_matches(token, issue))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::{Category, Implementation, ScopeSet};
    use crate::issues::Scope;
    use crate::model::{Literal, NodeData, Phase, TreeBuilder};

    static SAMPLE: Issue = Issue::create(
        "SampleId",
        "Sample",
        "Sample issue",
        Category::Correctness,
        5,
        Severity::Warning,
        Implementation::new("SampleDetector", ScopeSet::ALL),
    );

    static RTL_SAMPLE: Issue = Issue::create(
        "RtlSample",
        "Rtl",
        "Rtl sample",
        Category::Bidirectional,
        5,
        Severity::Warning,
        Implementation::new("SampleDetector", ScopeSet::ALL),
    );

    #[test]
    fn test_token_matching() {
        assert!(token_matches("SampleId", &SAMPLE));
        assert!(token_matches(" sampleid ", &SAMPLE));
        assert!(token_matches("all", &SAMPLE));
        assert!(token_matches("AndroidLintSampleId", &SAMPLE));
        assert!(token_matches("Correctness", &SAMPLE));
        assert!(token_matches("Internationalization", &RTL_SAMPLE));
        assert!(!token_matches("Other", &SAMPLE));
        assert!(!token_matches("", &SAMPLE));
    }

    #[test]
    fn test_comment_directive_on_previous_line() {
        let source = "class A {\n  //noinspection SampleId\n\n  void m() {}\n}\n";
        let method_start = source.find("void").unwrap();
        let mut b = TreeBuilder::new("A.java", Phase::Source, Scope::JavaFile).with_source(source);
        b.open(NodeData::new(NodeKind::Class).named("A").span(0, source.len()));
        let method = b.leaf(NodeData::new(NodeKind::Method).named("m").span(method_start, method_start + 11));
        let tree = b.build();

        let config = Config::default();
        let resolver = SuppressionResolver::new(&config);
        assert_eq!(
            resolver.suppression_at(&SAMPLE, &tree, method),
            Some(Suppression::Comment { line: 2 })
        );

        let disabled = Config {
            comment_suppression: false,
            ..Config::default()
        };
        let resolver = SuppressionResolver::new(&disabled);
        assert_eq!(resolver.check(&SAMPLE, &tree, Some(method)), Verdict::Keep(Severity::Warning));
    }

    #[test]
    fn test_annotation_on_enclosing_class() {
        // @SuppressLint({"Other", "SampleId"}) class A { void m() { call(); } }
        let mut b = TreeBuilder::new("A.java", Phase::Source, Scope::JavaFile);
        let class = b.open(NodeData::new(NodeKind::Class).named("A"));
        b.open(NodeData::new(NodeKind::Annotation).named("SuppressLint"));
        b.open(NodeData::new(NodeKind::AnnotationArgument));
        b.open(NodeData::new(NodeKind::ArrayInit));
        b.leaf(NodeData::new(NodeKind::Literal).literal(Literal::Str("Other".into())));
        b.leaf(NodeData::new(NodeKind::Literal).literal(Literal::Str("SampleId".into())));
        b.close();
        b.close();
        b.close();
        b.open(NodeData::new(NodeKind::Method).named("m"));
        let call = b.leaf(NodeData::new(NodeKind::Call).named("call"));
        let tree = b.build();

        let config = Config::default();
        let resolver = SuppressionResolver::new(&config);
        assert_eq!(
            resolver.check(&SAMPLE, &tree, Some(call)),
            Verdict::Drop(DropReason::Suppressed(Suppression::Annotation { node: class }))
        );
        assert!(resolver.check(&RTL_SAMPLE, &tree, Some(call)).is_kept());
    }

    #[test]
    fn test_severity_short_circuits() {
        let tree = TreeBuilder::new("A.java", Phase::Source, Scope::JavaFile).build();
        let mut config = Config::default();
        config.severity.insert("SampleId".into(), Severity::Ignore);
        let resolver = SuppressionResolver::new(&config);
        assert_eq!(
            resolver.check(&SAMPLE, &tree, None),
            Verdict::Drop(DropReason::Disabled)
        );

        let fatal_only = Config {
            fatal_only: true,
            ..Config::default()
        };
        let resolver = SuppressionResolver::new(&fatal_only);
        assert_eq!(
            resolver.check(&SAMPLE, &tree, None),
            Verdict::Drop(DropReason::NotFatal)
        );
    }
}
