//! Issue registry - read-only catalog of every known issue

use super::{Category, Issue, Scope, LINT_ERROR};
use crate::error::{LintError, Result};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use tracing::debug;

static BUILTIN: OnceCell<IssueRegistry> = OnceCell::new();

/// Catalog of issues, queryable by id and scope
///
/// Construction rejects duplicate ids; a duplicate means the rule set itself
/// is broken.
#[derive(Debug)]
pub struct IssueRegistry {
    issues: Vec<&'static Issue>,
    by_id: HashMap<&'static str, usize>,
}

impl IssueRegistry {
    pub fn new(issues: impl IntoIterator<Item = &'static Issue>) -> Result<Self> {
        let mut registry = Self {
            issues: Vec::new(),
            by_id: HashMap::new(),
        };

        for issue in issues {
            if registry.by_id.contains_key(issue.id) {
                return Err(LintError::Configuration(format!(
                    "duplicate issue id `{}`",
                    issue.id
                )));
            }
            registry.by_id.insert(issue.id, registry.issues.len());
            registry.issues.push(issue);
        }

        Ok(registry)
    }

    /// The process-wide registry of built-in issues, created on first use
    pub fn builtin() -> Result<&'static IssueRegistry> {
        BUILTIN.get_or_try_init(|| {
            let mut issues = vec![&LINT_ERROR];
            issues.extend(crate::analysis::detectors::builtin_issues());
            let registry = IssueRegistry::new(issues)?;
            debug!("Registered {} built-in issues", registry.len());
            Ok(registry)
        })
    }

    pub fn issue(&self, id: &str) -> Option<&'static Issue> {
        self.by_id.get(id).map(|&i| self.issues[i])
    }

    /// Whether this exact issue definition is registered
    pub fn contains(&self, issue: &Issue) -> bool {
        self.issue(issue.id)
            .is_some_and(|registered| std::ptr::eq(registered, issue))
    }

    /// All issues in registration order
    pub fn issues(&self) -> &[&'static Issue] {
        &self.issues
    }

    pub fn issues_for_scope(&self, scope: Scope) -> impl Iterator<Item = &'static Issue> + '_ {
        self.issues
            .iter()
            .copied()
            .filter(move |issue| issue.applies_to(scope))
    }

    /// Distinct categories, sorted
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self.issues.iter().map(|i| i.category).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::{Implementation, ScopeSet, Severity};

    static FIRST: Issue = Issue::create(
        "First",
        "first",
        "first issue",
        Category::Correctness,
        5,
        Severity::Warning,
        Implementation::new("Test", ScopeSet::JAVA_FILE),
    );

    static SECOND: Issue = Issue::create(
        "Second",
        "second",
        "second issue",
        Category::Performance,
        5,
        Severity::Error,
        Implementation::new("Test", ScopeSet::RESOURCE_FILE),
    );

    static FIRST_AGAIN: Issue = Issue::create(
        "First",
        "first again",
        "clashes with FIRST",
        Category::Correctness,
        5,
        Severity::Warning,
        Implementation::new("Other", ScopeSet::JAVA_FILE),
    );

    #[test]
    fn test_duplicate_id_is_fatal() {
        let err = IssueRegistry::new([&FIRST, &SECOND, &FIRST_AGAIN]).unwrap_err();
        assert!(matches!(err, LintError::Configuration(msg) if msg.contains("First")));
    }

    #[test]
    fn test_lookup_and_scope_queries() {
        let registry = IssueRegistry::new([&FIRST, &SECOND]).unwrap();
        assert_eq!(registry.issue("Second").map(|i| i.id), Some("Second"));
        assert!(registry.issue("Missing").is_none());
        assert!(registry.contains(&FIRST));
        assert!(!registry.contains(&FIRST_AGAIN));

        let java: Vec<_> = registry.issues_for_scope(Scope::JavaFile).map(|i| i.id).collect();
        assert_eq!(java, vec!["First"]);
        assert_eq!(
            registry.categories(),
            vec![Category::Correctness, Category::Performance]
        );
    }

    #[test]
    fn test_builtin_registry_is_shared() {
        let a = IssueRegistry::builtin().unwrap();
        let b = IssueRegistry::builtin().unwrap();
        assert!(std::ptr::eq(a, b));
        assert!(a.issue("LintError").is_some());
        assert!(a.issue("Range").is_some());
    }
}
