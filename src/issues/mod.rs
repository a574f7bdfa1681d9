//! Issue definitions
//!
//! An [`Issue`] is the immutable description of one class of finding. Issues
//! are declared as `static` items next to the detector that reports them and
//! collected into an [`IssueRegistry`] once per process.

mod registry;

pub use registry::IssueRegistry;

use serde::{Deserialize, Serialize};

/// Severity of an issue, ordered from disabled to fatal
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Disabled; findings are dropped before any scope walk
    Ignore,
    Info,
    Warning,
    Error,
    /// Reported even in fatal-only mode
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ignore => "ignore",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }

    /// Error or fatal; drives the process exit code
    pub fn is_error(&self) -> bool {
        *self >= Severity::Error
    }

    pub fn all() -> [Severity; 5] {
        [
            Severity::Ignore,
            Severity::Info,
            Severity::Warning,
            Severity::Error,
            Severity::Fatal,
        ]
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Issue category; suppression directives may name a category instead of an id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    /// Problems with the analysis itself
    Lint,
    Correctness,
    Performance,
    Security,
    Internationalization,
    /// Right-to-left layout support, a child of internationalization
    Bidirectional,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Lint => "Lint",
            Category::Correctness => "Correctness",
            Category::Performance => "Performance",
            Category::Security => "Security",
            Category::Internationalization => "Internationalization",
            Category::Bidirectional => "Bidirectional Text",
        }
    }

    pub fn parent(&self) -> Option<Category> {
        match self {
            Category::Bidirectional => Some(Category::Internationalization),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.parent() {
            Some(parent) => write!(f, "{}:{}", parent.name(), self.name()),
            None => write!(f, "{}", self.name()),
        }
    }
}

/// The kinds of compilation unit an issue can apply to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Scope {
    JavaFile,
    ClassFile,
    ResourceFile,
    Manifest,
    GradleFile,
}

impl Scope {
    fn bit(self) -> u8 {
        match self {
            Scope::JavaFile => 1,
            Scope::ClassFile => 1 << 1,
            Scope::ResourceFile => 1 << 2,
            Scope::Manifest => 1 << 3,
            Scope::GradleFile => 1 << 4,
        }
    }
}

/// Small set of [`Scope`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScopeSet(u8);

impl ScopeSet {
    pub const JAVA_FILE: ScopeSet = ScopeSet(1);
    pub const CLASS_FILE: ScopeSet = ScopeSet(1 << 1);
    pub const RESOURCE_FILE: ScopeSet = ScopeSet(1 << 2);
    pub const MANIFEST: ScopeSet = ScopeSet(1 << 3);
    pub const GRADLE_FILE: ScopeSet = ScopeSet(1 << 4);
    pub const JAVA_AND_CLASS: ScopeSet = ScopeSet(1 | 1 << 1);
    pub const RESOURCES_AND_MANIFEST: ScopeSet = ScopeSet(1 << 2 | 1 << 3);
    pub const ALL: ScopeSet = ScopeSet(0b1_1111);

    pub const fn union(self, other: ScopeSet) -> ScopeSet {
        ScopeSet(self.0 | other.0)
    }

    pub fn contains(&self, scope: Scope) -> bool {
        self.0 & scope.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Which detector produces an issue and which scopes it needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Implementation {
    pub detector: &'static str,
    pub scope: ScopeSet,
}

impl Implementation {
    pub const fn new(detector: &'static str, scope: ScopeSet) -> Self {
        Self { detector, scope }
    }
}

/// Static definition of one class of finding
#[derive(Debug, PartialEq, Eq)]
pub struct Issue {
    /// Globally unique identifier, used in suppression directives
    pub id: &'static str,
    pub brief: &'static str,
    pub explanation: &'static str,
    pub category: Category,
    /// 1 (lowest) to 10 (highest)
    pub priority: u8,
    pub severity: Severity,
    pub enabled_by_default: bool,
    pub implementation: Implementation,
}

impl Issue {
    pub const fn create(
        id: &'static str,
        brief: &'static str,
        explanation: &'static str,
        category: Category,
        priority: u8,
        severity: Severity,
        implementation: Implementation,
    ) -> Self {
        Self {
            id,
            brief,
            explanation,
            category,
            priority,
            severity,
            enabled_by_default: true,
            implementation,
        }
    }

    pub const fn disabled_by_default(mut self) -> Self {
        self.enabled_by_default = false;
        self
    }

    pub fn applies_to(&self, scope: Scope) -> bool {
        self.implementation.scope.contains(scope)
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Infrastructure issue: a detector failed or the environment is incomplete
pub static LINT_ERROR: Issue = Issue::create(
    "LintError",
    "Lint Failure",
    "This issue type represents a problem running lint itself, such as a \
     detector crashing on unexpected input or a required database being \
     unavailable. Results may be incomplete.",
    Category::Lint,
    10,
    Severity::Error,
    Implementation::new("LintDriver", ScopeSet::ALL),
);
