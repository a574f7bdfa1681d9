//! Configuration loading
//!
//! Settings come from `lintscan.toml` / `.lintscan.yml` (or an explicit
//! path) and are then overridden by command line flags.

use crate::error::{LintError, Result};
use crate::issues::{Issue, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_LOCATIONS: &[&str] = &[
    "lintscan.toml",
    ".lintscan.toml",
    "lintscan.yml",
    ".lintscan.yml",
    "lintscan.yaml",
];

/// Lint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories to analyze, relative to the project root
    pub targets: Vec<PathBuf>,

    /// Glob patterns to exclude
    pub exclude: Vec<String>,

    /// Per-issue severity overrides (`ignore` disables an issue)
    pub severity: HashMap<String, Severity>,

    /// Per-issue enable/disable switches
    pub enabled: HashMap<String, bool>,

    /// Only collect fatal findings
    pub fatal_only: bool,

    /// Honor `//noinspection` style comment directives
    pub comment_suppression: bool,

    /// Minimum SDK level; overrides the manifest value
    pub min_sdk: Option<u32>,

    /// JSON API version database
    pub api_database: Option<PathBuf>,

    /// Optional network lookups for newer library versions
    pub remote: RemoteConfig,

    /// Analyze files on the rayon thread pool
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: 3000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            exclude: vec!["**/build/**".to_string(), "**/.gradle/**".to_string()],
            severity: HashMap::new(),
            enabled: HashMap::new(),
            fatal_only: false,
            comment_suppression: true,
            min_sdk: None,
            api_database: None,
            remote: RemoteConfig::default(),
            parallel: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML or YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| LintError::io(path, e))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config = match extension {
            "toml" => toml::from_str(&content).map_err(|e| {
                LintError::Configuration(format!("{}: {}", path.display(), e))
            })?,
            "yml" | "yaml" => serde_yaml::from_str(&content).map_err(|e| {
                LintError::Configuration(format!("{}: {}", path.display(), e))
            })?,
            other => {
                return Err(LintError::Configuration(format!(
                    "unsupported config format `{}` for {}",
                    other,
                    path.display()
                )))
            }
        };

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Look for a config file in the project root, falling back to defaults
    pub fn from_default_locations(root: &Path) -> Result<Self> {
        for name in DEFAULT_LOCATIONS {
            let candidate = root.join(name);
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
        }
        Ok(Self::default())
    }

    /// Whether the issue is switched on, explicitly or by default
    pub fn is_enabled(&self, issue: &Issue) -> bool {
        self.enabled
            .get(issue.id)
            .copied()
            .unwrap_or(issue.enabled_by_default)
    }

    /// Effective severity; `Ignore` when the issue is disabled
    pub fn severity_for(&self, issue: &Issue) -> Severity {
        if !self.is_enabled(issue) {
            // An explicit severity switches a default-disabled issue on
            return match self.severity.get(issue.id) {
                Some(&severity) if !self.enabled.contains_key(issue.id) => severity,
                _ => Severity::Ignore,
            };
        }
        self.severity.get(issue.id).copied().unwrap_or(issue.severity)
    }

    /// Whether a finding of this issue can survive the severity filters
    pub fn is_reportable(&self, issue: &Issue) -> bool {
        let severity = self.severity_for(issue);
        severity != Severity::Ignore && (!self.fatal_only || severity == Severity::Fatal)
    }
}
