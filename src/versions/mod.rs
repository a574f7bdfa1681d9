//! API version database and library version lookups
//!
//! The database answers "since which API level does this class or member
//! exist"; it is loaded once and shared read-only by every worker.

mod remote;

pub use remote::{compare_versions, is_preview, MavenCentralLookup, VersionLookup};

use crate::error::{LintError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Read-only API level lookups keyed by internal names (`android/view/View`)
pub trait VersionDatabase: Send + Sync {
    /// API level that introduced the class (`member == None`) or member
    fn min_version_introduced(&self, owner: &str, member: Option<&str>) -> Option<u32>;

    fn class_exists(&self, owner: &str) -> bool;
}

#[derive(Debug, Default, Deserialize)]
struct ClassEntry {
    #[serde(default)]
    since: u32,
    #[serde(default)]
    members: HashMap<String, u32>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseFile {
    classes: HashMap<String, ClassEntry>,
}

/// Version database loaded from a JSON table
#[derive(Debug, Default)]
pub struct StaticVersionDatabase {
    classes: HashMap<String, ClassEntry>,
}

impl StaticVersionDatabase {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: DatabaseFile = serde_json::from_str(json)
            .map_err(|e| LintError::Configuration(format!("invalid API database: {}", e)))?;
        Ok(Self {
            classes: file.classes,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| LintError::io(path, e))?;
        let db = Self::from_json(&json)
            .map_err(|e| LintError::parse(path, e.to_string()))?;
        debug!("Loaded API database with {} classes from {}", db.len(), path.display());
        Ok(db)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl VersionDatabase for StaticVersionDatabase {
    fn min_version_introduced(&self, owner: &str, member: Option<&str>) -> Option<u32> {
        let class = self.classes.get(owner)?;
        match member {
            None => Some(class.since),
            // Members without their own entry date from the class
            Some(member) => Some(class.members.get(member).copied().unwrap_or(class.since)),
        }
    }

    fn class_exists(&self, owner: &str) -> bool {
        self.classes.contains_key(owner)
    }
}
