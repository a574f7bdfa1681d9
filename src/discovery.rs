//! File discovery
//!
//! Walks the project (honoring .gitignore) and classifies the files each
//! traversal phase understands.

use crate::config::Config;
use crate::error::{LintError, Result};
use crate::issues::Scope;
use crate::model::Phase;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Kind of input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Java,
    /// Layout, values and other resource XML
    Xml,
    /// AndroidManifest.xml
    Manifest,
    /// Gradle version catalog (`libs.versions.toml`)
    VersionCatalog,
}

impl FileType {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name == "AndroidManifest.xml" {
            return Some(FileType::Manifest);
        }
        if name.ends_with(".versions.toml") {
            return Some(FileType::VersionCatalog);
        }
        match path.extension()?.to_str()? {
            "java" => Some(FileType::Java),
            "xml" => Some(FileType::Xml),
            _ => None,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            FileType::Java => Phase::Source,
            FileType::Xml | FileType::Manifest => Phase::Xml,
            FileType::VersionCatalog => Phase::Build,
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            FileType::Java => Scope::JavaFile,
            FileType::Xml => Scope::ResourceFile,
            FileType::Manifest => Scope::Manifest,
            FileType::VersionCatalog => Scope::GradleFile,
        }
    }
}

/// A file to analyze
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub file_type: FileType,
}

impl SourceFile {
    pub fn new(path: PathBuf, file_type: FileType) -> Self {
        Self { path, file_type }
    }

    pub fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|e| LintError::io(&self.path, e))
    }
}

/// Finds analyzable files below a project root
pub struct FileFinder<'a> {
    config: &'a Config,
}

impl<'a> FileFinder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn find_files(&self, root: &Path) -> Result<Vec<SourceFile>> {
        let roots: Vec<PathBuf> = if self.config.targets.is_empty() {
            vec![root.to_path_buf()]
        } else {
            self.config.targets.iter().map(|t| root.join(t)).collect()
        };

        let mut overrides = OverrideBuilder::new(root);
        for pattern in &self.config.exclude {
            overrides
                .add(&format!("!{}", pattern))
                .map_err(|e| LintError::Configuration(format!("bad exclude `{}`: {}", pattern, e)))?;
        }
        let overrides = overrides
            .build()
            .map_err(|e| LintError::Configuration(e.to_string()))?;

        let mut files = Vec::new();
        for target in roots {
            if !target.exists() {
                debug!("Skipping missing target {}", target.display());
                continue;
            }
            let walker = WalkBuilder::new(&target)
                .hidden(true)
                .git_ignore(true)
                .overrides(overrides.clone())
                .build();

            for entry in walker.flatten() {
                let path = entry.path();
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                if let Some(file_type) = FileType::from_path(path) {
                    files.push(SourceFile::new(path.to_path_buf(), file_type));
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup();
        debug!("Discovered {} files", files.len());
        Ok(files)
    }
}
