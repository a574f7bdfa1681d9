//! Error types shared by the library
//!
//! Resolution failures never surface here; the evaluator answers `None`
//! for those. These variants cover the conditions that stop a run or a unit.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the lint engine
#[derive(Error, Diagnostic, Debug)]
pub enum LintError {
    /// A type name could not be bound to a known class
    #[error("unresolved type: {0}")]
    #[diagnostic(code(lintscan::unresolved_type))]
    UnresolvedType(String),

    /// The rule set or configuration is broken; fatal at startup
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(lintscan::configuration),
        help("check the issue registry, detector declarations and config file")
    )]
    Configuration(String),

    #[error("failed to read {path}: {source}")]
    #[diagnostic(code(lintscan::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    #[diagnostic(code(lintscan::parse))]
    Parse { path: PathBuf, message: String },

    /// Cooperative cancellation was requested
    #[error("analysis cancelled")]
    #[diagnostic(code(lintscan::cancelled))]
    Cancelled,

    /// Best-effort network lookups; never fails a run
    #[error("remote lookup failed: {0}")]
    #[diagnostic(code(lintscan::remote))]
    Remote(String),
}

impl LintError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LintError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        LintError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LintError>;
