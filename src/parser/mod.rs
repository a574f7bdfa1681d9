//! Input adapters
//!
//! Each adapter lowers one file format into a [`Tree`]: Java source through
//! tree-sitter, resource and manifest XML through quick-xml, and version
//! catalogs through toml.

mod catalog;
mod java;
mod xml;

use crate::discovery::{FileType, SourceFile};
use crate::error::Result;
use crate::model::Tree;
use std::path::Path;

/// Read and lower one discovered file
pub fn parse_file(file: &SourceFile) -> Result<Tree> {
    let source = file.read()?;
    parse_source(&file.path, file.file_type, &source)
}

/// Lower already-loaded text
pub fn parse_source(path: &Path, file_type: FileType, source: &str) -> Result<Tree> {
    match file_type {
        FileType::Java => java::parse(path, source),
        FileType::Xml | FileType::Manifest => xml::parse(path, file_type.scope(), source),
        FileType::VersionCatalog => catalog::parse(path, source),
    }
}
