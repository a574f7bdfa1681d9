//! Gradle version catalog adapter (`libs.versions.toml`)
//!
//! Every `[libraries]` entry becomes a `Dependency` node: group in
//! `prefix`, artifact in `name`, resolved version in `value`. The node spans
//! the entry's line so `#noinspection` comments above it apply.

use crate::error::{LintError, Result};
use crate::issues::Scope;
use crate::model::{NodeData, NodeKind, Phase, Tree, TreeBuilder};
use std::path::Path;
use toml::{Table, Value};

pub fn parse(path: &Path, source: &str) -> Result<Tree> {
    let catalog: Table = toml::from_str(source).map_err(|e| LintError::parse(path, e.to_string()))?;
    let versions = catalog.get("versions").and_then(Value::as_table);
    let mut builder = TreeBuilder::new(path, Phase::Build, Scope::GradleFile).with_source(source);

    let Some(libraries) = catalog.get("libraries").and_then(Value::as_table) else {
        return Ok(builder.build());
    };
    let section = section_offset(source, "libraries");

    let mut entries: Vec<(usize, usize, NodeData)> = Vec::new();
    for (alias, entry) in libraries {
        let Some((group, artifact, version)) = coordinates(entry, versions) else {
            continue;
        };
        let (start, end) = entry_span(source, section, alias).unwrap_or((0, 0));
        let mut data = NodeData::new(NodeKind::Dependency)
            .span(start, end)
            .named(artifact)
            .prefix(group);
        if let Some(version) = version {
            data = data.value(version);
        }
        entries.push((start, end, data));
    }

    // Document order keeps node ids in source order
    entries.sort_by_key(|(start, _, _)| *start);
    for (_, _, data) in entries {
        builder.leaf(data);
    }
    Ok(builder.build())
}

/// Group, artifact and version of one library entry
fn coordinates(entry: &Value, versions: Option<&Table>) -> Option<(String, String, Option<String>)> {
    match entry {
        Value::String(notation) => {
            let mut parts = notation.splitn(3, ':');
            let group = parts.next()?.to_string();
            let artifact = parts.next()?.to_string();
            Some((group, artifact, parts.next().map(str::to_string)))
        }
        Value::Table(table) => {
            let (group, artifact) = match table.get("module").and_then(Value::as_str) {
                Some(module) => {
                    let (group, artifact) = module.split_once(':')?;
                    (group.to_string(), artifact.to_string())
                }
                None => (
                    table.get("group")?.as_str()?.to_string(),
                    table.get("name")?.as_str()?.to_string(),
                ),
            };
            let version = table.get("version").and_then(|v| version_of(v, versions));
            Some((group, artifact, version))
        }
        _ => None,
    }
}

/// `"1.0"`, `{ ref = "name" }`, or `{ strictly / require / prefer = ... }`
fn version_of(value: &Value, versions: Option<&Table>) -> Option<String> {
    match value {
        Value::String(version) => Some(version.clone()),
        Value::Table(table) => {
            if let Some(name) = table.get("ref").and_then(Value::as_str) {
                return versions?.get(name).and_then(|v| version_of(v, None));
            }
            ["strictly", "require", "prefer"]
                .iter()
                .find_map(|key| table.get(*key).and_then(Value::as_str))
                .map(str::to_string)
        }
        _ => None,
    }
}

fn section_offset(source: &str, name: &str) -> usize {
    let header = format!("[{}]", name);
    let mut offset = 0;
    for line in source.split_inclusive('\n') {
        if line.trim() == header {
            return offset + line.len();
        }
        offset += line.len();
    }
    0
}

/// Byte span of the line defining `alias` within a section, allowing the
/// dotted `version.ref` form
fn entry_span(source: &str, section: usize, alias: &str) -> Option<(usize, usize)> {
    let mut offset = section;
    for line in source.get(section..)?.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') && !trimmed.starts_with("[[") {
            return None;
        }
        let key = trimmed
            .split(['=', '.'])
            .next()
            .map(|k| k.trim().trim_matches('"'));
        if key == Some(alias) {
            let indent = line.len() - trimmed.len();
            return Some((offset + indent, offset + line.trim_end().len()));
        }
        offset += line.len();
    }
    None
}
