//! XML adapter for resources and the manifest
//!
//! Produces `Document` → `Element` → `Attribute` trees. Comments are not
//! lowered; they stay in the source text where `<!--suppress-->`
//! directives are read from.

use crate::error::{LintError, Result};
use crate::issues::Scope;
use crate::model::{NodeData, NodeId, NodeKind, Phase, Tree, TreeBuilder};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

pub fn parse(path: &Path, scope: Scope, source: &str) -> Result<Tree> {
    let mut builder = TreeBuilder::new(path, Phase::Xml, scope).with_source(source);
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);

    let mut open: Vec<NodeId> = Vec::new();
    loop {
        let before = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| LintError::parse(path, e.to_string()))?;
        let after = reader.buffer_position() as usize;
        let start = source
            .get(before..after)
            .and_then(|s| s.find('<'))
            .map_or(before, |i| before + i);

        match event {
            Event::Start(tag) => {
                let id = element(&mut builder, source, &tag, start, after, path)?;
                open.push(id);
            }
            Event::Empty(tag) => {
                element(&mut builder, source, &tag, start, after, path)?;
                builder.close();
            }
            Event::End(_) => {
                if let Some(id) = open.pop() {
                    builder.node_mut(id).end = after;
                }
                builder.close();
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(builder.build())
}

/// Open an element node with its attributes; the caller closes it
fn element(
    builder: &mut TreeBuilder,
    source: &str,
    tag: &BytesStart<'_>,
    start: usize,
    end: usize,
    path: &Path,
) -> Result<NodeId> {
    let name = tag.name();
    let mut data = NodeData::new(NodeKind::Element)
        .span(start, end)
        .named(String::from_utf8_lossy(name.local_name().as_ref()));
    if let Some(prefix) = name.prefix() {
        data = data.prefix(String::from_utf8_lossy(prefix.as_ref()));
    }
    let id = builder.open(data);

    let tag_text = source.get(start..end).unwrap_or_default();
    for attribute in tag.attributes().with_checks(false) {
        let attribute = attribute.map_err(|e| LintError::parse(path, e.to_string()))?;
        let key = attribute.key;
        let raw_key = String::from_utf8_lossy(key.as_ref()).into_owned();
        let raw_value = String::from_utf8_lossy(&attribute.value).into_owned();
        let value = quick_xml::escape::unescape(&raw_value)
            .map(|v| v.into_owned())
            .unwrap_or(raw_value);

        let offset = tag_text.find(&format!("{}=", raw_key)).map_or(start, |i| start + i);
        let attribute_end = tag_text[offset - start..]
            .find(['"', '\''])
            .and_then(|open| {
                let quote_at = offset - start + open;
                let quote = tag_text[quote_at..].chars().next()?;
                tag_text[quote_at + 1..]
                    .find(quote)
                    .map(|close| start + quote_at + 1 + close + 1)
            })
            .unwrap_or(end);

        let mut data = NodeData::new(NodeKind::Attribute)
            .span(offset, attribute_end)
            .named(String::from_utf8_lossy(key.local_name().as_ref()))
            .value(value);
        if let Some(prefix) = key.prefix() {
            data = data.prefix(String::from_utf8_lossy(prefix.as_ref()));
        }
        builder.leaf(data);
    }
    Ok(id)
}
