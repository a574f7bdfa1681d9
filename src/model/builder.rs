use super::{ImportContext, NodeData, NodeId, NodeKind, Phase, Tree};
use crate::issues::Scope;
use std::path::PathBuf;
use std::sync::Arc;

/// Incremental [`Tree`] construction
///
/// Adapters and tests push nodes in pre-order: `open` adds a node and
/// descends into it, `leaf` adds a childless node, `close` returns to the
/// parent.
pub struct TreeBuilder {
    file: PathBuf,
    phase: Phase,
    scope: Scope,
    source: Option<Arc<str>>,
    imports: ImportContext,
    nodes: Vec<NodeData>,
    stack: Vec<NodeId>,
}

impl TreeBuilder {
    pub fn new(file: impl Into<PathBuf>, phase: Phase, scope: Scope) -> Self {
        let root_kind = match phase {
            Phase::Source | Phase::Bytecode => NodeKind::File,
            Phase::Xml | Phase::Build => NodeKind::Document,
        };
        Self {
            file: file.into(),
            phase,
            scope,
            source: None,
            imports: ImportContext::default(),
            nodes: vec![NodeData::new(root_kind)],
            stack: vec![NodeId(0)],
        }
    }

    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        let source: Arc<str> = source.into();
        self.nodes[0].end = source.len();
        self.source = Some(source);
        self
    }

    pub fn with_imports(mut self, imports: ImportContext) -> Self {
        self.imports = imports;
        self
    }

    pub fn imports_mut(&mut self) -> &mut ImportContext {
        &mut self.imports
    }

    /// Node currently receiving children
    pub fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(NodeId(0))
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    /// Add a node under the current one and descend into it
    pub fn open(&mut self, data: NodeData) -> NodeId {
        let id = self.leaf(data);
        self.stack.push(id);
        id
    }

    /// Add a node under the current one
    pub fn leaf(&mut self, mut data: NodeData) -> NodeId {
        let parent = self.current();
        let id = NodeId(self.nodes.len() as u32);
        data.parent = Some(parent);
        self.nodes.push(data);
        self.nodes[parent.index()].children.push(id);
        id
    }

    pub fn close(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Mark an existing child as the receiver/qualifier of `node`
    pub fn set_qualifier(&mut self, node: NodeId, qualifier: NodeId) {
        self.nodes[node.index()].qualifier = Some(qualifier);
    }

    pub fn build(mut self) -> Tree {
        match &self.source {
            Some(source) => {
                let index = LineIndex::new(source);
                for node in &mut self.nodes {
                    if node.line == 0 {
                        let (line, column) = index.line_col(node.start);
                        node.line = line;
                        node.column = column;
                    }
                }
            }
            None => {
                for node in &mut self.nodes {
                    node.line = node.line.max(1);
                    node.column = node.column.max(1);
                }
            }
        }

        Tree {
            file: self.file,
            phase: self.phase,
            scope: self.scope,
            source: self.source,
            imports: Arc::new(self.imports),
            nodes: self.nodes,
        }
    }
}

/// Byte offset to line/column mapping
pub(crate) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    /// 1-based line and column
    pub(crate) fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&s| s <= offset);
        let start = self.starts[line.saturating_sub(1)];
        (line.max(1), offset - start + 1)
    }
}
