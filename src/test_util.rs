//! Small in-memory snapshot builder shared by the unit tests.

use crate::document::{SnapshotDocument, SnapshotHeader, SnapshotMeta, TypeDescriptor};
use crate::snapshot::{AnalysisOptions, JsHeapSnapshot};
use std::collections::HashMap;

pub(crate) const NODE_TYPES: [&str; 14] = [
    "hidden",
    "array",
    "string",
    "object",
    "code",
    "closure",
    "regexp",
    "number",
    "native",
    "synthetic",
    "concatenated string",
    "sliced string",
    "symbol",
    "bigint",
];

pub(crate) const EDGE_TYPES: [&str; 7] = [
    "context", "element", "property", "internal", "hidden", "shortcut", "weak",
];

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn default_meta() -> SnapshotMeta {
    SnapshotMeta {
        node_fields: strings(&["type", "name", "id", "self_size", "edge_count", "trace_node_id"]),
        node_types: vec![
            TypeDescriptor::Enum(strings(&NODE_TYPES)),
            TypeDescriptor::Scalar("string".to_string()),
            TypeDescriptor::Scalar("number".to_string()),
            TypeDescriptor::Scalar("number".to_string()),
            TypeDescriptor::Scalar("number".to_string()),
            TypeDescriptor::Scalar("number".to_string()),
        ],
        edge_fields: strings(&["type", "name_or_index", "to_node"]),
        edge_types: vec![
            TypeDescriptor::Enum(strings(&EDGE_TYPES)),
            TypeDescriptor::Scalar("string_or_number".to_string()),
            TypeDescriptor::Scalar("node".to_string()),
        ],
        sample_fields: strings(&["timestamp_us", "last_assigned_id"]),
    }
}

struct BuilderNode {
    node_type: u32,
    name: u32,
    id: u32,
    self_size: u32,
    edges: Vec<(u32, u32, usize)>,
}

/// Builds a snapshot node by node. Ordinal 0 is always the synthetic root.
pub(crate) struct SnapshotBuilder {
    strings: Vec<String>,
    string_ids: HashMap<String, u32>,
    nodes: Vec<BuilderNode>,
    pub(crate) samples: Vec<u64>,
}

impl SnapshotBuilder {
    pub(crate) fn new() -> Self {
        let mut b = SnapshotBuilder {
            strings: vec![],
            string_ids: HashMap::new(),
            nodes: vec![],
            samples: vec![],
        };
        b.add_node("synthetic", "", 0);
        b
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(id) = self.string_ids.get(s) {
            return *id;
        }
        let id = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.string_ids.insert(s.to_string(), id);
        id
    }

    pub(crate) fn add_node(&mut self, node_type: &str, name: &str, self_size: u32) -> usize {
        let ordinal = self.nodes.len();
        let node_type = NODE_TYPES
            .iter()
            .position(|t| *t == node_type)
            .expect("unknown node type") as u32;
        let name = self.intern(name);
        self.nodes.push(BuilderNode {
            node_type,
            name,
            id: ordinal as u32 * 2 + 1,
            self_size,
            edges: vec![],
        });
        ordinal
    }

    pub(crate) fn set_id(&mut self, ordinal: usize, id: u32) {
        self.nodes[ordinal].id = id;
    }

    fn edge_type(edge_type: &str) -> u32 {
        EDGE_TYPES
            .iter()
            .position(|t| *t == edge_type)
            .expect("unknown edge type") as u32
    }

    /// Adds a named edge. `element` and `hidden` edges must use
    /// [`SnapshotBuilder::add_indexed_edge`] instead.
    pub(crate) fn add_edge(&mut self, from: usize, edge_type: &str, name: &str, to: usize) {
        let edge_type = Self::edge_type(edge_type);
        let name = self.intern(name);
        self.nodes[from].edges.push((edge_type, name, to));
    }

    pub(crate) fn add_indexed_edge(&mut self, from: usize, edge_type: &str, index: u32, to: usize) {
        let edge_type = Self::edge_type(edge_type);
        self.nodes[from].edges.push((edge_type, index, to));
    }

    pub(crate) fn document(&self) -> SnapshotDocument {
        let field_count = 6;
        let mut nodes = vec![];
        let mut edges = vec![];
        for n in &self.nodes {
            nodes.extend_from_slice(&[n.node_type, n.name, n.id, n.self_size, n.edges.len() as u32, 0]);
            for (t, name, to) in &n.edges {
                edges.extend_from_slice(&[*t, *name, (*to * field_count) as u32]);
            }
        }
        SnapshotDocument {
            snapshot: SnapshotHeader {
                title: "test".to_string(),
                meta: default_meta(),
                node_count: self.nodes.len(),
                edge_count: edges.len() / 3,
                trace_function_count: 0,
                root_index: None,
            },
            nodes,
            edges,
            strings: self.strings.clone(),
            samples: self.samples.clone(),
        }
    }

    pub(crate) fn build(&self) -> JsHeapSnapshot {
        self.build_with(AnalysisOptions::default())
    }

    pub(crate) fn build_with(&self, options: AnalysisOptions) -> JsHeapSnapshot {
        JsHeapSnapshot::from_document(self.document(), options).unwrap()
    }
}

/// Root -> (GC roots) -> two subroots, plus a user root `Window`.
/// Returns `(builder, gc_roots, window)`.
pub(crate) fn with_gc_roots() -> (SnapshotBuilder, usize, usize) {
    let mut b = SnapshotBuilder::new();
    let gc_roots = b.add_node("synthetic", "(GC roots)", 0);
    let window = b.add_node("object", "Window", 32);
    b.add_indexed_edge(0, "element", 1, gc_roots);
    b.add_edge(0, "shortcut", "window", window);
    (b, gc_roots, window)
}
