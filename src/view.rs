use crate::constants::*;
use crate::flags::NodeFlags;
use crate::snapshot::JsHeapSnapshot;
use crate::store::SnapshotStore;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Name of an edge: a string-table entry for named edges, a numeric index
/// for element and hidden edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeName<'a> {
    Name(&'a str),
    Index(u32),
}

impl<'a> EdgeName<'a> {
    /// Numeric value of the name, parsing named edges the way property keys
    /// are coerced.
    pub fn as_index(&self) -> Option<u32> {
        match self {
            EdgeName::Index(i) => Some(*i),
            EdgeName::Name(s) => s.parse().ok(),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        matches!(self, EdgeName::Name(s) if *s == name)
    }
}

impl fmt::Display for EdgeName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeName::Name(s) => f.write_str(s),
            EdgeName::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Display name of a node: borrowed from the string table, or shared with
/// the snapshot's cache of flattened concatenated strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeName<'a> {
    Raw(&'a str),
    Resolved(Arc<str>),
}

impl Deref for NodeName<'_> {
    type Target = str;

    fn deref(&self) -> &str {
        match self {
            NodeName::Raw(s) => s,
            NodeName::Resolved(s) => s,
        }
    }
}

impl PartialEq<str> for NodeName<'_> {
    fn eq(&self, other: &str) -> bool {
        &**self == other
    }
}

impl PartialEq<&str> for NodeName<'_> {
    fn eq(&self, other: &&str) -> bool {
        &**self == *other
    }
}

impl fmt::Display for NodeName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self)
    }
}

impl SnapshotStore {
    #[inline]
    pub fn edge_has_string_name(&self, edge_index: usize) -> bool {
        let t = self.edge_type(edge_index);
        t != self.layout.edge_element_type && t != self.layout.edge_hidden_type
    }

    /// Stored name of an edge without any shortcut reinterpretation.
    #[inline]
    pub fn edge_name(&self, edge_index: usize) -> EdgeName<'_> {
        let raw = self.edge_name_or_index(edge_index);
        if self.edge_has_string_name(edge_index) {
            EdgeName::Name(self.string(raw))
        } else {
            EdgeName::Index(raw)
        }
    }

    #[inline]
    pub fn is_synthetic(&self, node_index: usize) -> bool {
        self.node_type(node_index) == self.layout.node_synthetic_type
    }

    pub fn is_document_dom_trees_root(&self, node_index: usize) -> bool {
        self.is_synthetic(node_index) && self.node_raw_name(node_index) == DOCUMENT_DOM_TREES_NAME
    }

    /// Class of a node: its name for objects and native objects, a fixed
    /// per-type label otherwise.
    pub fn node_class_name(&self, node_index: usize) -> &str {
        let node_type = self.node_type(node_index) as usize;
        match self.layout.node_class_names.get(node_type) {
            Some(Some(fixed)) => fixed.as_str(),
            Some(None) => self.node_raw_name(node_index),
            None => "(unknown)",
        }
    }

    /// Aggregation key: the name id for objects and native objects,
    /// `-1 - type` for everything else.
    pub fn node_class_index(&self, node_index: usize) -> i64 {
        let node_type = self.node_type(node_index);
        if node_type == self.layout.node_object_type || node_type == self.layout.node_native_type {
            self.node_name_id(node_index) as i64
        } else {
            -1 - node_type as i64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNode {
    pub id: u32,
    pub name: String,
    pub distance: i32,
    pub node_index: usize,
    pub retained_size: u64,
    pub self_size: u32,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub can_be_queried: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub detached_dom_tree_node: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedEdge {
    pub name: String,
    pub node: SerializedNode,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub edge_index: usize,
}

/// A node of a [`JsHeapSnapshot`], addressed by node index.
#[derive(Clone, Copy)]
pub struct NodeView<'a> {
    snapshot: &'a JsHeapSnapshot,
    node_index: usize,
}

impl<'a> NodeView<'a> {
    pub(crate) fn new(snapshot: &'a JsHeapSnapshot, node_index: usize) -> Self {
        NodeView {
            snapshot,
            node_index,
        }
    }

    #[inline]
    fn store(&self) -> &'a SnapshotStore {
        self.snapshot.store()
    }

    pub fn node_index(&self) -> usize {
        self.node_index
    }

    pub fn ordinal(&self) -> usize {
        self.store().ordinal(self.node_index)
    }

    pub fn id(&self) -> u32 {
        self.store().node_id(self.node_index)
    }

    pub fn node_type(&self) -> u32 {
        self.store().node_type(self.node_index)
    }

    pub fn type_name(&self) -> &'a str {
        self.store().layout.node_type_name(self.node_type())
    }

    pub fn raw_name(&self) -> &'a str {
        self.store().node_raw_name(self.node_index)
    }

    /// Display name. Concatenated strings are flattened and cached.
    pub fn name(&self) -> NodeName<'a> {
        if self.node_type() == self.store().layout.node_cons_string_type {
            NodeName::Resolved(self.snapshot.cons_string_name(self.node_index))
        } else {
            NodeName::Raw(self.raw_name())
        }
    }

    pub fn class_name(&self) -> &'a str {
        self.store().node_class_name(self.node_index)
    }

    pub fn class_index(&self) -> i64 {
        self.store().node_class_index(self.node_index)
    }

    pub fn self_size(&self) -> u32 {
        self.store().node_self_size(self.node_index)
    }

    pub fn trace_node_id(&self) -> u32 {
        self.store().node_trace_node_id(self.node_index)
    }

    pub fn retained_size(&self) -> u64 {
        self.snapshot.retained_sizes()[self.ordinal()]
    }

    pub fn distance(&self) -> i32 {
        self.snapshot.calculate_distances()[self.ordinal()]
    }

    pub fn dominator_index(&self) -> usize {
        let dominator = self.snapshot.dominator_tree().dominator(self.ordinal());
        self.store().node_index(dominator)
    }

    pub fn flags(&self) -> NodeFlags {
        self.snapshot.flags()[self.ordinal()]
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'a>> + 'a {
        let snapshot = self.snapshot;
        self.store()
            .edge_indexes(self.ordinal())
            .map(move |edge_index| EdgeView::new(snapshot, edge_index))
    }

    pub fn edges_count(&self) -> usize {
        self.store().edges_count(self.ordinal())
    }

    pub fn retainers(&self) -> impl Iterator<Item = RetainerEdgeView<'a>> + 'a {
        let snapshot = self.snapshot;
        self.store()
            .retainer_indexes(self.ordinal())
            .map(move |retainer_index| RetainerEdgeView::new(snapshot, retainer_index))
    }

    pub fn retainers_count(&self) -> usize {
        self.store().retainers_count(self.ordinal())
    }

    /// Nodes this node immediately dominates.
    pub fn dominated_nodes(&self) -> impl Iterator<Item = NodeView<'a>> + 'a {
        let snapshot = self.snapshot;
        snapshot
            .dominator_tree()
            .dominated(self.ordinal())
            .iter()
            .map(move |node_index| NodeView::new(snapshot, *node_index as usize))
    }

    pub fn is_root(&self) -> bool {
        self.node_index == self.store().root_node_index()
    }

    pub fn is_hidden(&self) -> bool {
        self.node_type() == self.store().layout.node_hidden_type
    }

    pub fn is_array(&self) -> bool {
        self.node_type() == self.store().layout.node_array_type
    }

    pub fn is_synthetic(&self) -> bool {
        self.store().is_synthetic(self.node_index)
    }

    pub fn is_user_root(&self) -> bool {
        !self.is_synthetic()
    }

    pub fn is_document_dom_trees_root(&self) -> bool {
        self.store().is_document_dom_trees_root(self.node_index)
    }

    pub fn can_be_queried(&self) -> bool {
        self.flags().contains(NodeFlags::CAN_BE_QUERIED)
    }

    pub fn serialize(&self) -> SerializedNode {
        let flags = self.flags();
        SerializedNode {
            id: self.id(),
            name: self.name().to_string(),
            distance: self.distance(),
            node_index: self.node_index,
            retained_size: self.retained_size(),
            self_size: self.self_size(),
            node_type: self.type_name().to_string(),
            can_be_queried: flags.contains(NodeFlags::CAN_BE_QUERIED),
            detached_dom_tree_node: flags.contains(NodeFlags::DETACHED_DOM_TREE_NODE),
        }
    }
}

impl fmt::Debug for NodeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @{}", self.raw_name(), self.id())
    }
}

/// An outgoing edge, addressed by edge index.
#[derive(Clone, Copy)]
pub struct EdgeView<'a> {
    snapshot: &'a JsHeapSnapshot,
    edge_index: usize,
}

impl<'a> EdgeView<'a> {
    pub(crate) fn new(snapshot: &'a JsHeapSnapshot, edge_index: usize) -> Self {
        EdgeView {
            snapshot,
            edge_index,
        }
    }

    #[inline]
    fn store(&self) -> &'a SnapshotStore {
        self.snapshot.store()
    }

    pub fn edge_index(&self) -> usize {
        self.edge_index
    }

    pub fn edge_type(&self) -> u32 {
        self.store().edge_type(self.edge_index)
    }

    pub fn type_name(&self) -> &'a str {
        self.store().layout.edge_type_name(self.edge_type())
    }

    /// Shortcut edges whose name is numeric are reported by index.
    pub fn name(&self) -> EdgeName<'a> {
        let name = self.store().edge_name(self.edge_index);
        match name {
            EdgeName::Name(s) if self.is_shortcut() => {
                s.parse().map_or(name, EdgeName::Index)
            }
            _ => name,
        }
    }

    pub fn has_string_name(&self) -> bool {
        matches!(self.name(), EdgeName::Name(_))
    }

    pub fn node_index(&self) -> usize {
        self.store().edge_to_node(self.edge_index)
    }

    pub fn node(&self) -> NodeView<'a> {
        NodeView::new(self.snapshot, self.node_index())
    }

    pub fn is_element(&self) -> bool {
        self.snapshot.classifier().is_element(self.edge_type())
    }

    pub fn is_hidden(&self) -> bool {
        self.snapshot.classifier().is_hidden(self.edge_type())
    }

    pub fn is_weak(&self) -> bool {
        self.snapshot.classifier().is_weak(self.edge_type())
    }

    pub fn is_internal(&self) -> bool {
        self.snapshot.classifier().is_internal(self.edge_type())
    }

    pub fn is_invisible(&self) -> bool {
        self.snapshot.classifier().is_invisible(self.edge_type())
    }

    pub fn is_shortcut(&self) -> bool {
        self.snapshot.classifier().is_shortcut(self.edge_type())
    }

    pub fn serialize(&self) -> SerializedEdge {
        SerializedEdge {
            name: self.name().to_string(),
            node: self.node().serialize(),
            edge_type: self.type_name().to_string(),
            edge_index: self.edge_index,
        }
    }
}

fn fmt_edge(f: &mut fmt::Formatter<'_>, edge_type: &str, name: EdgeName<'_>) -> fmt::Result {
    let dotted = |f: &mut fmt::Formatter<'_>, s: &str| {
        if s.contains(' ') {
            write!(f, "[\"{}\"]", s)
        } else {
            write!(f, ".{}", s)
        }
    };
    match (edge_type, name) {
        ("context", _) => write!(f, "->{}", name),
        ("element", _) => write!(f, "[{}]", name),
        ("weak", _) => write!(f, "[[{}]]", name),
        ("property", _) => dotted(f, &name.to_string()),
        ("shortcut", EdgeName::Name(s)) => dotted(f, s),
        ("shortcut", EdgeName::Index(i)) => write!(f, "[{}]", i),
        ("internal" | "hidden" | "invisible", _) => write!(f, "{{{}}}", name),
        _ => write!(f, "?{}?", name),
    }
}

impl fmt::Display for EdgeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_edge(f, self.type_name(), self.name())
    }
}

impl fmt::Debug for EdgeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {:?}", self, self.node())
    }
}

/// A reverse view of an edge, from the retained node back to its retainer.
#[derive(Clone, Copy)]
pub struct RetainerEdgeView<'a> {
    snapshot: &'a JsHeapSnapshot,
    retainer_index: usize,
}

impl<'a> RetainerEdgeView<'a> {
    pub(crate) fn new(snapshot: &'a JsHeapSnapshot, retainer_index: usize) -> Self {
        RetainerEdgeView {
            snapshot,
            retainer_index,
        }
    }

    pub fn retainer_index(&self) -> usize {
        self.retainer_index
    }

    /// The underlying forward edge.
    pub fn edge(&self) -> EdgeView<'a> {
        let edge_index = self.snapshot.store().retaining_edge(self.retainer_index);
        EdgeView::new(self.snapshot, edge_index)
    }

    pub fn node_index(&self) -> usize {
        self.snapshot.store().retaining_node(self.retainer_index)
    }

    /// The retaining node.
    pub fn node(&self) -> NodeView<'a> {
        NodeView::new(self.snapshot, self.node_index())
    }

    pub fn name(&self) -> EdgeName<'a> {
        self.edge().name()
    }

    pub fn type_name(&self) -> &'a str {
        self.edge().type_name()
    }

    pub fn is_hidden(&self) -> bool {
        self.edge().is_hidden()
    }

    pub fn is_internal(&self) -> bool {
        self.edge().is_internal()
    }

    pub fn is_invisible(&self) -> bool {
        self.edge().is_invisible()
    }

    pub fn is_shortcut(&self) -> bool {
        self.edge().is_shortcut()
    }

    pub fn is_weak(&self) -> bool {
        self.edge().is_weak()
    }

    pub fn serialize(&self) -> SerializedEdge {
        let edge = self.edge();
        SerializedEdge {
            name: edge.name().to_string(),
            node: self.node().serialize(),
            edge_type: edge.type_name().to_string(),
            edge_index: edge.edge_index(),
        }
    }
}

impl fmt::Display for RetainerEdgeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.edge(), f)
    }
}
