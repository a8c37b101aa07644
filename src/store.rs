use crate::document::SnapshotDocument;
use crate::error::{integrity_bail, Result};
use crate::layout::Layout;
use std::iter::StepBy;
use std::ops::Range;

/// The immutable flat representation of a heap snapshot.
///
/// Nodes and edges are addressed by *index*: the offset of the record's
/// first field inside `nodes` / `containment_edges`. A node's *ordinal* is
/// its index divided by the node record width. Outgoing edges of ordinal
/// `n` occupy `first_edge_indexes[n]..first_edge_indexes[n + 1]`, and the
/// reverse (retainer) index uses the same scheme over `retaining_nodes` /
/// `retaining_edges`.
#[derive(Debug)]
pub struct SnapshotStore {
    pub(crate) layout: Layout,
    pub(crate) nodes: Vec<u32>,
    pub(crate) containment_edges: Vec<u32>,
    pub(crate) strings: Vec<String>,
    pub(crate) samples: Vec<u64>,
    pub(crate) node_count: usize,
    pub(crate) edge_count: usize,
    pub(crate) root_node_index: usize,
    pub(crate) first_edge_indexes: Vec<u32>,
    pub(crate) first_retainer_index: Vec<u32>,
    /// Node index of the retaining node, addressed by retainer index.
    pub(crate) retaining_nodes: Vec<u32>,
    /// Edge index of the retaining edge, addressed by retainer index.
    pub(crate) retaining_edges: Vec<u32>,
}

impl SnapshotStore {
    pub fn from_document(doc: SnapshotDocument) -> Result<SnapshotStore> {
        let layout = Layout::from_meta(&doc.snapshot.meta)?;
        let node_field_count = layout.node_field_count;
        let edge_fields_count = layout.edge_fields_count;
        if node_field_count == 0 || edge_fields_count == 0 {
            integrity_bail!("node and edge records must have at least one field");
        }
        if doc.nodes.len() % node_field_count != 0 {
            integrity_bail!(
                "node table length {} is not a multiple of the node record width {}",
                doc.nodes.len(),
                node_field_count
            );
        }
        if doc.edges.len() % edge_fields_count != 0 {
            integrity_bail!(
                "edge table length {} is not a multiple of the edge record width {}",
                doc.edges.len(),
                edge_fields_count
            );
        }
        if doc.edges.len() > u32::MAX as usize || doc.nodes.len() > u32::MAX as usize {
            integrity_bail!("flat tables exceed the addressable index range");
        }
        let node_count = doc.nodes.len() / node_field_count;
        let edge_count = doc.edges.len() / edge_fields_count;
        if node_count != doc.snapshot.node_count {
            integrity_bail!(
                "header declares {} nodes but the node table holds {}",
                doc.snapshot.node_count,
                node_count
            );
        }
        if edge_count != doc.snapshot.edge_count {
            integrity_bail!(
                "header declares {} edges but the edge table holds {}",
                doc.snapshot.edge_count,
                edge_count
            );
        }
        if node_count == 0 {
            integrity_bail!("snapshot has no root node");
        }
        let root_node_index = doc.snapshot.root_index.unwrap_or(0);
        if root_node_index % node_field_count != 0 || root_node_index >= doc.nodes.len() {
            integrity_bail!("invalid root node index {}", root_node_index);
        }
        let strings_len = doc.strings.len();
        for node_index in (0..doc.nodes.len()).step_by(node_field_count) {
            let name = doc.nodes[node_index + layout.node_name_offset] as usize;
            if name >= strings_len {
                integrity_bail!(
                    "node #{} names string {} but the string table holds {}",
                    node_index / node_field_count,
                    name,
                    strings_len
                );
            }
        }

        let mut store = SnapshotStore {
            layout,
            nodes: doc.nodes,
            containment_edges: doc.edges,
            strings: doc.strings,
            samples: doc.samples,
            node_count,
            edge_count,
            root_node_index,
            first_edge_indexes: vec![0; node_count + 1],
            first_retainer_index: vec![0; node_count + 1],
            retaining_nodes: vec![0; edge_count],
            retaining_edges: vec![0; edge_count],
        };
        info!("Building edge indexes for {} nodes", node_count);
        store.build_edge_indexes()?;
        info!("Building retainers for {} edges", edge_count);
        store.build_retainers()?;
        Ok(store)
    }

    fn build_edge_indexes(&mut self) -> Result<()> {
        let node_field_count = self.layout.node_field_count;
        let edge_fields_count = self.layout.edge_fields_count;
        let edge_count_offset = self.layout.node_edge_count_offset;
        let edges_length = self.containment_edges.len();
        let mut edge_index: usize = 0;
        for ordinal in 0..self.node_count {
            if edge_index > edges_length {
                break;
            }
            self.first_edge_indexes[ordinal] = edge_index as u32;
            let edges = self.nodes[ordinal * node_field_count + edge_count_offset] as usize;
            edge_index += edges * edge_fields_count;
        }
        if edge_index != edges_length {
            integrity_bail!(
                "edge counts cover {} edge fields but the edge table holds {}",
                edge_index,
                edges_length
            );
        }
        self.first_edge_indexes[self.node_count] = edges_length as u32;
        Ok(())
    }

    fn build_retainers(&mut self) -> Result<()> {
        let node_field_count = self.layout.node_field_count;
        let edge_fields_count = self.layout.edge_fields_count;
        let to_node_offset = self.layout.edge_to_node_offset;
        let type_offset = self.layout.edge_type_offset;
        let name_offset = self.layout.edge_name_offset;
        let element_type = self.layout.edge_element_type;
        let hidden_type = self.layout.edge_hidden_type;
        let node_count = self.node_count;
        let strings_len = self.strings.len();
        let edges = &self.containment_edges;
        let first_retainer_index = &mut self.first_retainer_index;
        let retaining_nodes = &mut self.retaining_nodes;
        let retaining_edges = &mut self.retaining_edges;

        for edge_index in (0..edges.len()).step_by(edge_fields_count) {
            let to_node_index = edges[edge_index + to_node_offset] as usize;
            if to_node_index % node_field_count != 0 {
                integrity_bail!("invalid to_node index {} at edge {}", to_node_index, edge_index);
            }
            let to_ordinal = to_node_index / node_field_count;
            if to_ordinal >= node_count {
                integrity_bail!(
                    "edge {} references node ordinal {} but there are only {} nodes",
                    edge_index,
                    to_ordinal,
                    node_count
                );
            }
            let edge_type = edges[edge_index + type_offset];
            if edge_type != element_type
                && edge_type != hidden_type
                && edges[edge_index + name_offset] as usize >= strings_len
            {
                integrity_bail!("edge {} names a string outside the string table", edge_index);
            }
            first_retainer_index[to_ordinal] += 1;
        }

        // Turn counts into slot starts; park each count in the first slot of
        // its run so the fill pass below can count down through it.
        let mut first_unused_retainer_slot: u32 = 0;
        for i in 0..node_count {
            let retainers_count = first_retainer_index[i];
            first_retainer_index[i] = first_unused_retainer_slot;
            if retainers_count > 0 {
                retaining_nodes[first_unused_retainer_slot as usize] = retainers_count;
            }
            first_unused_retainer_slot += retainers_count;
        }
        first_retainer_index[node_count] = retaining_nodes.len() as u32;

        for src_ordinal in 0..node_count {
            let begin = self.first_edge_indexes[src_ordinal] as usize;
            let end = self.first_edge_indexes[src_ordinal + 1] as usize;
            let src_node_index = (src_ordinal * node_field_count) as u32;
            for edge_index in (begin..end).step_by(edge_fields_count) {
                let to_ordinal = edges[edge_index + to_node_offset] as usize / node_field_count;
                let first_slot = first_retainer_index[to_ordinal] as usize;
                retaining_nodes[first_slot] -= 1;
                let slot = first_slot + retaining_nodes[first_slot] as usize;
                retaining_nodes[slot] = src_node_index;
                retaining_edges[slot] = edge_index as u32;
            }
        }
        Ok(())
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn root_node_index(&self) -> usize {
        self.root_node_index
    }

    pub fn root_node_ordinal(&self) -> usize {
        self.root_node_index / self.layout.node_field_count
    }

    pub fn first_edge_indexes(&self) -> &[u32] {
        &self.first_edge_indexes
    }

    pub fn string(&self, id: u32) -> &str {
        self.strings.get(id as usize).map_or("", |s| s.as_str())
    }

    #[inline]
    pub fn node_index(&self, ordinal: usize) -> usize {
        ordinal * self.layout.node_field_count
    }

    #[inline]
    pub fn ordinal(&self, node_index: usize) -> usize {
        node_index / self.layout.node_field_count
    }

    #[inline]
    pub fn node_type(&self, node_index: usize) -> u32 {
        self.nodes[node_index + self.layout.node_type_offset]
    }

    #[inline]
    pub fn node_name_id(&self, node_index: usize) -> u32 {
        self.nodes[node_index + self.layout.node_name_offset]
    }

    #[inline]
    pub fn node_raw_name(&self, node_index: usize) -> &str {
        self.string(self.node_name_id(node_index))
    }

    #[inline]
    pub fn node_id(&self, node_index: usize) -> u32 {
        self.nodes[node_index + self.layout.node_id_offset]
    }

    #[inline]
    pub fn node_self_size(&self, node_index: usize) -> u32 {
        self.nodes[node_index + self.layout.node_self_size_offset]
    }

    pub fn node_trace_node_id(&self, node_index: usize) -> u32 {
        self.layout
            .node_trace_node_id_offset
            .map_or(0, |offset| self.nodes[node_index + offset])
    }

    /// Edge indexes of the outgoing edges of `ordinal`.
    #[inline]
    pub fn edge_indexes(&self, ordinal: usize) -> StepBy<Range<usize>> {
        let begin = self.first_edge_indexes[ordinal] as usize;
        let end = self.first_edge_indexes[ordinal + 1] as usize;
        (begin..end).step_by(self.layout.edge_fields_count)
    }

    #[inline]
    pub fn edges_count(&self, ordinal: usize) -> usize {
        let begin = self.first_edge_indexes[ordinal] as usize;
        let end = self.first_edge_indexes[ordinal + 1] as usize;
        (end - begin) / self.layout.edge_fields_count
    }

    #[inline]
    pub fn edge_type(&self, edge_index: usize) -> u32 {
        self.containment_edges[edge_index + self.layout.edge_type_offset]
    }

    #[inline]
    pub fn edge_name_or_index(&self, edge_index: usize) -> u32 {
        self.containment_edges[edge_index + self.layout.edge_name_offset]
    }

    #[inline]
    pub fn edge_to_node(&self, edge_index: usize) -> usize {
        self.containment_edges[edge_index + self.layout.edge_to_node_offset] as usize
    }

    #[inline]
    pub fn edge_to_ordinal(&self, edge_index: usize) -> usize {
        self.edge_to_node(edge_index) / self.layout.node_field_count
    }

    /// Retainer indexes of the edges pointing at `ordinal`.
    #[inline]
    pub fn retainer_indexes(&self, ordinal: usize) -> Range<usize> {
        self.first_retainer_index[ordinal] as usize..self.first_retainer_index[ordinal + 1] as usize
    }

    #[inline]
    pub fn retainers_count(&self, ordinal: usize) -> usize {
        self.retainer_indexes(ordinal).len()
    }

    #[inline]
    pub fn retaining_node(&self, retainer_index: usize) -> usize {
        self.retaining_nodes[retainer_index] as usize
    }

    #[inline]
    pub fn retaining_edge(&self, retainer_index: usize) -> usize {
        self.retaining_edges[retainer_index] as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SnapshotError;
    use crate::test_util::SnapshotBuilder;

    fn sample() -> SnapshotBuilder {
        let mut b = SnapshotBuilder::new();
        let a = b.add_node("object", "A", 10);
        let c = b.add_node("object", "C", 20);
        let d = b.add_node("string", "hello", 30);
        b.add_edge(0, "shortcut", "a", a);
        b.add_edge(0, "shortcut", "c", c);
        b.add_edge(a, "property", "d", d);
        b.add_edge(c, "property", "d", d);
        b.add_edge(c, "weak", "a", a);
        b
    }

    #[test]
    fn test_csr_coverage() {
        let store = SnapshotStore::from_document(sample().document()).unwrap();
        let first = store.first_edge_indexes();
        assert_eq!(first.len(), store.node_count() + 1);
        assert_eq!(first[store.node_count()] as usize, store.containment_edges.len());
        assert!(first.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(store.edges_count(0), 2);
        assert_eq!(store.edges_count(3), 0);
    }

    #[test]
    fn test_retainers() {
        let store = SnapshotStore::from_document(sample().document()).unwrap();
        // d is retained by a and c
        assert_eq!(store.retainers_count(3), 2);
        let mut retainers: Vec<usize> = store
            .retainer_indexes(3)
            .map(|r| store.ordinal(store.retaining_node(r)))
            .collect();
        retainers.sort();
        assert_eq!(retainers, vec![1, 2]);
        for r in store.retainer_indexes(3) {
            assert_eq!(store.edge_to_ordinal(store.retaining_edge(r)), 3);
        }
        // a is retained by the root and by the weak edge from c
        assert_eq!(store.retainers_count(1), 2);
        assert_eq!(store.retainers_count(0), 0);
        assert_eq!(*store.first_retainer_index.last().unwrap() as usize, store.edge_count());
    }

    #[test]
    fn test_edge_count_mismatch_is_rejected() {
        let mut doc = sample().document();
        // claim one more edge for the root than the table holds
        doc.nodes[4] += 1;
        match SnapshotStore::from_document(doc) {
            Err(SnapshotError::StructuralIntegrity(_)) => {}
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_out_of_range_target_is_rejected() {
        let mut doc = sample().document();
        let last = doc.edges.len() - 1;
        doc.edges[last] = (doc.nodes.len()) as u32;
        match SnapshotStore::from_document(doc) {
            Err(SnapshotError::StructuralIntegrity(msg)) => assert!(msg.contains("ordinal")),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_misaligned_target_is_rejected() {
        let mut doc = sample().document();
        doc.edges[2] = 7;
        assert!(matches!(
            SnapshotStore::from_document(doc),
            Err(SnapshotError::StructuralIntegrity(_))
        ));
    }

    #[test]
    fn test_header_count_mismatch_is_rejected() {
        let mut doc = sample().document();
        doc.snapshot.node_count += 1;
        assert!(matches!(
            SnapshotStore::from_document(doc),
            Err(SnapshotError::StructuralIntegrity(_))
        ));
    }

    #[test]
    fn test_truncated_node_table_is_rejected() {
        let mut doc = sample().document();
        doc.nodes.pop();
        assert!(matches!(
            SnapshotStore::from_document(doc),
            Err(SnapshotError::StructuralIntegrity(_))
        ));
    }
}
