use crate::classify::EdgeClassifier;
use crate::flags::NodeFlags;
use crate::store::SnapshotStore;

/// Flag everything the page owns: nodes reachable over non-weak edges from
/// the root's shortcut children and from the "(Document DOM trees)" root.
///
/// A node carries the transient marker from the moment it is queued until
/// it is popped, so each node is queued at most once and the queue never
/// outgrows the node count.
pub(crate) fn mark_page_owned_nodes(
    store: &SnapshotStore,
    classifier: EdgeClassifier,
    flags: &mut [NodeFlags],
) {
    let flag = NodeFlags::PAGE_OBJECT;
    let marker = NodeFlags::VISITED_MARKER;
    let marker_and_flag = marker | flag;
    let mut nodes_to_visit: Vec<usize> = Vec::with_capacity(store.node_count());

    for edge_index in store.edge_indexes(store.root_node_ordinal()) {
        let t = store.edge_type(edge_index);
        let node_index = store.edge_to_node(edge_index);
        if classifier.is_element(t) {
            if !store.is_document_dom_trees_root(node_index) {
                continue;
            }
        } else if !classifier.is_shortcut(t) {
            continue;
        }
        let ordinal = store.ordinal(node_index);
        nodes_to_visit.push(ordinal);
        flags[ordinal] |= marker;
    }

    while let Some(ordinal) = nodes_to_visit.pop() {
        flags[ordinal] = (flags[ordinal] | flag).permanent();
        for edge_index in store.edge_indexes(ordinal) {
            let child = store.edge_to_ordinal(edge_index);
            if flags[child].intersects(marker_and_flag) {
                continue;
            }
            if classifier.is_weak(store.edge_type(edge_index)) {
                continue;
            }
            nodes_to_visit.push(child);
            flags[child] |= marker;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_gc_roots;

    #[test]
    fn test_page_ownership_and_marker_cleanup() {
        let (mut b, gc_roots, window) = with_gc_roots();
        let doc_trees = b.add_node("synthetic", "(Document DOM trees)", 0);
        let document = b.add_node("native", "HTMLDocument", 64);
        let owned = b.add_node("object", "Owned", 8);
        let weakly_held = b.add_node("object", "Weak", 8);
        let system = b.add_node("object", "System", 8);
        b.add_indexed_edge(0, "element", 2, doc_trees);
        b.add_indexed_edge(doc_trees, "element", 1, document);
        b.add_edge(window, "property", "o", owned);
        b.add_edge(owned, "property", "cycle", window);
        b.add_edge(owned, "weak", "w", weakly_held);
        b.add_indexed_edge(gc_roots, "element", 1, system);
        let store = SnapshotStore::from_document(b.document()).unwrap();
        let classifier = EdgeClassifier::new(store.layout(), false);
        let mut flags = vec![NodeFlags::empty(); store.node_count()];
        mark_page_owned_nodes(&store, classifier, &mut flags);

        for page in [window, owned, doc_trees, document] {
            assert!(flags[page].contains(NodeFlags::PAGE_OBJECT), "#{}", page);
        }
        for other in [0, gc_roots, weakly_held, system] {
            assert!(!flags[other].contains(NodeFlags::PAGE_OBJECT), "#{}", other);
        }
        assert!(flags.iter().all(|f| !f.intersects(NodeFlags::VISITED_MARKER)));
    }
}
