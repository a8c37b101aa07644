use crate::constants::{DETACHED_DOM_TREES_NAME, DETACHED_DOM_TREE_PREFIX};
use crate::flags::NodeFlags;
use crate::roots::child_by_name;
use crate::store::SnapshotStore;

/// Flag the members of every "Detached DOM tree" group.
pub(crate) fn mark_detached_dom_tree_nodes(store: &SnapshotStore, flags: &mut [NodeFlags]) {
    let trees = match child_by_name(store, store.root_node_index(), DETACHED_DOM_TREES_NAME) {
        Some(trees) => trees,
        None => return,
    };
    for group_edge in store.edge_indexes(store.ordinal(trees)) {
        let group = store.edge_to_node(group_edge);
        if !store.node_class_name(group).starts_with(DETACHED_DOM_TREE_PREFIX) {
            continue;
        }
        for member_edge in store.edge_indexes(store.ordinal(group)) {
            flags[store.edge_to_ordinal(member_edge)] |= NodeFlags::DETACHED_DOM_TREE_NODE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::SnapshotBuilder;

    #[test]
    fn test_marks_group_members_only() {
        let mut b = SnapshotBuilder::new();
        let trees = b.add_node("synthetic", "(Detached DOM trees)", 0);
        let group = b.add_node("native", "Detached DOM tree / 2 entries", 0);
        let other = b.add_node("native", "Attached thing", 0);
        let div = b.add_node("native", "HTMLDivElement", 40);
        let span = b.add_node("native", "HTMLSpanElement", 40);
        let stray = b.add_node("native", "HTMLPElement", 40);
        b.add_indexed_edge(0, "element", 1, trees);
        b.add_indexed_edge(trees, "element", 1, group);
        b.add_indexed_edge(trees, "element", 2, other);
        b.add_indexed_edge(group, "element", 1, div);
        b.add_indexed_edge(group, "element", 2, span);
        b.add_indexed_edge(other, "element", 1, stray);
        let store = SnapshotStore::from_document(b.document()).unwrap();
        let mut flags = vec![NodeFlags::empty(); store.node_count()];
        mark_detached_dom_tree_nodes(&store, &mut flags);
        assert!(flags[div].contains(NodeFlags::DETACHED_DOM_TREE_NODE));
        assert!(flags[span].contains(NodeFlags::DETACHED_DOM_TREE_NODE));
        assert!(flags[stray].is_empty());
        assert!(flags[group].is_empty());
    }

    #[test]
    fn test_missing_group_root_is_noop() {
        let mut b = SnapshotBuilder::new();
        let n = b.add_node("native", "Detached DOM tree / 1 entries", 0);
        b.add_indexed_edge(0, "element", 1, n);
        let store = SnapshotStore::from_document(b.document()).unwrap();
        let mut flags = vec![NodeFlags::empty(); store.node_count()];
        mark_detached_dom_tree_nodes(&store, &mut flags);
        assert!(flags.iter().all(|f| f.is_empty()));
    }
}
