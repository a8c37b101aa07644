use crate::classify::EdgeClassifier;
use crate::flags::NodeFlags;
use crate::store::SnapshotStore;

/// Flag everything reachable from a non-synthetic child of the root through
/// ordinary references. Objects behind hidden, internal, invisible or weak
/// edges may be in an inconsistent state and must not be queried.
pub(crate) fn mark_queryable_heap_objects(
    store: &SnapshotStore,
    classifier: EdgeClassifier,
    flags: &mut [NodeFlags],
) {
    let flag = NodeFlags::CAN_BE_QUERIED;
    let mut mark_stack: Vec<usize> = store
        .edge_indexes(store.root_node_ordinal())
        .map(|edge_index| store.edge_to_node(edge_index))
        .filter(|node_index| !store.is_synthetic(*node_index))
        .map(|node_index| store.ordinal(node_index))
        .collect();

    while let Some(ordinal) = mark_stack.pop() {
        if flags[ordinal].contains(flag) {
            continue;
        }
        flags[ordinal] |= flag;
        for edge_index in store.edge_indexes(ordinal) {
            let child = store.edge_to_ordinal(edge_index);
            if flags[child].contains(flag) {
                continue;
            }
            let t = store.edge_type(edge_index);
            if classifier.is_hidden(t)
                || classifier.is_invisible(t)
                || classifier.is_internal(t)
                || classifier.is_weak(t)
            {
                continue;
            }
            mark_stack.push(child);
        }
    }
}
