use crate::constants::GC_ROOTS_NAME;
use crate::store::SnapshotStore;
use fixedbitset::FixedBitSet;

/// First child of `node_index` whose raw name is `name`.
pub fn child_by_name(store: &SnapshotStore, node_index: usize, name: &str) -> Option<usize> {
    store
        .edge_indexes(store.ordinal(node_index))
        .map(|edge_index| store.edge_to_node(edge_index))
        .find(|child| store.node_raw_name(*child) == name)
}

/// Enumerate root nodes, passing each node index to `action` at most once.
///
/// With `user_roots_only` only the root's children accepted by
/// `is_user_root` are visited. Otherwise every sub-root under "(GC roots)"
/// is visited after its own children, followed by all of the root's
/// children. Snapshots without a "(GC roots)" node have no roots at all.
pub fn for_each_root<U, A>(
    store: &SnapshotStore,
    user_roots_only: bool,
    is_user_root: U,
    mut action: A,
) where
    U: Fn(usize) -> bool,
    A: FnMut(usize),
{
    let root = store.root_node_index();
    let gc_roots = match child_by_name(store, root, GC_ROOTS_NAME) {
        Some(gc_roots) => gc_roots,
        None => return,
    };

    let mut visited = FixedBitSet::with_capacity(store.node_count());
    let mut visit = |node_index: usize| {
        let ordinal = store.ordinal(node_index);
        if !visited.put(ordinal) {
            action(node_index);
        }
    };

    if user_roots_only {
        for edge_index in store.edge_indexes(store.ordinal(root)) {
            let node = store.edge_to_node(edge_index);
            if is_user_root(node) {
                visit(node);
            }
        }
        return;
    }

    for edge_index in store.edge_indexes(store.ordinal(gc_roots)) {
        let sub_root = store.edge_to_node(edge_index);
        for child_edge in store.edge_indexes(store.ordinal(sub_root)) {
            visit(store.edge_to_node(child_edge));
        }
        visit(sub_root);
    }
    for edge_index in store.edge_indexes(store.ordinal(root)) {
        visit(store.edge_to_node(edge_index));
    }
}
