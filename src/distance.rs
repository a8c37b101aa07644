use crate::classify::EdgeClassifier;
use crate::constants::*;
use crate::store::SnapshotStore;

/// Breadth-first distances from the roots.
///
/// User roots are seeded at distance 1 and expanded first. Whatever is
/// still unreached is then expanded from every root at
/// [`BASE_SYSTEM_DISTANCE`], so anything only the engine holds sits at or
/// above that threshold. Weak edges are never followed and `filter` may
/// veto any other `(node index, edge index)` step. Unreached nodes keep
/// [`NO_DISTANCE`].
pub fn calculate_distances<R, F>(
    store: &SnapshotStore,
    classifier: EdgeClassifier,
    for_each_root: R,
    mut filter: F,
) -> Vec<i32>
where
    R: Fn(bool, &mut dyn FnMut(usize)),
    F: FnMut(usize, usize) -> bool,
{
    let node_count = store.node_count();
    let mut distances = vec![NO_DISTANCE; node_count];
    let mut nodes_to_visit: Vec<u32> = Vec::with_capacity(node_count);

    for (user_roots_only, distance) in [(true, 1), (false, BASE_SYSTEM_DISTANCE)] {
        nodes_to_visit.clear();
        for_each_root(user_roots_only, &mut |node_index| {
            let ordinal = store.ordinal(node_index);
            if distances[ordinal] != NO_DISTANCE {
                return;
            }
            distances[ordinal] = distance;
            nodes_to_visit.push(ordinal as u32);
        });
        bfs(store, classifier, &mut nodes_to_visit, &mut distances, &mut filter);
    }
    distances
}

fn bfs<F>(
    store: &SnapshotStore,
    classifier: EdgeClassifier,
    nodes_to_visit: &mut Vec<u32>,
    distances: &mut [i32],
    filter: &mut F,
) where
    F: FnMut(usize, usize) -> bool,
{
    // The queue is never drained in place; `index` chases the tail.
    let mut index = 0;
    while index < nodes_to_visit.len() {
        let ordinal = nodes_to_visit[index] as usize;
        index += 1;
        let node_index = store.node_index(ordinal);
        let distance = distances[ordinal] + 1;
        for edge_index in store.edge_indexes(ordinal) {
            if classifier.is_weak(store.edge_type(edge_index)) {
                continue;
            }
            let child = store.edge_to_ordinal(edge_index);
            if distances[child] != NO_DISTANCE {
                continue;
            }
            if !filter(node_index, edge_index) {
                continue;
            }
            distances[child] = distance;
            nodes_to_visit.push(child as u32);
        }
    }
    if nodes_to_visit.len() > distances.len() {
        error!(
            "BFS queued {} nodes for a snapshot of {}",
            nodes_to_visit.len(),
            distances.len()
        );
    }
}

/// Default step filter for JavaScript snapshots.
///
/// Skips the `sloppy_function_map` link out of the native context and the
/// value slots of descriptor arrays, which would otherwise pull unrelated
/// objects close to the roots.
pub fn js_edge_filter(store: &SnapshotStore, node_index: usize, edge_index: usize) -> bool {
    let layout = store.layout();
    let node_type = store.node_type(node_index);
    if node_type == layout.node_hidden_type {
        return !(store.edge_name(edge_index).is(SLOPPY_FUNCTION_MAP_EDGE)
            && store.node_raw_name(node_index) == NATIVE_CONTEXT_NAME);
    }
    if node_type == layout.node_array_type {
        if store.node_raw_name(node_index) != MAP_DESCRIPTORS_NAME {
            return true;
        }
        return match store.edge_name(edge_index).as_index() {
            Some(index) => index < 2 || index % 3 != 1,
            None => true,
        };
    }
    true
}
