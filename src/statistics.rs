use crate::constants::*;
use crate::store::SnapshotStore;
use serde::Serialize;

/// Byte totals per object category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: u64,
    /// Everything except native objects.
    pub v8heap: u64,
    pub native: u64,
    pub code: u64,
    pub js_arrays: u64,
    pub strings: u64,
    /// Nodes only reachable from system roots.
    pub system: u64,
}

/// Self size of a JS array plus its backing store, when nothing else holds
/// the backing store.
fn array_size(store: &SnapshotStore, node_index: usize) -> u64 {
    let layout = store.layout();
    let mut size = store.node_self_size(node_index) as u64;
    for edge_index in store.edge_indexes(store.ordinal(node_index)) {
        if store.edge_type(edge_index) != layout.edge_internal_type {
            continue;
        }
        if !store.edge_name(edge_index).is(ELEMENTS_EDGE) {
            continue;
        }
        let elements = store.edge_to_node(edge_index);
        if store.retainers_count(store.ordinal(elements)) == 1 {
            size += store.node_self_size(elements) as u64;
        }
    }
    size
}

/// Single pass over all nodes. `total` is the retained size of the root.
pub fn calculate_statistics(store: &SnapshotStore, distances: &[i32], total: u64) -> Statistics {
    let layout = store.layout();
    let mut stats = Statistics {
        total,
        ..Default::default()
    };
    for ordinal in 0..store.node_count() {
        let node_index = store.node_index(ordinal);
        let size = store.node_self_size(node_index) as u64;
        if distances[ordinal] >= BASE_SYSTEM_DISTANCE {
            stats.system += size;
            continue;
        }
        let t = store.node_type(node_index);
        if t == layout.node_native_type {
            stats.native += size;
        } else if t == layout.node_code_type {
            stats.code += size;
        } else if t == layout.node_cons_string_type
            || t == layout.node_sliced_string_type
            || t == layout.node_string_type
        {
            stats.strings += size;
        } else if store.node_raw_name(node_index) == ARRAY_CLASS_NAME {
            stats.js_arrays += array_size(store, node_index);
        }
    }
    stats.v8heap = total.saturating_sub(stats.native);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{with_gc_roots, SnapshotBuilder};
    use crate::variant::SnapshotVariant;

    #[test]
    fn test_buckets_partition_user_reachable_nodes() {
        let mut b = SnapshotBuilder::new();
        let gc_roots = b.add_node("synthetic", "(GC roots)", 0);
        let doc = b.add_node("native", "HTMLDocument", 100);
        let code = b.add_node("code", "foo", 40);
        let s = b.add_node("string", "hello", 24);
        let cons = b.add_node("concatenated string", "", 32);
        let arr = b.add_node("object", "Array", 16);
        let elements = b.add_node("array", "", 64);
        b.add_indexed_edge(0, "element", 1, gc_roots);
        b.add_edge(0, "shortcut", "doc", doc);
        b.add_edge(doc, "property", "code", code);
        b.add_edge(doc, "property", "s", s);
        b.add_edge(doc, "property", "cons", cons);
        b.add_edge(cons, "internal", "first", s);
        b.add_edge(cons, "internal", "second", s);
        b.add_edge(doc, "property", "arr", arr);
        b.add_edge(arr, "internal", "elements", elements);
        // the synthetic nodes have no size, so every byte is user reachable
        let snapshot = b.build();
        let stats = snapshot.get_statistics();
        assert_eq!(stats.native, 100);
        assert_eq!(stats.code, 40);
        assert_eq!(stats.strings, 56);
        assert_eq!(stats.js_arrays, 80);
        assert_eq!(stats.system, 0);
        let all: u64 = (0..snapshot.node_count())
            .map(|o| snapshot.create_node(o).self_size() as u64)
            .sum();
        assert_eq!(
            stats.native + stats.code + stats.strings + stats.js_arrays + stats.system,
            all
        );
    }

    #[test]
    fn test_totals() {
        let (mut b, gc_roots, window) = with_gc_roots();
        let sys = b.add_node("native", "SystemThing", 50);
        let native = b.add_node("native", "HTMLDivElement", 20);
        b.add_edge(window, "property", "div", native);
        b.add_indexed_edge(gc_roots, "element", 1, sys);
        b.add_indexed_edge(gc_roots, "element", 2, window);
        let snapshot = b.build();
        let stats = snapshot.get_statistics();
        assert_eq!(stats.total, 102);
        assert_eq!(stats.v8heap, stats.total - stats.native);
        assert_eq!(stats.native, 20);
        assert_eq!(stats.system, 50);
    }

    #[test]
    fn test_shared_elements_are_not_counted() {
        let (mut b, gc_roots, window) = with_gc_roots();
        let arr = b.add_node("object", "Array", 16);
        let elements = b.add_node("array", "", 64);
        b.add_edge(window, "property", "a", arr);
        b.add_edge(window, "internal", "also", elements);
        b.add_edge(arr, "internal", "elements", elements);
        b.add_indexed_edge(gc_roots, "element", 1, window);
        let snapshot = b.build();
        assert_eq!(snapshot.get_statistics().js_arrays, 16);
    }
}
