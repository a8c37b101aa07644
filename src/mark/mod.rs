use crate::classify::EdgeClassifier;
use crate::flags::NodeFlags;
use crate::store::SnapshotStore;

use std::time::{Duration, Instant};

mod detached;
mod page_owned;
mod queryable;

pub(crate) use detached::mark_detached_dom_tree_nodes;
pub(crate) use page_owned::mark_page_owned_nodes;
pub(crate) use queryable::mark_queryable_heap_objects;

#[derive(Debug, Default)]
pub struct MarkingStats {
    pub detached_dom_tree_nodes: usize,
    pub queryable_objects: usize,
    pub page_objects: usize,
    pub time: Duration,
}

/// Run the three marking passes over a fresh flag vector.
pub fn calculate_flags(
    store: &SnapshotStore,
    classifier: EdgeClassifier,
) -> (Vec<NodeFlags>, MarkingStats) {
    let start = Instant::now();
    let mut flags = vec![NodeFlags::empty(); store.node_count()];
    mark_detached_dom_tree_nodes(store, &mut flags);
    mark_queryable_heap_objects(store, classifier, &mut flags);
    mark_page_owned_nodes(store, classifier, &mut flags);
    debug_assert!(verify_marks(&flags));
    let count = |flag: NodeFlags| flags.iter().filter(|f| f.contains(flag)).count();
    let stats = MarkingStats {
        detached_dom_tree_nodes: count(NodeFlags::DETACHED_DOM_TREE_NODE),
        queryable_objects: count(NodeFlags::CAN_BE_QUERIED),
        page_objects: count(NodeFlags::PAGE_OBJECT),
        time: start.elapsed(),
    };
    (flags, stats)
}

/// No node may keep the transient marker once the passes are done.
pub fn verify_marks(flags: &[NodeFlags]) -> bool {
    let mut ok = true;
    for (ordinal, f) in flags.iter().enumerate() {
        if f.intersects(NodeFlags::VISITED_MARKER) {
            warn!("node #{} still carries the visited marker", ordinal);
            ok = false;
        }
    }
    ok
}
