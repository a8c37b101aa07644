//! Dominator tree and retained sizes.
//!
//! The tree is computed with the iterative algorithm of Cooper, Harvey and
//! Kennedy ("A Simple, Fast Dominance Algorithm") over a post-order of the
//! graph that ignores weak and shortcut edges.

use crate::classify::EdgeClassifier;
use crate::flags::NodeFlags;
use crate::store::SnapshotStore;
use fixedbitset::FixedBitSet;
use std::time::Instant;

/// Page ownership used to keep debugger-held objects from stealing
/// dominance over page objects. `None` treats every node as page owned.
#[derive(Clone, Copy)]
pub struct UserObjects<'a> {
    pub map: &'a [NodeFlags],
    pub flag: NodeFlags,
}

#[inline]
fn is_user_object(user_objects: Option<UserObjects<'_>>, ordinal: usize) -> bool {
    user_objects.map_or(true, |u| u.map[ordinal].intersects(u.flag))
}

#[inline]
fn is_dominance_edge(classifier: EdgeClassifier, edge_type: u32) -> bool {
    !classifier.is_weak(edge_type) && !classifier.is_shortcut(edge_type)
}

#[derive(Debug)]
pub struct PostOrder {
    pub post_order_index_to_ordinal: Vec<u32>,
    pub ordinal_to_post_order_index: Vec<u32>,
}

fn describe(store: &SnapshotStore, ordinal: usize) -> String {
    let node_index = store.node_index(ordinal);
    format!("{} @{}", store.node_raw_name(node_index), store.node_id(node_index))
}

fn has_only_weak_retainers(store: &SnapshotStore, classifier: EdgeClassifier, ordinal: usize) -> bool {
    store
        .retainer_indexes(ordinal)
        .all(|r| !is_dominance_edge(classifier, store.edge_type(store.retaining_edge(r))))
}

/// Depth-first post-order from the root. The root always gets the last
/// post-order index, and every node gets exactly one index even when it is
/// unreachable.
pub fn build_post_order_index(
    store: &SnapshotStore,
    classifier: EdgeClassifier,
    user_objects: Option<UserObjects<'_>>,
) -> PostOrder {
    let node_count = store.node_count();
    let root = store.root_node_ordinal();
    let first_edge_indexes = store.first_edge_indexes();
    let edge_fields_count = store.layout().edge_fields_count as u32;

    let mut stack_nodes = vec![0u32; node_count];
    let mut stack_current_edge = vec![0u32; node_count];
    let mut post_order_index_to_ordinal = vec![0u32; node_count];
    let mut ordinal_to_post_order_index = vec![0u32; node_count];
    let mut visited = FixedBitSet::with_capacity(node_count);
    let mut post_order_index = 0usize;

    let mut stack_top: isize = 0;
    stack_nodes[0] = root as u32;
    stack_current_edge[0] = first_edge_indexes[root];
    visited.insert(root);

    let mut iteration = 0;
    loop {
        iteration += 1;
        while stack_top >= 0 {
            let top = stack_top as usize;
            let ordinal = stack_nodes[top] as usize;
            let edge_index = stack_current_edge[top];
            let edges_end = first_edge_indexes[ordinal + 1];

            if edge_index < edges_end {
                stack_current_edge[top] += edge_fields_count;
                let edge_index = edge_index as usize;
                if !is_dominance_edge(classifier, store.edge_type(edge_index)) {
                    continue;
                }
                let child = store.edge_to_ordinal(edge_index);
                if visited.contains(child) {
                    continue;
                }
                // Edges from objects the page does not own into page objects
                // would let debugger-held references decide dominance.
                if ordinal != root
                    && is_user_object(user_objects, child)
                    && !is_user_object(user_objects, ordinal)
                {
                    continue;
                }
                stack_top += 1;
                let top = stack_top as usize;
                stack_nodes[top] = child as u32;
                stack_current_edge[top] = first_edge_indexes[child];
                visited.insert(child);
            } else {
                ordinal_to_post_order_index[ordinal] = post_order_index as u32;
                post_order_index_to_ordinal[post_order_index] = ordinal as u32;
                post_order_index += 1;
                stack_top -= 1;
            }
        }

        if post_order_index == node_count || iteration > 1 {
            break;
        }

        // Retract the root and put it at the bottom of the stack, so it is
        // numbered after the orphans' subgraphs.
        post_order_index -= 1;
        stack_top = 0;
        stack_nodes[0] = root as u32;
        stack_current_edge[0] = first_edge_indexes[root + 1];
        let mut orphans = vec![];
        for ordinal in 0..node_count {
            if visited.contains(ordinal) || !has_only_weak_retainers(store, classifier, ordinal) {
                continue;
            }
            stack_top += 1;
            let top = stack_top as usize;
            stack_nodes[top] = ordinal as u32;
            stack_current_edge[top] = first_edge_indexes[ordinal];
            visited.insert(ordinal);
            orphans.push(describe(store, ordinal));
        }
        warn!(
            "Heap snapshot: {} nodes are unreachable from the root. Following nodes have only weak retainers: {}",
            node_count - post_order_index - 1,
            orphans.join(", ")
        );
    }

    if post_order_index != node_count {
        post_order_index -= 1;
        let mut unreachable = vec![];
        for ordinal in 0..node_count {
            if visited.contains(ordinal) {
                continue;
            }
            unreachable.push(describe(store, ordinal));
            ordinal_to_post_order_index[ordinal] = post_order_index as u32;
            post_order_index_to_ordinal[post_order_index] = ordinal as u32;
            post_order_index += 1;
        }
        ordinal_to_post_order_index[root] = post_order_index as u32;
        post_order_index_to_ordinal[post_order_index] = root as u32;
        warn!(
            "Still found {} unreachable nodes in heap snapshot: {}",
            unreachable.len(),
            unreachable.join(", ")
        );
    }

    PostOrder {
        post_order_index_to_ordinal,
        ordinal_to_post_order_index,
    }
}

/// Immediate dominator of every node, addressed by ordinal. The root
/// dominates itself.
pub fn build_dominators(
    store: &SnapshotStore,
    classifier: EdgeClassifier,
    user_objects: Option<UserObjects<'_>>,
    post_order: &PostOrder,
) -> Vec<u32> {
    let post_to_ordinal = &post_order.post_order_index_to_ordinal;
    let ordinal_to_post = &post_order.ordinal_to_post_order_index;
    let nodes_count = post_to_ordinal.len();
    let root_post_ordered_index = nodes_count - 1;
    let no_entry = nodes_count as u32;
    let root_node_index = store.root_node_index();

    let mut dominators = vec![no_entry; nodes_count];
    dominators[root_post_ordered_index] = root_post_ordered_index as u32;

    // Entries whose retainers changed and need their dominator recomputed.
    let mut affected = FixedBitSet::with_capacity(nodes_count);
    for edge_index in store.edge_indexes(store.root_node_ordinal()) {
        if !is_dominance_edge(classifier, store.edge_type(edge_index)) {
            continue;
        }
        affected.insert(ordinal_to_post[store.edge_to_ordinal(edge_index)] as usize);
    }
    // Nodes held only through weak or shortcut edges settle on the root and
    // pass that on to their children.
    let root_ordinal = store.root_node_ordinal();
    for ordinal in 0..nodes_count {
        if ordinal != root_ordinal && has_only_weak_retainers(store, classifier, ordinal) {
            affected.insert(ordinal_to_post[ordinal] as usize);
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for post_order_index in (0..root_post_ordered_index).rev() {
            if !affected.contains(post_order_index) {
                continue;
            }
            affected.set(post_order_index, false);
            // Already at the root, cannot move any higher.
            if dominators[post_order_index] == root_post_ordered_index as u32 {
                continue;
            }
            let ordinal = post_to_ordinal[post_order_index] as usize;
            let node_flag = is_user_object(user_objects, ordinal);
            let mut new_dominator = no_entry;
            let mut orphan = true;
            for retainer_index in store.retainer_indexes(ordinal) {
                let edge_type = store.edge_type(store.retaining_edge(retainer_index));
                let retainer_node_index = store.retaining_node(retainer_index);
                if !is_dominance_edge(classifier, edge_type) {
                    continue;
                }
                orphan = false;
                let retainer_ordinal = store.ordinal(retainer_node_index);
                if retainer_node_index != root_node_index
                    && node_flag
                    && !is_user_object(user_objects, retainer_ordinal)
                {
                    continue;
                }
                let mut retainer_post = ordinal_to_post[retainer_ordinal];
                if dominators[retainer_post as usize] == no_entry {
                    continue;
                }
                if new_dominator == no_entry {
                    new_dominator = retainer_post;
                } else {
                    while retainer_post != new_dominator {
                        while retainer_post < new_dominator {
                            retainer_post = dominators[retainer_post as usize];
                        }
                        while new_dominator < retainer_post {
                            new_dominator = dominators[new_dominator as usize];
                        }
                    }
                }
                if new_dominator == root_post_ordered_index as u32 {
                    break;
                }
            }
            if orphan {
                new_dominator = root_post_ordered_index as u32;
            }
            if new_dominator != no_entry && dominators[post_order_index] != new_dominator {
                dominators[post_order_index] = new_dominator;
                changed = true;
                for edge_index in store.edge_indexes(ordinal) {
                    affected.insert(ordinal_to_post[store.edge_to_ordinal(edge_index)] as usize);
                }
            }
        }
    }

    let root = store.root_node_ordinal() as u32;
    let mut dominators_tree = vec![0u32; nodes_count];
    for (post_order_index, dominator) in dominators.iter().enumerate() {
        let ordinal = post_to_ordinal[post_order_index] as usize;
        // Nodes no retainer could settle hang off the root.
        dominators_tree[ordinal] = if *dominator == no_entry {
            root
        } else {
            post_to_ordinal[*dominator as usize]
        };
    }
    dominators_tree
}

/// Self size plus the self sizes of everything a node dominates.
pub fn calculate_retained_sizes(
    store: &SnapshotStore,
    dominators_tree: &[u32],
    post_order: &PostOrder,
) -> Vec<u64> {
    let node_count = store.node_count();
    let mut retained_sizes: Vec<u64> = (0..node_count)
        .map(|ordinal| store.node_self_size(store.node_index(ordinal)) as u64)
        .collect();
    for post_order_index in 0..node_count.saturating_sub(1) {
        let ordinal = post_order.post_order_index_to_ordinal[post_order_index] as usize;
        let dominator = dominators_tree[ordinal] as usize;
        retained_sizes[dominator] += retained_sizes[ordinal];
    }
    retained_sizes
}

/// Children of each node in the dominator tree, as a CSR of node indexes.
pub fn build_dominated_nodes(store: &SnapshotStore, dominators_tree: &[u32]) -> (Vec<u32>, Vec<u32>) {
    let node_count = store.node_count();
    let root = store.root_node_ordinal();
    let mut first_dominated_node_index = vec![0u32; node_count + 1];
    for (ordinal, dominator) in dominators_tree.iter().enumerate() {
        if ordinal != root {
            first_dominated_node_index[*dominator as usize] += 1;
        }
    }
    let mut start = 0u32;
    for slot in first_dominated_node_index.iter_mut() {
        let count = *slot;
        *slot = start;
        start += count;
    }

    let mut cursor = first_dominated_node_index.clone();
    let mut dominated_nodes = vec![0u32; node_count.saturating_sub(1)];
    for (ordinal, dominator) in dominators_tree.iter().enumerate() {
        if ordinal == root {
            continue;
        }
        let slot = &mut cursor[*dominator as usize];
        dominated_nodes[*slot as usize] = store.node_index(ordinal) as u32;
        *slot += 1;
    }
    (first_dominated_node_index, dominated_nodes)
}

/// Everything derived from the dominator relation.
#[derive(Debug)]
pub struct DominatorTree {
    dominators: Vec<u32>,
    retained_sizes: Vec<u64>,
    first_dominated_node_index: Vec<u32>,
    dominated_nodes: Vec<u32>,
}

impl DominatorTree {
    pub fn build(
        store: &SnapshotStore,
        classifier: EdgeClassifier,
        user_objects: Option<UserObjects<'_>>,
    ) -> DominatorTree {
        let start = Instant::now();
        let post_order = build_post_order_index(store, classifier, user_objects);
        let dominators = build_dominators(store, classifier, user_objects, &post_order);
        let retained_sizes = calculate_retained_sizes(store, &dominators, &post_order);
        let (first_dominated_node_index, dominated_nodes) = build_dominated_nodes(store, &dominators);
        info!(
            "Built dominator tree for {} nodes in {} ms",
            store.node_count(),
            start.elapsed().as_millis()
        );
        DominatorTree {
            dominators,
            retained_sizes,
            first_dominated_node_index,
            dominated_nodes,
        }
    }

    /// Ordinal of the immediate dominator of `ordinal`.
    pub fn dominator(&self, ordinal: usize) -> usize {
        self.dominators[ordinal] as usize
    }

    pub fn dominators(&self) -> &[u32] {
        &self.dominators
    }

    pub fn retained_sizes(&self) -> &[u64] {
        &self.retained_sizes
    }

    /// Node indexes of the nodes `ordinal` immediately dominates.
    pub fn dominated(&self, ordinal: usize) -> &[u32] {
        let begin = self.first_dominated_node_index[ordinal] as usize;
        let end = self.first_dominated_node_index[ordinal + 1] as usize;
        &self.dominated_nodes[begin..end]
    }
}
