use crate::dominator::UserObjects;
use crate::view::{EdgeView, NodeView, RetainerEdgeView};

pub type NodePredicate<'a> = Box<dyn Fn(&NodeView<'_>) -> bool + 'a>;

/// Flavor-specific hooks over the shared snapshot engine.
///
/// The generic passes (distances, dominators, aggregates) only ever talk to
/// a snapshot through these methods and the flat store.
pub trait SnapshotVariant {
    /// View of the node with the given ordinal.
    fn create_node(&self, ordinal: usize) -> NodeView<'_>;

    fn create_edge(&self, edge_index: usize) -> EdgeView<'_>;

    fn create_retaining_edge(&self, retainer_index: usize) -> RetainerEdgeView<'_>;

    /// Restricts class listings; `None` admits every node.
    fn class_nodes_filter(&self) -> Option<NodePredicate<'_>>;

    fn is_user_root(&self, node: &NodeView<'_>) -> bool;

    /// Visit root nodes, each at most once.
    fn for_each_root(&self, user_roots_only: bool, action: &mut dyn FnMut(NodeView<'_>));

    /// Page-ownership map consulted by the dominator and aggregate passes.
    fn user_objects_map_and_flag(&self) -> Option<UserObjects<'_>>;

    /// Step filter applied by the distance BFS.
    fn distance_filter(&self, _node: &NodeView<'_>, _edge: &EdgeView<'_>) -> bool {
        true
    }
}
