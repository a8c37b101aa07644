use crate::layout::Layout;

/// Edge type predicates shared by every traversal.
///
/// Holds copies of the type tags so it can be passed by value into hot
/// loops without touching the layout again.
#[derive(Debug, Clone, Copy)]
pub struct EdgeClassifier {
    hidden: u32,
    invisible: u32,
    internal: u32,
    weak: u32,
    shortcut: u32,
    element: u32,
    hidden_node: u32,
    show_hidden_data: bool,
}

impl EdgeClassifier {
    pub fn new(layout: &Layout, show_hidden_data: bool) -> Self {
        EdgeClassifier {
            hidden: layout.edge_hidden_type,
            invisible: layout.edge_invisible_type,
            internal: layout.edge_internal_type,
            weak: layout.edge_weak_type,
            shortcut: layout.edge_shortcut_type,
            element: layout.edge_element_type,
            hidden_node: layout.node_hidden_type,
            show_hidden_data,
        }
    }

    #[inline]
    pub fn is_hidden(&self, edge_type: u32) -> bool {
        edge_type == self.hidden
    }

    #[inline]
    pub fn is_invisible(&self, edge_type: u32) -> bool {
        edge_type == self.invisible
    }

    #[inline]
    pub fn is_internal(&self, edge_type: u32) -> bool {
        edge_type == self.internal
    }

    #[inline]
    pub fn is_weak(&self, edge_type: u32) -> bool {
        edge_type == self.weak
    }

    #[inline]
    pub fn is_shortcut(&self, edge_type: u32) -> bool {
        edge_type == self.shortcut
    }

    #[inline]
    pub fn is_element(&self, edge_type: u32) -> bool {
        edge_type == self.element
    }

    /// Edges a user can follow through heap contents. `node_type` is the
    /// type of the node the edge view points at.
    pub fn containment(&self, edge_type: u32, node_type: u32) -> bool {
        if self.is_invisible(edge_type) {
            return false;
        }
        if self.show_hidden_data {
            return true;
        }
        !self.is_hidden(edge_type) && node_type != self.hidden_node
    }

    /// Containment edges that also count as retaining the node they point at.
    pub fn retaining(&self, edge_type: u32, node_type: u32, node_is_root: bool) -> bool {
        self.containment(edge_type, node_type) && !node_is_root && !self.is_weak(edge_type)
    }
}
