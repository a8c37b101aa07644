use bitflags::bitflags;

bitflags! {
    /// Per-node marks derived from the snapshot graph.
    ///
    /// The low half holds the permanent flags. Bit 16 is a scratch marker
    /// owned by a single marking pass; [`NodeFlags::PERMANENT`] masks it off
    /// and no node may carry it once a pass returns.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u32 {
        /// Safe to query at runtime: reachable from a user root through
        /// ordinary references.
        const CAN_BE_QUERIED = 1 << 0;
        /// Direct child of a "Detached DOM tree" group.
        const DETACHED_DOM_TREE_NODE = 1 << 1;
        /// Owned by the page rather than the debugger or the engine.
        const PAGE_OBJECT = 1 << 2;

        /// Transient "queued" marker used while marking page objects.
        const VISITED_MARKER = 1 << 16;

        /// Everything below the transient marker.
        const PERMANENT = 0x0ffff;
    }
}

impl NodeFlags {
    /// Drop any transient marker bits.
    #[inline]
    pub fn permanent(self) -> NodeFlags {
        self & NodeFlags::PERMANENT
    }
}
