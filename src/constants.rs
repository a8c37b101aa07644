/// Distance assigned to nodes that are only reachable through non-user roots.
/// Anything at or above this value is owned by the system, not the page.
pub const BASE_SYSTEM_DISTANCE: i32 = 100_000_000;
/// Distance of a node no BFS has reached yet.
pub const NO_DISTANCE: i32 = -5;

/// Resolved display names stop growing once they reach this many characters.
pub const MAX_CONS_STRING_NAME_LENGTH: usize = 1024;

/// Type tag that never matches a record, used for type names the snapshot
/// does not declare.
pub const ABSENT_TYPE: u32 = u32::MAX;

pub const GC_ROOTS_NAME: &str = "(GC roots)";
pub const DETACHED_DOM_TREES_NAME: &str = "(Detached DOM trees)";
pub const DOCUMENT_DOM_TREES_NAME: &str = "(Document DOM trees)";
pub const DETACHED_DOM_TREE_PREFIX: &str = "Detached DOM tree";
pub const NATIVE_CONTEXT_NAME: &str = "system / NativeContext";
pub const SLOPPY_FUNCTION_MAP_EDGE: &str = "sloppy_function_map";
pub const MAP_DESCRIPTORS_NAME: &str = "(map descriptors)";
pub const ELEMENTS_EDGE: &str = "elements";
pub const ARRAY_CLASS_NAME: &str = "Array";
pub const CONS_STRING_FIRST_EDGE: &str = "first";
pub const CONS_STRING_SECOND_EDGE: &str = "second";

/// Edge type appended to the snapshot's own edge type table.
pub const INVISIBLE_EDGE_TYPE_NAME: &str = "invisible";
