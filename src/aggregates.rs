use crate::snapshot::JsHeapSnapshot;
use crate::variant::SnapshotVariant;
use crate::view::NodeView;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Node id window for aggregate queries: `min < id <= max`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NodeFilter {
    pub min_node_id: Option<u32>,
    pub max_node_id: Option<u32>,
}

impl NodeFilter {
    pub fn between(min_node_id: u32, max_node_id: u32) -> Self {
        NodeFilter {
            min_node_id: Some(min_node_id),
            max_node_id: Some(max_node_id),
        }
    }

    pub fn is_all(&self) -> bool {
        self.min_node_id.is_none() && self.max_node_id.is_none()
    }

    pub fn accepts(&self, id: u32) -> bool {
        self.min_node_id.map_or(true, |min| id > min) && self.max_node_id.map_or(true, |max| id <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub count: u32,
    pub distance: i32,
    #[serde(rename = "self")]
    pub self_size: u64,
    pub max_ret: u64,
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: Option<String>,
    /// Node indexes of the members, ordered by node id.
    pub idxs: Vec<u32>,
}

/// Group nodes by class and sum their sizes.
///
/// `max_ret` only counts instances that are not dominated by another
/// instance of the same class, so nested instances are not counted twice.
pub fn build_aggregates(snapshot: &JsHeapSnapshot, filter: &NodeFilter) -> BTreeMap<String, Aggregate> {
    let store = snapshot.store();
    let native_type = store.layout().node_native_type;
    let distances = snapshot.calculate_distances();
    let tree = snapshot.dominator_tree();
    let class_nodes_filter = snapshot.class_nodes_filter();

    let accepts = |node: &NodeView<'_>| {
        if let Some(class_filter) = &class_nodes_filter {
            if !class_filter(node) {
                return false;
            }
        }
        if !filter.accepts(node.id()) {
            return false;
        }
        node.self_size() != 0 || node.node_type() == native_type
    };

    let mut slots: HashMap<i64, usize> = HashMap::new();
    let mut classes: Vec<(&str, Aggregate)> = vec![];
    for ordinal in 0..store.node_count() {
        let node = snapshot.create_node(ordinal);
        if !accepts(&node) {
            continue;
        }
        let class_index = node.class_index();
        let self_size = node.self_size() as u64;
        match slots.get(&class_index) {
            Some(slot) => {
                let aggregate = &mut classes[*slot].1;
                aggregate.distance = aggregate.distance.min(distances[ordinal]);
                aggregate.count += 1;
                aggregate.self_size += self_size;
                aggregate.idxs.push(node.node_index() as u32);
            }
            None => {
                let node_type = node.type_name();
                let name_matters = node_type == "object" || node_type == "native";
                slots.insert(class_index, classes.len());
                classes.push((
                    node.class_name(),
                    Aggregate {
                        count: 1,
                        distance: distances[ordinal],
                        self_size,
                        max_ret: 0,
                        node_type: node_type.to_string(),
                        name: name_matters.then(|| node.raw_name().to_string()),
                        idxs: vec![node.node_index() as u32],
                    },
                ));
            }
        }
    }

    // Walk the dominator tree keeping the set of classes on the current
    // path; `path_marks` records the stack depth at which each class leaves it.
    let retained_sizes = tree.retained_sizes();
    let mut list = vec![store.root_node_index()];
    let mut path_marks: Vec<usize> = vec![];
    let mut path_classes: Vec<i64> = vec![];
    let mut seen: HashSet<i64> = HashSet::new();
    while let Some(node_index) = list.pop() {
        let node = snapshot.node_at(node_index);
        let class_index = node.class_index();
        let ordinal = node.ordinal();
        let dominated = tree.dominated(ordinal);
        if !seen.contains(&class_index) && accepts(&node) {
            if let Some(slot) = slots.get(&class_index) {
                classes[*slot].1.max_ret += retained_sizes[ordinal];
            }
            if !dominated.is_empty() {
                seen.insert(class_index);
                path_marks.push(list.len());
                path_classes.push(class_index);
            }
        }
        list.extend(dominated.iter().map(|n| *n as usize));
        let l = list.len();
        while path_marks.last() == Some(&l) {
            path_marks.pop();
            if let Some(class_index) = path_classes.pop() {
                seen.remove(&class_index);
            }
        }
    }

    let mut by_class_name = BTreeMap::new();
    for (class_name, mut aggregate) in classes {
        aggregate
            .idxs
            .sort_by_key(|node_index| store.node_id(*node_index as usize));
        by_class_name.insert(class_name.to_string(), aggregate);
    }
    by_class_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::AnalysisOptions;
    use crate::test_util::SnapshotBuilder;

    /// root -> (Document DOM trees) -> window -> Node -> Node -> Node,
    /// window -> text
    fn linked_list() -> (SnapshotBuilder, [usize; 5]) {
        let mut b = SnapshotBuilder::new();
        let gc_roots = b.add_node("synthetic", "(GC roots)", 0);
        let doc_trees = b.add_node("synthetic", "(Document DOM trees)", 0);
        let window = b.add_node("object", "Window", 10);
        let n1 = b.add_node("object", "Node", 20);
        let n2 = b.add_node("object", "Node", 20);
        let n3 = b.add_node("object", "Node", 20);
        let text = b.add_node("string", "hello", 8);
        b.add_indexed_edge(0, "element", 1, gc_roots);
        b.add_indexed_edge(0, "element", 2, doc_trees);
        b.add_edge(0, "shortcut", "window", window);
        b.add_indexed_edge(doc_trees, "element", 1, window);
        b.add_edge(window, "property", "head", n1);
        b.add_edge(n1, "property", "next", n2);
        b.add_edge(n2, "property", "next", n3);
        b.add_edge(window, "property", "text", text);
        b.set_id(n1, 101);
        b.set_id(n2, 51);
        b.set_id(n3, 75);
        (b, [window, n1, n2, n3, text])
    }

    #[test]
    fn test_counts_and_nested_retained_size() {
        let (b, [window, n1, n2, n3, _]) = linked_list();
        let snapshot = b.build();
        let aggregates = build_aggregates(&snapshot, &NodeFilter::default());
        let node = &aggregates["Node"];
        assert_eq!(node.count, 3);
        assert_eq!(node.self_size, 60);
        // n2 and n3 are nested under n1, so only n1's retained size counts
        assert_eq!(node.max_ret, 60);
        assert_eq!(node.distance, 2);
        assert_eq!(node.name.as_deref(), Some("Node"));
        let store = snapshot.store();
        let ids: Vec<u32> = node.idxs.iter().map(|i| store.node_id(*i as usize)).collect();
        assert_eq!(ids, vec![51, 75, 101]);
        let tree = snapshot.dominator_tree();
        assert_eq!(tree.dominator(n1), window);
        assert_eq!(tree.dominator(n2), n1);
        assert_eq!(tree.dominator(n3), n2);

        let window_agg = &aggregates["Window"];
        assert_eq!(window_agg.max_ret, 10 + 60 + 8);
        assert_eq!(window_agg.distance, 1);
        assert!(aggregates.contains_key("(string)"));
        assert_eq!(aggregates["(string)"].name, None);
        assert!(!aggregates.contains_key("(GC roots)"));
        assert!(!aggregates.contains_key("(Document DOM trees)"));
    }

    #[test]
    fn test_id_window_and_hidden_data() {
        let (b, _) = linked_list();
        let snapshot = b.build();
        let filtered = build_aggregates(&snapshot, &NodeFilter::between(60, 101));
        assert_eq!(filtered["Node"].count, 2);
        assert!(!filtered.contains_key("Window"));

        // without page ownership everything with a size is listed
        let mut b2 = SnapshotBuilder::new();
        let sys = b2.add_node("object", "Engine", 10);
        b2.add_indexed_edge(0, "element", 1, sys);
        let hidden = build_aggregates(&b2.build(), &NodeFilter::default());
        assert!(!hidden.contains_key("Engine"));
        let shown = b2.build_with(AnalysisOptions {
            show_hidden_data: true,
        });
        assert_eq!(build_aggregates(&shown, &NodeFilter::default())["Engine"].count, 1);
    }
}
