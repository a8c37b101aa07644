use crate::aggregates::{build_aggregates, Aggregate, NodeFilter};
use crate::classify::EdgeClassifier;
use crate::distance::{self, js_edge_filter};
use crate::document::SnapshotDocument;
use crate::dominator::{DominatorTree, UserObjects};
use crate::error::{Result, SnapshotError};
use crate::flags::NodeFlags;
use crate::mark::{calculate_flags, verify_marks};
use crate::names::NameCache;
use crate::roots;
use crate::samples::{build_samples, Samples};
use crate::statistics::{calculate_statistics, Statistics};
use crate::store::SnapshotStore;
use crate::variant::{NodePredicate, SnapshotVariant};
use crate::view::{EdgeView, NodeView, RetainerEdgeView};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Include engine internals (hidden nodes and edges, objects the page
    /// does not own) in listings and dominator computation.
    pub show_hidden_data: bool,
}

/// A JavaScript heap snapshot and everything derived from it.
///
/// The graph is immutable after construction. Flags, distances, the
/// dominator tree and statistics are computed on first use and cached for
/// the lifetime of the snapshot.
pub struct JsHeapSnapshot {
    store: SnapshotStore,
    options: AnalysisOptions,
    classifier: EdgeClassifier,
    flags: OnceCell<Vec<NodeFlags>>,
    distances: OnceCell<Vec<i32>>,
    dominator_tree: OnceCell<DominatorTree>,
    statistics: OnceCell<Statistics>,
    aggregates: OnceCell<BTreeMap<String, Aggregate>>,
    samples: OnceCell<Option<Samples>>,
    names: NameCache,
}

impl JsHeapSnapshot {
    pub fn from_document(doc: SnapshotDocument, options: AnalysisOptions) -> Result<JsHeapSnapshot> {
        let store = SnapshotStore::from_document(doc)?;
        let classifier = EdgeClassifier::new(store.layout(), options.show_hidden_data);
        Ok(JsHeapSnapshot {
            store,
            options,
            classifier,
            flags: OnceCell::new(),
            distances: OnceCell::new(),
            dominator_tree: OnceCell::new(),
            statistics: OnceCell::new(),
            aggregates: OnceCell::new(),
            samples: OnceCell::new(),
            names: NameCache::default(),
        })
    }

    pub fn from_path(path: impl AsRef<Path>, options: AnalysisOptions) -> Result<JsHeapSnapshot> {
        let path = path.as_ref();
        info!("Loading snapshot {}", path.display());
        let start = Instant::now();
        let doc = SnapshotDocument::from_path(path)?;
        info!("Parsed {} in {} ms", path.display(), start.elapsed().as_millis());
        Self::from_document(doc, options)
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn options(&self) -> AnalysisOptions {
        self.options
    }

    pub fn classifier(&self) -> EdgeClassifier {
        self.classifier
    }

    pub fn node_count(&self) -> usize {
        self.store.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.store.edge_count()
    }

    /// View of the node at `node_index` (not ordinal).
    pub fn node_at(&self, node_index: usize) -> NodeView<'_> {
        NodeView::new(self, node_index)
    }

    pub fn root_node(&self) -> NodeView<'_> {
        self.node_at(self.store.root_node_index())
    }

    /// Force every derived field, checking the marking invariants on the
    /// way.
    pub fn analyze(&self) -> Result<&Statistics> {
        let start = Instant::now();
        if !verify_marks(self.flags()) {
            return Err(SnapshotError::Internal(
                "marking left transient markers behind".to_string(),
            ));
        }
        let statistics = self.get_statistics();
        info!(
            "Analyzed {} nodes and {} edges in {} ms",
            self.node_count(),
            self.edge_count(),
            start.elapsed().as_millis()
        );
        Ok(statistics)
    }

    pub fn flags(&self) -> &[NodeFlags] {
        self.flags.get_or_init(|| {
            info!("Marking nodes");
            let (flags, stats) = calculate_flags(&self.store, self.classifier);
            debug!("{:?}", stats);
            flags
        })
    }

    /// Distances from the roots, addressed by ordinal.
    pub fn calculate_distances(&self) -> &[i32] {
        self.distances.get_or_init(|| {
            info!("Calculating distances");
            let roots = |user_roots_only: bool, action: &mut dyn FnMut(usize)| {
                self.for_each_root(user_roots_only, &mut |node| action(node.node_index()))
            };
            distance::calculate_distances(&self.store, self.classifier, roots, |node_index, edge_index| {
                self.distance_filter(&self.node_at(node_index), &self.create_edge(edge_index))
            })
        })
    }

    pub fn dominator_tree(&self) -> &DominatorTree {
        self.dominator_tree.get_or_init(|| {
            info!("Building dominator tree");
            DominatorTree::build(&self.store, self.classifier, self.user_objects_map_and_flag())
        })
    }

    pub fn retained_sizes(&self) -> &[u64] {
        self.dominator_tree().retained_sizes()
    }

    /// Retained size of the root.
    pub fn total_size(&self) -> u64 {
        self.retained_sizes()[self.store.root_node_ordinal()]
    }

    pub fn get_statistics(&self) -> &Statistics {
        self.statistics.get_or_init(|| {
            info!("Calculating statistics");
            calculate_statistics(&self.store, self.calculate_distances(), self.total_size())
        })
    }

    pub fn get_samples(&self) -> Option<&Samples> {
        self.samples.get_or_init(|| build_samples(&self.store)).as_ref()
    }

    /// Class aggregates over every node the class filter admits.
    pub fn aggregates(&self) -> &BTreeMap<String, Aggregate> {
        self.aggregates.get_or_init(|| {
            info!("Building class aggregates");
            build_aggregates(self, &NodeFilter::default())
        })
    }

    pub fn aggregates_with_filter(&self, filter: &NodeFilter) -> BTreeMap<String, Aggregate> {
        if filter.is_all() {
            return self.aggregates().clone();
        }
        build_aggregates(self, filter)
    }

    pub(crate) fn cons_string_name(&self, node_index: usize) -> Arc<str> {
        self.names.get_or_resolve(&self.store, node_index)
    }

    /// Linear scan; ids are not indexed.
    pub fn node_for_id(&self, id: u32) -> Option<NodeView<'_>> {
        (0..self.node_count())
            .map(|ordinal| self.create_node(ordinal))
            .find(|node| node.id() == id)
    }

    pub fn node_class_name(&self, id: u32) -> Option<&str> {
        self.node_for_id(id).map(|node| node.class_name())
    }

    pub fn ids_of_objects_with_name(&self, name: &str) -> Vec<u32> {
        (0..self.node_count())
            .map(|ordinal| self.create_node(ordinal))
            .filter(|node| node.name() == name)
            .map(|node| node.id())
            .collect()
    }

    /// Outgoing edges a user can browse.
    pub fn containment_edges<'a>(&'a self, node: &NodeView<'a>) -> impl Iterator<Item = EdgeView<'a>> + 'a {
        let classifier = self.classifier;
        node.edges()
            .filter(move |edge| classifier.containment(edge.edge_type(), edge.node().node_type()))
    }

    /// Incoming edges that keep `node` alive.
    pub fn retaining_edges<'a>(
        &'a self,
        node: &NodeView<'a>,
    ) -> impl Iterator<Item = RetainerEdgeView<'a>> + 'a {
        let classifier = self.classifier;
        node.retainers().filter(move |retainer| {
            let retaining = retainer.node();
            classifier.retaining(
                retainer.edge().edge_type(),
                retaining.node_type(),
                retaining.is_root(),
            )
        })
    }
}

impl SnapshotVariant for JsHeapSnapshot {
    fn create_node(&self, ordinal: usize) -> NodeView<'_> {
        self.node_at(self.store.node_index(ordinal))
    }

    fn create_edge(&self, edge_index: usize) -> EdgeView<'_> {
        EdgeView::new(self, edge_index)
    }

    fn create_retaining_edge(&self, retainer_index: usize) -> RetainerEdgeView<'_> {
        RetainerEdgeView::new(self, retainer_index)
    }

    fn class_nodes_filter(&self) -> Option<NodePredicate<'_>> {
        let user_objects = self.user_objects_map_and_flag()?;
        Some(Box::new(move |node: &NodeView<'_>| {
            user_objects.map[node.ordinal()].intersects(user_objects.flag)
        }))
    }

    fn is_user_root(&self, node: &NodeView<'_>) -> bool {
        node.is_user_root() || node.is_document_dom_trees_root()
    }

    fn for_each_root(&self, user_roots_only: bool, action: &mut dyn FnMut(NodeView<'_>)) {
        roots::for_each_root(
            &self.store,
            user_roots_only,
            |node_index| self.is_user_root(&self.node_at(node_index)),
            |node_index| action(self.node_at(node_index)),
        )
    }

    fn user_objects_map_and_flag(&self) -> Option<UserObjects<'_>> {
        if self.options.show_hidden_data {
            return None;
        }
        Some(UserObjects {
            map: self.flags(),
            flag: NodeFlags::PAGE_OBJECT,
        })
    }

    fn distance_filter(&self, node: &NodeView<'_>, edge: &EdgeView<'_>) -> bool {
        js_edge_filter(&self.store, node.node_index(), edge.edge_index())
    }
}
