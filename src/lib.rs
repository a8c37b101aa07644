#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate log;

pub mod aggregates;
mod classify;
mod cli;
pub mod constants;
mod distance;
mod document;
pub mod dominator;
mod error;
mod export;
mod flags;
mod layout;
mod mark;
mod names;
mod roots;
pub mod samples;
mod snapshot;
pub mod statistics;
mod store;
#[cfg(test)]
mod test_util;
mod variant;
mod view;
mod worker;

pub use crate::aggregates::{Aggregate, NodeFilter};
pub use crate::classify::EdgeClassifier;
pub use crate::cli::*;
pub use crate::document::{SnapshotDocument, SnapshotHeader, SnapshotMeta, TypeDescriptor};
pub use crate::dominator::DominatorTree;
pub use crate::error::{Result, SnapshotError};
pub use crate::export::{aggregates_frame, export_aggregates};
pub use crate::flags::NodeFlags;
pub use crate::layout::Layout;
pub use crate::samples::Samples;
pub use crate::snapshot::{AnalysisOptions, JsHeapSnapshot};
pub use crate::statistics::Statistics;
pub use crate::store::SnapshotStore;
pub use crate::variant::{NodePredicate, SnapshotVariant};
pub use crate::view::{EdgeName, EdgeView, NodeName, NodeView, RetainerEdgeView, SerializedEdge, SerializedNode};
pub use crate::worker::{AnalysisReport, AnalysisWorker, SnapshotSource};
