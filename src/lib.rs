//! # cofold
//!
//! Fold and unfold the cluster hierarchies of a coclustering report while
//! keeping partitions and the sparse cell table consistent.
//!
//! A coclustering report describes several dimensions, each with a partition
//! (intervals or value groups), a cluster hierarchy over that partition, and
//! a cell table of part-index tuples with frequencies. Collapsing a node
//! merges the parts below it into one; this crate rewrites the hierarchy,
//! the partition and the cells so the report stays coherent.
//!
//! ```text
//! Document ──> Folder::reduce(collapsed) ──> Document
//!                │
//!                ├── hierarchy::DimensionTree   (per dimension)
//!                ├── reconciliation             (cluster records)
//!                ├── partition                  (intervals / value groups)
//!                └── cells                      (transition + re-aggregation)
//! ```
//!
//! The total cell frequency is conserved by every fold.

pub mod algebra;
pub mod cells;
pub mod config;
/// Error types used across `cofold`.
pub mod error;
pub mod fold;
pub mod hierarchy;
pub mod partition;
pub mod reconciliation;
pub mod report;
pub mod store;

#[cfg(test)]
mod reconciliation_tests;

pub use crate::cells::{
    check_mass_conservation, reaggregate, reaggregate_cells, update_summary_cells, CellTable,
    TransitionTable,
};
pub use crate::config::FoldConfig;
pub use crate::fold::Folder;
pub use crate::hierarchy::{
    collapsed_at_rank, validate_hierarchy, validate_report, DimensionTree, HealthCheck, TreeNode,
    ValidationReport,
};
pub use crate::partition::{composition, reconcile_partition, CompositionEntry};
pub use crate::reconciliation::{reconcile_hierarchy, update_summary_parts};
pub use crate::report::{
    ClusterRecord, CoclusteringReport, CollapsedNodes, DimensionHierarchy, DimensionPartition,
    DimensionSummary, DimensionType, Document, Interval, PartitionParts, SavedDatas, ValueGroup,
};
pub use crate::store::{JsonFileStore, MemoryStore, ReportStore};

pub use error::{Error, Result};
