//! Cluster hierarchies of a coclustering report.
//!
//! Each dimension ships its hierarchy as a flat, rank-annotated list of
//! cluster records. This module turns that list into an arena-backed tree:
//!
//! ```text
//! records (flat)                       tree
//! ───────────────────────────          ─────────────────────
//! ]-inf;30]  parent P  leaf            P
//! ]30;60]    parent P  leaf            ├── ]-inf;30]  (matrix 0)
//! ]60;+inf[  parent P  leaf            ├── ]30;60]    (matrix 1)
//! P          parent -  root            └── ]60;+inf[  (matrix 2)
//! ```
//!
//! - [`DimensionTree`]: unflattened forest with subtree listings and the
//!   "visible leaves" traversal that honours collapsed nodes
//! - [`TreeNode`]: one cluster with its display bounds and matrix index
//! - [`collapsed_at_rank`]: the collapsed set that shows a hierarchy down to
//!   a hierarchical rank
//! - [`validate_report`]: structural checks before folding

mod node;
mod tree;
pub mod unfold;
mod validate;

pub use node::{display_bounds, TreeNode};
pub use tree::{ChildrenList, DimensionTree};
pub use unfold::{cluster_count_at_rank, collapsed_at_rank, collapsed_nodes_at_rank};
pub use validate::{
    validate_hierarchy, validate_report, validate_tree_structure, HealthCheck, HealthReport, Severity,
    ValidationIssue, ValidationReport,
};
