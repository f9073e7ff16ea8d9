//! Cluster tree node.

use core::fmt;

use crate::algebra::parse_interval;
use crate::report::{ClusterRecord, DimensionSummary, DimensionType};

/// A node in a dimension's cluster tree.
///
/// Built once from a [`ClusterRecord`]; children are arena indexes into the
/// owning [`super::DimensionTree`].
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Index of this node in the tree arena.
    pub id: usize,
    /// Cluster name.
    pub cluster: String,
    /// Human-readable bounds derived from the cluster name.
    pub bounds: String,
    /// User label, defaults to `bounds`.
    pub short_description: String,
    /// Parent name, empty for the root.
    pub parent_cluster: String,
    /// Parent arena index.
    pub parent: Option<usize>,
    /// Child arena indexes in rank order.
    pub children: Vec<usize>,
    /// Whether the record is a partition part.
    pub is_leaf: bool,
    /// Whether the user folded this node.
    pub is_collapsed: bool,
    /// Whether this is the root sentinel.
    pub is_parent_cluster: bool,
    /// Position on the cell axis, leaves only.
    pub matrix_index: Option<usize>,
    /// Rank used to nest nodes.
    pub rank: usize,
    /// Rank of the merge that produced this node.
    pub hierarchical_rank: usize,
    /// Level in the hierarchy.
    pub hierarchical_level: f64,
    /// Number of instances.
    pub frequency: u64,
    /// Interest of the cluster.
    pub interest: f64,
}

impl TreeNode {
    /// Create a node from its record.
    pub fn new(
        id: usize,
        record: &ClusterRecord,
        dimension: &DimensionSummary,
        matrix_index: Option<usize>,
        missing_label: &str,
    ) -> Self {
        let bounds = display_bounds(&record.cluster, dimension, missing_label);
        Self {
            id,
            cluster: record.cluster.clone(),
            short_description: bounds.clone(),
            bounds,
            parent_cluster: record.parent_cluster.clone(),
            parent: None,
            children: Vec::new(),
            is_leaf: record.is_leaf,
            is_collapsed: false,
            is_parent_cluster: record.parent_cluster.is_empty(),
            matrix_index,
            rank: record.rank,
            hierarchical_rank: record.hierarchical_rank,
            hierarchical_level: record.hierarchical_level,
            frequency: record.frequency,
            interest: record.interest,
        }
    }

    /// Override the label.
    pub fn with_short_description(mut self, label: impl Into<String>) -> Self {
        self.short_description = label.into();
        self
    }

    /// Mark as folded.
    pub fn with_collapsed(mut self, collapsed: bool) -> Self {
        self.is_collapsed = collapsed;
        self
    }

    /// Numeric interval of `bounds`, ignoring a leading missing-value label.
    pub fn interval(&self) -> Option<(f64, f64)> {
        let text = self
            .bounds
            .rsplit_once(" U ")
            .map_or(self.bounds.as_str(), |(_, interval)| interval);
        parse_interval(text)
    }

    /// Whether the node has no children in the tree.
    pub fn is_terminal(&self) -> bool {
        self.children.is_empty()
    }
}

/// Bounds shown for a cluster.
///
/// For numerical dimensions the open `-inf` / `+inf` ends are replaced by the
/// observed min / max and `*` becomes `"<missing_label> U "`.
pub fn display_bounds(cluster: &str, dimension: &DimensionSummary, missing_label: &str) -> String {
    if dimension.dimension_type != DimensionType::Numerical {
        return cluster.to_string();
    }
    let mut bounds = cluster.to_string();
    if let Some(min) = dimension.min {
        bounds = bounds.replace("]-inf", &format!("[{min}"));
    }
    if let Some(max) = dimension.max {
        bounds = bounds.replace("+inf[", &format!("{max}]"));
    }
    bounds.replace('*', &format!("{missing_label} U "))
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_terminal() || self.is_collapsed {
            write!(f, "Leaf[{}]: {}", self.cluster, self.short_description)
        } else {
            write!(
                f,
                "Node[{}] {} children: {}",
                self.cluster,
                self.children.len(),
                self.short_description
            )
        }
    }
}
