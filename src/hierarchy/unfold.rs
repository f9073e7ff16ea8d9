//! Folding a hierarchy down to a hierarchical rank.
//!
//! Each internal node carries the rank of the merge that created it; the
//! root has the smallest. Showing the hierarchy "unfolded to rank `r`" means
//! expanding every node with `hierarchicalRank < r` and folding the rest:
//!
//! ```text
//!            R (1)                      r = 3:   R
//!          /     \                             /   \
//!       L (2)    Q (3)                       L      Q   <- collapsed
//!       /  \     /   \                      / \
//!      a    b   c     d                    a   b
//! ```

use std::collections::BTreeMap;

use super::tree::DimensionTree;
use crate::report::CollapsedNodes;

/// Topmost internal nodes with `hierarchicalRank >= rank`, in rank order.
pub fn collapsed_at_rank(tree: &DimensionTree, rank: usize) -> Vec<String> {
    let mut folded: Vec<(usize, String)> = tree
        .iter()
        .filter(|node| !node.children.is_empty() && node.hierarchical_rank >= rank)
        .filter(|node| {
            node.parent
                .and_then(|p| tree.node(p))
                .map_or(true, |parent| parent.hierarchical_rank < rank)
        })
        .map(|node| (node.rank, node.cluster.clone()))
        .collect();
    folded.sort();
    folded.into_iter().map(|(_, name)| name).collect()
}

/// [`collapsed_at_rank`] for every tree, keyed by dimension name.
///
/// Dimensions with nothing to fold are left out.
pub fn collapsed_nodes_at_rank(trees: &[DimensionTree], rank: usize) -> CollapsedNodes {
    let mut nodes = BTreeMap::new();
    for tree in trees {
        let names = collapsed_at_rank(tree, rank);
        if !names.is_empty() {
            nodes.insert(tree.name().to_string(), names);
        }
    }
    nodes
}

/// Number of clusters shown per dimension when unfolded to `rank`.
pub fn cluster_count_at_rank(tree: &DimensionTree, rank: usize) -> usize {
    let folded = collapsed_at_rank(tree, rank);
    tree.effective_collapsed(&folded)
        .iter()
        .map(|&id| tree.subtree(id).leaf_names.len().saturating_sub(1))
        .fold(tree.leaves().len(), |count, hidden| count.saturating_sub(hidden))
}
