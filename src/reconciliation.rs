//! Hierarchy reconciliation.
//!
//! A hierarchy is coherent with its partition when its leaf records are
//! exactly the partition parts. Folding a node breaks that until the
//! hierarchy is rewritten: descendants of the folded node are removed and
//! the node itself becomes a leaf.
//!
//! ```text
//! before                         after folding A
//! R                              R
//! ├── A                          ├── A          (isLeaf)
//! │   ├── {a, b}                 └── {x, y, z}
//! │   └── {c}
//! └── {x, y, z}
//! ```
//!
//! Records are then ordered leaves first, each group by rank, the order
//! exported reports use.

use std::collections::HashSet;

use crate::hierarchy::DimensionTree;
use crate::report::{ClusterRecord, DimensionHierarchy, DimensionSummary};

/// Rewrite a hierarchy for the collapsed nodes `collapsed` (arena indexes of `tree`).
///
/// `tree` must be built from `hierarchy`. The input is left untouched.
pub fn reconcile_hierarchy(
    tree: &DimensionTree,
    collapsed: &[usize],
    hierarchy: &DimensionHierarchy,
) -> DimensionHierarchy {
    let mut removed: HashSet<String> = HashSet::new();
    let mut folded: HashSet<&str> = HashSet::new();

    for &id in collapsed {
        let Some(node) = tree.node(id) else { continue };
        folded.insert(node.cluster.as_str());
        removed.extend(tree.subtree(id).names.into_iter().skip(1));
    }

    let mut clusters: Vec<ClusterRecord> = hierarchy
        .clusters
        .iter()
        .filter(|record| !removed.contains(&record.cluster))
        .map(|record| {
            let mut record = record.clone();
            if folded.contains(record.cluster.as_str()) {
                record.is_leaf = true;
            }
            record
        })
        .collect();
    clusters.sort_by_key(|record| (!record.is_leaf, record.rank));

    log::debug!(
        "{}: hierarchy reconciled from {} to {} clusters",
        hierarchy.name,
        hierarchy.clusters.len(),
        clusters.len()
    );
    DimensionHierarchy {
        name: hierarchy.name.clone(),
        dimension_type: hierarchy.dimension_type,
        clusters,
        extra: hierarchy.extra.clone(),
    }
}

/// Set every summary's part count to the leaf count of its hierarchy.
///
/// Summaries and hierarchies are matched by name; unmatched summaries are left alone.
pub fn update_summary_parts(summaries: &mut [DimensionSummary], hierarchies: &[DimensionHierarchy]) {
    for summary in summaries.iter_mut() {
        if let Some(hierarchy) = hierarchies.iter().find(|h| h.name == summary.name) {
            summary.parts = hierarchy.leaf_count();
        }
    }
}
