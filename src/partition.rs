//! Partition reconciliation.
//!
//! Folding a node merges the partition parts of its leaves into one part
//! named after the node:
//!
//! ```text
//! numerical     ]-inf;30] ]30;60] ]60;+inf[   fold P   P = ]-inf;+inf[
//! categorical   {a, b}    {c}     {x, y, z}   fold A   A = {a, b, c}, {x, y, z}
//! ```
//!
//! Reconciliation always starts from the pristine partition and returns a
//! fresh one; the input is never modified.

use std::collections::HashSet;

use crate::algebra::{cmp_parts, find_included_intervals, union_value_groups};
use crate::config::FoldConfig;
use crate::error::{Error, Result};
use crate::hierarchy::{DimensionTree, TreeNode};
use crate::report::{DimensionPartition, Interval, PartitionParts, ValueGroup};

/// Rewrite a partition for the collapsed nodes `collapsed` (arena indexes of `tree`).
///
/// `tree` must be built from the hierarchy the partition belongs to, and
/// `collapsed` should come from [`DimensionTree::effective_collapsed`].
pub fn reconcile_partition(
    tree: &DimensionTree,
    collapsed: &[usize],
    partition: &DimensionPartition,
    config: &FoldConfig,
) -> Result<DimensionPartition> {
    let parts = match &partition.parts {
        PartitionParts::Intervals(intervals) => {
            PartitionParts::Intervals(reconcile_intervals(tree, collapsed, intervals, config)?)
        }
        PartitionParts::ValueGroups {
            groups,
            default_group_index,
        } => {
            let (groups, default_group_index) =
                reconcile_value_groups(tree, collapsed, groups, *default_group_index, config);
            PartitionParts::ValueGroups {
                groups,
                default_group_index,
            }
        }
    };
    log::debug!(
        "{}: partition reconciled from {} to {} parts",
        partition.name,
        partition.parts.len(),
        parts.len()
    );
    Ok(DimensionPartition {
        name: partition.name.clone(),
        dimension_type: partition.dimension_type,
        parts,
        extra: partition.extra.clone(),
    })
}

/// Numerical case: replace the intervals below each collapsed node by one
/// interval, keep the list sorted and drop intervals included in another.
pub fn reconcile_intervals(
    tree: &DimensionTree,
    collapsed: &[usize],
    intervals: &[Interval],
    config: &FoldConfig,
) -> Result<Vec<Interval>> {
    let mut current: Vec<Interval> = intervals.to_vec();

    for &id in collapsed {
        let Some(node) = tree.node(id) else { continue };
        let subtree = tree.subtree(id);
        let below: HashSet<&str> = subtree.names.iter().skip(1).map(String::as_str).collect();

        let (absorbed, kept): (Vec<Interval>, Vec<Interval>) = current
            .into_iter()
            .partition(|interval| below.contains(interval.cluster.as_str()));
        current = kept;

        if current.iter().any(|i| i.cluster == node.cluster) {
            log::debug!("{}: interval '{}' already present", tree.name(), node.cluster);
            continue;
        }

        let merged = merged_interval(node, &absorbed, tree.name())?;
        current.push(merged);
        current.sort_by(cmp_parts);
    }

    let bounded: Vec<(usize, (f64, f64))> = current
        .iter()
        .enumerate()
        .filter_map(|(i, interval)| interval.bounds.map(|b| (i, b)))
        .collect();
    let bounds: Vec<(f64, f64)> = bounded.iter().map(|(_, b)| *b).collect();
    let included: HashSet<usize> = find_included_intervals(&bounds, config.epsilon)
        .into_iter()
        .map(|k| bounded[k].0)
        .collect();
    if !included.is_empty() {
        log::debug!("{}: dropping {} included intervals", tree.name(), included.len());
    }

    Ok(current
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !included.contains(i))
        .map(|(_, interval)| interval)
        .collect())
}

/// Interval standing for a collapsed node.
///
/// Bounds are the hull of the absorbed intervals, so they keep the values
/// the partition already uses. Without any bounded interval they come from
/// the node's bounds, where `min` / `max` replace the open ends. The result
/// holds missing values when an absorbed part did.
fn merged_interval(node: &TreeNode, absorbed: &[Interval], dimension: &str) -> Result<Interval> {
    let missing_values = absorbed.iter().any(Interval::includes_missing);
    let hull = absorbed
        .iter()
        .filter_map(|i| i.bounds)
        .reduce(|(lo, hi), (olo, ohi)| (lo.min(olo), hi.max(ohi)));

    let merged = match (hull, node.interval()) {
        (Some((lower, upper)), _) => Interval::new(&node.cluster, lower, upper),
        (None, Some((lower, upper))) => {
            log::debug!(
                "{dimension}: bounds of '{}' read from '{}'",
                node.cluster,
                node.bounds
            );
            Interval::new(&node.cluster, lower, upper)
        }
        (None, None) if missing_values => Interval::missing(&node.cluster),
        (None, None) => {
            return Err(Error::InvalidBounds {
                cluster: node.cluster.clone(),
            })
        }
    };
    Ok(merged.with_missing_values(missing_values))
}

/// Categorical case: union the groups below each collapsed node into the
/// position of the first one and relocate the default group.
pub fn reconcile_value_groups(
    tree: &DimensionTree,
    collapsed: &[usize],
    groups: &[ValueGroup],
    default_group_index: Option<usize>,
    config: &FoldConfig,
) -> (Vec<ValueGroup>, Option<usize>) {
    let default_value = default_group_index
        .and_then(|i| groups.get(i))
        .and_then(|g| g.values.first())
        .cloned();

    let mut current: Vec<ValueGroup> = groups.to_vec();
    for &id in collapsed {
        let Some(node) = tree.node(id) else { continue };
        let subtree = tree.subtree(id);
        let members: HashSet<&str> = subtree.names.iter().map(String::as_str).collect();

        let absorbed: Vec<&ValueGroup> = current
            .iter()
            .filter(|g| members.contains(g.cluster.as_str()))
            .collect();
        if absorbed.is_empty() {
            log::debug!("{}: no value group below '{}'", tree.name(), node.cluster);
            continue;
        }
        let merged = union_value_groups(&node.cluster, &absorbed, config.sort_merged_values);

        let mut next = Vec::with_capacity(current.len());
        let mut merged = Some(merged);
        for group in current {
            if members.contains(group.cluster.as_str()) {
                if let Some(m) = merged.take() {
                    next.push(m);
                }
            } else {
                next.push(group);
            }
        }
        current = next;
    }

    let default_group_index = default_value.and_then(|value| {
        let found = current.iter().position(|g| g.contains_value(&value));
        if found.is_none() {
            log::warn!("{}: default group holding '{value}' not found", tree.name());
        }
        found
    });
    (current, default_group_index)
}

/// One entry of a node's composition.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionEntry {
    /// Leaf cluster holding the value.
    pub leaf: String,
    /// Value, or the interval name for numerical dimensions.
    pub value: String,
    /// Frequency of the value.
    pub frequency: u64,
    /// Typicality of the value, categorical only.
    pub typicality: Option<f64>,
}

/// Values (or intervals) covered by the leaves below `cluster`.
///
/// Unknown clusters, and leaves without a partition part, contribute nothing.
pub fn composition(
    tree: &DimensionTree,
    cluster: &str,
    partition: &DimensionPartition,
) -> Vec<CompositionEntry> {
    let leaves = tree.children_list(cluster).leaf_names;
    let mut entries = Vec::new();
    for leaf in &leaves {
        match &partition.parts {
            PartitionParts::Intervals(intervals) => {
                if intervals.iter().any(|i| &i.cluster == leaf) {
                    entries.push(CompositionEntry {
                        leaf: leaf.clone(),
                        value: tree.get(leaf).map_or_else(|| leaf.clone(), |n| n.bounds.clone()),
                        frequency: tree.get(leaf).map_or(0, |n| n.frequency),
                        typicality: None,
                    });
                }
            }
            PartitionParts::ValueGroups { groups, .. } => {
                let Some(group) = groups.iter().find(|g| &g.cluster == leaf) else {
                    continue;
                };
                for (i, value) in group.values.iter().enumerate() {
                    entries.push(CompositionEntry {
                        leaf: leaf.clone(),
                        value: value.clone(),
                        frequency: group.value_frequencies.get(i).copied().unwrap_or(0),
                        typicality: group.value_typicalities.get(i).copied(),
                    });
                }
            }
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{DimensionHierarchy, DimensionSummary};
    use serde_json::json;

    fn numerical() -> (DimensionTree, DimensionPartition) {
        let summary: DimensionSummary = serde_json::from_value(json!({
            "name": "X", "type": "Numerical", "parts": 4, "initialParts": 4, "min": 0, "max": 9
        }))
        .unwrap();
        let hierarchy: DimensionHierarchy = serde_json::from_value(json!({
            "name": "X", "type": "Numerical",
            "clusters": [
                {"cluster": "]-inf;1]", "parentCluster": "]-inf;2]", "rank": 4, "isLeaf": true, "frequency": 1},
                {"cluster": "]1;2]", "parentCluster": "]-inf;2]", "rank": 5, "isLeaf": true, "frequency": 2},
                {"cluster": "]2;3]", "parentCluster": "Q", "rank": 6, "isLeaf": true, "frequency": 3},
                {"cluster": "]3;+inf[", "parentCluster": "Q", "rank": 7, "isLeaf": true, "frequency": 4},
                {"cluster": "R", "parentCluster": "", "rank": 1, "isLeaf": false},
                {"cluster": "]-inf;2]", "parentCluster": "R", "rank": 2, "isLeaf": false},
                {"cluster": "Q", "parentCluster": "R", "rank": 3, "isLeaf": false}
            ]
        }))
        .unwrap();
        let partition: DimensionPartition = serde_json::from_value(json!({
            "name": "X", "type": "Numerical",
            "intervals": [
                {"cluster": "]-inf;1]", "bounds": [0, 1]},
                {"cluster": "]1;2]", "bounds": [1, 2]},
                {"cluster": "]2;3]", "bounds": [2, 3]},
                {"cluster": "]3;+inf[", "bounds": [3, 9]}
            ]
        }))
        .unwrap();
        let tree = DimensionTree::build(&summary, &hierarchy, &[], None, &FoldConfig::default());
        (tree, partition)
    }

    fn categorical() -> (DimensionTree, DimensionPartition) {
        let summary: DimensionSummary = serde_json::from_value(json!({
            "name": "C", "type": "Categorical", "parts": 3, "initialParts": 3
        }))
        .unwrap();
        let hierarchy: DimensionHierarchy = serde_json::from_value(json!({
            "name": "C", "type": "Categorical",
            "clusters": [
                {"cluster": "{a, b}", "parentCluster": "A", "rank": 3, "isLeaf": true},
                {"cluster": "{c}", "parentCluster": "A", "rank": 4, "isLeaf": true},
                {"cluster": "{x, y, z}", "parentCluster": "R", "rank": 5, "isLeaf": true},
                {"cluster": "R", "parentCluster": "", "rank": 1, "isLeaf": false},
                {"cluster": "A", "parentCluster": "R", "rank": 2, "isLeaf": false}
            ]
        }))
        .unwrap();
        let partition: DimensionPartition = serde_json::from_value(json!({
            "name": "C", "type": "Categorical", "defaultGroupIndex": 2,
            "valueGroups": [
                {"cluster": "{a, b}", "values": ["a", "b"], "valueFrequencies": [4, 1], "valueTypicalities": [1, 0.5]},
                {"cluster": "{c}", "values": ["c"], "valueFrequencies": [3], "valueTypicalities": [1]},
                {"cluster": "{x, y, z}", "values": ["x", "y", "z"], "valueFrequencies": [2, 2, 1], "valueTypicalities": [1, 1, 1]}
            ]
        }))
        .unwrap();
        let tree = DimensionTree::build(&summary, &hierarchy, &[], None, &FoldConfig::default());
        (tree, partition)
    }

    fn intervals(p: &DimensionPartition) -> Vec<(String, Option<(f64, f64)>)> {
        match &p.parts {
            PartitionParts::Intervals(i) => i.iter().map(|i| (i.cluster.clone(), i.bounds)).collect(),
            _ => panic!("not numerical"),
        }
    }

    #[test]
    fn folded_bounds_keep_finite_partition_values() {
        let (tree, partition) = numerical();
        let ids = tree.effective_collapsed(&["]-inf;2]"]);
        let out = reconcile_partition(&tree, &ids, &partition, &FoldConfig::default()).unwrap();
        assert_eq!(
            intervals(&out),
            vec![
                ("]-inf;2]".to_string(), Some((0.0, 2.0))),
                ("]2;3]".to_string(), Some((2.0, 3.0))),
                ("]3;+inf[".to_string(), Some((3.0, 9.0))),
            ]
        );
        let value = serde_json::to_value(&out).unwrap();
        assert_eq!(value["intervals"][0]["bounds"], json!([0.0, 2.0]));
    }

    #[test]
    fn bounds_come_from_node_when_nothing_bounded_is_absorbed() {
        let (tree, _) = numerical();
        let ids = tree.effective_collapsed(&["]-inf;2]"]);
        let out = reconcile_intervals(&tree, &ids, &[], &FoldConfig::default()).unwrap();
        assert_eq!(out, vec![Interval::new("]-inf;2]", 0.0, 2.0)]);
    }

    #[test]
    fn folding_over_missing_part_keeps_missing_values() {
        let summary: DimensionSummary = serde_json::from_value(json!({
            "name": "X", "type": "Numerical", "parts": 4, "initialParts": 4, "min": 0, "max": 9
        }))
        .unwrap();
        let hierarchy: DimensionHierarchy = serde_json::from_value(json!({
            "name": "X", "type": "Numerical",
            "clusters": [
                {"cluster": "Missing", "parentCluster": "Q", "rank": 4, "isLeaf": true},
                {"cluster": "]-inf;1]", "parentCluster": "L", "rank": 5, "isLeaf": true},
                {"cluster": "]1;2]", "parentCluster": "L", "rank": 6, "isLeaf": true},
                {"cluster": "]2;+inf[", "parentCluster": "Q", "rank": 7, "isLeaf": true},
                {"cluster": "R", "parentCluster": "", "rank": 1, "isLeaf": false},
                {"cluster": "L", "parentCluster": "R", "rank": 2, "isLeaf": false},
                {"cluster": "Q", "parentCluster": "R", "rank": 3, "isLeaf": false}
            ]
        }))
        .unwrap();
        let intervals = vec![
            Interval::missing("Missing"),
            Interval::new("]-inf;1]", 0.0, 1.0),
            Interval::new("]1;2]", 1.0, 2.0),
            Interval::new("]2;+inf[", 2.0, 9.0),
        ];
        let tree = DimensionTree::build(&summary, &hierarchy, &[], None, &FoldConfig::default());
        let ids = tree.effective_collapsed(&["Q"]);
        let out = reconcile_intervals(&tree, &ids, &intervals, &FoldConfig::default()).unwrap();
        let q = out.last().unwrap();
        assert_eq!(q.cluster, "Q");
        assert_eq!(q.bounds, Some((2.0, 9.0)));
        assert!(q.includes_missing());
        assert!(out.iter().all(|i| i.bounds.is_some()));
    }

    #[test]
    fn falls_back_to_hull_for_plain_names() {
        let (tree, partition) = numerical();
        let ids = tree.effective_collapsed(&["Q"]);
        let out = reconcile_partition(&tree, &ids, &partition, &FoldConfig::default()).unwrap();
        assert_eq!(intervals(&out).last().unwrap(), &("Q".to_string(), Some((2.0, 9.0))));
        assert_eq!(out.parts.len(), 3);
    }

    #[test]
    fn folding_root_leaves_one_interval() {
        let (tree, partition) = numerical();
        let ids = tree.effective_collapsed(&["]-inf;2]", "R"]);
        let out = reconcile_partition(&tree, &ids, &partition, &FoldConfig::default()).unwrap();
        assert_eq!(intervals(&out), vec![("R".to_string(), Some((0.0, 9.0)))]);
    }

    #[test]
    fn input_partition_is_untouched() {
        let (tree, partition) = numerical();
        let before = partition.clone();
        let ids = tree.effective_collapsed(&["Q"]);
        let _ = reconcile_partition(&tree, &ids, &partition, &FoldConfig::default()).unwrap();
        assert_eq!(partition, before);
    }

    #[test]
    fn unknown_bounds_are_an_error() {
        let (tree, _) = numerical();
        let ids = tree.effective_collapsed(&["Q"]);
        let err = reconcile_intervals(&tree, &ids, &[], &FoldConfig::default()).unwrap_err();
        assert_eq!(err, Error::InvalidBounds { cluster: "Q".to_string() });
    }

    #[test]
    fn value_groups_merge_in_place_and_default_follows() {
        let (tree, partition) = categorical();
        let ids = tree.effective_collapsed(&["A"]);
        let out = reconcile_partition(&tree, &ids, &partition, &FoldConfig::default()).unwrap();
        match out.parts {
            PartitionParts::ValueGroups {
                groups,
                default_group_index,
            } => {
                assert_eq!(groups.len(), 2);
                assert_eq!(groups[0].cluster, "A");
                assert_eq!(groups[0].values, vec!["a", "c", "b"]);
                assert_eq!(groups[0].value_frequencies, vec![4, 3, 1]);
                assert_eq!(default_group_index, Some(1));
                assert!(groups[1].contains_value("x"));
            }
            _ => panic!("not categorical"),
        }
    }

    #[test]
    fn default_group_absorbed_by_fold_is_relocated() {
        let (tree, partition) = categorical();
        let ids = tree.effective_collapsed(&["R"]);
        let out = reconcile_partition(&tree, &ids, &partition, &FoldConfig::default()).unwrap();
        match out.parts {
            PartitionParts::ValueGroups {
                groups,
                default_group_index,
            } => {
                assert_eq!(groups.len(), 1);
                assert_eq!(default_group_index, Some(0));
            }
            _ => panic!("not categorical"),
        }
    }

    #[test]
    fn composition_lists_values_below_node() {
        let (tree, partition) = categorical();
        let entries = composition(&tree, "A", &partition);
        let values: Vec<&str> = entries.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(values, vec!["a", "b", "c"]);
        assert_eq!(entries[2].leaf, "{c}");
        assert!(composition(&tree, "nope", &partition).is_empty());

        let (tree, partition) = numerical();
        let entries = composition(&tree, "Q", &partition);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].value, "]3;9]");
        assert_eq!(entries[1].frequency, 4);
    }
}
