//! Dimension cluster trees.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::node::TreeNode;
use crate::config::FoldConfig;
use crate::report::{DimensionHierarchy, DimensionSummary, DimensionType};

/// Names and matrix positions below a node, self first, in pre-order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildrenList {
    /// Every node of the subtree.
    pub names: Vec<String>,
    /// Nodes of the subtree without children.
    pub leaf_names: Vec<String>,
    /// Matrix index of each entry of `leaf_names`.
    pub leaf_indexes: Vec<usize>,
}

/// The cluster forest of one dimension, stored as an arena.
#[derive(Debug, Clone)]
pub struct DimensionTree {
    name: String,
    dimension_type: DimensionType,
    nodes: Vec<TreeNode>,
    roots: Vec<usize>,
    index: HashMap<String, usize>,
}

impl DimensionTree {
    /// Build the tree of one dimension.
    ///
    /// Leaves get consecutive matrix indexes in record order; nodes are then
    /// linked to their parents in rank order, so children lists are rank
    /// ordered. A node whose parent cannot be found becomes a root.
    pub fn build(
        dimension: &DimensionSummary,
        hierarchy: &DimensionHierarchy,
        collapsed: &[String],
        renames: Option<&BTreeMap<String, String>>,
        config: &FoldConfig,
    ) -> Self {
        let collapsed: HashSet<&str> = collapsed.iter().map(String::as_str).collect();
        let mut leaf_position = 0usize;
        let mut nodes: Vec<TreeNode> = Vec::with_capacity(hierarchy.clusters.len());

        for (id, record) in hierarchy.clusters.iter().enumerate() {
            let matrix_index = if record.is_leaf {
                leaf_position += 1;
                Some(leaf_position - 1)
            } else {
                None
            };
            let mut node = TreeNode::new(id, record, dimension, matrix_index, &config.missing_label)
                .with_collapsed(collapsed.contains(record.cluster.as_str()));
            if let Some(label) = renames.and_then(|r| r.get(&record.cluster)) {
                node = node.with_short_description(label.clone());
            }
            nodes.push(node);
        }

        let index: HashMap<String, usize> = nodes
            .iter()
            .map(|n| (n.cluster.clone(), n.id))
            .collect();

        let mut order: Vec<usize> = (0..nodes.len()).collect();
        order.sort_by_key(|&id| nodes[id].rank);

        let mut roots = Vec::new();
        for id in order {
            let parent = if nodes[id].parent_cluster.is_empty() {
                None
            } else {
                index.get(&nodes[id].parent_cluster).copied().filter(|&p| p != id)
            };
            match parent {
                Some(p) => {
                    nodes[id].parent = Some(p);
                    nodes[p].children.push(id);
                }
                None => {
                    if !nodes[id].parent_cluster.is_empty() {
                        log::debug!(
                            "{}: parent '{}' of '{}' not found, treating as root",
                            hierarchy.name,
                            nodes[id].parent_cluster,
                            nodes[id].cluster
                        );
                    }
                    roots.push(id);
                }
            }
        }

        Self {
            name: hierarchy.name.clone(),
            dimension_type: hierarchy.dimension_type,
            nodes,
            roots,
            index,
        }
    }

    /// Dimension name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dimension type.
    pub fn dimension_type(&self) -> DimensionType {
        self.dimension_type
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root arena indexes in rank order.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// First root, if any.
    pub fn root(&self) -> Option<&TreeNode> {
        self.roots.first().map(|&id| &self.nodes[id])
    }

    /// Node by arena index.
    pub fn node(&self, id: usize) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    /// Node by cluster name.
    pub fn get(&self, cluster: &str) -> Option<&TreeNode> {
        self.index.get(cluster).map(|&id| &self.nodes[id])
    }

    /// Iterate over nodes in record order.
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    /// Leaves in matrix order.
    pub fn leaves(&self) -> Vec<&TreeNode> {
        let mut leaves: Vec<&TreeNode> = self
            .nodes
            .iter()
            .filter(|n| n.matrix_index.is_some())
            .collect();
        leaves.sort_by_key(|n| n.matrix_index);
        leaves
    }

    /// Strict ancestors of a node, nearest first.
    pub fn ancestors(&self, id: usize) -> impl Iterator<Item = &TreeNode> {
        let mut current = self.nodes.get(id).and_then(|n| n.parent);
        let mut steps = 0usize;
        let limit = self.nodes.len();
        std::iter::from_fn(move || {
            let id = current?;
            steps += 1;
            if steps > limit {
                return None;
            }
            let node = &self.nodes[id];
            current = node.parent;
            Some(node)
        })
    }

    /// Subtree listing of the node named `cluster`.
    ///
    /// Always descends fully, whatever the collapsed state of descendants.
    /// Unknown names give an empty listing.
    pub fn children_list(&self, cluster: &str) -> ChildrenList {
        self.index
            .get(cluster)
            .map(|&id| self.subtree(id))
            .unwrap_or_default()
    }

    /// Subtree listing of the node at arena index `id`.
    pub fn subtree(&self, id: usize) -> ChildrenList {
        let mut list = ChildrenList::default();
        if id >= self.nodes.len() {
            return list;
        }
        let mut seen: HashSet<usize> = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let node = &self.nodes[current];
            list.names.push(node.cluster.clone());
            if node.children.is_empty() {
                if let Some(matrix_index) = node.matrix_index {
                    list.leaf_names.push(node.cluster.clone());
                    list.leaf_indexes.push(matrix_index);
                }
            }
            stack.extend(node.children.iter().rev());
        }
        list
    }

    /// Nodes shown as leaves once collapsed nodes hide their subtrees.
    pub fn visible_leaves(&self) -> Vec<&TreeNode> {
        let mut visible = Vec::new();
        let mut seen: HashSet<usize> = HashSet::new();
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let node = &self.nodes[id];
            if node.is_collapsed || node.children.is_empty() {
                visible.push(node);
            } else {
                stack.extend(node.children.iter().rev());
            }
        }
        visible
    }

    /// Collapsed nodes that actually fold something, in rank order.
    ///
    /// Unknown names, terminal nodes and nodes below another collapsed node
    /// are dropped, so the result does not depend on the order of `names`.
    pub fn effective_collapsed<S: AsRef<str>>(&self, names: &[S]) -> Vec<usize> {
        let mut requested: HashSet<usize> = HashSet::new();
        for name in names {
            match self.index.get(name.as_ref()) {
                Some(&id) => {
                    requested.insert(id);
                }
                None => log::warn!("{}: ignoring unknown collapsed node '{}'", self.name, name.as_ref()),
            }
        }

        let mut effective: Vec<usize> = requested
            .iter()
            .copied()
            .filter(|&id| {
                if self.nodes[id].children.is_empty() {
                    return false;
                }
                let shadowed = self.ancestors(id).any(|a| requested.contains(&a.id));
                if shadowed {
                    log::debug!(
                        "{}: '{}' is folded by a collapsed ancestor",
                        self.name,
                        self.nodes[id].cluster
                    );
                }
                !shadowed
            })
            .collect();
        effective.sort_by_key(|&id| (self.nodes[id].rank, id));
        effective
    }
}
