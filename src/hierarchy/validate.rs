//! Hierarchy and report consistency checks.
//!
//! Folding assumes a well-formed input: one root per dimension, every parent
//! name resolvable, leaves matching partition parts one to one. These checks
//! report what is wrong instead of failing on first contact:
//!
//! - Orphaned clusters (not reachable from the root)
//! - Cycles in the parent links
//! - Leaf records with children, internal records without
//! - Summary part counts that disagree with the leaf count
//!
//! # Example
//!
//! ```rust,ignore
//! let report = validate_report(&doc.coclustering_report, &FoldConfig::default());
//! if !report.is_healthy() {
//!     for issue in &report.issues {
//!         log::warn!("{issue}");
//!     }
//! }
//! ```

use std::collections::{HashMap, HashSet};

use super::tree::DimensionTree;
use crate::config::FoldConfig;
use crate::report::{CoclusteringReport, DimensionSummary};

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational, not a problem.
    Info,
    /// Something unusual but not necessarily wrong.
    Warning,
    /// A problem that should be fixed.
    Error,
    /// A critical issue that may cause failures.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A single issue found while validating.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// Dimension involved.
    pub dimension: Option<String>,
    /// Cluster involved.
    pub cluster: Option<String>,
}

impl ValidationIssue {
    /// Create a new validation issue.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            dimension: None,
            cluster: None,
        }
    }

    /// Attach the dimension name.
    pub fn in_dimension(mut self, name: impl Into<String>) -> Self {
        self.dimension = Some(name.into());
        self
    }

    /// Attach the cluster name.
    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] ", self.severity)?;
        if let Some(dimension) = &self.dimension {
            write!(f, "{dimension}: ")?;
        }
        write!(f, "{}", self.message)?;
        if let Some(cluster) = &self.cluster {
            write!(f, " (cluster '{cluster}')")?;
        }
        Ok(())
    }
}

/// Issues collected by a check.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// All issues found.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Add an issue to the report.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Move all issues of `other` into this report.
    pub fn merge(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }

    /// Add a warning-level issue.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.add(ValidationIssue::new(Severity::Warning, message));
    }

    /// Add an error-level issue.
    pub fn error(&mut self, message: impl Into<String>) {
        self.add(ValidationIssue::new(Severity::Error, message));
    }

    /// True when there are no errors or critical issues.
    pub fn is_healthy(&self) -> bool {
        !self.issues.iter().any(|i| i.severity >= Severity::Error)
    }

    /// True when there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues of a given severity or higher.
    pub fn issues_at_level(&self, min_severity: Severity) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity >= min_severity)
            .collect()
    }

    /// Count issues by severity.
    pub fn counts(&self) -> HashMap<Severity, usize> {
        let mut counts = HashMap::new();
        for issue in &self.issues {
            *counts.entry(issue.severity).or_default() += 1;
        }
        counts
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_clean() {
            return write!(f, "Validation passed: no issues found");
        }

        let counts = self.counts();
        let parts: Vec<String> = [
            (Severity::Critical, "critical"),
            (Severity::Error, "errors"),
            (Severity::Warning, "warnings"),
            (Severity::Info, "info"),
        ]
        .iter()
        .filter_map(|(sev, name)| counts.get(sev).map(|c| format!("{c} {name}")))
        .collect();
        writeln!(f, "Validation report: {}", parts.join(", "))?;

        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}

/// Shape statistics of one dimension tree plus its issues.
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Validation issues.
    pub validation: ValidationReport,
    /// Total number of clusters.
    pub node_count: usize,
    /// Number of leaf clusters.
    pub leaf_count: usize,
    /// Maximum depth below the root.
    pub max_depth: usize,
}

impl HealthReport {
    /// Check if the tree is healthy (no errors or critical issues).
    pub fn is_healthy(&self) -> bool {
        self.validation.is_healthy()
    }
}

impl std::fmt::Display for HealthReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Clusters: {} ({} leaves)", self.node_count, self.leaf_count)?;
        writeln!(f, "Max depth: {}", self.max_depth)?;
        write!(f, "{}", self.validation)
    }
}

/// Trait for types that can be health-checked.
pub trait HealthCheck {
    /// Perform a health check and return a report.
    fn health_check(&self) -> HealthReport;

    /// Quick check: returns true if healthy.
    fn is_healthy(&self) -> bool {
        self.health_check().is_healthy()
    }
}

impl HealthCheck for DimensionTree {
    fn health_check(&self) -> HealthReport {
        let mut parents: HashMap<usize, usize> = HashMap::new();
        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        for node in self.iter() {
            if let Some(parent) = node.parent {
                parents.insert(node.id, parent);
            }
            if !node.children.is_empty() {
                children.insert(node.id, node.children.clone());
            }
        }

        let mut validation = validate_tree_structure(&parents, &children, self.len());
        for issue in &mut validation.issues {
            issue.dimension = Some(self.name().to_string());
        }

        for node in self.iter() {
            let issue = if node.is_leaf && !node.children.is_empty() {
                Some(ValidationIssue::new(Severity::Error, "leaf cluster has children"))
            } else if !node.is_leaf && node.children.is_empty() {
                Some(ValidationIssue::new(Severity::Warning, "internal cluster has no children"))
            } else if !node.is_parent_cluster && node.parent.is_none() {
                Some(ValidationIssue::new(Severity::Error, "parent cluster not found"))
            } else {
                None
            };
            if let Some(issue) = issue {
                validation.add(issue.in_dimension(self.name()).with_cluster(&node.cluster));
            }
        }

        let mut max_depth = 0;
        for &root in self.roots() {
            let mut stack = vec![(root, 0usize)];
            let mut seen = HashSet::new();
            while let Some((id, depth)) = stack.pop() {
                if !seen.insert(id) {
                    continue;
                }
                max_depth = max_depth.max(depth);
                if let Some(node) = self.node(id) {
                    stack.extend(node.children.iter().map(|&c| (c, depth + 1)));
                }
            }
        }

        HealthReport {
            validation,
            node_count: self.len(),
            leaf_count: self.leaves().len(),
            max_depth,
        }
    }
}

/// Validate that parent/child links over `node_count` arena slots form one tree.
pub fn validate_tree_structure(
    parents: &HashMap<usize, usize>,
    children: &HashMap<usize, Vec<usize>>,
    node_count: usize,
) -> ValidationReport {
    let mut report = ValidationReport::new();
    if node_count == 0 {
        report.warn("hierarchy is empty");
        return report;
    }

    let roots: Vec<usize> = (0..node_count).filter(|id| !parents.contains_key(id)).collect();
    if roots.is_empty() {
        report.add(ValidationIssue::new(
            Severity::Critical,
            "no root cluster found, parent links form a cycle",
        ));
    } else if roots.len() > 1 {
        report.error(format!("{} root clusters, expected one", roots.len()));
    }

    let mut reachable = HashSet::new();
    let mut stack = roots.clone();
    while let Some(node) = stack.pop() {
        if reachable.insert(node) {
            if let Some(node_children) = children.get(&node) {
                stack.extend(node_children);
            }
        }
    }
    let orphans = node_count - reachable.len().min(node_count);
    if orphans > 0 {
        report.error(format!("{orphans} clusters not reachable from a root"));
    }

    for (child, parent) in parents {
        let listed = children.get(parent).is_some_and(|c| c.contains(child));
        if !listed {
            report.error(format!(
                "cluster {child} names parent {parent} which does not list it"
            ));
        }
    }

    report
}

/// Check one dimension tree: structure, leaf flags, and the summary part count.
pub fn validate_hierarchy(tree: &DimensionTree, summary: &DimensionSummary) -> ValidationReport {
    let mut out = tree.health_check().validation;
    let leaves = tree.leaves().len();
    if summary.parts != leaves {
        out.add(
            ValidationIssue::new(
                Severity::Error,
                format!("summary declares {} parts, hierarchy has {leaves} leaves", summary.parts),
            )
            .in_dimension(&summary.name),
        );
    }
    out
}

/// Check every dimension of a report.
///
/// Covers tree structure, the summary part counts, and the match between
/// leaf clusters and partition parts.
pub fn validate_report(report: &CoclusteringReport, config: &FoldConfig) -> ValidationReport {
    let mut out = ValidationReport::new();
    if let Err(err) = report.check_cells() {
        out.add(ValidationIssue::new(Severity::Critical, err.to_string()));
        return out;
    }

    for ((summary, hierarchy), partition) in report
        .dimension_summaries
        .iter()
        .zip(&report.dimension_hierarchies)
        .zip(&report.dimension_partitions)
    {
        let tree = DimensionTree::build(summary, hierarchy, &[], None, config);
        out.merge(validate_hierarchy(&tree, summary));

        let leaves = hierarchy.leaf_count();
        if partition.parts.len() != leaves {
            out.add(
                ValidationIssue::new(
                    Severity::Error,
                    format!("partition has {} parts, hierarchy has {leaves} leaves", partition.parts.len()),
                )
                .in_dimension(&summary.name),
            );
        }
        for cluster in partition.parts.clusters() {
            let is_leaf = tree.get(cluster).is_some_and(|n| n.is_leaf);
            if !is_leaf {
                out.add(
                    ValidationIssue::new(Severity::Warning, "partition part is not a leaf cluster")
                        .in_dimension(&summary.name)
                        .with_cluster(cluster),
                );
            }
        }
    }

    if report.summary.cells != report.cell_frequencies.len() {
        out.warn(format!(
            "summary declares {} cells, table has {}",
            report.summary.cells,
            report.cell_frequencies.len()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{DimensionHierarchy, DimensionSummary};
    use serde_json::json;

    fn tree(clusters: serde_json::Value) -> DimensionTree {
        let summary: DimensionSummary = serde_json::from_value(json!({
            "name": "V", "type": "Categorical", "parts": 2, "initialParts": 2
        }))
        .unwrap();
        let hierarchy: DimensionHierarchy =
            serde_json::from_value(json!({"name": "V", "type": "Categorical", "clusters": clusters}))
                .unwrap();
        DimensionTree::build(&summary, &hierarchy, &[], None, &FoldConfig::default())
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn test_issue_display() {
        let issue = ValidationIssue::new(Severity::Error, "Something wrong")
            .in_dimension("Age")
            .with_cluster("A1");
        let s = format!("{issue}");
        assert!(s.contains("ERROR"));
        assert!(s.contains("Age"));
        assert!(s.contains("A1"));
    }

    #[test]
    fn well_formed_tree_is_healthy() {
        let t = tree(json!([
            {"cluster": "{a}", "parentCluster": "R", "rank": 2, "isLeaf": true},
            {"cluster": "{b}", "parentCluster": "R", "rank": 3, "isLeaf": true},
            {"cluster": "R", "parentCluster": "", "rank": 1, "isLeaf": false}
        ]));
        let health = t.health_check();
        assert!(health.is_healthy(), "{health}");
        assert_eq!(health.leaf_count, 2);
        assert_eq!(health.max_depth, 1);
    }

    #[test]
    fn dangling_parent_is_reported() {
        let t = tree(json!([
            {"cluster": "{a}", "parentCluster": "R", "rank": 2, "isLeaf": true},
            {"cluster": "{b}", "parentCluster": "Gone", "rank": 3, "isLeaf": true},
            {"cluster": "R", "parentCluster": "", "rank": 1, "isLeaf": false}
        ]));
        let health = t.health_check();
        assert!(!health.is_healthy());
        assert!(health
            .validation
            .issues
            .iter()
            .any(|i| i.cluster.as_deref() == Some("{b}")));
        assert!(health.validation.issues.iter().any(|i| i.message.contains("root clusters")));
    }

    #[test]
    fn summary_part_count_must_match_leaves() {
        let t = tree(json!([
            {"cluster": "{a}", "parentCluster": "R", "rank": 2, "isLeaf": true},
            {"cluster": "R", "parentCluster": "", "rank": 1, "isLeaf": false}
        ]));
        let summary: DimensionSummary = serde_json::from_value(json!({
            "name": "V", "type": "Categorical", "parts": 2, "initialParts": 2
        }))
        .unwrap();
        let report = validate_hierarchy(&t, &summary);
        assert!(!report.is_healthy());
        assert!(report.issues[0].message.contains("2 parts"));
    }

    #[test]
    fn structure_cycle_is_critical() {
        let parents: HashMap<usize, usize> = [(0, 1), (1, 0)].into_iter().collect();
        let children: HashMap<usize, Vec<usize>> =
            [(0, vec![1]), (1, vec![0])].into_iter().collect();
        let report = validate_tree_structure(&parents, &children, 2);
        assert!(!report.issues_at_level(Severity::Critical).is_empty());
    }
}
