//! Coclustering report document.
//!
//! The JSON shape consumed and produced by folding:
//!
//! ```text
//! {
//!   "coclusteringReport": {
//!     "summary": {"cells": ..},
//!     "dimensionSummaries":   [{name, type, parts, initialParts, min?, max?, ..}],
//!     "dimensionPartitions":  [{name, type, intervals? | valueGroups?, defaultGroupIndex?}],
//!     "dimensionHierarchies": [{name, type, clusters: [..]}],
//!     "cellPartIndexes": [[..], ..],
//!     "cellFrequencies": [..]
//!   },
//!   "savedDatas": {"collapsedNodes": {dimension: [cluster, ..]}, "nodesNames": {..}, ..}
//! }
//! ```
//!
//! Fields this crate does not interpret are kept in `extra` maps so that a
//! document survives a decode/encode cycle unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Fields carried through without interpretation.
pub type Extra = Map<String, Value>;

/// Collapsed cluster names per dimension name.
pub type CollapsedNodes = BTreeMap<String, Vec<String>>;

/// Type of an analyzed variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimensionType {
    /// Partitioned into intervals.
    Numerical,
    /// Partitioned into value groups.
    Categorical,
}

/// A full report document: the report plus saved session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// The coclustering report proper.
    pub coclustering_report: CoclusteringReport,
    /// Session state saved alongside the report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_datas: Option<SavedDatas>,
    /// Other top-level fields (tool, version, ..).
    #[serde(flatten)]
    pub extra: Extra,
}

impl Document {
    /// Decode a document from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let doc: Document = serde_json::from_str(text)?;
        doc.coclustering_report.check_cells()?;
        Ok(doc)
    }

    /// Decode a document from a JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let doc: Document = serde_json::from_value(value)?;
        doc.coclustering_report.check_cells()?;
        Ok(doc)
    }

    /// Encode as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Collapsed nodes recorded in the saved session, if any.
    pub fn collapsed_nodes(&self) -> Option<&CollapsedNodes> {
        self.saved_datas.as_ref().map(|s| &s.collapsed_nodes)
    }
}

/// Saved session state. Only `collapsedNodes` and `nodesNames` are read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDatas {
    /// Collapsed cluster names per dimension.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub collapsed_nodes: CollapsedNodes,
    /// User renames: dimension -> cluster -> label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nodes_names: BTreeMap<String, BTreeMap<String, String>>,
    /// Selection, layout, annotations and the rest.
    #[serde(flatten)]
    pub extra: Extra,
}

/// The coclustering report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoclusteringReport {
    /// Global summary.
    pub summary: Summary,
    /// One summary per dimension.
    pub dimension_summaries: Vec<DimensionSummary>,
    /// One partition per dimension.
    pub dimension_partitions: Vec<DimensionPartition>,
    /// One cluster hierarchy per dimension.
    pub dimension_hierarchies: Vec<DimensionHierarchy>,
    /// Part index tuple of every non-empty cell.
    pub cell_part_indexes: Vec<Vec<usize>>,
    /// Frequency of every non-empty cell.
    pub cell_frequencies: Vec<u64>,
    /// Other fields.
    #[serde(flatten)]
    pub extra: Extra,
}

impl CoclusteringReport {
    /// Number of dimensions.
    pub fn dimension_count(&self) -> usize {
        self.dimension_summaries.len()
    }

    /// Position of a dimension by name.
    pub fn dimension_index(&self, name: &str) -> Option<usize> {
        self.dimension_summaries.iter().position(|d| d.name == name)
    }

    /// Sum of all cell frequencies.
    pub fn total_frequency(&self) -> u64 {
        self.cell_frequencies.iter().sum()
    }

    /// Check the cell table against the dimension lists and partitions.
    pub fn check_cells(&self) -> Result<()> {
        let dims = self.dimension_summaries.len();
        if self.dimension_partitions.len() != dims || self.dimension_hierarchies.len() != dims {
            return Err(Error::ShapeMismatch {
                expected: format!("{dims} partitions and hierarchies"),
                actual: format!(
                    "{} partitions, {} hierarchies",
                    self.dimension_partitions.len(),
                    self.dimension_hierarchies.len()
                ),
            });
        }
        if self.cell_part_indexes.len() != self.cell_frequencies.len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} cell frequencies", self.cell_part_indexes.len()),
                actual: format!("{} cell frequencies", self.cell_frequencies.len()),
            });
        }
        for (cell, tuple) in self.cell_part_indexes.iter().enumerate() {
            if tuple.len() != dims {
                return Err(Error::ShapeMismatch {
                    expected: format!("{dims} indexes in cell {cell}"),
                    actual: format!("{} indexes", tuple.len()),
                });
            }
            for (d, &part) in tuple.iter().enumerate() {
                let parts = self.dimension_partitions[d].parts.len();
                if part >= parts {
                    return Err(Error::ShapeMismatch {
                        expected: format!(
                            "part index below {parts} for '{}' in cell {cell}",
                            self.dimension_partitions[d].name
                        ),
                        actual: format!("{part}"),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Global report summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of non-empty cells.
    pub cells: usize,
    /// Other fields.
    #[serde(flatten)]
    pub extra: Extra,
}

/// Per-dimension summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionSummary {
    /// Dimension name.
    pub name: String,
    /// Dimension type.
    #[serde(rename = "type")]
    pub dimension_type: DimensionType,
    /// Current number of parts (leaf clusters).
    pub parts: usize,
    /// Number of parts before any folding.
    #[serde(default)]
    pub initial_parts: usize,
    /// Smallest observed value (numerical dimensions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Largest observed value (numerical dimensions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Other fields.
    #[serde(flatten)]
    pub extra: Extra,
}

/// Cluster hierarchy of one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionHierarchy {
    /// Dimension name.
    pub name: String,
    /// Dimension type.
    #[serde(rename = "type")]
    pub dimension_type: DimensionType,
    /// Flat cluster records.
    pub clusters: Vec<ClusterRecord>,
    /// Other fields.
    #[serde(flatten)]
    pub extra: Extra,
}

impl DimensionHierarchy {
    /// Number of leaf records.
    pub fn leaf_count(&self) -> usize {
        self.clusters.iter().filter(|c| c.is_leaf).count()
    }
}

/// One node of a hierarchy as shipped in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecord {
    /// Unique cluster name.
    pub cluster: String,
    /// Parent name, empty for the root.
    #[serde(default)]
    pub parent_cluster: String,
    /// Number of instances.
    #[serde(default)]
    pub frequency: u64,
    /// Interest of the cluster.
    #[serde(default)]
    pub interest: f64,
    /// Level in the hierarchy.
    #[serde(default)]
    pub hierarchical_level: f64,
    /// Rank used to nest nodes.
    pub rank: usize,
    /// Rank of the merge that produced this node.
    #[serde(default)]
    pub hierarchical_rank: usize,
    /// Whether this is a partition part.
    pub is_leaf: bool,
    /// Other fields.
    #[serde(flatten)]
    pub extra: Extra,
}

/// A numerical part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Cluster name.
    pub cluster: String,
    /// Lower and upper bound. `None` for the missing-value part.
    #[serde(default, with = "bounds_serde", skip_serializing_if = "Option::is_none")]
    pub bounds: Option<(f64, f64)>,
    /// Set on a folded part that absorbed the missing-value part.
    #[serde(skip)]
    pub missing_values: bool,
}

impl Interval {
    /// Create a bounded interval.
    pub fn new(cluster: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            cluster: cluster.into(),
            bounds: Some((lower, upper)),
            missing_values: false,
        }
    }

    /// Create the missing-value part.
    pub fn missing(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            bounds: None,
            missing_values: false,
        }
    }

    /// Mark this part as holding missing values.
    pub fn with_missing_values(mut self, missing_values: bool) -> Self {
        self.missing_values = missing_values;
        self
    }

    /// Whether this part holds missing values.
    pub fn includes_missing(&self) -> bool {
        self.missing_values || self.bounds.is_none() || self.cluster.starts_with('*')
    }

    /// Whether `other` lies within this part.
    pub fn contains(&self, other: &Interval, epsilon: f64) -> bool {
        match (self.bounds, other.bounds) {
            (Some((lo, hi)), Some((olo, ohi))) => olo >= lo - epsilon && ohi <= hi + epsilon,
            (_, None) => self.includes_missing(),
            (None, Some(_)) => false,
        }
    }
}

/// A categorical part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueGroup {
    /// Cluster name.
    pub cluster: String,
    /// Values of the group.
    pub values: Vec<String>,
    /// Frequency of each value.
    #[serde(default)]
    pub value_frequencies: Vec<u64>,
    /// Typicality of each value.
    #[serde(default)]
    pub value_typicalities: Vec<f64>,
}

impl ValueGroup {
    /// Whether the group holds `value`.
    pub fn contains_value(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// Parts of a partition.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionParts {
    /// Numerical partition.
    Intervals(Vec<Interval>),
    /// Categorical partition.
    ValueGroups {
        /// The groups.
        groups: Vec<ValueGroup>,
        /// Index of the catch-all group, if any.
        default_group_index: Option<usize>,
    },
}

impl PartitionParts {
    /// Number of parts.
    pub fn len(&self) -> usize {
        match self {
            PartitionParts::Intervals(intervals) => intervals.len(),
            PartitionParts::ValueGroups { groups, .. } => groups.len(),
        }
    }

    /// Whether there are no parts.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cluster name of every part, in order.
    pub fn clusters(&self) -> Vec<&str> {
        match self {
            PartitionParts::Intervals(intervals) => {
                intervals.iter().map(|i| i.cluster.as_str()).collect()
            }
            PartitionParts::ValueGroups { groups, .. } => {
                groups.iter().map(|g| g.cluster.as_str()).collect()
            }
        }
    }
}

/// Partition of one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPartition", into = "RawPartition")]
pub struct DimensionPartition {
    /// Dimension name.
    pub name: String,
    /// Dimension type.
    pub dimension_type: DimensionType,
    /// Intervals or value groups.
    pub parts: PartitionParts,
    /// Other fields.
    pub extra: Extra,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPartition {
    name: String,
    #[serde(rename = "type")]
    dimension_type: DimensionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    intervals: Option<Vec<Interval>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value_groups: Option<Vec<ValueGroup>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_group_index: Option<usize>,
    #[serde(flatten)]
    extra: Extra,
}

impl TryFrom<RawPartition> for DimensionPartition {
    type Error = Error;

    fn try_from(raw: RawPartition) -> Result<Self> {
        let parts = match raw.dimension_type {
            DimensionType::Numerical => {
                PartitionParts::Intervals(raw.intervals.ok_or_else(|| Error::MissingField {
                    dimension: raw.name.clone(),
                    field: "intervals",
                })?)
            }
            DimensionType::Categorical => PartitionParts::ValueGroups {
                groups: raw.value_groups.ok_or_else(|| Error::MissingField {
                    dimension: raw.name.clone(),
                    field: "valueGroups",
                })?,
                default_group_index: raw.default_group_index,
            },
        };
        Ok(Self {
            name: raw.name,
            dimension_type: raw.dimension_type,
            parts,
            extra: raw.extra,
        })
    }
}

impl From<DimensionPartition> for RawPartition {
    fn from(partition: DimensionPartition) -> Self {
        let (intervals, value_groups, default_group_index) = match partition.parts {
            PartitionParts::Intervals(intervals) => (Some(intervals), None, None),
            PartitionParts::ValueGroups {
                groups,
                default_group_index,
            } => (None, Some(groups), default_group_index),
        };
        Self {
            name: partition.name,
            dimension_type: partition.dimension_type,
            intervals,
            value_groups,
            default_group_index,
            extra: partition.extra,
        }
    }
}

/// Interval bounds as a two-element array; infinities travel as `"-inf"` / `"+inf"`.
mod bounds_serde {
    use serde::ser::SerializeSeq;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    use crate::algebra::parse_bound;

    struct Bound(f64);

    impl Serialize for Bound {
        fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
            if self.0 == f64::INFINITY {
                s.serialize_str("+inf")
            } else if self.0 == f64::NEG_INFINITY {
                s.serialize_str("-inf")
            } else {
                s.serialize_f64(self.0)
            }
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawBound {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(
        bounds: &Option<(f64, f64)>,
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match bounds {
            None => s.serialize_none(),
            Some((lower, upper)) => {
                let mut seq = s.serialize_seq(Some(2))?;
                seq.serialize_element(&Bound(*lower))?;
                seq.serialize_element(&Bound(*upper))?;
                seq.end()
            }
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Option<(f64, f64)>, D::Error> {
        let raw: Option<Vec<RawBound>> = Option::deserialize(d)?;
        let raw = match raw {
            None => return Ok(None),
            Some(raw) if raw.is_empty() => return Ok(None),
            Some(raw) => raw,
        };
        if raw.len() != 2 {
            return Err(de::Error::invalid_length(raw.len(), &"two bounds"));
        }
        let mut values = [0.0f64; 2];
        for (slot, bound) in values.iter_mut().zip(raw) {
            *slot = match bound {
                RawBound::Number(v) => v,
                RawBound::Text(t) => parse_bound(&t)
                    .ok_or_else(|| de::Error::custom(format!("invalid bound '{t}'")))?,
            };
        }
        Ok(Some((values[0], values[1])))
    }
}
