//! Cell transition and re-aggregation.
//!
//! Cells are sparse: one part-index tuple and one frequency per non-empty
//! cell. After folding, several initial parts map to the same current part,
//! so cells are re-keyed and summed without building the dense product.
//!
//! ```text
//! transition (per dimension)      cells
//! initial part -> current part    (0, 2) 5  ─┐
//! 0 -> 0                          (1, 2) 3  ─┴─> (0, 2) 8
//! 1 -> 0
//! 2 -> 1
//! ```
//!
//! The total frequency is conserved exactly.

use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::algebra::cmp_parts;
use crate::config::FoldConfig;
use crate::error::{Error, Result};
use crate::report::{CoclusteringReport, DimensionPartition, Interval, PartitionParts, ValueGroup};

/// Per-dimension mapping from initial part index to current part index.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTable {
    columns: Vec<Vec<usize>>,
}

impl TransitionTable {
    /// Build the table between two partition lists of the same dimensions.
    pub fn build(
        initial: &[DimensionPartition],
        current: &[DimensionPartition],
        config: &FoldConfig,
    ) -> Result<Self> {
        if initial.len() != current.len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} partitions", initial.len()),
                actual: format!("{} partitions", current.len()),
            });
        }
        let columns = initial
            .iter()
            .zip(current)
            .map(|(from, to)| transition(from, to, config))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { columns })
    }

    /// Identity table for the given part counts.
    pub fn identity(part_counts: &[usize]) -> Self {
        Self {
            columns: part_counts.iter().map(|&n| (0..n).collect()).collect(),
        }
    }

    /// Number of dimensions.
    pub fn dimensions(&self) -> usize {
        self.columns.len()
    }

    /// Mapping of one dimension.
    pub fn column(&self, dimension: usize) -> Option<&[usize]> {
        self.columns.get(dimension).map(Vec::as_slice)
    }

    /// Map one part index tuple.
    pub fn map_tuple(&self, tuple: &[usize]) -> Result<Vec<usize>> {
        if tuple.len() != self.columns.len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} indexes", self.columns.len()),
                actual: format!("{} indexes", tuple.len()),
            });
        }
        tuple
            .iter()
            .zip(&self.columns)
            .enumerate()
            .map(|(d, (&part, column))| {
                column.get(part).copied().ok_or_else(|| Error::ShapeMismatch {
                    expected: format!("part index below {} in dimension {d}", column.len()),
                    actual: format!("{part}"),
                })
            })
            .collect()
    }
}

fn transition(
    initial: &DimensionPartition,
    current: &DimensionPartition,
    config: &FoldConfig,
) -> Result<Vec<usize>> {
    match (&initial.parts, &current.parts) {
        (PartitionParts::Intervals(from), PartitionParts::Intervals(to)) => {
            interval_transition(&initial.name, from, to, config.epsilon)
        }
        (PartitionParts::ValueGroups { groups: from, .. }, PartitionParts::ValueGroups { groups: to, .. }) => {
            value_group_transition(&initial.name, from, to)
        }
        _ => Err(Error::ShapeMismatch {
            expected: format!("same partition type for '{}'", initial.name),
            actual: format!("'{}' changed type", current.name),
        }),
    }
}

/// Numerical mapping by a single forward sweep over both sorted lists.
///
/// Folding never reorders intervals, so once an initial interval is found
/// inside the current interval at the cursor, every following initial
/// interval lies at the cursor or after it.
pub fn interval_transition(
    dimension: &str,
    initial: &[Interval],
    current: &[Interval],
    epsilon: f64,
) -> Result<Vec<usize>> {
    let mut from: Vec<usize> = (0..initial.len()).collect();
    from.sort_by(|&a, &b| cmp_parts(&initial[a], &initial[b]));
    let mut to: Vec<usize> = (0..current.len()).collect();
    to.sort_by(|&a, &b| cmp_parts(&current[a], &current[b]));

    let mut mapping = vec![0usize; initial.len()];
    let mut cursor = 0usize;
    for &i in &from {
        if initial[i].bounds.is_none() {
            mapping[i] = missing_target(dimension, i, current, &to)?;
            continue;
        }
        while cursor < to.len() && !current[to[cursor]].contains(&initial[i], epsilon) {
            cursor += 1;
        }
        let Some(&target) = to.get(cursor) else {
            return Err(Error::TransitionOverrun {
                dimension: dimension.to_string(),
                part: i,
            });
        };
        mapping[i] = target;
    }
    Ok(mapping)
}

/// Current part receiving the missing-value part: the one flagged as holding
/// missing values, else the lowest interval.
fn missing_target(dimension: &str, part: usize, current: &[Interval], sorted: &[usize]) -> Result<usize> {
    if let Some(&at) = sorted.iter().find(|&&at| current[at].includes_missing()) {
        return Ok(at);
    }
    match sorted.first() {
        Some(&at) => {
            log::warn!(
                "{dimension}: missing values merged into '{}'",
                current[at].cluster
            );
            Ok(at)
        }
        None => Err(Error::TransitionOverrun {
            dimension: dimension.to_string(),
            part,
        }),
    }
}

/// Categorical mapping: each initial group goes to the current group holding
/// its first value.
///
/// The cursor moves forward and wraps once, so groups whose merge moved
/// them earlier are still found.
pub fn value_group_transition(
    dimension: &str,
    initial: &[ValueGroup],
    current: &[ValueGroup],
) -> Result<Vec<usize>> {
    let mut mapping = Vec::with_capacity(initial.len());
    let mut cursor = 0usize;
    for (i, group) in initial.iter().enumerate() {
        let holds = |candidate: &ValueGroup| match group.values.first() {
            Some(value) => candidate.contains_value(value),
            None => candidate.cluster == group.cluster,
        };
        let found = (0..current.len())
            .map(|step| (cursor + step) % current.len())
            .find(|&at| holds(&current[at]));
        match found {
            Some(at) => {
                cursor = at;
                mapping.push(at);
            }
            None => {
                return Err(Error::TransitionOverrun {
                    dimension: dimension.to_string(),
                    part: i,
                })
            }
        }
    }
    Ok(mapping)
}

/// Sparse cell table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellTable {
    /// Part index tuple of every cell.
    pub part_indexes: Vec<Vec<usize>>,
    /// Frequency of every cell.
    pub frequencies: Vec<u64>,
}

impl CellTable {
    /// Cells of a report.
    pub fn from_report(report: &CoclusteringReport) -> Self {
        Self {
            part_indexes: report.cell_part_indexes.clone(),
            frequencies: report.cell_frequencies.clone(),
        }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Whether there are no cells.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Sum of frequencies.
    pub fn total(&self) -> u64 {
        self.frequencies.iter().sum()
    }
}

/// Re-key every cell through `table` and sum cells that land on the same tuple.
///
/// The result is ordered by descending frequency; ties keep the order in
/// which their tuple first appeared.
pub fn reaggregate_cells(cells: &CellTable, table: &TransitionTable) -> Result<CellTable> {
    if cells.part_indexes.len() != cells.frequencies.len() {
        return Err(Error::ShapeMismatch {
            expected: format!("{} cell frequencies", cells.part_indexes.len()),
            actual: format!("{} cell frequencies", cells.frequencies.len()),
        });
    }

    #[cfg(feature = "parallel")]
    let mapped: Vec<Vec<usize>> = cells
        .part_indexes
        .par_iter()
        .map(|tuple| table.map_tuple(tuple))
        .collect::<Result<_>>()?;
    #[cfg(not(feature = "parallel"))]
    let mapped: Vec<Vec<usize>> = cells
        .part_indexes
        .iter()
        .map(|tuple| table.map_tuple(tuple))
        .collect::<Result<_>>()?;

    let mut slots: HashMap<Vec<usize>, usize> = HashMap::with_capacity(mapped.len());
    let mut merged: Vec<(Vec<usize>, u64)> = Vec::new();
    for (tuple, &frequency) in mapped.into_iter().zip(&cells.frequencies) {
        match slots.get(&tuple) {
            Some(&slot) => merged[slot].1 += frequency,
            None => {
                slots.insert(tuple.clone(), merged.len());
                merged.push((tuple, frequency));
            }
        }
    }
    merged.sort_by(|a, b| b.1.cmp(&a.1));

    let (part_indexes, frequencies) = merged.into_iter().unzip();
    let out = CellTable {
        part_indexes,
        frequencies,
    };
    log::debug!("cells re-aggregated from {} to {}", cells.len(), out.len());
    Ok(out)
}

/// Cells of `initial` re-keyed onto the partitions of `current`.
pub fn reaggregate(
    initial: &CoclusteringReport,
    current: &CoclusteringReport,
    config: &FoldConfig,
) -> Result<CellTable> {
    let table = TransitionTable::build(
        &initial.dimension_partitions,
        &current.dimension_partitions,
        config,
    )?;
    let before = CellTable::from_report(initial);
    let after = reaggregate_cells(&before, &table)?;
    if config.check_mass {
        check_mass_conservation(&before.frequencies, &after.frequencies)?;
    }
    Ok(after)
}

/// Set the summary cell count to the number of non-empty cells.
pub fn update_summary_cells(report: &mut CoclusteringReport) {
    report.summary.cells = report.cell_frequencies.len();
}

/// Fail unless both frequency lists have the same total.
pub fn check_mass_conservation(before: &[u64], after: &[u64]) -> Result<()> {
    let before: u64 = before.iter().sum();
    let after: u64 = after.iter().sum();
    if before == after {
        Ok(())
    } else {
        Err(Error::MassMismatch { before, after })
    }
}
