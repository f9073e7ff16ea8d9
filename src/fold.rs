//! Folding a coclustering report.
//!
//! [`Folder`] owns the pristine report and derives every reduced report
//! from it, so folds never compound:
//!
//! ```text
//! pristine ──┬── reduce({})            ──> pristine + session
//!            └── reduce({P: [..], ..}) ──> hierarchy ─> summary parts
//!                                          partition ─> transition ─> cells
//!                                          summary cells
//! ```
//!
//! Partitions are rebuilt from the pristine ones on every call, and cells
//! are re-keyed from the pristine cell table.

use crate::cells::{reaggregate, update_summary_cells};
use crate::config::FoldConfig;
use crate::error::Result;
use crate::hierarchy::{collapsed_nodes_at_rank, DimensionTree};
use crate::partition::reconcile_partition;
use crate::reconciliation::{reconcile_hierarchy, update_summary_parts};
use crate::report::{CoclusteringReport, CollapsedNodes, Document, SavedDatas};
use crate::store::ReportStore;

/// Folds a pristine report according to collapsed-node sets.
#[derive(Debug, Clone)]
pub struct Folder {
    initial: Document,
    config: FoldConfig,
    session: Option<SavedDatas>,
}

impl Folder {
    /// Wrap a pristine document. Its saved session, if any, becomes the
    /// session carried into every reduced document.
    pub fn new(initial: Document, config: FoldConfig) -> Self {
        let session = initial.saved_datas.clone();
        Self {
            initial,
            config,
            session,
        }
    }

    /// Decode a pristine document from JSON text.
    pub fn from_json(text: &str, config: FoldConfig) -> Result<Self> {
        Ok(Self::new(Document::from_json_str(text)?, config))
    }

    /// Replace the session state.
    pub fn with_session(mut self, session: SavedDatas) -> Self {
        self.session = Some(session);
        self
    }

    /// The pristine document.
    pub fn initial(&self) -> &Document {
        &self.initial
    }

    /// Folding configuration.
    pub fn config(&self) -> &FoldConfig {
        &self.config
    }

    /// Session state carried into reduced documents.
    pub fn session(&self) -> Option<&SavedDatas> {
        self.session.as_ref()
    }

    /// Mutable session state, created empty on first access.
    pub fn session_mut(&mut self) -> &mut SavedDatas {
        self.session.get_or_insert_with(SavedDatas::default)
    }

    /// Trees of the pristine hierarchies, flagged with `collapsed`.
    pub fn initial_trees(&self, collapsed: Option<&CollapsedNodes>) -> Vec<DimensionTree> {
        build_trees(
            &self.initial.coclustering_report,
            collapsed,
            self.session.as_ref(),
            &self.config,
        )
    }

    /// Trees of a reduced document, flagged with its own collapsed nodes.
    pub fn current_trees(&self, current: &Document) -> Vec<DimensionTree> {
        build_trees(
            &current.coclustering_report,
            current.collapsed_nodes(),
            current.saved_datas.as_ref().or(self.session.as_ref()),
            &self.config,
        )
    }

    /// Reduce the pristine report for `collapsed`.
    ///
    /// With no collapsed nodes the pristine report comes back unchanged
    /// with the session attached. Otherwise hierarchies, partitions and
    /// cells are reconciled and `collapsed` is recorded in the session.
    pub fn reduce(&self, collapsed: Option<&CollapsedNodes>) -> Result<Document> {
        let mut doc = self.initial.clone();
        doc.saved_datas = self.session.clone();

        let Some(collapsed) = collapsed.filter(|c| c.values().any(|names| !names.is_empty())) else {
            return Ok(doc);
        };

        let initial = &self.initial.coclustering_report;
        for name in collapsed.keys() {
            if initial.dimension_index(name).is_none() {
                log::warn!("ignoring collapsed nodes of unknown dimension '{name}'");
            }
        }

        let trees = self.initial_trees(Some(collapsed));
        let report = &mut doc.coclustering_report;
        let mut hierarchies = Vec::with_capacity(trees.len());
        let mut partitions = Vec::with_capacity(trees.len());
        for ((tree, hierarchy), partition) in trees
            .iter()
            .zip(&initial.dimension_hierarchies)
            .zip(&initial.dimension_partitions)
        {
            let names = collapsed.get(tree.name()).map(Vec::as_slice).unwrap_or_default();
            let ids = tree.effective_collapsed(names);
            hierarchies.push(reconcile_hierarchy(tree, &ids, hierarchy));
            partitions.push(reconcile_partition(tree, &ids, partition, &self.config)?);
        }
        report.dimension_hierarchies = hierarchies;
        update_summary_parts(&mut report.dimension_summaries, &report.dimension_hierarchies);
        report.dimension_partitions = partitions;

        let cells = reaggregate(initial, report, &self.config)?;
        report.cell_part_indexes = cells.part_indexes;
        report.cell_frequencies = cells.frequencies;
        update_summary_cells(report);

        log::debug!(
            "reduced to {} cells over parts {:?}",
            report.summary.cells,
            report.dimension_summaries.iter().map(|d| d.parts).collect::<Vec<_>>()
        );

        doc.saved_datas
            .get_or_insert_with(SavedDatas::default)
            .collapsed_nodes = collapsed.clone();
        Ok(doc)
    }

    /// Reduce so that every hierarchy shows down to `rank`.
    pub fn reduce_to_rank(&self, rank: usize) -> Result<Document> {
        let collapsed = collapsed_nodes_at_rank(&self.initial_trees(None), rank);
        self.reduce(Some(&collapsed))
    }

    /// Write `document` through `store` and hand it back.
    pub fn save<S: ReportStore + ?Sized>(&self, document: &Document, store: &mut S) -> Result<Document> {
        store.store(document)?;
        Ok(document.clone())
    }
}

fn build_trees(
    report: &CoclusteringReport,
    collapsed: Option<&CollapsedNodes>,
    session: Option<&SavedDatas>,
    config: &FoldConfig,
) -> Vec<DimensionTree> {
    report
        .dimension_summaries
        .iter()
        .zip(&report.dimension_hierarchies)
        .map(|(summary, hierarchy)| {
            let names = collapsed
                .and_then(|c| c.get(&hierarchy.name))
                .map(Vec::as_slice)
                .unwrap_or_default();
            let renames = session.and_then(|s| s.nodes_names.get(&hierarchy.name));
            DimensionTree::build(summary, hierarchy, names, renames, config)
        })
        .collect()
}
