#[cfg(test)]
mod tests {
    use crate::report::{CollapsedNodes, Document, PartitionParts};
    use crate::{FoldConfig, Folder, Result};
    use proptest::prelude::*;
    use serde_json::{json, Value};

    // Age (numerical):  P -> ]-inf;30] ]30;60] ]60;+inf[
    // Color (categorical): C -> A -> {red, pink} {blue}
    //                        -> {x, y, z}            (default group)
    fn report(cells: &[(usize, usize, u64)]) -> Value {
        json!({
            "tool": "Khiops Coclustering",
            "version": "10.0",
            "coclusteringReport": {
                "summary": {"instances": 32, "cells": cells.len(), "nullCost": 100.5},
                "dimensionSummaries": [
                    {"name": "Age", "type": "Numerical", "parts": 3, "initialParts": 3, "min": 18, "max": 90},
                    {"name": "Color", "type": "Categorical", "parts": 3, "initialParts": 3}
                ],
                "dimensionPartitions": [
                    {"name": "Age", "type": "Numerical", "intervals": [
                        {"cluster": "]-inf;30]", "bounds": ["-inf", 30]},
                        {"cluster": "]30;60]", "bounds": [30, 60]},
                        {"cluster": "]60;+inf[", "bounds": [60, "+inf"]}
                    ]},
                    {"name": "Color", "type": "Categorical", "defaultGroupIndex": 2, "valueGroups": [
                        {"cluster": "{red, pink}", "values": ["red", "pink"], "valueFrequencies": [6, 4], "valueTypicalities": [1, 0.8]},
                        {"cluster": "{blue}", "values": ["blue"], "valueFrequencies": [5], "valueTypicalities": [1]},
                        {"cluster": "{x, y, z}", "values": ["x", "y", "z"], "valueFrequencies": [9, 5, 3], "valueTypicalities": [1, 0.6, 0.2]}
                    ]}
                ],
                "dimensionHierarchies": [
                    {"name": "Age", "type": "Numerical", "clusters": [
                        {"cluster": "]-inf;30]", "parentCluster": "P", "frequency": 13, "rank": 2, "hierarchicalRank": 5, "isLeaf": true},
                        {"cluster": "]30;60]", "parentCluster": "P", "frequency": 8, "rank": 3, "hierarchicalRank": 5, "isLeaf": true},
                        {"cluster": "]60;+inf[", "parentCluster": "P", "frequency": 11, "rank": 4, "hierarchicalRank": 5, "isLeaf": true},
                        {"cluster": "P", "parentCluster": "", "frequency": 32, "rank": 1, "hierarchicalRank": 1, "isLeaf": false}
                    ]},
                    {"name": "Color", "type": "Categorical", "clusters": [
                        {"cluster": "{red, pink}", "parentCluster": "A", "frequency": 10, "rank": 3, "hierarchicalRank": 6, "isLeaf": true},
                        {"cluster": "{blue}", "parentCluster": "A", "frequency": 5, "rank": 4, "hierarchicalRank": 6, "isLeaf": true},
                        {"cluster": "{x, y, z}", "parentCluster": "C", "frequency": 17, "rank": 5, "hierarchicalRank": 6, "isLeaf": true},
                        {"cluster": "C", "parentCluster": "", "frequency": 32, "rank": 1, "hierarchicalRank": 1, "isLeaf": false},
                        {"cluster": "A", "parentCluster": "C", "frequency": 15, "rank": 2, "hierarchicalRank": 2, "isLeaf": false}
                    ]}
                ],
                "cellPartIndexes": cells.iter().map(|(a, c, _)| json!([a, c])).collect::<Vec<_>>(),
                "cellFrequencies": cells.iter().map(|(_, _, f)| *f).collect::<Vec<_>>()
            },
            "savedDatas": {
                "nodesNames": {"Age": {"P": "All ages"}},
                "selectedNodes": ["P", "A"],
                "layout": {"split": 0.5}
            }
        })
    }

    const CELLS: [(usize, usize, u64); 7] = [
        (0, 0, 10),
        (2, 2, 7),
        (1, 0, 5),
        (2, 0, 4),
        (0, 1, 3),
        (1, 1, 2),
        (1, 2, 1),
    ];

    fn folder() -> Folder {
        let doc = Document::from_value(report(&CELLS)).unwrap();
        Folder::new(doc, FoldConfig::default())
    }

    fn collapsed(entries: &[(&str, Vec<&str>)]) -> CollapsedNodes {
        entries
            .iter()
            .map(|(dim, names)| (dim.to_string(), names.iter().map(|n| n.to_string()).collect()))
            .collect()
    }

    fn cells(doc: &Document) -> Vec<(Vec<usize>, u64)> {
        let report = &doc.coclustering_report;
        report
            .cell_part_indexes
            .iter()
            .cloned()
            .zip(report.cell_frequencies.iter().copied())
            .collect()
    }

    #[test]
    fn test_no_op_reduce_returns_pristine_report() -> Result<()> {
        let f = folder();
        let out = f.reduce(None)?;
        assert_eq!(&out, f.initial());
        assert_eq!(out.extra.get("tool"), Some(&json!("Khiops Coclustering")));
        let saved = out.saved_datas.as_ref().unwrap();
        assert_eq!(saved.extra.get("layout"), Some(&json!({"split": 0.5})));
        assert!(saved.collapsed_nodes.is_empty());
        Ok(())
    }

    #[test]
    fn test_json_round_trip() -> Result<()> {
        let f = folder();
        let text = f.reduce(None)?.to_json_string()?;
        let back = Document::from_json_str(&text)?;
        assert_eq!(&back, f.initial());
        assert!(text.contains("\"+inf\""));
        assert!(text.contains("\"nullCost\""));
        Ok(())
    }

    #[test]
    fn test_collapse_numerical_root() -> Result<()> {
        let out = folder().reduce(Some(&collapsed(&[("Age", vec!["P"])])))?;
        let report = &out.coclustering_report;

        let age = &report.dimension_hierarchies[0];
        assert_eq!(age.clusters.len(), 1);
        assert_eq!(age.clusters[0].cluster, "P");
        assert!(age.clusters[0].is_leaf);

        match &report.dimension_partitions[0].parts {
            PartitionParts::Intervals(intervals) => {
                assert_eq!(intervals.len(), 1);
                assert_eq!(intervals[0].cluster, "P");
                assert_eq!(intervals[0].bounds, Some((f64::NEG_INFINITY, f64::INFINITY)));
            }
            other => panic!("unexpected parts {other:?}"),
        }

        assert_eq!(
            cells(&out),
            vec![(vec![0, 0], 19), (vec![0, 2], 8), (vec![0, 1], 5)]
        );
        assert_eq!(report.summary.cells, 3);
        assert_eq!(report.summary.extra.get("instances"), Some(&json!(32)));
        assert_eq!(report.dimension_summaries[0].parts, 1);
        assert_eq!(report.dimension_summaries[0].initial_parts, 3);
        assert_eq!(report.dimension_summaries[1].parts, 3);
        assert_eq!(report.total_frequency(), 32);
        Ok(())
    }

    #[test]
    fn test_collapse_categorical_keeps_default_group() -> Result<()> {
        let out = folder().reduce(Some(&collapsed(&[("Color", vec!["A"])])))?;
        let report = &out.coclustering_report;

        match &report.dimension_partitions[1].parts {
            PartitionParts::ValueGroups {
                groups,
                default_group_index,
            } => {
                assert_eq!(groups.len(), 2);
                assert_eq!(groups[0].cluster, "A");
                assert_eq!(groups[0].values, vec!["red", "blue", "pink"]);
                assert_eq!(groups[0].value_frequencies, vec![6, 5, 4]);
                assert_eq!(*default_group_index, Some(1));
                assert_eq!(groups[1].values[0], "x");
            }
            other => panic!("unexpected parts {other:?}"),
        }

        let names: Vec<&str> = report.dimension_hierarchies[1]
            .clusters
            .iter()
            .map(|c| c.cluster.as_str())
            .collect();
        assert_eq!(names, vec!["A", "{x, y, z}", "C"]);

        assert_eq!(
            cells(&out),
            vec![
                (vec![0, 0], 13),
                (vec![2, 1], 7),
                (vec![1, 0], 7),
                (vec![2, 0], 4),
                (vec![1, 1], 1),
            ]
        );
        assert_eq!(report.dimension_summaries[1].parts, 2);
        Ok(())
    }

    #[test]
    fn test_folds_always_start_from_pristine_report() -> Result<()> {
        let f = folder();
        let first = f.reduce(Some(&collapsed(&[("Age", vec!["P"])])))?;
        let second = f.reduce(Some(&collapsed(&[("Color", vec!["A"])])))?;
        assert_eq!(first.coclustering_report.dimension_summaries[1].parts, 3);
        assert_eq!(second.coclustering_report.dimension_summaries[0].parts, 3);
        assert_eq!(
            second.collapsed_nodes(),
            Some(&collapsed(&[("Color", vec!["A"])]))
        );
        Ok(())
    }

    #[test]
    fn test_ancestor_shadows_descendant_collapse() -> Result<()> {
        let f = folder();
        let both = f.reduce(Some(&collapsed(&[("Color", vec!["A", "C"])])))?;
        let root = f.reduce(Some(&collapsed(&[("Color", vec!["C"])])))?;
        assert_eq!(both.coclustering_report, root.coclustering_report);
        assert_eq!(root.coclustering_report.dimension_summaries[1].parts, 1);
        Ok(())
    }

    #[test]
    fn test_current_trees_show_renamed_collapsed_node() -> Result<()> {
        let f = folder();
        let out = f.reduce(Some(&collapsed(&[("Age", vec!["P"])])))?;
        let trees = f.current_trees(&out);
        let p = trees[0].get("P").unwrap();
        assert!(p.is_collapsed);
        assert_eq!(p.short_description, "All ages");
        assert_eq!(p.matrix_index, Some(0));
        Ok(())
    }

    fn nested() -> Value {
        let mut doc = report(&CELLS);
        let hierarchy = json!({"name": "Age", "type": "Numerical", "clusters": [
            {"cluster": "]-inf;30]", "parentCluster": "L", "rank": 4, "hierarchicalRank": 5, "isLeaf": true},
            {"cluster": "]30;60]", "parentCluster": "L", "rank": 5, "hierarchicalRank": 5, "isLeaf": true},
            {"cluster": "]60;+inf[", "parentCluster": "R", "rank": 6, "hierarchicalRank": 5, "isLeaf": true},
            {"cluster": "R", "parentCluster": "", "rank": 1, "hierarchicalRank": 1, "isLeaf": false},
            {"cluster": "L", "parentCluster": "R", "rank": 2, "hierarchicalRank": 2, "isLeaf": false}
        ]});
        doc["coclusteringReport"]["dimensionHierarchies"][0] = hierarchy;
        doc
    }

    #[test]
    fn test_nested_fold_merges_first_two_intervals() -> Result<()> {
        let f = Folder::new(Document::from_value(nested())?, FoldConfig::default());
        let out = f.reduce(Some(&collapsed(&[("Age", vec!["L"])])))?;
        match &out.coclustering_report.dimension_partitions[0].parts {
            PartitionParts::Intervals(intervals) => {
                let bounds: Vec<_> = intervals.iter().map(|i| i.bounds).collect();
                assert_eq!(
                    bounds,
                    vec![Some((f64::NEG_INFINITY, 60.0)), Some((60.0, f64::INFINITY))]
                );
            }
            other => panic!("unexpected parts {other:?}"),
        }
        assert_eq!(out.coclustering_report.total_frequency(), 32);
        Ok(())
    }

    // X (numerical, bounds written with min / max like a real export):
    //   *]-inf;+inf[ -> ]-inf;2] -> ]-inf;1] ]1;2]
    //                -> <parent> -> Missing ]2;+inf[
    fn exported(missing_parent: &str) -> Value {
        json!({
            "coclusteringReport": {
                "summary": {"instances": 106, "cells": 4},
                "dimensionSummaries": [
                    {"name": "X", "type": "Numerical", "parts": 4, "initialParts": 4, "min": 0, "max": 9}
                ],
                "dimensionPartitions": [
                    {"name": "X", "type": "Numerical", "intervals": [
                        {"cluster": "Missing"},
                        {"cluster": "]-inf;1]", "bounds": [0, 1]},
                        {"cluster": "]1;2]", "bounds": [1, 2]},
                        {"cluster": "]2;+inf[", "bounds": [2, 9]}
                    ]}
                ],
                "dimensionHierarchies": [
                    {"name": "X", "type": "Numerical", "clusters": [
                        {"cluster": "Missing", "parentCluster": missing_parent, "frequency": 100, "rank": 6, "hierarchicalRank": 7, "isLeaf": true},
                        {"cluster": "]-inf;1]", "parentCluster": "]-inf;2]", "frequency": 3, "rank": 4, "hierarchicalRank": 7, "isLeaf": true},
                        {"cluster": "]1;2]", "parentCluster": "]-inf;2]", "frequency": 2, "rank": 5, "hierarchicalRank": 7, "isLeaf": true},
                        {"cluster": "]2;+inf[", "parentCluster": missing_parent, "frequency": 1, "rank": 7, "hierarchicalRank": 7, "isLeaf": true},
                        {"cluster": "*]-inf;+inf[", "parentCluster": "", "frequency": 106, "rank": 1, "hierarchicalRank": 1, "isLeaf": false},
                        {"cluster": "]-inf;2]", "parentCluster": "*]-inf;+inf[", "frequency": 5, "rank": 2, "hierarchicalRank": 2, "isLeaf": false},
                        {"cluster": missing_parent, "parentCluster": "*]-inf;+inf[", "frequency": 101, "rank": 3, "hierarchicalRank": 3, "isLeaf": false}
                    ]}
                ],
                "cellPartIndexes": [[0], [1], [2], [3]],
                "cellFrequencies": [100, 3, 2, 1]
            }
        })
    }

    fn fold_exported(missing_parent: &str, names: Vec<&str>) -> Result<Value> {
        let f = Folder::new(Document::from_value(exported(missing_parent))?, FoldConfig::default());
        let out = f.reduce(Some(&collapsed(&[("X", names)])))?;
        assert_eq!(out.coclustering_report.total_frequency(), 106);
        Ok(serde_json::to_value(&out)?["coclusteringReport"].clone())
    }

    fn all_bounds_are_numbers(report: &Value) -> bool {
        report["dimensionPartitions"][0]["intervals"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|interval| interval.get("bounds"))
            .all(|bounds| bounds.as_array().is_some_and(|b| b.iter().all(Value::is_f64)))
    }

    #[test]
    fn test_exported_interval_node_keeps_finite_bounds() -> Result<()> {
        let report = fold_exported("Q", vec!["]-inf;2]"])?;
        assert_eq!(
            report["dimensionPartitions"][0]["intervals"],
            json!([
                {"cluster": "Missing"},
                {"cluster": "]-inf;2]", "bounds": [0.0, 2.0]},
                {"cluster": "]2;+inf[", "bounds": [2.0, 9.0]}
            ])
        );
        assert!(all_bounds_are_numbers(&report));
        assert_eq!(report["cellPartIndexes"], json!([[0], [1], [2]]));
        assert_eq!(report["cellFrequencies"], json!([100, 5, 1]));
        assert_eq!(report["dimensionSummaries"][0]["parts"], json!(3));
        Ok(())
    }

    #[test]
    fn test_exported_fold_over_missing_part() -> Result<()> {
        for parent in ["Q", "*]2;+inf["] {
            let report = fold_exported(parent, vec![parent])?;
            assert_eq!(
                report["dimensionPartitions"][0]["intervals"],
                json!([
                    {"cluster": "]-inf;1]", "bounds": [0.0, 1.0]},
                    {"cluster": "]1;2]", "bounds": [1.0, 2.0]},
                    {"cluster": parent, "bounds": [2.0, 9.0]}
                ])
            );
            assert!(all_bounds_are_numbers(&report));
            assert_eq!(report["cellPartIndexes"], json!([[2], [0], [1]]));
            assert_eq!(report["cellFrequencies"], json!([101, 3, 2]));
        }
        Ok(())
    }

    #[test]
    fn test_exported_root_fold_spans_min_to_max() -> Result<()> {
        let report = fold_exported("Q", vec!["*]-inf;+inf["])?;
        assert_eq!(
            report["dimensionPartitions"][0]["intervals"],
            json!([{"cluster": "*]-inf;+inf[", "bounds": [0.0, 9.0]}])
        );
        assert_eq!(report["cellPartIndexes"], json!([[0]]));
        assert_eq!(report["cellFrequencies"], json!([106]));
        Ok(())
    }

    proptest! {
        #[test]
        fn collapse_order_does_not_matter(
            names in proptest::sample::subsequence(vec!["R", "L", "]30;60]", "nope"], 0..=4)
                .prop_shuffle(),
        ) {
            let f = Folder::new(Document::from_value(nested()).unwrap(), FoldConfig::default());
            let mut sorted = names.clone();
            sorted.sort_unstable();
            let a = f.reduce(Some(&collapsed(&[("Age", names.clone())]))).unwrap();
            let b = f.reduce(Some(&collapsed(&[("Age", sorted)]))).unwrap();
            prop_assert_eq!(a.coclustering_report, b.coclustering_report);
        }

        #[test]
        fn folding_conserves_mass(
            raw in proptest::collection::vec((0usize..3, 0usize..3, 1u64..500), 1..40),
            age in proptest::sample::subsequence(vec!["P"], 0..=1),
            color in proptest::sample::subsequence(vec!["A", "C"], 0..=2),
        ) {
            let doc = Document::from_value(report(&raw)).unwrap();
            let f = Folder::new(doc, FoldConfig::default());
            let out = f
                .reduce(Some(&collapsed(&[("Age", age), ("Color", color)])))
                .unwrap();
            let report = &out.coclustering_report;
            prop_assert_eq!(report.total_frequency(), f.initial().coclustering_report.total_frequency());
            prop_assert_eq!(report.summary.cells, report.cell_frequencies.len());
            for (summary, hierarchy) in report.dimension_summaries.iter().zip(&report.dimension_hierarchies) {
                prop_assert_eq!(summary.parts, hierarchy.leaf_count());
            }
            prop_assert!(report.check_cells().is_ok());
        }
    }
}
