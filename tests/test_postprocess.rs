//! Integration test: post-processing of the search incumbent

use kolosal_autofe::config::SearchConfig;
use kolosal_autofe::data::{DataNode, FeatureType, TaskType};
use kolosal_autofe::graph::NodeId;
use kolosal_autofe::optimizer::{search, SearchPhase};
use kolosal_autofe::transformers::TransKind;
use kolosal_autofe::Result;
use ndarray::{Array1, Array2};

fn categorical_dataset(n_categorical: usize) -> DataNode {
    let n = 30;
    let cols = 1 + n_categorical;
    let x = Array2::from_shape_fn((n, cols), |(i, j)| match j {
        0 => i as f64 * 0.5,
        1 => (i % 3) as f64,
        2 => (i % 2) as f64,
        _ => ((i / 5) % 4) as f64,
    });
    let y = Array1::from_shape_fn(n, |i| ((i % 3 == 0) as usize) as f64);
    let mut types = vec![FeatureType::Numerical];
    types.extend(std::iter::repeat(FeatureType::Categorical).take(n_categorical));
    DataNode::new(x, y, types, TaskType::Classification).unwrap()
}

/// Wider representations score lower
fn narrow_is_better(node: &DataNode) -> Result<f64> {
    Ok(1.0 - 0.01 * node.features.ncols() as f64)
}

#[test]
fn test_crossing_runs_with_three_categoricals() {
    let config = SearchConfig::default().with_max_evaluations(1);
    let result = search(categorical_dataset(3), &narrow_is_better, config).unwrap();

    let beam_incumbent = result
        .stats
        .trajectory
        .iter()
        .filter(|u| u.phase == SearchPhase::Beam)
        .last()
        .map(|u| u.node)
        .unwrap();

    let cross_edge = result
        .graph
        .edges()
        .iter()
        .find(|e| e.kind == TransKind::CategoricalCross)
        .expect("crossing node registered");
    assert_eq!(cross_edge.parent, beam_incumbent);
    assert_eq!(cross_edge.name, "categorical_cross");

    // 4 original columns plus 3 pairwise crosses
    let crossed = &result.graph[cross_edge.child];
    assert_eq!(crossed.shape(), (30, 7));
    assert_eq!(crossed.cat_num(), 6);
    assert!(crossed.score.unwrap() < result.graph[beam_incumbent].score.unwrap());

    assert!(result.stats.post_processed);
    assert!(result.stats.post_evaluations >= 1);
    // budgeted counter is untouched by post-processing
    assert_eq!(result.stats.evaluations, 1);
}

#[test]
fn test_skipped_with_single_categorical() {
    let config = SearchConfig::default().with_max_evaluations(5);
    let result = search(categorical_dataset(1), &narrow_is_better, config).unwrap();

    assert!(!result.stats.post_processed);
    assert_eq!(result.stats.post_evaluations, 0);
    assert!(result
        .stats
        .trajectory
        .iter()
        .all(|u| u.phase == SearchPhase::Beam));
    assert_eq!(result.incumbent.node, result.root);
    assert_eq!(result.graph.len(), 1 + 5);
}

#[test]
fn test_disabled_post_process() {
    let config = SearchConfig::default()
        .with_max_evaluations(1)
        .with_post_process(false);
    let result = search(categorical_dataset(3), &narrow_is_better, config).unwrap();

    assert!(!result.stats.post_processed);
    assert_eq!(result.graph.len(), 2);
}

#[test]
fn test_selection_follows_crossing() {
    let config = SearchConfig::default().with_max_evaluations(1);
    let result = search(categorical_dataset(3), &narrow_is_better, config).unwrap();

    let cross_child = result
        .graph
        .edges()
        .iter()
        .find(|e| e.kind == TransKind::CategoricalCross)
        .map(|e| e.child)
        .unwrap();

    let selected = result.graph.children(cross_child);
    let failed_selection = result
        .stats
        .failures
        .iter()
        .any(|f| f.phase == SearchPhase::PostProcess && f.kind == TransKind::TreeSelection);
    assert!(selected.len() == 1 || failed_selection);

    for child in selected {
        let edge = result.graph.producing_edge(child).unwrap();
        assert_eq!(edge.kind, TransKind::TreeSelection);
        assert!(result.graph[child].features.ncols() <= 7);
    }
}

#[test]
fn test_crossing_reruns_on_crossed_incumbent() {
    let crossed_is_better = |node: &DataNode| -> Result<f64> {
        if node.has_applied(TransKind::CategoricalCross) {
            Ok(0.9)
        } else {
            Ok(0.5)
        }
    };
    let config = SearchConfig::default().with_max_evaluations(10);
    let result = search(categorical_dataset(3), &crossed_is_better, config).unwrap();

    let beam_incumbent = result
        .stats
        .trajectory
        .iter()
        .filter(|u| u.phase == SearchPhase::Beam)
        .last()
        .map(|u| u.node)
        .unwrap();
    assert!(result.graph[beam_incumbent].has_applied(TransKind::CategoricalCross));

    assert!(result.stats.post_processed);
    assert!(result
        .graph
        .edges()
        .iter()
        .any(|e| e.kind == TransKind::CategoricalCross && e.parent == beam_incumbent));

    for i in 0..result.graph.len() {
        let hist = &result.graph[NodeId(i)].trans_hist;
        let mut kinds = hist.clone();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), hist.len(), "repeated kind in {:?}", hist);
    }
}

#[test]
fn test_refinement_respects_max_depth() {
    let config = SearchConfig::default()
        .with_max_depth(1)
        .with_max_evaluations(10);
    let result = search(categorical_dataset(3), &narrow_is_better, config).unwrap();

    // The root cannot be expanded, so every other node comes from refinement
    assert_eq!(result.stats.evaluations, 0);
    assert!(result.stats.post_processed);
    assert!(result.graph.len() > 1);
    for i in 0..result.graph.len() {
        assert!(result.graph[NodeId(i)].depth <= 1);
    }
    assert!(result
        .graph
        .edges()
        .iter()
        .any(|e| e.kind == TransKind::CategoricalCross && e.parent == result.root));
}
