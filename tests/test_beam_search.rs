//! Integration test: beam search driver (incumbent, budget, frontier, failures)

use kolosal_autofe::catalog::TransformationCatalog;
use kolosal_autofe::config::SearchConfig;
use kolosal_autofe::data::{DataNode, FeatureType, TaskType};
use kolosal_autofe::graph::NodeId;
use kolosal_autofe::optimizer::{
    BudgetExhaustion, EvaluationBasedOptimizer, ManualClock, SearchPhase, SearchResult,
};
use kolosal_autofe::transformers::{TransKind, Transformer};
use kolosal_autofe::{KolosalError, Result};
use ndarray::{Array1, Array2};
use std::cell::Cell;
use std::collections::HashSet;
use std::time::Duration;

/// Copies its input, or fails with a recoverable error when `fails` is set
struct StubTransformer {
    kind: TransKind,
    name: String,
    fails: bool,
}

impl Transformer for StubTransformer {
    fn kind(&self) -> TransKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn operate(&self, node: &DataNode) -> Result<DataNode> {
        if self.fails {
            return Err(KolosalError::ValueError(format!("{} cannot apply", self.name)));
        }
        node.derive(
            node.features.clone(),
            node.feature_types.clone(),
            node.feature_names.clone(),
        )
    }
}

/// Offers a fixed list of kinds, in list order
struct StubCatalog {
    kinds: Vec<TransKind>,
    failing: Vec<TransKind>,
}

impl StubCatalog {
    fn new(kinds: &[TransKind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
            failing: Vec::new(),
        }
    }

    fn with_failing(mut self, kind: TransKind) -> Self {
        self.failing.push(kind);
        self
    }
}

impl TransformationCatalog for StubCatalog {
    fn get_transformations(
        &self,
        _node: &DataNode,
        trans_kinds: &[TransKind],
    ) -> Result<Vec<Box<dyn Transformer>>> {
        Ok(self
            .kinds
            .iter()
            .filter(|k| trans_kinds.contains(k))
            .map(|&kind| {
                Box::new(StubTransformer {
                    kind,
                    name: kind.as_str().to_string(),
                    fails: self.failing.contains(&kind),
                }) as Box<dyn Transformer>
            })
            .collect())
    }
}

struct BrokenCatalog;

impl TransformationCatalog for BrokenCatalog {
    fn get_transformations(
        &self,
        _node: &DataNode,
        _trans_kinds: &[TransKind],
    ) -> Result<Vec<Box<dyn Transformer>>> {
        Err(KolosalError::CatalogError("operator registry is empty".to_string()))
    }
}

/// Small all-numerical dataset so the post-processor stays out of the way
fn numeric_root() -> DataNode {
    let n = 12;
    let x = Array2::from_shape_fn((n, 3), |(i, j)| (i * (j + 1)) as f64);
    let y = Array1::from_shape_fn(n, |i| (i % 2) as f64);
    DataNode::new(x, y, vec![FeatureType::Numerical; 3], TaskType::Classification).unwrap()
}

fn run<E>(catalog: StubCatalog, config: SearchConfig, eval: &E) -> SearchResult
where
    E: Fn(&DataNode) -> Result<f64>,
{
    EvaluationBasedOptimizer::new(config)
        .with_catalog(Box::new(catalog))
        .optimize(numeric_root(), eval)
        .unwrap()
}

const KINDS: [TransKind; 5] = [
    TransKind::Scaler,
    TransKind::Normalizer,
    TransKind::Discretizer,
    TransKind::LogTransform,
    TransKind::ArithmeticCross,
];

/// Deterministic score that rewards some histories over others
fn history_score(node: &DataNode) -> f64 {
    let mut score = 0.5;
    for (pos, kind) in node.trans_hist.iter().enumerate() {
        score += ((kind.id() as usize * 7 + pos * 3) % 11) as f64 / 100.0 - 0.04;
    }
    score
}

#[test]
fn test_single_improvement_becomes_incumbent() {
    let eval = |node: &DataNode| -> Result<f64> {
        Ok(if node.trans_hist.is_empty() { 0.70 } else { 0.75 })
    };
    let config = SearchConfig::default().with_max_evaluations(3);
    let result = run(StubCatalog::new(&[TransKind::Scaler]), config, &eval);

    assert_eq!(result.root_score, 0.70);
    assert_eq!(result.best_score(), 0.75);
    assert_eq!(result.incumbent.node, NodeId(1));
    assert_eq!(result.best_node().trans_hist, vec![TransKind::Scaler]);
    assert_eq!(result.best_path(), vec!["scaler".to_string()]);
}

#[test]
fn test_failing_operator_is_discarded() {
    let eval = |node: &DataNode| -> Result<f64> {
        Ok(if node.trans_hist.is_empty() { 0.6 } else { 0.4 })
    };
    let catalog = StubCatalog::new(&[TransKind::Scaler, TransKind::Normalizer])
        .with_failing(TransKind::Scaler);
    let config = SearchConfig::default().with_max_evaluations(2);
    let result = run(catalog, config, &eval);

    assert_eq!(result.graph.len(), 2);
    assert!(result
        .graph
        .edges()
        .iter()
        .all(|e| e.kind == TransKind::Normalizer));
    assert_eq!(result.incumbent.node, result.root);
    assert_eq!(result.stats.evaluations, 2);
    assert_eq!(result.stats.failures.len(), 1);
    assert_eq!(result.stats.failures[0].kind, TransKind::Scaler);
    assert_eq!(result.stats.failures[0].phase, SearchPhase::Beam);
}

#[test]
fn test_recoverable_evaluator_error_is_discarded() {
    let eval = |node: &DataNode| -> Result<f64> {
        if node.has_applied(TransKind::Scaler) {
            Err(KolosalError::ComputationError("model diverged".to_string()))
        } else {
            Ok(0.5 + 0.1 * node.trans_hist.len() as f64)
        }
    };
    let config = SearchConfig::default().with_max_evaluations(2);
    let result = run(
        StubCatalog::new(&[TransKind::Scaler, TransKind::Normalizer]),
        config,
        &eval,
    );

    assert_eq!(result.graph.len(), 2);
    assert_eq!(result.best_node().trans_hist, vec![TransKind::Normalizer]);
    assert!((result.best_score() - 0.6).abs() < 1e-12);
}

#[test]
fn test_single_evaluation_budget() {
    let calls = Cell::new(0usize);
    let eval = |node: &DataNode| -> Result<f64> {
        calls.set(calls.get() + 1);
        Ok(if node.trans_hist.is_empty() { 0.3 } else { 0.9 })
    };
    let config = SearchConfig::default().with_max_evaluations(1);
    let result = run(StubCatalog::new(&KINDS), config, &eval);

    // root scoring plus exactly one candidate
    assert_eq!(calls.get(), 2);
    assert_eq!(result.stats.evaluations, 1);
    assert_eq!(result.graph.len(), 2);
    assert_eq!(result.best_score(), 0.9);
    assert_eq!(
        result.stats.exhaustion,
        Some(BudgetExhaustion::Evaluations { limit: 1 })
    );
}

#[test]
fn test_equal_scores_keep_first_found() {
    let eval = |node: &DataNode| -> Result<f64> {
        Ok(if node.trans_hist.is_empty() { 0.5 } else { 0.80 })
    };
    let config = SearchConfig::default().with_max_evaluations(2);
    let result = run(
        StubCatalog::new(&[TransKind::Scaler, TransKind::Normalizer]),
        config,
        &eval,
    );

    let first = NodeId(1);
    let second = NodeId(2);
    assert_eq!(result.graph[first].trans_hist, vec![TransKind::Scaler]);
    assert_eq!(result.graph[second].trans_hist, vec![TransKind::Normalizer]);
    assert_eq!(result.incumbent.node, first);
    assert_eq!(result.stats.trajectory.len(), 2);
    assert_eq!(result.graph.sort_nodes_by_score(&[first, second]), vec![first, second]);
}

#[test]
fn test_incumbent_trajectory_is_monotonic() {
    let eval = |node: &DataNode| -> Result<f64> { Ok(history_score(node)) };
    let config = SearchConfig::default().with_max_evaluations(80);
    let result = run(StubCatalog::new(&KINDS), config, &eval);

    let scores: Vec<f64> = result.stats.trajectory.iter().map(|u| u.score).collect();
    assert!(scores.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(scores.last().copied(), Some(result.best_score()));

    let best_in_graph = result
        .graph
        .node_ids()
        .filter_map(|id| result.graph[id].score)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(best_in_graph, result.best_score());
}

#[test]
fn test_depth_bound_and_unique_history() {
    let eval = |node: &DataNode| -> Result<f64> { Ok(history_score(node)) };
    let config = SearchConfig::default()
        .with_max_depth(3)
        .with_max_evaluations(200);
    let result = run(StubCatalog::new(&KINDS), config, &eval);

    for id in result.graph.node_ids() {
        let node = &result.graph[id];
        assert!(node.depth <= 3, "{} has depth {}", id, node.depth);

        let unique: HashSet<TransKind> = node.trans_hist.iter().copied().collect();
        assert_eq!(unique.len(), node.trans_hist.len());

        if let Some(edge) = result.graph.producing_edge(id) {
            let parent = &result.graph[edge.parent];
            assert_eq!(node.depth, parent.depth + 1);
            assert_eq!(node.trans_hist[..parent.trans_hist.len()], parent.trans_hist[..]);
            assert_eq!(node.trans_hist.last(), Some(&edge.kind));
        }
    }
}

#[test]
fn test_root_in_every_frontier() {
    let eval = |node: &DataNode| -> Result<f64> { Ok(history_score(node)) };
    let config = SearchConfig::default().with_max_evaluations(40);
    let result = run(StubCatalog::new(&KINDS), config, &eval);

    assert!(result.stats.frontiers.len() > 2);
    for frontier in &result.stats.frontiers {
        assert!(frontier.contains(&result.root));
        assert!(frontier.len() <= 3 + 1);
    }
    assert_eq!(result.stats.frontiers[0], vec![result.root]);
}

#[test]
fn test_evaluations_never_exceed_limit() {
    for limit in [1usize, 4, 7, 23] {
        let calls = Cell::new(0usize);
        let eval = |node: &DataNode| -> Result<f64> {
            calls.set(calls.get() + 1);
            Ok(history_score(node))
        };
        let config = SearchConfig::default().with_max_evaluations(limit);
        let result = run(StubCatalog::new(&KINDS), config, &eval);

        assert_eq!(calls.get() - 1, limit);
        assert_eq!(result.stats.evaluations, limit);
    }
}

#[test]
fn test_failures_count_against_budget() {
    let calls = Cell::new(0usize);
    let eval = |_: &DataNode| -> Result<f64> {
        calls.set(calls.get() + 1);
        Ok(0.5)
    };
    let catalog = StubCatalog::new(&[TransKind::Scaler, TransKind::Normalizer])
        .with_failing(TransKind::Scaler);
    let config = SearchConfig::default().with_max_evaluations(1);
    let result = run(catalog, config, &eval);

    // the failing operator used the only evaluation slot
    assert_eq!(calls.get(), 1);
    assert_eq!(result.graph.len(), 1);
    assert_eq!(result.incumbent.node, result.root);
}

#[test]
fn test_no_candidates_terminates() {
    let eval = |_: &DataNode| -> Result<f64> { Ok(0.5) };
    let catalog = StubCatalog::new(&[TransKind::Scaler]).with_failing(TransKind::Scaler);
    let result = run(catalog, SearchConfig::default(), &eval);

    assert_eq!(result.graph.len(), 1);
    assert_eq!(result.stats.rounds, 1);
    assert!(result.stats.exhaustion.is_none());
    assert_eq!(result.incumbent.node, result.root);
}

#[test]
fn test_time_budget_with_manual_clock() {
    let clock = ManualClock::new();
    let ticking = clock.clone();
    let eval = move |node: &DataNode| -> Result<f64> {
        ticking.advance(Duration::from_secs(1));
        Ok(history_score(node))
    };
    let config = SearchConfig::default().with_time_budget(3.5);
    let result = EvaluationBasedOptimizer::new(config)
        .with_catalog(Box::new(StubCatalog::new(&KINDS)))
        .with_clock(Box::new(clock.clone()))
        .optimize(numeric_root(), &eval)
        .unwrap();

    // root at t=1, candidates at t=2, 3, 4
    assert_eq!(result.stats.evaluations, 3);
    assert!(matches!(
        result.stats.exhaustion,
        Some(BudgetExhaustion::Time { .. })
    ));
    assert_eq!(result.stats.elapsed_secs, 4.0);
}

#[test]
fn test_catalog_error_is_fatal() {
    let eval = |_: &DataNode| -> Result<f64> { Ok(0.5) };
    let err = EvaluationBasedOptimizer::new(SearchConfig::default())
        .with_catalog(Box::new(BrokenCatalog))
        .optimize(numeric_root(), &eval)
        .unwrap_err();
    assert!(matches!(err, KolosalError::CatalogError(_)));
}

#[test]
fn test_unrecoverable_evaluator_error_is_fatal() {
    let eval = |node: &DataNode| -> Result<f64> {
        if node.trans_hist.is_empty() {
            Ok(0.5)
        } else {
            Err(KolosalError::DataError("evaluation backend lost".to_string()))
        }
    };
    let err = EvaluationBasedOptimizer::new(SearchConfig::default())
        .with_catalog(Box::new(StubCatalog::new(&KINDS)))
        .optimize(numeric_root(), &eval)
        .unwrap_err();
    assert!(matches!(err, KolosalError::DataError(_)));
}

#[test]
fn test_rebalance_only_below_root() {
    let eval = |node: &DataNode| -> Result<f64> { Ok(history_score(node)) };
    let config = SearchConfig::default().with_max_evaluations(60);
    let result = run(
        StubCatalog::new(&[TransKind::Scaler, TransKind::Rebalance, TransKind::Normalizer]),
        config,
        &eval,
    );

    for edge in result.graph.edges() {
        if edge.kind == TransKind::Rebalance {
            assert_eq!(edge.parent, result.root);
        }
    }
}
