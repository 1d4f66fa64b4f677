//! One-shot refinement of the search incumbent
//!
//! Runs after the budgeted phase and does not consume its budget:
//!
//! 1. Cross the incumbent's categorical columns by concatenation.
//! 2. Select features with an extra-trees importance selector, starting from
//!    the crossed node (or from the incumbent when crossing was discarded).
//!
//! Both steps are skipped unless the incumbent has more than one categorical
//! column. When they run, they run whatever the incumbent's history holds, and
//! their kinds are not appended to the children's `trans_hist`: the
//! no-repeat rule governs search paths only. Child depth is capped at the
//! search's `max_depth`.

use super::result::{CandidateFailure, Incumbent, IncumbentUpdate, SearchPhase, SearchStats};
use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::graph::{NodeId, TransformationGraph};
use crate::transformers::{ExtraTreeBasedSelector, PolynomialTransformation, Transformer};
use tracing::{debug, info, warn};

/// Number of trees used by the selection step
const SELECTOR_ESTIMATORS: usize = 50;

#[derive(Debug, Clone)]
pub struct PostProcessor {
    crossing: PolynomialTransformation,
    selector: ExtraTreeBasedSelector,
    max_depth: usize,
}

impl PostProcessor {
    pub fn new(seed: u64) -> Self {
        Self {
            crossing: PolynomialTransformation::categorical(),
            selector: ExtraTreeBasedSelector::new(SELECTOR_ESTIMATORS, seed),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Deepest depth a refinement node may take
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    /// Refine `incumbent` in place; returns whether the refinement ran.
    ///
    /// Recoverable errors discard the step and are recorded in `stats`.
    pub fn refine<E: Evaluator + ?Sized>(
        &self,
        graph: &mut TransformationGraph,
        incumbent: &mut Incumbent,
        evaluator: &E,
        stats: &mut SearchStats,
    ) -> Result<bool> {
        let start = incumbent.node;
        let cat_num = graph[start].cat_num();
        if cat_num <= 1 {
            debug!(node = %start, cat_num, "Skipping post-processing");
            return Ok(false);
        }
        stats.post_processed = true;
        info!(node = %start, cat_num, "Post-processing incumbent");

        let crossed = self.step(graph, start, &self.crossing, incumbent, evaluator, stats)?;
        let base = crossed.unwrap_or(start);
        self.step(graph, base, &self.selector, incumbent, evaluator, stats)?;
        Ok(true)
    }

    /// Apply one refinement operator to `parent`; `None` when discarded
    fn step<E: Evaluator + ?Sized>(
        &self,
        graph: &mut TransformationGraph,
        parent: NodeId,
        transformer: &dyn Transformer,
        incumbent: &mut Incumbent,
        evaluator: &E,
        stats: &mut SearchStats,
    ) -> Result<Option<NodeId>> {
        let kind = transformer.kind();
        let outcome = transformer.operate(&graph[parent]).and_then(|mut child| {
            child.depth = (graph[parent].depth + 1).min(self.max_depth);
            stats.post_evaluations += 1;
            let score = evaluator.evaluate(&child)?;
            child.score = Some(score);
            Ok((child, score))
        });

        match outcome {
            Ok((child, score)) => {
                let (before, after) = (graph[parent].shape(), child.shape());
                let child_id = graph.add_node(child);
                graph.add_trans_in_graph(parent, child_id, transformer)?;
                info!(
                    transformer = transformer.name(),
                    before = ?before,
                    after = ?after,
                    score,
                    "Refinement step scored"
                );

                if incumbent.offer(child_id, score) {
                    stats.trajectory.push(IncumbentUpdate {
                        evaluation: stats.evaluations,
                        phase: SearchPhase::PostProcess,
                        node: child_id,
                        score,
                    });
                }
                Ok(Some(child_id))
            }
            Err(e) if e.is_recoverable() => {
                warn!(transformer = transformer.name(), error = %e, "Refinement step discarded");
                stats.failures.push(CandidateFailure {
                    phase: SearchPhase::PostProcess,
                    parent,
                    transformer: transformer.name().to_string(),
                    kind,
                    error: e.to_string(),
                });
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::mixed_node;
    use crate::data::{DataNode, FeatureType, TaskType};
    use crate::error::KolosalError;
    use crate::transformers::TransKind;
    use ndarray::{Array1, Array2};

    fn setup(node: DataNode, score: f64) -> (TransformationGraph, Incumbent) {
        let mut node = node;
        node.score = Some(score);
        let mut graph = TransformationGraph::new();
        let id = graph.add_node(node);
        (graph, Incumbent::new(id, score))
    }

    #[test]
    fn test_skipped_with_one_categorical() {
        let mut node = mixed_node();
        node.feature_types[3] = FeatureType::Numerical;
        let (mut graph, mut incumbent) = setup(node, 0.5);
        let mut stats = SearchStats::new();
        let eval = |_: &DataNode| -> Result<f64> { Ok(1.0) };

        let ran = PostProcessor::new(1)
            .refine(&mut graph, &mut incumbent, &eval, &mut stats)
            .unwrap();
        assert!(!ran);
        assert_eq!(graph.len(), 1);
        assert_eq!(stats.post_evaluations, 0);
        assert_eq!(incumbent.node, NodeId(0));
    }

    #[test]
    fn test_crossing_registers_node() {
        let (mut graph, mut incumbent) = setup(mixed_node(), 0.5);
        let mut stats = SearchStats::new();
        // The crossed node is the only one wider than the input
        let eval = |node: &DataNode| -> Result<f64> {
            if node.features.ncols() > 4 {
                Ok(0.9)
            } else {
                Ok(0.1)
            }
        };

        let ran = PostProcessor::new(1)
            .refine(&mut graph, &mut incumbent, &eval, &mut stats)
            .unwrap();
        assert!(ran);
        assert!(stats.post_processed);
        let crossed = graph.children(NodeId(0));
        assert_eq!(crossed.len(), 1);
        assert_eq!(
            graph.producing_edge(crossed[0]).unwrap().kind,
            TransKind::CategoricalCross
        );
        assert_eq!(graph[crossed[0]].depth, 2);
        assert!(graph[crossed[0]].trans_hist.is_empty());
        assert!(incumbent.score >= 0.9);
    }

    #[test]
    fn test_crossing_runs_on_already_crossed_incumbent() {
        let mut node = mixed_node();
        node.trans_hist.push(TransKind::CategoricalCross);
        let (mut graph, mut incumbent) = setup(node, 0.5);
        let mut stats = SearchStats::new();
        let eval = |_: &DataNode| -> Result<f64> { Ok(0.1) };

        let ran = PostProcessor::new(1)
            .refine(&mut graph, &mut incumbent, &eval, &mut stats)
            .unwrap();
        assert!(ran);
        let crossed: Vec<NodeId> = graph
            .children(NodeId(0))
            .into_iter()
            .filter(|&id| graph.producing_edge(id).unwrap().kind == TransKind::CategoricalCross)
            .collect();
        assert_eq!(crossed.len(), 1);
        assert_eq!(graph[crossed[0]].trans_hist, vec![TransKind::CategoricalCross]);
        assert!(stats.post_evaluations >= 1);
    }

    #[test]
    fn test_depth_capped_at_max_depth() {
        let mut node = mixed_node();
        node.depth = 3;
        let (mut graph, mut incumbent) = setup(node, 0.5);
        let mut stats = SearchStats::new();
        let eval = |_: &DataNode| -> Result<f64> { Ok(0.1) };

        PostProcessor::new(1)
            .with_max_depth(3)
            .refine(&mut graph, &mut incumbent, &eval, &mut stats)
            .unwrap();
        assert!(graph.len() > 1);
        for i in 0..graph.len() {
            assert!(graph[NodeId(i)].depth <= 3);
        }
    }

    #[test]
    fn test_failed_crossing_falls_back_to_incumbent() {
        let n = 20;
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => i as f64,
            1 => (i % 2) as f64,
            _ => (i % 3) as f64,
        });
        let y = Array1::from_shape_fn(n, |i| (i % 2) as f64);
        let node = DataNode::new(
            x,
            y,
            vec![
                FeatureType::Numerical,
                FeatureType::Categorical,
                FeatureType::Categorical,
            ],
            TaskType::Classification,
        )
        .unwrap();
        let (mut graph, mut incumbent) = setup(node, 0.5);
        let mut stats = SearchStats::new();
        // Crossing widens the node to four columns; scoring it fails
        let eval = |node: &DataNode| -> Result<f64> {
            if node.features.ncols() > 3 {
                Err(KolosalError::ValueError("cannot score crossed node".to_string()))
            } else {
                Ok(0.1)
            }
        };

        let ran = PostProcessor::new(1)
            .refine(&mut graph, &mut incumbent, &eval, &mut stats)
            .unwrap();
        assert!(ran);
        assert!(graph
            .edges()
            .iter()
            .all(|e| e.kind != TransKind::CategoricalCross));

        assert_eq!(stats.failures.len(), 1);
        let failure = &stats.failures[0];
        assert_eq!(failure.phase, SearchPhase::PostProcess);
        assert_eq!(failure.kind, TransKind::CategoricalCross);
        assert_eq!(failure.parent, NodeId(0));

        let children = graph.children(NodeId(0));
        assert_eq!(children.len(), 1);
        assert_eq!(
            graph.producing_edge(children[0]).unwrap().kind,
            TransKind::TreeSelection
        );
        assert_eq!(stats.post_evaluations, 2);
        assert_eq!(incumbent.node, NodeId(0));
        assert_eq!(incumbent.score, 0.5);
    }
}
