//! Evaluation-based beam search over the transformation graph

use super::budget::{Clock, SearchBudget, SystemClock};
use super::postprocess::PostProcessor;
use super::result::{
    CandidateFailure, Incumbent, IncumbentUpdate, SearchPhase, SearchResult, SearchStats,
};
use crate::catalog::{allowed_kinds, TransformationCatalog, TransformerManager};
use crate::config::SearchConfig;
use crate::data::DataNode;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::graph::{NodeId, TransformationGraph};
use crate::transformers::Transformer;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Beam search driver
///
/// Each round expands every frontier node with every applicable operator whose
/// kind is not yet in the node's history, scores the candidates, and keeps the
/// best `beam_width` of them plus the root as the next frontier.
///
/// A round in which no candidate survives ends the search with an empty
/// frontier, root included: operators and evaluators are deterministic per
/// node, so re-expanding the root would only repeat the same failures.
pub struct EvaluationBasedOptimizer {
    config: SearchConfig,
    catalog: Box<dyn TransformationCatalog>,
    clock: Option<Box<dyn Clock>>,
}

impl EvaluationBasedOptimizer {
    pub fn new(config: SearchConfig) -> Self {
        let catalog = Box::new(TransformerManager::new(config.seed));
        Self {
            config,
            catalog,
            clock: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Box<dyn TransformationCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Use `clock` for the time budget instead of the wall clock
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run the search from `root`.
    ///
    /// Candidate failures with a recoverable error are dropped and recorded.
    /// Catalog errors, fatal evaluator errors and any failure to score the
    /// root abort the run.
    pub fn optimize<E: Evaluator + ?Sized>(&self, mut root: DataNode, evaluator: &E) -> Result<SearchResult> {
        self.config.validate()?;

        let system_clock = SystemClock::start();
        let clock: &dyn Clock = match &self.clock {
            Some(clock) => clock.as_ref(),
            None => &system_clock,
        };
        let time_budget = self.config.time_budget_secs.map(Duration::from_secs_f64);
        let mut budget = SearchBudget::new(self.config.evaluation_limit(), time_budget, clock);
        let mut stats = SearchStats::new();
        let mut graph = TransformationGraph::new();

        root.depth = 1;
        let root_score = evaluator.evaluate(&root)?;
        root.score = Some(root_score);
        let (n_rows, n_cols) = root.shape();
        let root_id = graph.add_node(root);

        info!(
            rows = n_rows,
            cols = n_cols,
            score = root_score,
            max_depth = self.config.max_depth,
            beam_width = self.config.beam_width,
            "Starting beam search"
        );

        let mut incumbent = Incumbent::new(root_id, root_score);
        stats.trajectory.push(IncumbentUpdate {
            evaluation: 0,
            phase: SearchPhase::Beam,
            node: root_id,
            score: root_score,
        });

        let mut frontier = vec![root_id];
        stats.frontiers.push(frontier.clone());

        while !frontier.is_empty() && !budget.is_exhausted() {
            stats.rounds += 1;
            let mut candidates: Vec<NodeId> = Vec::new();

            for &node_id in &frontier {
                if budget.is_exhausted() {
                    break;
                }
                let depth = graph[node_id].depth;
                if depth >= self.config.max_depth {
                    continue;
                }

                let transformers = self
                    .catalog
                    .get_transformations(&graph[node_id], &allowed_kinds(depth))?;
                debug!(node = %node_id, depth, operators = transformers.len(), "Expanding node");

                for transformer in &transformers {
                    if graph[node_id].has_applied(transformer.kind()) {
                        continue;
                    }

                    match self.expand(&graph[node_id], transformer.as_ref(), evaluator) {
                        Ok((child, score)) => {
                            let child_id = graph.add_node(child);
                            graph.add_trans_in_graph(node_id, child_id, transformer.as_ref())?;
                            candidates.push(child_id);
                            debug!(
                                node = %child_id,
                                parent = %node_id,
                                transformer = transformer.name(),
                                score,
                                "Candidate scored"
                            );

                            if incumbent.offer(child_id, score) {
                                stats.trajectory.push(IncumbentUpdate {
                                    evaluation: budget.evaluations() + 1,
                                    phase: SearchPhase::Beam,
                                    node: child_id,
                                    score,
                                });
                            }
                        }
                        Err(e) if e.is_recoverable() => {
                            warn!(
                                parent = %node_id,
                                transformer = transformer.name(),
                                error = %e,
                                "Candidate discarded"
                            );
                            stats.failures.push(CandidateFailure {
                                phase: SearchPhase::Beam,
                                parent: node_id,
                                transformer: transformer.name().to_string(),
                                kind: transformer.kind(),
                                error: e.to_string(),
                            });
                        }
                        Err(e) => return Err(e),
                    }

                    if budget.record_evaluation() {
                        info!(
                            evaluations = budget.evaluations(),
                            elapsed_secs = budget.elapsed().as_secs_f64(),
                            "Budget runs out"
                        );
                        break;
                    }
                }
            }

            // A round with no surviving candidate would only re-expand the root
            // into the same failures.
            frontier = if candidates.is_empty() {
                Vec::new()
            } else {
                let mut next: Vec<NodeId> = graph
                    .sort_nodes_by_score(&candidates)
                    .into_iter()
                    .take(self.config.beam_width)
                    .collect();
                next.push(root_id);
                next
            };
            if !frontier.is_empty() {
                stats.frontiers.push(frontier.clone());
            }

            info!(
                round = stats.rounds,
                candidates = candidates.len(),
                incumbent = incumbent.score,
                improvement = incumbent.score - root_score,
                "Round finished"
            );
        }

        stats.evaluations = budget.evaluations();
        stats.exhaustion = budget.exhaustion();

        if self.config.enable_post_process {
            PostProcessor::new(self.config.seed)
                .with_max_depth(self.config.max_depth)
                .refine(&mut graph, &mut incumbent, evaluator, &mut stats)?;
        }
        stats.elapsed_secs = clock.elapsed().as_secs_f64();

        info!(
            score = incumbent.score,
            improvement = incumbent.score - root_score,
            nodes = graph.len(),
            evaluations = stats.evaluations,
            failures = stats.failures.len(),
            "Search finished"
        );

        Ok(SearchResult {
            graph,
            root: root_id,
            root_score,
            incumbent,
            stats,
        })
    }

    /// Apply one operator to `parent` and score the result
    fn expand<E: Evaluator + ?Sized>(
        &self,
        parent: &DataNode,
        transformer: &dyn Transformer,
        evaluator: &E,
    ) -> Result<(DataNode, f64)> {
        let mut child = transformer.operate(parent)?;
        child.depth = parent.depth + 1;
        child.trans_hist = parent.trans_hist.clone();
        child.trans_hist.push(transformer.kind());

        let score = evaluator.evaluate(&child)?;
        child.score = Some(score);
        Ok((child, score))
    }
}

/// Run a search with the default catalog and the wall clock
pub fn search<E: Evaluator + ?Sized>(
    root: DataNode,
    evaluator: &E,
    config: SearchConfig,
) -> Result<SearchResult> {
    EvaluationBasedOptimizer::new(config).optimize(root, evaluator)
}
