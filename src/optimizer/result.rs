//! Incumbent tracking and search results

use super::budget::BudgetExhaustion;
use crate::data::DataNode;
use crate::graph::{GraphSummary, NodeId, TransformationGraph};
use crate::transformers::TransKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Best node seen so far
///
/// Only a strictly greater score replaces it, so among equal scores the
/// earliest discovered node wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Incumbent {
    pub node: NodeId,
    pub score: f64,
}

impl Incumbent {
    pub fn new(node: NodeId, score: f64) -> Self {
        Self { node, score }
    }

    /// Replace the incumbent if `score` is strictly better; returns whether it did
    pub fn offer(&mut self, node: NodeId, score: f64) -> bool {
        if score > self.score {
            self.node = node;
            self.score = score;
            true
        } else {
            false
        }
    }
}

/// Phase in which a candidate was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchPhase {
    Beam,
    PostProcess,
}

/// A candidate dropped after a recoverable error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateFailure {
    pub phase: SearchPhase,
    /// Node the transformation was applied to
    pub parent: NodeId,
    pub transformer: String,
    pub kind: TransKind,
    pub error: String,
}

/// One incumbent change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncumbentUpdate {
    /// Budgeted evaluations issued when the update happened
    pub evaluation: usize,
    pub phase: SearchPhase,
    pub node: NodeId,
    pub score: f64,
}

/// Diagnostics collected during a search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStats {
    pub started_at: DateTime<Utc>,
    /// Candidates issued in the budgeted phase, failed ones included
    pub evaluations: usize,
    /// Evaluations spent by post-processing (outside the budget)
    pub post_evaluations: usize,
    pub rounds: usize,
    /// Every computed frontier, the initial `[root]` first
    pub frontiers: Vec<Vec<NodeId>>,
    pub trajectory: Vec<IncumbentUpdate>,
    pub failures: Vec<CandidateFailure>,
    pub exhaustion: Option<BudgetExhaustion>,
    pub post_processed: bool,
    pub elapsed_secs: f64,
}

impl SearchStats {
    pub(crate) fn new() -> Self {
        Self {
            started_at: Utc::now(),
            evaluations: 0,
            post_evaluations: 0,
            rounds: 0,
            frontiers: Vec::new(),
            trajectory: Vec::new(),
            failures: Vec::new(),
            exhaustion: None,
            post_processed: false,
            elapsed_secs: 0.0,
        }
    }
}

/// Outcome of [`EvaluationBasedOptimizer::optimize`](super::EvaluationBasedOptimizer::optimize)
#[derive(Debug)]
pub struct SearchResult {
    pub graph: TransformationGraph,
    pub root: NodeId,
    pub root_score: f64,
    pub incumbent: Incumbent,
    pub stats: SearchStats,
}

impl SearchResult {
    /// The best representation found
    pub fn best_node(&self) -> &DataNode {
        &self.graph[self.incumbent.node]
    }

    pub fn best_score(&self) -> f64 {
        self.incumbent.score
    }

    /// Incumbent score minus root score
    pub fn improvement(&self) -> f64 {
        self.incumbent.score - self.root_score
    }

    /// Operator names leading from the root to the incumbent
    pub fn best_path(&self) -> Vec<String> {
        self.graph.path_to(self.incumbent.node)
    }

    pub fn report(&self) -> SearchReport {
        SearchReport {
            root_score: self.root_score,
            incumbent: self.incumbent,
            best_path: self.best_path(),
            best_shape: self.best_node().shape(),
            stats: self.stats.clone(),
            graph: self.graph.summary(),
        }
    }
}

/// Serializable search summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub root_score: f64,
    pub incumbent: Incumbent,
    pub best_path: Vec<String>,
    pub best_shape: (usize, usize),
    pub stats: SearchStats,
    pub graph: GraphSummary,
}
