//! Transformation graph
//!
//! Append-only arena of representation nodes joined by transformation edges.
//! A node's identity is its insertion index, which also serves as the
//! discovery order used to break score ties.

use crate::data::DataNode;
use crate::error::{KolosalError, Result};
use crate::transformers::{TransKind, Transformer};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

/// Arena index of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Edge from a parent representation to the node it produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransEdge {
    pub parent: NodeId,
    pub child: NodeId,
    pub kind: TransKind,
    /// Operator display name
    pub name: String,
}

/// Serializable view of a node for reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub depth: usize,
    pub score: Option<f64>,
    pub shape: (usize, usize),
    pub cat_num: usize,
    pub trans_hist: Vec<TransKind>,
}

/// Serializable view of the whole graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSummary {
    pub nodes: Vec<NodeSummary>,
    pub edges: Vec<TransEdge>,
}

/// Append-only DAG of representations
#[derive(Debug, Default)]
pub struct TransformationGraph {
    nodes: Vec<DataNode>,
    edges: Vec<TransEdge>,
    /// child -> index into `edges`
    producing: HashMap<NodeId, usize>,
}

impl TransformationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: DataNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Record that `transformer` turned `parent` into `child`.
    ///
    /// Every non-root node has exactly one producing edge; a second edge into
    /// the same child is rejected.
    pub fn add_trans_in_graph(
        &mut self,
        parent: NodeId,
        child: NodeId,
        transformer: &dyn Transformer,
    ) -> Result<()> {
        self.add_edge(parent, child, transformer.kind(), transformer.name())
    }

    pub fn add_edge(&mut self, parent: NodeId, child: NodeId, kind: TransKind, name: &str) -> Result<()> {
        if !self.contains(parent) || !self.contains(child) {
            return Err(KolosalError::GraphError(format!(
                "edge {} -> {} references a node outside the graph",
                parent, child
            )));
        }
        if parent == child {
            return Err(KolosalError::GraphError(format!("self loop on {}", parent)));
        }
        if self.producing.contains_key(&child) {
            return Err(KolosalError::GraphError(format!(
                "{} already has a producing edge",
                child
            )));
        }

        self.producing.insert(child, self.edges.len());
        self.edges.push(TransEdge {
            parent,
            child,
            kind,
            name: name.to_string(),
        });
        Ok(())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&DataNode> {
        self.nodes.get(id.0)
    }

    /// Mutable access is limited to score assignment
    pub fn set_score(&mut self, id: NodeId, score: f64) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or_else(|| KolosalError::GraphError(format!("unknown node {}", id)))?;
        node.score = Some(score);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edges(&self) -> &[TransEdge] {
        &self.edges
    }

    /// Node ids in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn producing_edge(&self, id: NodeId) -> Option<&TransEdge> {
        self.producing.get(&id).map(|&idx| &self.edges[idx])
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|e| e.parent == id)
            .map(|e| e.child)
            .collect()
    }

    /// Operator names from the root down to `id`
    pub fn path_to(&self, id: NodeId) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = id;
        while let Some(edge) = self.producing_edge(current) {
            names.push(edge.name.clone());
            current = edge.parent;
        }
        names.reverse();
        names
    }

    /// Sort ids by score, best first.
    ///
    /// The sort is stable: equal scores keep their input order, so the node
    /// discovered first stays ahead. Unscored nodes go last.
    pub fn sort_nodes_by_score(&self, ids: &[NodeId]) -> Vec<NodeId> {
        let mut ranked: Vec<NodeId> = ids.to_vec();
        ranked.sort_by(|a, b| {
            let sa = self.node(*a).and_then(|n| n.score);
            let sb = self.node(*b).and_then(|n| n.score);
            match (sa, sb) {
                (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
        ranked
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            nodes: self
                .node_ids()
                .zip(&self.nodes)
                .map(|(id, n)| NodeSummary {
                    id,
                    depth: n.depth,
                    score: n.score,
                    shape: n.shape(),
                    cat_num: n.cat_num(),
                    trans_hist: n.trans_hist.clone(),
                })
                .collect(),
            edges: self.edges.clone(),
        }
    }
}

impl Index<NodeId> for TransformationGraph {
    type Output = DataNode;

    fn index(&self, id: NodeId) -> &DataNode {
        &self.nodes[id.0]
    }
}
