//! Fan-in sub-graph extraction.
//!
//! For a set of destination nodes, [`extract`] keeps exactly the edges that
//! end in the set. Sources may lie anywhere in the graph: a level-`L` gate
//! reads from strictly lower levels. Node indices are never renumbered, so
//! aggregators index straight into the full hidden-state table.

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::{check_index, CircuitGraph, Edge};

/// The fan-in edges of one node group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubGraph {
    /// Kept edges in their original relative order, original node indices.
    pub edges: Vec<Edge>,
    /// Position of each kept edge in the full edge list (the edge attribute).
    pub edge_ids: Vec<usize>,
}

impl SubGraph {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Destination nodes that receive at least one edge, ascending and unique.
    pub fn destinations(&self) -> Vec<usize> {
        let mut dst: Vec<usize> = self.edges.iter().map(|&(_, d)| d).collect();
        dst.sort_unstable();
        dst.dedup();
        dst
    }
}

/// Returns the edges of `edges` whose destination is in `subset`.
///
/// Fails with [`GraphError::InvalidIndex`] if a subset entry is not below
/// `num_nodes`. Edge endpoints themselves are not checked here; consumers
/// bound-check them against the tables they index.
pub fn extract(subset: &[usize], edges: &[Edge], num_nodes: usize) -> Result<SubGraph, GraphError> {
    let mut member = vec![false; num_nodes];
    for &node in subset {
        check_index(node, num_nodes)?;
        member[node] = true;
    }

    let mut sub = SubGraph::default();
    for (pos, &(src, dst)) in edges.iter().enumerate() {
        if member.get(dst).copied().unwrap_or(false) {
            sub.edges.push((src, dst));
            sub.edge_ids.push(pos);
        }
    }
    Ok(sub)
}

impl CircuitGraph {
    /// Fan-in sub-graph of `subset` within this circuit.
    pub fn subgraph(&self, subset: &[usize]) -> Result<SubGraph, GraphError> {
        extract(subset, self.edges(), self.num_nodes())
    }
}
