//! CircuitGraph: the immutable per-call descriptor of one And-Inverter Graph.
//!
//! Nodes are dense indices `0..num_nodes`. Every per-node array (gate type,
//! forward level, backward level, forward index) is a plain vector in that
//! index space, so hidden-state tables can be addressed directly by node id.
//!
//! Descriptors arrive from external parsers with precomputed levels. They can
//! be constructed without checks via [`CircuitGraph::from_parts`] (mirroring
//! how loaders reconstruct stored data) and checked afterwards with
//! [`CircuitGraph::validate`], or built from gates and edges alone with
//! [`CircuitGraph::levelized`], which derives the levels.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::gate::GateType;

/// A directed fan-in edge `(source, destination)`.
pub type Edge = (usize, usize);

/// Immutable description of one circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitGraph {
    /// Gate category per node.
    gate: Vec<GateType>,
    /// Fan-in edges in their original order; duplicates allowed.
    edges: Vec<Edge>,
    /// Longest-path distance from the primary inputs.
    forward_level: Vec<u32>,
    /// Longest-path distance to a node without fan-out.
    backward_level: Vec<u32>,
    /// Stable node identifiers used when selecting groups of nodes.
    forward_index: Vec<usize>,
}

impl CircuitGraph {
    /// Assembles a descriptor from its component arrays without checking them.
    ///
    /// Call [`validate`](Self::validate) before trusting the result; the
    /// propagation engine still bounds-checks every index it uses.
    pub fn from_parts(
        gate: Vec<GateType>,
        edges: Vec<Edge>,
        forward_level: Vec<u32>,
        backward_level: Vec<u32>,
        forward_index: Vec<usize>,
    ) -> Self {
        CircuitGraph {
            gate,
            edges,
            forward_level,
            backward_level,
            forward_index,
        }
    }

    /// Builds a validated descriptor from gates and edges, deriving forward
    /// and backward levels and an identity forward index.
    pub fn levelized(gate: Vec<GateType>, edges: Vec<Edge>) -> Result<Self, GraphError> {
        let (forward_level, backward_level) = levelize(gate.len(), &edges)?;
        let forward_index = (0..gate.len()).collect();
        let graph = CircuitGraph {
            gate,
            edges,
            forward_level,
            backward_level,
            forward_index,
        };
        graph.validate()?;
        Ok(graph)
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Number of nodes (inputs and gates).
    pub fn num_nodes(&self) -> usize {
        self.gate.len()
    }

    /// Gate type of every node.
    pub fn gates(&self) -> &[GateType] {
        &self.gate
    }

    /// Gate type of one node, if it exists.
    pub fn gate(&self, node: usize) -> Option<GateType> {
        self.gate.get(node).copied()
    }

    /// The full fan-in edge list.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Forward level of every node.
    pub fn forward_levels(&self) -> &[u32] {
        &self.forward_level
    }

    /// Backward level of every node.
    pub fn backward_levels(&self) -> &[u32] {
        &self.backward_level
    }

    /// Stable node identifiers.
    pub fn forward_index(&self) -> &[usize] {
        &self.forward_index
    }

    /// `max(forward_level) + 1`, or 0 for an empty graph.
    pub fn num_forward_levels(&self) -> usize {
        self.forward_level
            .iter()
            .max()
            .map_or(0, |&max| max as usize + 1)
    }

    /// `max(backward_level) + 1`, or 0 for an empty graph.
    pub fn num_backward_levels(&self) -> usize {
        self.backward_level
            .iter()
            .max()
            .map_or(0, |&max| max as usize + 1)
    }

    /// Node identifiers of the level-0 nodes (the primary inputs of a valid
    /// graph), in ascending node order.
    pub fn primary_inputs(&self) -> Vec<usize> {
        self.forward_level
            .iter()
            .zip(&self.forward_index)
            .filter(|&(&level, _)| level == 0)
            .map(|(_, &id)| id)
            .collect()
    }

    /// Number of incoming edges per node. Out-of-range destinations are ignored.
    pub fn fan_in_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_nodes()];
        for &(_, dst) in &self.edges {
            if let Some(c) = counts.get_mut(dst) {
                *c += 1;
            }
        }
        counts
    }

    /// Builds a petgraph view of the circuit. Edge weights are positions in
    /// [`edges`](Self::edges).
    pub fn to_petgraph(&self) -> Result<DiGraph<GateType, usize>, GraphError> {
        let n = self.num_nodes();
        let mut graph = DiGraph::with_capacity(n, self.edges.len());
        for &gate in &self.gate {
            graph.add_node(gate);
        }
        for (pos, &(src, dst)) in self.edges.iter().enumerate() {
            check_index(src, n)?;
            check_index(dst, n)?;
            graph.add_edge(NodeIndex::new(src), NodeIndex::new(dst), pos);
        }
        Ok(graph)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Checks every structural invariant of a descriptor.
    ///
    /// - all per-node arrays have `num_nodes` entries
    /// - edge endpoints and forward-index entries are valid node indices
    /// - the edge list is acyclic
    /// - every edge strictly increases the forward level
    /// - primary inputs have no fan-in, every other gate has some
    /// - level 0 holds exactly the primary inputs
    pub fn validate(&self) -> Result<(), GraphError> {
        let n = self.num_nodes();
        check_len("forward_level", n, self.forward_level.len())?;
        check_len("backward_level", n, self.backward_level.len())?;
        check_len("forward_index", n, self.forward_index.len())?;

        for &id in &self.forward_index {
            check_index(id, n)?;
        }

        let graph = self.to_petgraph()?;
        toposort(&graph, None).map_err(|cycle| GraphError::CycleDetected {
            node: cycle.node_id().index(),
        })?;

        for &(src, dst) in &self.edges {
            let (src_level, dst_level) = (self.forward_level[src], self.forward_level[dst]);
            if dst_level <= src_level {
                return Err(GraphError::LevelOrder {
                    src,
                    dst,
                    src_level,
                    dst_level,
                });
            }
        }

        for (node, (&gate, &fan_in)) in self.gate.iter().zip(&self.fan_in_counts()).enumerate() {
            if gate.is_input() && fan_in > 0 {
                return Err(GraphError::UnexpectedFanIn { node });
            }
            if !gate.is_input() && fan_in == 0 {
                return Err(GraphError::MissingFanIn { node, gate });
            }
            let level = self.forward_level[node];
            if gate.is_input() != (level == 0) {
                return Err(GraphError::InputLevel { node, gate, level });
            }
        }

        Ok(())
    }
}

/// Computes `(forward_level, backward_level)` as longest-path distances from
/// sources and to sinks respectively.
pub fn levelize(num_nodes: usize, edges: &[Edge]) -> Result<(Vec<u32>, Vec<u32>), GraphError> {
    let mut graph = DiGraph::<(), ()>::with_capacity(num_nodes, edges.len());
    for _ in 0..num_nodes {
        graph.add_node(());
    }
    for &(src, dst) in edges {
        check_index(src, num_nodes)?;
        check_index(dst, num_nodes)?;
        graph.add_edge(NodeIndex::new(src), NodeIndex::new(dst), ());
    }

    let order = toposort(&graph, None).map_err(|cycle| GraphError::CycleDetected {
        node: cycle.node_id().index(),
    })?;

    let mut forward = vec![0u32; num_nodes];
    for &node in &order {
        let level = graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|pred| forward[pred.index()] + 1)
            .max()
            .unwrap_or(0);
        forward[node.index()] = level;
    }

    let mut backward = vec![0u32; num_nodes];
    for &node in order.iter().rev() {
        let level = graph
            .neighbors_directed(node, Direction::Outgoing)
            .map(|succ| backward[succ.index()] + 1)
            .max()
            .unwrap_or(0);
        backward[node.index()] = level;
    }

    Ok((forward, backward))
}

pub(crate) fn check_index(index: usize, num_nodes: usize) -> Result<(), GraphError> {
    if index < num_nodes {
        Ok(())
    } else {
        Err(GraphError::InvalidIndex { index, num_nodes })
    }
}

pub(crate) fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<(), GraphError> {
    if expected == actual {
        Ok(())
    } else {
        Err(GraphError::LengthMismatch {
            field,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use GateType::*;

    /// Two inputs, AND at level 1, NOT at level 2.
    fn and_not() -> CircuitGraph {
        CircuitGraph::levelized(
            vec![PrimaryInput, PrimaryInput, And, Not],
            vec![(0, 2), (1, 2), (2, 3)],
        )
        .unwrap()
    }

    #[test]
    fn levelized_computes_forward_and_backward_levels() {
        let graph = and_not();
        assert_eq!(graph.forward_levels(), &[0, 0, 1, 2]);
        assert_eq!(graph.backward_levels(), &[2, 2, 1, 0]);
        assert_eq!(graph.forward_index(), &[0, 1, 2, 3]);
        assert_eq!(graph.num_forward_levels(), 3);
        assert_eq!(graph.num_backward_levels(), 3);
    }

    #[test]
    fn levels_follow_longest_path() {
        // 0 -> 2 -> 3, and 1 -> 3 directly: node 3 sits at level 2.
        let graph = CircuitGraph::levelized(
            vec![PrimaryInput, PrimaryInput, Not, And],
            vec![(0, 2), (2, 3), (1, 3)],
        )
        .unwrap();
        assert_eq!(graph.forward_levels(), &[0, 0, 1, 2]);
        assert_eq!(graph.backward_levels(), &[2, 1, 1, 0]);
    }

    #[test]
    fn primary_inputs_are_level_zero_nodes() {
        assert_eq!(and_not().primary_inputs(), vec![0, 1]);
    }

    #[test]
    fn empty_graph_has_no_levels() {
        let graph = CircuitGraph::levelized(vec![], vec![]).unwrap();
        assert_eq!(graph.num_nodes(), 0);
        assert_eq!(graph.num_forward_levels(), 0);
    }

    #[test]
    fn validate_rejects_length_mismatch() {
        let graph = CircuitGraph::from_parts(
            vec![PrimaryInput, PrimaryInput],
            vec![],
            vec![0],
            vec![0, 0],
            vec![0, 1],
        );
        assert_eq!(
            graph.validate(),
            Err(GraphError::LengthMismatch {
                field: "forward_level",
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn validate_rejects_out_of_range_edge() {
        let graph = CircuitGraph::from_parts(
            vec![PrimaryInput, Not],
            vec![(0, 5)],
            vec![0, 1],
            vec![1, 0],
            vec![0, 1],
        );
        assert_eq!(
            graph.validate(),
            Err(GraphError::InvalidIndex {
                index: 5,
                num_nodes: 2
            })
        );
    }

    #[test]
    fn validate_rejects_out_of_range_forward_index() {
        let graph = CircuitGraph::from_parts(
            vec![PrimaryInput, Not],
            vec![(0, 1)],
            vec![0, 1],
            vec![1, 0],
            vec![0, 7],
        );
        assert!(matches!(
            graph.validate(),
            Err(GraphError::InvalidIndex { index: 7, .. })
        ));
    }

    #[test]
    fn validate_rejects_cycle() {
        let graph = CircuitGraph::from_parts(
            vec![PrimaryInput, And, And],
            vec![(0, 1), (1, 2), (2, 1)],
            vec![0, 1, 2],
            vec![2, 1, 0],
            vec![0, 1, 2],
        );
        assert!(matches!(
            graph.validate(),
            Err(GraphError::CycleDetected { .. })
        ));
    }

    #[test]
    fn levelize_rejects_cycle() {
        assert!(matches!(
            levelize(2, &[(0, 1), (1, 0)]),
            Err(GraphError::CycleDetected { .. })
        ));
    }

    #[test]
    fn validate_rejects_non_increasing_level() {
        let graph = CircuitGraph::from_parts(
            vec![PrimaryInput, And, Not],
            vec![(0, 1), (1, 2)],
            vec![0, 2, 2],
            vec![2, 1, 0],
            vec![0, 1, 2],
        );
        assert_eq!(
            graph.validate(),
            Err(GraphError::LevelOrder {
                src: 1,
                dst: 2,
                src_level: 2,
                dst_level: 2
            })
        );
    }

    #[test]
    fn validate_accepts_level_gaps() {
        // The NOT gate sits two levels above its predecessor.
        let graph = CircuitGraph::from_parts(
            vec![PrimaryInput, Not, Not],
            vec![(0, 1), (1, 2)],
            vec![0, 1, 3],
            vec![2, 1, 0],
            vec![0, 1, 2],
        );
        assert_eq!(graph.validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_gate_without_fan_in() {
        let graph = CircuitGraph::from_parts(
            vec![PrimaryInput, And],
            vec![],
            vec![0, 1],
            vec![0, 0],
            vec![0, 1],
        );
        assert_eq!(
            graph.validate(),
            Err(GraphError::MissingFanIn { node: 1, gate: And })
        );
    }

    #[test]
    fn validate_rejects_input_with_fan_in() {
        let graph = CircuitGraph::from_parts(
            vec![PrimaryInput, PrimaryInput],
            vec![(0, 1)],
            vec![0, 1],
            vec![1, 0],
            vec![0, 1],
        );
        assert_eq!(
            graph.validate(),
            Err(GraphError::UnexpectedFanIn { node: 1 })
        );
    }

    #[test]
    fn to_petgraph_keeps_edge_positions() {
        let graph = and_not();
        let pg = graph.to_petgraph().unwrap();
        assert_eq!(pg.node_count(), 4);
        let weights: Vec<usize> = pg.edge_weights().copied().collect();
        assert_eq!(weights, vec![0, 1, 2]);
    }

    #[test]
    fn validation_messages() {
        let cases = [
            CircuitGraph::from_parts(vec![PrimaryInput, And], vec![(0, 1)], vec![0, 0], vec![1, 0], vec![0, 1]),
            CircuitGraph::from_parts(vec![PrimaryInput, Not], vec![], vec![0, 1], vec![0, 0], vec![0, 1]),
            CircuitGraph::from_parts(vec![PrimaryInput], vec![], vec![0], vec![], vec![0]),
        ];
        let messages: Vec<String> = cases
            .iter()
            .map(|g| g.validate().unwrap_err().to_string())
            .collect();
        insta::assert_snapshot!(messages.join("\n"), @r###"
        level order violated on edge 0 -> 1: level 0 -> 0
        gate 1 (not) has no fan-in
        length mismatch for 'backward_level': expected 1, got 0
        "###);
    }

    #[test]
    fn serde_roundtrip() {
        let graph = and_not();
        let json = serde_json::to_string(&graph).unwrap();
        let back: CircuitGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(graph, back);
    }

    #[test]
    fn loads_dataset_gate_codes() {
        let json = r#"{
            "gate": [0, 0, 1, 2],
            "edges": [[0, 2], [1, 2], [2, 3]],
            "forward_level": [0, 0, 1, 2],
            "backward_level": [2, 2, 1, 0],
            "forward_index": [0, 1, 2, 3]
        }"#;
        let graph: CircuitGraph = serde_json::from_str(json).unwrap();
        assert_eq!(graph, and_not());
        assert_eq!(graph.validate(), Ok(()));
    }
}
