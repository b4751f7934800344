//! Incremental construction of circuit descriptors.
//!
//! [`CircuitBuilder`] only accepts fan-in from nodes that already exist, so
//! every graph it produces is acyclic by construction. Levels are derived in
//! [`build`](CircuitBuilder::build).

use smallvec::SmallVec;

use crate::error::GraphError;
use crate::gate::GateType;
use crate::graph::{check_index, CircuitGraph, Edge};

/// Gate-by-gate builder for [`CircuitGraph`].
#[derive(Debug, Clone, Default)]
pub struct CircuitBuilder {
    gates: Vec<GateType>,
    fan_in: Vec<SmallVec<[usize; 2]>>,
}

impl CircuitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes added so far.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Adds a primary input and returns its node index.
    pub fn add_input(&mut self) -> usize {
        self.gates.push(GateType::PrimaryInput);
        self.fan_in.push(SmallVec::new());
        self.gates.len() - 1
    }

    /// Adds a gate fed by `inputs` (existing nodes) and returns its index.
    pub fn add_gate(&mut self, gate: GateType, inputs: &[usize]) -> Result<usize, GraphError> {
        let node = self.gates.len();
        if gate.is_input() {
            if !inputs.is_empty() {
                return Err(GraphError::UnexpectedFanIn { node });
            }
            return Ok(self.add_input());
        }
        if inputs.is_empty() {
            return Err(GraphError::MissingFanIn { node, gate });
        }
        for &input in inputs {
            check_index(input, node)?;
        }
        self.gates.push(gate);
        self.fan_in.push(inputs.iter().copied().collect());
        Ok(node)
    }

    pub fn and(&mut self, a: usize, b: usize) -> Result<usize, GraphError> {
        self.add_gate(GateType::And, &[a, b])
    }

    pub fn not(&mut self, a: usize) -> Result<usize, GraphError> {
        self.add_gate(GateType::Not, &[a])
    }

    pub fn xor(&mut self, a: usize, b: usize) -> Result<usize, GraphError> {
        self.add_gate(GateType::Xor, &[a, b])
    }

    /// Finishes the circuit, deriving levels and an identity forward index.
    pub fn build(self) -> Result<CircuitGraph, GraphError> {
        let edges: Vec<Edge> = self
            .fan_in
            .iter()
            .enumerate()
            .flat_map(|(dst, inputs)| inputs.iter().map(move |&src| (src, dst)))
            .collect();
        CircuitGraph::levelized(self.gates, edges)
    }
}
