//! Core error types for aigprop-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! ways a circuit descriptor can be malformed.

use thiserror::Error;

use crate::gate::GateType;

/// Errors produced while building, validating or slicing a circuit graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A node index is outside `[0, num_nodes)`.
    #[error("invalid node index {index}: graph has {num_nodes} nodes")]
    InvalidIndex { index: usize, num_nodes: usize },

    /// A per-node array does not have one entry per node.
    #[error("length mismatch for '{field}': expected {expected}, got {actual}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The edge list contains a directed cycle through `node`.
    #[error("cycle detected at node {node}")]
    CycleDetected { node: usize },

    /// An edge does not go from a lower to a strictly higher forward level.
    #[error(
        "level order violated on edge {src} -> {dst}: level {src_level} -> {dst_level}"
    )]
    LevelOrder {
        src: usize,
        dst: usize,
        src_level: u32,
        dst_level: u32,
    },

    /// A non-input gate has no incoming edge.
    #[error("gate {node} ({gate}) has no fan-in")]
    MissingFanIn { node: usize, gate: GateType },

    /// A primary input has an incoming edge.
    #[error("primary input {node} has fan-in")]
    UnexpectedFanIn { node: usize },

    /// A primary input is not at level 0, or a gate is at level 0.
    #[error("node {node} ({gate}) has inconsistent forward level {level}")]
    InputLevel {
        node: usize,
        gate: GateType,
        level: u32,
    },

    /// The same node identifier was assigned to more than one group of a level.
    #[error("node {node} appears in more than one group at level {level}")]
    OverlappingGroups { node: usize, level: u32 },

    /// A numeric gate code does not name a known gate type.
    #[error("unknown gate code: {code}")]
    UnknownGateCode { code: u8 },

    /// A gate name does not name a known gate type.
    #[error("unknown gate name: {name}")]
    UnknownGateName { name: String },
}
