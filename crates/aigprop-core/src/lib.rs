//! Circuit descriptors for level-synchronous embedding propagation.
//!
//! - [`graph`]: the immutable [`CircuitGraph`] descriptor, levelization and
//!   validation
//! - [`builder`]: gate-by-gate [`CircuitBuilder`]
//! - [`gate`]: the closed [`GateType`] enumeration
//! - [`subgraph`]: fan-in extraction for a group of destination nodes
//! - [`plan`]: level/gate-type partition consumed by the scheduler
//! - [`error`]: [`GraphError`]

pub mod builder;
pub mod error;
pub mod gate;
pub mod graph;
pub mod plan;
pub mod subgraph;

// Re-export commonly used types
pub use builder::CircuitBuilder;
pub use error::GraphError;
pub use gate::GateType;
pub use graph::{levelize, CircuitGraph, Edge};
pub use plan::{LevelGroup, LevelPlan};
pub use subgraph::{extract, SubGraph};
