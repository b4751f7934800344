//! Propagation trace recording.
//!
//! When [`ExecutionContext::trace_enabled`](crate::context::ExecutionContext)
//! is set, the scheduler records a [`TraceEntry`] for every group it
//! processes, in processing order. Skipped groups leave no entry.

use serde::Serialize;

use aigprop_core::GateType;

/// One processed level/gate-type group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    pub round: usize,
    pub level: usize,
    pub gate: GateType,
    /// Name of the channel set the gate type is bound to.
    pub channel: String,
    /// Node identifiers of the group, ascending.
    pub nodes: Vec<usize>,
    /// Number of fan-in edges aggregated for the group.
    pub edges: usize,
}
