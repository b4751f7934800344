//! Explicit execution context threaded through every forward-pass call.
//!
//! Nothing about where or how a pass runs is inferred from the model's own
//! state; callers construct an [`ExecutionContext`] and hand it down.

use serde::{Deserialize, Serialize};

/// Compute device a pass runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    /// Host CPU, single-threaded.
    #[default]
    Cpu,
}

/// Per-call execution settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Device every table of the pass lives on.
    pub device: Device,
    /// Record a [`TraceEntry`](crate::propagate::TraceEntry) per processed group.
    pub trace_enabled: bool,
}

impl ExecutionContext {
    /// CPU context without tracing.
    pub fn cpu() -> Self {
        Self::default()
    }

    /// Returns a copy with tracing switched on.
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }
}
