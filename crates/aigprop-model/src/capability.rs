//! Contracts between the propagation scheduler and its neural components.
//!
//! The scheduler never names a concrete layer. A gate-type binding owns one
//! [`Aggregate`] and one [`Update`] per channel, and any implementation that
//! honors these signatures can be swapped in.

use std::fmt::Debug;

use ndarray::{Array2, ArrayView2};

use aigprop_core::SubGraph;

use crate::context::ExecutionContext;
use crate::error::ModelError;
use crate::layers::{GruCell, TfAggregator};
use crate::params::Parameterized;

/// Permutation-invariant message aggregation over a fan-in sub-graph.
pub trait Aggregate: Parameterized + Send + Sync + Debug {
    /// Width of the state table this aggregator reads.
    fn input_dim(&self) -> usize;

    /// Width of the produced message rows.
    fn output_dim(&self) -> usize;

    /// Returns a message table with one row per row of `state`. Only rows of
    /// destinations in `edges` are meaningful; the rest are zero.
    fn aggregate(
        &self,
        ctx: &ExecutionContext,
        state: ArrayView2<'_, f32>,
        edges: &SubGraph,
    ) -> Result<Array2<f32>, ModelError>;
}

/// Stateless single-step recurrence applied row by row.
pub trait Update: Parameterized + Send + Sync + Debug {
    fn input_dim(&self) -> usize;

    fn hidden_dim(&self) -> usize;

    /// `prev` and `message` have the same number of rows; row `i` of the
    /// result is the next state of row `i`.
    fn update(
        &self,
        ctx: &ExecutionContext,
        prev: ArrayView2<'_, f32>,
        message: ArrayView2<'_, f32>,
    ) -> Result<Array2<f32>, ModelError>;
}

impl Aggregate for TfAggregator {
    fn input_dim(&self) -> usize {
        self.in_dim()
    }

    fn output_dim(&self) -> usize {
        self.out_dim()
    }

    fn aggregate(
        &self,
        _ctx: &ExecutionContext,
        state: ArrayView2<'_, f32>,
        edges: &SubGraph,
    ) -> Result<Array2<f32>, ModelError> {
        self.forward(state, edges)
    }
}

impl Update for GruCell {
    fn input_dim(&self) -> usize {
        GruCell::input_dim(self)
    }

    fn hidden_dim(&self) -> usize {
        GruCell::hidden_dim(self)
    }

    fn update(
        &self,
        _ctx: &ExecutionContext,
        prev: ArrayView2<'_, f32>,
        message: ArrayView2<'_, f32>,
    ) -> Result<Array2<f32>, ModelError> {
        self.step(prev, message)
    }
}
