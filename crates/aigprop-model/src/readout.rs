//! Functional embedding to per-node probability.

use ndarray::{ArrayView1, ArrayView2, Axis};
use rand_chacha::ChaCha8Rng;

use crate::context::ExecutionContext;
use crate::error::ModelError;
use crate::layers::Mlp;
use crate::params::{ParamSet, Parameterized};

const READOUT_LAYERS: usize = 3;

/// MLP head `dim_hidden -> dim_mlp -> dim_mlp -> 1`, clamped to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Readout {
    mlp: Mlp,
}

impl Readout {
    pub fn new(dim_hidden: usize, dim_mlp: usize, rng: &mut ChaCha8Rng) -> Self {
        Readout {
            mlp: Mlp::new(dim_hidden, dim_mlp, 1, READOUT_LAYERS, true, rng),
        }
    }

    pub fn input_dim(&self) -> usize {
        self.mlp.in_dim()
    }

    /// Probability for a single `hf` row.
    pub fn predict(&self, _ctx: &ExecutionContext, hf_row: ArrayView1<'_, f32>) -> Result<f32, ModelError> {
        let out = self.mlp.forward(hf_row.insert_axis(Axis(0)))?;
        Ok(clamp_probability(out[[0, 0]]))
    }

    /// Probabilities for every row of `hf`.
    pub fn predict_batch(
        &self,
        _ctx: &ExecutionContext,
        hf: ArrayView2<'_, f32>,
    ) -> Result<Vec<f32>, ModelError> {
        let out = self.mlp.forward(hf)?;
        Ok(out.column(0).iter().copied().map(clamp_probability).collect())
    }
}

/// Clamps to `[0, 1]`; `+inf` maps to 1, `-inf` and NaN to 0.
pub fn clamp_probability(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl Parameterized for Readout {
    fn export_params(&self, prefix: &str, out: &mut ParamSet) {
        self.mlp.export_params(prefix, out);
    }

    fn import_params(&mut self, prefix: &str, params: &ParamSet) -> Result<(), ModelError> {
        self.mlp.import_params(prefix, params)
    }
}
