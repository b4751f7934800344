//! Multi-layer perceptron with ReLU activations.
//!
//! Hidden layers are `Linear -> [BatchNorm] -> ReLU`; the final layer is a
//! bare `Linear`. Dropout is a training-time concern and has no inference
//! counterpart here.

use ndarray::{Array2, ArrayView2};
use rand_chacha::ChaCha8Rng;

use crate::error::ModelError;
use crate::layers::linear::Linear;
use crate::layers::norm::BatchNorm;
use crate::params::{join, ParamSet, Parameterized};

/// Feed-forward network `in -> hidden -> ... -> out`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    layers: Vec<Linear>,
    norms: Vec<BatchNorm>,
}

impl Mlp {
    /// Builds a network with `num_layers` affine layers (at least one).
    ///
    /// With `normalize`, every hidden layer is followed by a batch norm.
    pub fn new(
        in_dim: usize,
        hidden_dim: usize,
        out_dim: usize,
        num_layers: usize,
        normalize: bool,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let num_layers = num_layers.max(1);
        let mut layers = Vec::with_capacity(num_layers);
        let mut norms = Vec::new();
        for i in 0..num_layers {
            let fan_in = if i == 0 { in_dim } else { hidden_dim };
            let fan_out = if i + 1 == num_layers { out_dim } else { hidden_dim };
            layers.push(Linear::new(fan_in, fan_out, rng));
            if normalize && i + 1 < num_layers {
                norms.push(BatchNorm::new(fan_out));
            }
        }
        Mlp { layers, norms }
    }

    pub fn in_dim(&self) -> usize {
        self.layers.first().map_or(0, Linear::in_features)
    }

    pub fn out_dim(&self) -> usize {
        self.layers.last().map_or(0, Linear::out_features)
    }

    pub fn forward(&self, x: ArrayView2<'_, f32>) -> Result<Array2<f32>, ModelError> {
        let last = self.layers.len().saturating_sub(1);
        let mut h = x.to_owned();
        for (i, layer) in self.layers.iter().enumerate() {
            h = layer.forward(h.view())?;
            if i < last {
                if let Some(norm) = self.norms.get(i) {
                    h = norm.forward(h.view())?;
                }
                h.mapv_inplace(|v| v.max(0.0));
            }
        }
        Ok(h)
    }
}

impl Parameterized for Mlp {
    fn export_params(&self, prefix: &str, out: &mut ParamSet) {
        for (i, layer) in self.layers.iter().enumerate() {
            layer.export_params(&join(prefix, &format!("layers.{i}")), out);
        }
        for (i, norm) in self.norms.iter().enumerate() {
            norm.export_params(&join(prefix, &format!("norms.{i}")), out);
        }
    }

    fn import_params(&mut self, prefix: &str, params: &ParamSet) -> Result<(), ModelError> {
        for (i, layer) in self.layers.iter_mut().enumerate() {
            layer.import_params(&join(prefix, &format!("layers.{i}")), params)?;
        }
        for (i, norm) in self.norms.iter_mut().enumerate() {
            norm.import_params(&join(prefix, &format!("norms.{i}")), params)?;
        }
        Ok(())
    }
}
