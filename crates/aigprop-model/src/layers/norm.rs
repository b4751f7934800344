//! Batch normalization in inference mode.
//!
//! Only the running statistics are used; batch statistics are a training
//! concern.

use ndarray::{Array1, Array2, ArrayView2};

use crate::error::ModelError;
use crate::params::{join, ParamSet, Parameterized};

const EPS: f32 = 1e-5;

/// Per-feature affine normalization with frozen running statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchNorm {
    weight: Array1<f32>,
    bias: Array1<f32>,
    running_mean: Array1<f32>,
    running_var: Array1<f32>,
}

impl BatchNorm {
    /// Identity normalization (unit scale, zero shift, standard statistics).
    pub fn new(features: usize) -> Self {
        BatchNorm {
            weight: Array1::ones(features),
            bias: Array1::zeros(features),
            running_mean: Array1::zeros(features),
            running_var: Array1::ones(features),
        }
    }

    pub fn features(&self) -> usize {
        self.weight.len()
    }

    pub fn forward(&self, x: ArrayView2<'_, f32>) -> Result<Array2<f32>, ModelError> {
        ModelError::dims("batch norm input", self.features(), x.ncols())?;
        let scale = &self.weight / &self.running_var.mapv(|v| (v + EPS).sqrt());
        let shift = &self.bias - &(&self.running_mean * &scale);
        let mut y = &x * &scale;
        y += &shift;
        Ok(y)
    }
}

impl Parameterized for BatchNorm {
    fn export_params(&self, prefix: &str, out: &mut ParamSet) {
        out.insert(join(prefix, "weight"), self.weight.clone().into_dyn());
        out.insert(join(prefix, "bias"), self.bias.clone().into_dyn());
        out.insert(join(prefix, "running_mean"), self.running_mean.clone().into_dyn());
        out.insert(join(prefix, "running_var"), self.running_var.clone().into_dyn());
    }

    fn import_params(&mut self, prefix: &str, params: &ParamSet) -> Result<(), ModelError> {
        let n = self.features();
        let weight = params.vector(&join(prefix, "weight"), n)?;
        let bias = params.vector(&join(prefix, "bias"), n)?;
        let running_mean = params.vector(&join(prefix, "running_mean"), n)?;
        let running_var = params.vector(&join(prefix, "running_var"), n)?;
        *self = BatchNorm {
            weight,
            bias,
            running_mean,
            running_var,
        };
        Ok(())
    }
}
