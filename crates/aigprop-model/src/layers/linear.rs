//! Affine layer `y = x W^T + b`.

use ndarray::{Array1, Array2, ArrayView2};
use rand_chacha::ChaCha8Rng;

use crate::error::ModelError;
use crate::init::{uniform_matrix, uniform_vector};
use crate::params::{join, ParamSet, Parameterized};

/// Fully connected layer with bias.
#[derive(Debug, Clone, PartialEq)]
pub struct Linear {
    /// `(out_features, in_features)`
    weight: Array2<f32>,
    /// `(out_features,)`
    bias: Array1<f32>,
}

impl Linear {
    pub fn new(in_features: usize, out_features: usize, rng: &mut ChaCha8Rng) -> Self {
        Linear {
            weight: uniform_matrix(rng, out_features, in_features, in_features),
            bias: uniform_vector(rng, out_features, in_features),
        }
    }

    /// Builds a layer from explicit tensors.
    pub fn from_weights(weight: Array2<f32>, bias: Array1<f32>) -> Result<Self, ModelError> {
        ModelError::dims("linear bias", weight.nrows(), bias.len())?;
        Ok(Linear { weight, bias })
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    /// Applies the layer to every row of `x`.
    pub fn forward(&self, x: ArrayView2<'_, f32>) -> Result<Array2<f32>, ModelError> {
        ModelError::dims("linear input", self.in_features(), x.ncols())?;
        let mut y = x.dot(&self.weight.t());
        y += &self.bias;
        Ok(y)
    }
}

impl Parameterized for Linear {
    fn export_params(&self, prefix: &str, out: &mut ParamSet) {
        out.insert(join(prefix, "weight"), self.weight.clone().into_dyn());
        out.insert(join(prefix, "bias"), self.bias.clone().into_dyn());
    }

    fn import_params(&mut self, prefix: &str, params: &ParamSet) -> Result<(), ModelError> {
        let weight = params.matrix(&join(prefix, "weight"), self.weight.dim())?;
        let bias = params.vector(&join(prefix, "bias"), self.bias.len())?;
        self.weight = weight;
        self.bias = bias;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};
    use rand::SeedableRng;

    #[test]
    fn forward_applies_weight_and_bias() {
        let layer = Linear::from_weights(arr2(&[[1.0, 2.0], [0.0, -1.0]]), arr1(&[0.5, 1.0])).unwrap();
        let y = layer.forward(arr2(&[[1.0, 1.0], [2.0, 0.0]]).view()).unwrap();
        assert_eq!(y, arr2(&[[3.5, 0.0], [2.5, 1.0]]));
    }

    #[test]
    fn forward_rejects_wrong_width() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let layer = Linear::new(3, 2, &mut rng);
        assert!(matches!(
            layer.forward(Array2::zeros((1, 4)).view()),
            Err(ModelError::DimensionMismatch {
                expected: 3,
                actual: 4,
                ..
            })
        ));
    }

    #[test]
    fn empty_batch_gives_empty_output() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let layer = Linear::new(3, 2, &mut rng);
        assert_eq!(layer.forward(Array2::zeros((0, 3)).view()).unwrap().dim(), (0, 2));
    }

    #[test]
    fn params_export_import() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let a = Linear::new(3, 2, &mut rng);
        let mut b = Linear::new(3, 2, &mut rng);
        assert_ne!(a, b);

        let mut set = ParamSet::new();
        a.export_params("fc", &mut set);
        assert_eq!(set.shape("fc.weight"), Some(&[2, 3][..]));
        assert_eq!(set.shape("fc.bias"), Some(&[2][..]));
        b.import_params("fc", &set).unwrap();
        assert_eq!(a, b);
    }
}
