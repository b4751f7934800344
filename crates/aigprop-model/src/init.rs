//! Deterministic initialization.
//!
//! Learned tensors start from a uniform distribution scaled by fan-in, drawn
//! from a seeded [`ChaCha8Rng`] so two models built from the same seed are
//! bit-identical. Primary-input structural states come from a
//! [`StructuralInit`] collaborator; [`OrthogonalInit`] is the default.

use ndarray::{Array1, Array2};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use aigprop_core::CircuitGraph;

use crate::context::ExecutionContext;
use crate::error::ModelError;

/// Uniform `U(-1/sqrt(fan_in), 1/sqrt(fan_in))` matrix.
pub(crate) fn uniform_matrix(rng: &mut ChaCha8Rng, rows: usize, cols: usize, fan_in: usize) -> Array2<f32> {
    let bound = fan_in_bound(fan_in);
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-bound..=bound))
}

/// Uniform `U(-1/sqrt(fan_in), 1/sqrt(fan_in))` vector.
pub(crate) fn uniform_vector(rng: &mut ChaCha8Rng, len: usize, fan_in: usize) -> Array1<f32> {
    let bound = fan_in_bound(fan_in);
    Array1::from_shape_fn(len, |_| rng.gen_range(-bound..=bound))
}

fn fan_in_bound(fan_in: usize) -> f32 {
    1.0 / (fan_in.max(1) as f32).sqrt()
}

/// Produces the structural hidden state of a circuit before propagation.
///
/// The returned table has one row per node; rows of non-input nodes must be
/// zero.
pub trait StructuralInit: Send + Sync + std::fmt::Debug {
    fn init_hs(
        &self,
        ctx: &ExecutionContext,
        graph: &CircuitGraph,
        dim: usize,
    ) -> Result<Array2<f32>, ModelError>;
}

/// Gives every primary input a seeded pseudo-random unit vector.
///
/// The first `min(#inputs, dim)` vectors are orthonormalized with
/// Gram-Schmidt so distinct inputs start maximally distinguishable; any
/// further inputs get independent random unit vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrthogonalInit {
    pub seed: u64,
}

impl OrthogonalInit {
    pub fn new(seed: u64) -> Self {
        OrthogonalInit { seed }
    }

    /// `count` unit vectors of width `dim`.
    pub fn vectors(&self, count: usize, dim: usize) -> Array2<f32> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut out = Array2::<f32>::zeros((count, dim));
        if dim == 0 {
            return out;
        }
        for i in 0..count {
            loop {
                let mut v: Array1<f32> = Array1::from_shape_fn(dim, |_| rng.gen_range(-1.0f32..1.0));
                if i < dim {
                    for j in 0..i {
                        let basis = out.row(j);
                        let proj = v.dot(&basis);
                        v.scaled_add(-proj, &basis);
                    }
                }
                let norm = v.dot(&v).sqrt();
                // Redraw degenerate vectors.
                if norm > 1e-6 {
                    out.row_mut(i).assign(&(v / norm));
                    break;
                }
            }
        }
        out
    }
}

impl Default for OrthogonalInit {
    fn default() -> Self {
        OrthogonalInit::new(0)
    }
}

impl StructuralInit for OrthogonalInit {
    fn init_hs(
        &self,
        _ctx: &ExecutionContext,
        graph: &CircuitGraph,
        dim: usize,
    ) -> Result<Array2<f32>, ModelError> {
        let n = graph.num_nodes();
        let inputs = graph.primary_inputs();
        let vectors = self.vectors(inputs.len(), dim);
        let mut hs = Array2::<f32>::zeros((n, dim));
        for (row, &node) in inputs.iter().enumerate() {
            if node >= n {
                return Err(aigprop_core::GraphError::InvalidIndex {
                    index: node,
                    num_nodes: n,
                }
                .into());
            }
            hs.row_mut(node).assign(&vectors.row(row));
        }
        Ok(hs)
    }
}
