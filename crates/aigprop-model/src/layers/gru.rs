//! Single-step gated recurrent unit.
//!
//! Gate layout follows the usual `(r, z, n)` stacking: rows `0..h` of the
//! input/hidden weights produce the reset gate, `h..2h` the update gate and
//! `2h..3h` the candidate state.

use ndarray::{s, Array1, Array2, ArrayView2};
use rand_chacha::ChaCha8Rng;

use crate::error::ModelError;
use crate::init::{uniform_matrix, uniform_vector};
use crate::params::{join, ParamSet, Parameterized};

/// Stateless GRU cell applied to a batch of independent rows.
#[derive(Debug, Clone, PartialEq)]
pub struct GruCell {
    input_dim: usize,
    hidden_dim: usize,
    /// `(3h, in)`
    weight_ih: Array2<f32>,
    /// `(3h, h)`
    weight_hh: Array2<f32>,
    bias_ih: Array1<f32>,
    bias_hh: Array1<f32>,
}

impl GruCell {
    pub fn new(input_dim: usize, hidden_dim: usize, rng: &mut ChaCha8Rng) -> Self {
        // Recurrent layers scale every tensor by the hidden width.
        let gates = 3 * hidden_dim;
        GruCell {
            input_dim,
            hidden_dim,
            weight_ih: uniform_matrix(rng, gates, input_dim, hidden_dim),
            weight_hh: uniform_matrix(rng, gates, hidden_dim, hidden_dim),
            bias_ih: uniform_vector(rng, gates, hidden_dim),
            bias_hh: uniform_vector(rng, gates, hidden_dim),
        }
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    /// One recurrence step per row: `prev` holds the previous states, `input`
    /// the matching messages.
    pub fn step(
        &self,
        prev: ArrayView2<'_, f32>,
        input: ArrayView2<'_, f32>,
    ) -> Result<Array2<f32>, ModelError> {
        ModelError::dims("gru input rows", prev.nrows(), input.nrows())?;
        ModelError::dims("gru input width", self.input_dim, input.ncols())?;
        ModelError::dims("gru state width", self.hidden_dim, prev.ncols())?;

        let h = self.hidden_dim;
        let mut gi = input.dot(&self.weight_ih.t());
        gi += &self.bias_ih;
        let mut gh = prev.dot(&self.weight_hh.t());
        gh += &self.bias_hh;

        let (i_r, i_z, i_n) = (gi.slice(s![.., ..h]), gi.slice(s![.., h..2 * h]), gi.slice(s![.., 2 * h..]));
        let (h_r, h_z, h_n) = (gh.slice(s![.., ..h]), gh.slice(s![.., h..2 * h]), gh.slice(s![.., 2 * h..]));

        let mut next = Array2::<f32>::zeros(prev.raw_dim());
        for ((row, col), out) in next.indexed_iter_mut() {
            let r = sigmoid(i_r[[row, col]] + h_r[[row, col]]);
            let z = sigmoid(i_z[[row, col]] + h_z[[row, col]]);
            let n = (i_n[[row, col]] + r * h_n[[row, col]]).tanh();
            *out = (1.0 - z) * n + z * prev[[row, col]];
        }
        Ok(next)
    }
}

fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

impl Parameterized for GruCell {
    fn export_params(&self, prefix: &str, out: &mut ParamSet) {
        out.insert(join(prefix, "weight_ih_l0"), self.weight_ih.clone().into_dyn());
        out.insert(join(prefix, "weight_hh_l0"), self.weight_hh.clone().into_dyn());
        out.insert(join(prefix, "bias_ih_l0"), self.bias_ih.clone().into_dyn());
        out.insert(join(prefix, "bias_hh_l0"), self.bias_hh.clone().into_dyn());
    }

    fn import_params(&mut self, prefix: &str, params: &ParamSet) -> Result<(), ModelError> {
        let weight_ih = params.matrix(&join(prefix, "weight_ih_l0"), self.weight_ih.dim())?;
        let weight_hh = params.matrix(&join(prefix, "weight_hh_l0"), self.weight_hh.dim())?;
        let bias_ih = params.vector(&join(prefix, "bias_ih_l0"), self.bias_ih.len())?;
        let bias_hh = params.vector(&join(prefix, "bias_hh_l0"), self.bias_hh.len())?;
        self.weight_ih = weight_ih;
        self.weight_hh = weight_hh;
        self.bias_ih = bias_ih;
        self.bias_hh = bias_hh;
        Ok(())
    }
}
