//! Level-synchronous propagation.
//!
//! [`Propagator`] walks rounds x levels x bound gate types over a
//! [`HiddenStates`] pair, calling each group's aggregators and updaters and
//! scattering the results back in place. Level 0 is never processed.

pub mod scheduler;
pub mod trace;

use ndarray::{concatenate, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

pub use scheduler::{Propagation, Propagator};
pub use trace::TraceEntry;

/// Structural (`hs`) and functional (`hf`) embedding tables, one row per node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiddenStates {
    pub hs: Array2<f32>,
    pub hf: Array2<f32>,
}

impl HiddenStates {
    /// Pairs two tables after checking they cover the same nodes.
    pub fn new(hs: Array2<f32>, hf: Array2<f32>) -> Result<Self, ModelError> {
        ModelError::dims("hidden state rows", hs.nrows(), hf.nrows())?;
        Ok(HiddenStates { hs, hf })
    }

    pub fn num_nodes(&self) -> usize {
        self.hs.nrows()
    }

    /// The joint view `concat(hs, hf)` along the feature axis.
    pub fn joint(&self) -> Result<Array2<f32>, ModelError> {
        Ok(concatenate(Axis(1), &[self.hs.view(), self.hf.view()])?)
    }
}

/// Overwrites `rows` of `table` with the rows of `values`, in order.
pub(crate) fn scatter(
    table: &mut Array2<f32>,
    rows: &[usize],
    values: ArrayView2<'_, f32>,
) -> Result<(), ModelError> {
    ModelError::dims("scatter rows", rows.len(), values.nrows())?;
    ModelError::dims("scatter width", table.ncols(), values.ncols())?;
    for (&row, value) in rows.iter().zip(values.rows()) {
        table.row_mut(row).assign(&value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn joint_concatenates_features() {
        let states = HiddenStates::new(arr2(&[[1.0], [2.0]]), arr2(&[[3.0, 4.0], [5.0, 6.0]])).unwrap();
        assert_eq!(states.joint().unwrap(), arr2(&[[1.0, 3.0, 4.0], [2.0, 5.0, 6.0]]));
    }

    #[test]
    fn new_rejects_row_mismatch() {
        assert!(HiddenStates::new(Array2::zeros((2, 1)), Array2::zeros((3, 1))).is_err());
    }

    #[test]
    fn scatter_writes_selected_rows() {
        let mut table = Array2::<f32>::zeros((4, 2));
        scatter(&mut table, &[3, 1], arr2(&[[1.0, 1.0], [2.0, 2.0]]).view()).unwrap();
        assert_eq!(table, arr2(&[[0.0, 0.0], [2.0, 2.0], [0.0, 0.0], [1.0, 1.0]]));
        assert!(scatter(&mut table, &[0], arr2(&[[1.0]]).view()).is_err());
    }
}
