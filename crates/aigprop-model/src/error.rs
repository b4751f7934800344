//! Error types for aigprop-model.
//!
//! Forward-pass failures are fatal for the call and surface immediately.
//! Checkpoint reconciliation never produces a `ModelError`; its findings are
//! reported as [`CheckpointDiagnostic`](crate::checkpoint::CheckpointDiagnostic)
//! values instead.

use aigprop_core::GraphError;
use thiserror::Error;

/// Errors produced by the propagation engine and its building blocks.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The circuit descriptor is malformed (out-of-range index, overlapping
    /// groups, length mismatch, ...).
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A table or batch has the wrong width or row count.
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A parameter supplied for loading does not have the live shape.
    #[error("parameter '{name}' has shape {actual:?}, expected {expected:?}")]
    ParameterShape {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A parameter required by a layer is absent from the supplied set.
    #[error("missing parameter '{name}'")]
    MissingParameter { name: String },

    /// A gate-type binding is inconsistent.
    #[error("invalid gate binding: {reason}")]
    Binding { reason: String },

    /// JSON (de)serialization of configs or parameter sets failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing a config or parameter file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// An ndarray reshape or concatenation failed.
    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl ModelError {
    pub(crate) fn dims(context: &'static str, expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(ModelError::DimensionMismatch {
                context,
                expected,
                actual,
            })
        }
    }
}
