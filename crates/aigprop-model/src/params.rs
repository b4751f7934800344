//! Named parameter sets.
//!
//! A [`ParamSet`] maps dotted structural paths
//! (`<component>.<subcomponent>.<parameter>`, e.g.
//! `aggr_and_strc.msg_q.layers.0.weight`) to dense tensors. Insertion order is
//! preserved so exported sets list parameters in construction order.
//!
//! Layers expose their tensors through [`Parameterized`]: `export_params`
//! writes them under a prefix, `import_params` reads them back and rejects
//! absent or mis-shaped entries.

use std::path::Path;

use indexmap::IndexMap;
use ndarray::{Array1, Array2, ArrayD, Ix1, Ix2};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Ordered map from parameter name to tensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(IndexMap<String, ArrayD<f32>>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Inserts or replaces a tensor, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: ArrayD<f32>) -> Option<ArrayD<f32>> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&ArrayD<f32>> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Removes a tensor, preserving the order of the remaining entries.
    pub fn remove(&mut self, name: &str) -> Option<ArrayD<f32>> {
        self.0.shift_remove(name)
    }

    /// Shape of a named tensor.
    pub fn shape(&self, name: &str) -> Option<&[usize]> {
        self.0.get(name).map(|t| t.shape())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArrayD<f32>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total number of scalar parameters.
    pub fn num_scalars(&self) -> usize {
        self.0.values().map(|t| t.len()).sum()
    }

    /// Content hash over names, shapes and values, in insertion order.
    ///
    /// Two sets with equal fingerprints load identically into a model.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        for (name, tensor) in &self.0 {
            hasher.update(&(name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update(&(tensor.ndim() as u64).to_le_bytes());
            for &dim in tensor.shape() {
                hasher.update(&(dim as u64).to_le_bytes());
            }
            for &value in tensor.iter() {
                hasher.update(&value.to_le_bytes());
            }
        }
        hasher.finalize()
    }

    /// Reads a parameter set from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes the parameter set as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        std::fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    /// Reads a rank-2 tensor of exactly `shape`.
    pub fn matrix(&self, name: &str, shape: (usize, usize)) -> Result<Array2<f32>, ModelError> {
        let tensor = self.expect_shape(name, &[shape.0, shape.1])?;
        Ok(tensor.clone().into_dimensionality::<Ix2>()?)
    }

    /// Reads a rank-1 tensor of exactly `len` entries.
    pub fn vector(&self, name: &str, len: usize) -> Result<Array1<f32>, ModelError> {
        let tensor = self.expect_shape(name, &[len])?;
        Ok(tensor.clone().into_dimensionality::<Ix1>()?)
    }

    fn expect_shape(&self, name: &str, expected: &[usize]) -> Result<&ArrayD<f32>, ModelError> {
        let tensor = self.get(name).ok_or_else(|| ModelError::MissingParameter {
            name: name.to_string(),
        })?;
        if tensor.shape() != expected {
            return Err(ModelError::ParameterShape {
                name: name.to_string(),
                expected: expected.to_vec(),
                actual: tensor.shape().to_vec(),
            });
        }
        Ok(tensor)
    }
}

impl FromIterator<(String, ArrayD<f32>)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (String, ArrayD<f32>)>>(iter: I) -> Self {
        ParamSet(iter.into_iter().collect())
    }
}

impl IntoIterator for ParamSet {
    type Item = (String, ArrayD<f32>);
    type IntoIter = indexmap::map::IntoIter<String, ArrayD<f32>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Joins a prefix and a local parameter name with a dot.
pub fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Components that own learned tensors.
pub trait Parameterized {
    /// Writes every owned tensor into `out`, named under `prefix`.
    fn export_params(&self, prefix: &str, out: &mut ParamSet);

    /// Replaces every owned tensor with the entry of the same name in
    /// `params`. Fails without partial updates being observable by callers
    /// that discard the component on error.
    fn import_params(&mut self, prefix: &str, params: &ParamSet) -> Result<(), ModelError>;
}
