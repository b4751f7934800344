//! Model configuration.
//!
//! Every field has a default, so a partial JSON object (or `{}`) is a valid
//! configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::binding::FunctionalContext;
use crate::error::ModelError;

/// How XOR gates are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XorBinding {
    /// XOR is not bound; XOR nodes keep their initial state.
    #[default]
    Disabled,
    /// XOR gates reuse the AND channel set and its parameters.
    SharedWithAnd,
    /// XOR gates get their own channel set (`aggr_xor_*`, `update_xor_*`).
    Dedicated,
}

/// Configuration for [`Model`](crate::Model).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Propagation sweeps over all levels. Default: 1.
    pub num_rounds: usize,
    /// Width of `hs` and `hf`. Default: 128.
    pub dim_hidden: usize,
    /// Hidden width of the aggregator and readout MLPs. Default: 32.
    pub dim_mlp: usize,
    /// Seed primary-input structural states before propagation. Default: true.
    pub enable_encode: bool,
    /// Seed for learned-parameter initialization. Default: 0.
    pub param_seed: u64,
    /// Seed for primary-input structural vectors. Default: 0.
    pub init_seed: u64,
    /// XOR handling. Default: disabled.
    pub xor: XorBinding,
    /// View read by the NOT functional aggregator. Default: joint.
    pub not_functional_context: FunctionalContext,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            num_rounds: 1,
            dim_hidden: 128,
            dim_mlp: 32,
            enable_encode: true,
            param_seed: 0,
            init_seed: 0,
            xor: XorBinding::Disabled,
            not_functional_context: FunctionalContext::Joint,
        }
    }
}

impl ModelConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        assert_eq!(ModelConfig::from_json_str("{}").unwrap(), ModelConfig::default());
    }

    #[test]
    fn partial_override() {
        let config = ModelConfig::from_json_str(
            r#"{"num_rounds": 3, "xor": "shared_with_and", "not_functional_context": "functional_only"}"#,
        )
        .unwrap();
        assert_eq!(config.num_rounds, 3);
        assert_eq!(config.xor, XorBinding::SharedWithAnd);
        assert_eq!(config.not_functional_context, FunctionalContext::FunctionalOnly);
        assert_eq!(config.dim_hidden, 128);
    }

    #[test]
    fn rejects_unknown_xor_mode() {
        assert!(matches!(
            ModelConfig::from_json_str(r#"{"xor": "sometimes"}"#),
            Err(ModelError::Serialization(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            ModelConfig::load("/nonexistent/aigprop/config.json"),
            Err(ModelError::Io(_))
        ));
    }
}
