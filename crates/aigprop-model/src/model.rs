//! The embedding model: bindings, structural initializer and readout.

use std::path::Path;

use ndarray::ArrayView2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use aigprop_core::{CircuitGraph, GateType};

use crate::binding::{ChannelSet, FunctionalContext, GateBindings};
use crate::checkpoint::{reconcile, CheckpointDiagnostic};
use crate::config::{ModelConfig, XorBinding};
use crate::context::ExecutionContext;
use crate::error::ModelError;
use crate::init::{OrthogonalInit, StructuralInit};
use crate::params::{ParamSet, Parameterized};
use crate::propagate::{HiddenStates, Propagation, Propagator};
use crate::readout::Readout;

const READOUT_PREFIX: &str = "readout_prob";

/// A configured, read-only propagation model.
///
/// `&Model` can be shared across threads; every forward pass owns its own
/// hidden-state tables.
#[derive(Debug)]
pub struct Model {
    config: ModelConfig,
    bindings: GateBindings,
    readout: Readout,
    encoder: Box<dyn StructuralInit>,
}

impl Model {
    /// Builds a model with reference components, initialized from
    /// `config.param_seed`.
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let mut rng = ChaCha8Rng::seed_from_u64(config.param_seed);
        let (dim_hidden, dim_mlp) = (config.dim_hidden, config.dim_mlp);

        let mut bindings = GateBindings::new();
        bindings.add_channel(ChannelSet::reference(
            "and",
            dim_hidden,
            dim_mlp,
            FunctionalContext::Joint,
            &mut rng,
        ))?;
        bindings.add_channel(ChannelSet::reference(
            "not",
            dim_hidden,
            dim_mlp,
            config.not_functional_context,
            &mut rng,
        ))?;
        bindings.bind(GateType::And, "and")?;
        bindings.bind(GateType::Not, "not")?;
        match config.xor {
            XorBinding::Disabled => {}
            XorBinding::SharedWithAnd => bindings.bind(GateType::Xor, "and")?,
            XorBinding::Dedicated => {
                bindings.add_channel(ChannelSet::reference(
                    "xor",
                    dim_hidden,
                    dim_mlp,
                    FunctionalContext::Joint,
                    &mut rng,
                ))?;
                bindings.bind(GateType::Xor, "xor")?;
            }
        }

        let readout = Readout::new(dim_hidden, dim_mlp, &mut rng);
        let encoder = Box::new(OrthogonalInit::new(config.init_seed));
        Model::from_parts(config, bindings, readout, encoder)
    }

    /// Assembles a model from custom components.
    pub fn from_parts(
        config: ModelConfig,
        bindings: GateBindings,
        readout: Readout,
        encoder: Box<dyn StructuralInit>,
    ) -> Result<Self, ModelError> {
        let (dim_hs, dim_hf) = bindings.state_dims().ok_or_else(|| ModelError::Binding {
            reason: "no channel set registered".to_string(),
        })?;
        ModelError::dims("structural state width", config.dim_hidden, dim_hs)?;
        ModelError::dims("readout input", dim_hf, readout.input_dim())?;

        let model = Model {
            config,
            bindings,
            readout,
            encoder,
        };
        debug!(
            channels = model.bindings.channels().len(),
            scalars = model.state_dict().num_scalars(),
            "model constructed"
        );
        Ok(model)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn bindings(&self) -> &GateBindings {
        &self.bindings
    }

    pub fn readout(&self) -> &Readout {
        &self.readout
    }

    /// Initial `(hs, hf)` for `graph`: `hf` is zero; `hs` is zero except for
    /// primary-input rows when structural encoding is enabled.
    pub fn init_states(
        &self,
        ctx: &ExecutionContext,
        graph: &CircuitGraph,
    ) -> Result<HiddenStates, ModelError> {
        let n = graph.num_nodes();
        let (mut hs, hf) = self.bindings.zero_states(n);
        if self.config.enable_encode {
            let encoded = self.encoder.init_hs(ctx, graph, hs.ncols())?;
            ModelError::dims("encoded state rows", n, encoded.nrows())?;
            ModelError::dims("encoded state width", hs.ncols(), encoded.ncols())?;
            hs = encoded;
        }
        HiddenStates::new(hs, hf)
    }

    /// Initializes and propagates, returning the states and optional trace.
    pub fn propagate(
        &self,
        ctx: &ExecutionContext,
        graph: &CircuitGraph,
    ) -> Result<Propagation, ModelError> {
        let states = self.init_states(ctx, graph)?;
        Propagator::new(&self.bindings, self.config.num_rounds).run(ctx, graph, states)
    }

    /// Final `(hs, hf)` for `graph`.
    pub fn forward(
        &self,
        ctx: &ExecutionContext,
        graph: &CircuitGraph,
    ) -> Result<HiddenStates, ModelError> {
        Ok(self.propagate(ctx, graph)?.states)
    }

    /// Per-node probabilities from a functional state table.
    pub fn pred_prob(
        &self,
        ctx: &ExecutionContext,
        hf: ArrayView2<'_, f32>,
    ) -> Result<Vec<f32>, ModelError> {
        self.readout.predict_batch(ctx, hf)
    }

    /// Every learned tensor, in construction order.
    pub fn state_dict(&self) -> ParamSet {
        let mut params = ParamSet::new();
        self.bindings.export_params("", &mut params);
        self.readout.export_params(READOUT_PREFIX, &mut params);
        params
    }

    /// Replaces every learned tensor. Fails without modifying the model if
    /// any live parameter is absent or mis-shaped in `params`.
    pub fn load_state_dict(&mut self, params: &ParamSet) -> Result<(), ModelError> {
        for (name, tensor) in self.state_dict().iter() {
            let found = params.shape(name).ok_or_else(|| ModelError::MissingParameter {
                name: name.to_string(),
            })?;
            if found != tensor.shape() {
                return Err(ModelError::ParameterShape {
                    name: name.to_string(),
                    expected: tensor.shape().to_vec(),
                    actual: found.to_vec(),
                });
            }
        }
        self.bindings.import_params("", params)?;
        self.readout.import_params(READOUT_PREFIX, params)
    }

    /// Reconciles `saved` against the live parameters, loads the result and
    /// returns the diagnostics (each is also logged as a warning).
    pub fn load_checkpoint(
        &mut self,
        saved: ParamSet,
    ) -> Result<Vec<CheckpointDiagnostic>, ModelError> {
        let reconciled = reconcile(saved, &self.state_dict());
        for diagnostic in &reconciled.diagnostics {
            warn!("{diagnostic}");
        }
        self.load_state_dict(&reconciled.params)?;
        Ok(reconciled.diagnostics)
    }

    /// [`load_checkpoint`](Self::load_checkpoint) from a JSON parameter file.
    pub fn load_checkpoint_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<CheckpointDiagnostic>, ModelError> {
        self.load_checkpoint(ParamSet::load(path)?)
    }

    /// Convenience: forward pass followed by readout of every node.
    pub fn forward_with_probs(
        &self,
        ctx: &ExecutionContext,
        graph: &CircuitGraph,
    ) -> Result<(HiddenStates, Vec<f32>), ModelError> {
        let states = self.forward(ctx, graph)?;
        let probs = self.pred_prob(ctx, states.hf.view())?;
        Ok((states, probs))
    }
}
