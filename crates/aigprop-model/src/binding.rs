//! Gate-type to channel-set binding table.
//!
//! A [`ChannelSet`] bundles the structural and functional aggregator and
//! updater used for one family of gates. [`GateBindings`] maps each non-input
//! [`GateType`] to a channel set and fixes the order in which gate types are
//! processed within a level. Several gate types may share one channel set,
//! in which case they also share its parameters.

use ndarray::Array2;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use aigprop_core::GateType;

use crate::capability::{Aggregate, Update};
use crate::error::ModelError;
use crate::layers::{GruCell, TfAggregator};
use crate::params::{join, ParamSet, Parameterized};

/// Which view of the hidden states a functional aggregator reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionalContext {
    /// `concat(hs, hf)`, recomputed after the structural update.
    #[default]
    Joint,
    /// `hf` alone.
    FunctionalOnly,
}

/// Aggregators and updaters for the structural and functional channels.
#[derive(Debug)]
pub struct ChannelSet {
    name: String,
    functional_context: FunctionalContext,
    aggr_strc: Box<dyn Aggregate>,
    aggr_func: Box<dyn Aggregate>,
    update_strc: Box<dyn Update>,
    update_func: Box<dyn Update>,
}

impl ChannelSet {
    /// Assembles a channel set, checking that the four components agree on
    /// their widths.
    pub fn new(
        name: impl Into<String>,
        functional_context: FunctionalContext,
        aggr_strc: Box<dyn Aggregate>,
        aggr_func: Box<dyn Aggregate>,
        update_strc: Box<dyn Update>,
        update_func: Box<dyn Update>,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        let dim_hs = update_strc.hidden_dim();
        let dim_hf = update_func.hidden_dim();
        let func_in = match functional_context {
            FunctionalContext::Joint => dim_hs + dim_hf,
            FunctionalContext::FunctionalOnly => dim_hf,
        };
        let checks = [
            ("structural aggregator input", dim_hs, aggr_strc.input_dim()),
            ("structural updater input", aggr_strc.output_dim(), update_strc.input_dim()),
            ("functional aggregator input", func_in, aggr_func.input_dim()),
            ("functional updater input", aggr_func.output_dim(), update_func.input_dim()),
        ];
        for (what, expected, actual) in checks {
            if expected != actual {
                return Err(ModelError::Binding {
                    reason: format!("channel '{name}': {what} is {actual}, expected {expected}"),
                });
            }
        }
        Ok(ChannelSet {
            name,
            functional_context,
            aggr_strc,
            aggr_func,
            update_strc,
            update_func,
        })
    }

    /// Attention aggregators and GRU updaters with `dim_hidden`-wide states.
    pub fn reference(
        name: impl Into<String>,
        dim_hidden: usize,
        dim_mlp: usize,
        functional_context: FunctionalContext,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let func_in = match functional_context {
            FunctionalContext::Joint => 2 * dim_hidden,
            FunctionalContext::FunctionalOnly => dim_hidden,
        };
        ChannelSet {
            name: name.into(),
            functional_context,
            aggr_strc: Box::new(TfAggregator::new(dim_hidden, dim_hidden, dim_mlp, rng)),
            aggr_func: Box::new(TfAggregator::new(func_in, dim_hidden, dim_mlp, rng)),
            update_strc: Box::new(GruCell::new(dim_hidden, dim_hidden, rng)),
            update_func: Box::new(GruCell::new(dim_hidden, dim_hidden, rng)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn functional_context(&self) -> FunctionalContext {
        self.functional_context
    }

    pub fn aggr_strc(&self) -> &dyn Aggregate {
        self.aggr_strc.as_ref()
    }

    pub fn aggr_func(&self) -> &dyn Aggregate {
        self.aggr_func.as_ref()
    }

    pub fn update_strc(&self) -> &dyn Update {
        self.update_strc.as_ref()
    }

    pub fn update_func(&self) -> &dyn Update {
        self.update_func.as_ref()
    }

    /// Width of the structural state.
    pub fn dim_hs(&self) -> usize {
        self.update_strc.hidden_dim()
    }

    /// Width of the functional state.
    pub fn dim_hf(&self) -> usize {
        self.update_func.hidden_dim()
    }
}

impl Parameterized for ChannelSet {
    fn export_params(&self, prefix: &str, out: &mut ParamSet) {
        let name = &self.name;
        self.aggr_strc.export_params(&join(prefix, &format!("aggr_{name}_strc")), out);
        self.aggr_func.export_params(&join(prefix, &format!("aggr_{name}_func")), out);
        self.update_strc.export_params(&join(prefix, &format!("update_{name}_strc")), out);
        self.update_func.export_params(&join(prefix, &format!("update_{name}_func")), out);
    }

    fn import_params(&mut self, prefix: &str, params: &ParamSet) -> Result<(), ModelError> {
        let name = self.name.clone();
        self.aggr_strc.import_params(&join(prefix, &format!("aggr_{name}_strc")), params)?;
        self.aggr_func.import_params(&join(prefix, &format!("aggr_{name}_func")), params)?;
        self.update_strc.import_params(&join(prefix, &format!("update_{name}_strc")), params)?;
        self.update_func.import_params(&join(prefix, &format!("update_{name}_func")), params)?;
        Ok(())
    }
}

/// Ordered binding of gate types to channel sets.
#[derive(Debug, Default)]
pub struct GateBindings {
    channels: Vec<ChannelSet>,
    /// Gate types in processing order, each with its channel index.
    schedule: Vec<(GateType, usize)>,
}

impl GateBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a channel set; names must be unique.
    pub fn add_channel(&mut self, channel: ChannelSet) -> Result<(), ModelError> {
        if self.channel(channel.name()).is_some() {
            return Err(ModelError::Binding {
                reason: format!("channel '{}' is already registered", channel.name()),
            });
        }
        if let Some(first) = self.channels.first() {
            if (first.dim_hs(), first.dim_hf()) != (channel.dim_hs(), channel.dim_hf()) {
                return Err(ModelError::Binding {
                    reason: format!(
                        "channel '{}' has state widths ({}, {}), expected ({}, {})",
                        channel.name(),
                        channel.dim_hs(),
                        channel.dim_hf(),
                        first.dim_hs(),
                        first.dim_hf()
                    ),
                });
            }
        }
        self.channels.push(channel);
        Ok(())
    }

    /// Binds `gate` to a registered channel. Gate types are processed within a
    /// level in the order they were bound.
    pub fn bind(&mut self, gate: GateType, channel: &str) -> Result<(), ModelError> {
        if gate.is_input() {
            return Err(ModelError::Binding {
                reason: format!("gate type '{gate}' has no fan-in and cannot be bound"),
            });
        }
        if self.is_bound(gate) {
            return Err(ModelError::Binding {
                reason: format!("gate type '{gate}' is already bound"),
            });
        }
        let index = self
            .channels
            .iter()
            .position(|c| c.name() == channel)
            .ok_or_else(|| ModelError::Binding {
                reason: format!("unknown channel '{channel}'"),
            })?;
        self.schedule.push((gate, index));
        Ok(())
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelSet> {
        self.channels.iter().find(|c| c.name() == name)
    }

    pub fn channels(&self) -> &[ChannelSet] {
        &self.channels
    }

    /// Channel set `gate` is bound to.
    pub fn channel_for(&self, gate: GateType) -> Option<&ChannelSet> {
        self.schedule
            .iter()
            .find(|&&(g, _)| g == gate)
            .map(|&(_, i)| &self.channels[i])
    }

    pub fn is_bound(&self, gate: GateType) -> bool {
        self.schedule.iter().any(|&(g, _)| g == gate)
    }

    /// Bound gate types in processing order.
    pub fn schedule(&self) -> impl Iterator<Item = (GateType, &ChannelSet)> + '_ {
        self.schedule
            .iter()
            .map(move |&(gate, i)| (gate, &self.channels[i]))
    }

    /// `(dim_hs, dim_hf)` shared by every channel, if any is registered.
    pub fn state_dims(&self) -> Option<(usize, usize)> {
        self.channels.first().map(|c| (c.dim_hs(), c.dim_hf()))
    }

    /// Zero-initialized `(hs, hf)` tables for `num_nodes` nodes.
    pub fn zero_states(&self, num_nodes: usize) -> (Array2<f32>, Array2<f32>) {
        let (dim_hs, dim_hf) = self.state_dims().unwrap_or((0, 0));
        (
            Array2::zeros((num_nodes, dim_hs)),
            Array2::zeros((num_nodes, dim_hf)),
        )
    }
}

impl Parameterized for GateBindings {
    fn export_params(&self, prefix: &str, out: &mut ParamSet) {
        for channel in &self.channels {
            channel.export_params(prefix, out);
        }
    }

    fn import_params(&mut self, prefix: &str, params: &ParamSet) -> Result<(), ModelError> {
        for channel in &mut self.channels {
            channel.import_params(prefix, params)?;
        }
        Ok(())
    }
}
