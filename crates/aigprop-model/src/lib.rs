//! Level-synchronous embedding propagation over And-Inverter Graphs.
//!
//! A [`Model`] owns a [`GateBindings`] table that maps every non-input gate
//! type to a [`ChannelSet`] (structural and functional aggregators and
//! updaters), a structural initializer for primary inputs and a [`Readout`]
//! head. A forward pass:
//!
//! 1. seeds `hs` for primary inputs and zeroes everything else,
//! 2. sweeps rounds x levels x bound gate types with [`Propagator`],
//! 3. optionally maps `hf` rows to probabilities.
//!
//! Learned tensors live in a [`ParamSet`] keyed by dotted paths such as
//! `aggr_and_strc.msg_q.layers.0.weight`; saved sets are matched against the
//! live one by [`checkpoint::reconcile`].
//!
//! Every call takes an explicit [`ExecutionContext`].

pub mod binding;
pub mod capability;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod error;
pub mod init;
pub mod layers;
pub mod model;
pub mod params;
pub mod propagate;
pub mod readout;

pub use binding::{ChannelSet, FunctionalContext, GateBindings};
pub use capability::{Aggregate, Update};
pub use checkpoint::{reconcile, CheckpointDiagnostic, Reconciled};
pub use config::{ModelConfig, XorBinding};
pub use context::{Device, ExecutionContext};
pub use error::ModelError;
pub use init::{OrthogonalInit, StructuralInit};
pub use model::Model;
pub use params::{ParamSet, Parameterized};
pub use propagate::{HiddenStates, Propagation, Propagator, TraceEntry};
pub use readout::{clamp_probability, Readout};
