//! Reference neural building blocks.
//!
//! These are replaceable implementations of the aggregation and update
//! contracts in [`crate::capability`]; the scheduler only sees the traits.

pub mod attention;
pub mod gru;
pub mod linear;
pub mod mlp;
pub mod norm;

pub use attention::TfAggregator;
pub use gru::GruCell;
pub use linear::Linear;
pub use mlp::Mlp;
pub use norm::BatchNorm;
