//! The propagation state machine.
//!
//! ```text
//! ROUND(r), r in 0..num_rounds
//!   LEVEL(l), every populated level l >= 1, ascending
//!     for each bound gate type T, in binding order:
//!       G   = nodes at level l with gate type T     (empty -> skip T)
//!       E   = fan-in edges of G
//!       hs[G] = update_strc(hs[G], aggr_strc(hs, E)[G])
//!       hf[G] = update_func(hf[G], aggr_func(ctx_view, E)[G])
//! ```
//!
//! `ctx_view` is `concat(hs, hf)` rebuilt after the structural update of the
//! same group, or `hf` alone for channels bound with
//! [`FunctionalContext::FunctionalOnly`].

use std::collections::BTreeSet;

use ndarray::{Array2, ArrayView2, Axis};
use tracing::{debug, trace, warn};

use aigprop_core::{CircuitGraph, GateType, LevelPlan, SubGraph};

use crate::binding::{ChannelSet, FunctionalContext, GateBindings};
use crate::context::ExecutionContext;
use crate::error::ModelError;

use super::trace::TraceEntry;
use super::{scatter, HiddenStates};

/// Result of one forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Propagation {
    pub states: HiddenStates,
    /// Processed groups, present only when tracing was enabled.
    pub trace: Option<Vec<TraceEntry>>,
}

/// Runs level-synchronous propagation with a fixed binding table.
#[derive(Debug, Clone, Copy)]
pub struct Propagator<'b> {
    bindings: &'b GateBindings,
    num_rounds: usize,
}

impl<'b> Propagator<'b> {
    pub fn new(bindings: &'b GateBindings, num_rounds: usize) -> Self {
        Propagator {
            bindings,
            num_rounds,
        }
    }

    pub fn num_rounds(&self) -> usize {
        self.num_rounds
    }

    /// Propagates `states` over `graph` and returns the final tables.
    ///
    /// Fails with `InvalidIndex` if a node identifier from the forward index
    /// does not address a row of `states`.
    pub fn run(
        &self,
        ctx: &ExecutionContext,
        graph: &CircuitGraph,
        mut states: HiddenStates,
    ) -> Result<Propagation, ModelError> {
        ModelError::dims("hidden state rows", graph.num_nodes(), states.num_nodes())?;
        ModelError::dims("functional state rows", states.num_nodes(), states.hf.nrows())?;
        if let Some((dim_hs, dim_hf)) = self.bindings.state_dims() {
            ModelError::dims("structural state width", dim_hs, states.hs.ncols())?;
            ModelError::dims("functional state width", dim_hf, states.hf.ncols())?;
        }

        let plan = LevelPlan::new(graph, states.num_nodes())?;
        self.warn_unbound(&plan);

        let mut trace_log = ctx.trace_enabled.then(Vec::new);
        for round in 0..self.num_rounds {
            trace!(round, levels = plan.num_levels(), "propagation round");
            for (level, _) in plan.levels().filter(|&(level, _)| level >= 1) {
                for (gate, channel) in self.bindings.schedule() {
                    let nodes = plan.group(level, gate);
                    if nodes.is_empty() {
                        continue;
                    }
                    let edges = graph.subgraph(nodes)?;
                    debug!(
                        round,
                        level,
                        gate = %gate,
                        channel = channel.name(),
                        nodes = nodes.len(),
                        edges = edges.len(),
                        "propagating group"
                    );
                    step_group(ctx, channel, nodes, &edges, &mut states)?;

                    if let Some(log) = trace_log.as_mut() {
                        log.push(TraceEntry {
                            round,
                            level,
                            gate,
                            channel: channel.name().to_string(),
                            nodes: nodes.to_vec(),
                            edges: edges.len(),
                        });
                    }
                }
            }
        }

        Ok(Propagation {
            states,
            trace: trace_log,
        })
    }

    fn warn_unbound(&self, plan: &LevelPlan) {
        let unbound: BTreeSet<GateType> = plan
            .levels()
            .filter(|&(level, _)| level >= 1)
            .flat_map(|(_, groups)| groups)
            .map(|group| group.gate)
            .filter(|&gate| !self.bindings.is_bound(gate))
            .collect();
        for gate in unbound {
            warn!(gate = %gate, "gate type has no binding; its nodes keep their initial state");
        }
    }
}

/// Structural then functional update of one group.
fn step_group(
    ctx: &ExecutionContext,
    channel: &ChannelSet,
    nodes: &[usize],
    edges: &SubGraph,
    states: &mut HiddenStates,
) -> Result<(), ModelError> {
    let msg = channel.aggr_strc().aggregate(ctx, states.hs.view(), edges)?;
    let next = update_rows(ctx, channel, Channel::Structural, &states.hs, nodes, msg.view())?;
    scatter(&mut states.hs, nodes, next.view())?;

    let joint;
    let view = match channel.functional_context() {
        FunctionalContext::Joint => {
            joint = states.joint()?;
            joint.view()
        }
        FunctionalContext::FunctionalOnly => states.hf.view(),
    };
    let msg = channel.aggr_func().aggregate(ctx, view, edges)?;
    let next = update_rows(ctx, channel, Channel::Functional, &states.hf, nodes, msg.view())?;
    scatter(&mut states.hf, nodes, next.view())
}

#[derive(Clone, Copy)]
enum Channel {
    Structural,
    Functional,
}

/// Gathers the group's previous state and message rows and applies the
/// channel's updater.
fn update_rows(
    ctx: &ExecutionContext,
    channel: &ChannelSet,
    which: Channel,
    table: &Array2<f32>,
    nodes: &[usize],
    msg: ArrayView2<'_, f32>,
) -> Result<Array2<f32>, ModelError> {
    ModelError::dims("message rows", table.nrows(), msg.nrows())?;
    let prev = table.select(Axis(0), nodes);
    let msg = msg.select(Axis(0), nodes);
    let updater = match which {
        Channel::Structural => channel.update_strc(),
        Channel::Functional => channel.update_func(),
    };
    updater.update(ctx, prev.view(), msg.view())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigprop_core::CircuitBuilder;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn bindings(dim: usize) -> GateBindings {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut b = GateBindings::new();
        for name in ["and", "not"] {
            b.add_channel(ChannelSet::reference(name, dim, 8, FunctionalContext::Joint, &mut rng))
                .unwrap();
        }
        b.bind(GateType::And, "and").unwrap();
        b.bind(GateType::Not, "not").unwrap();
        b
    }

    fn seeded_states(graph: &CircuitGraph, dim: usize) -> HiddenStates {
        let mut hs = Array2::<f32>::zeros((graph.num_nodes(), dim));
        for (i, node) in graph.primary_inputs().into_iter().enumerate() {
            hs[[node, i % dim]] = 1.0;
        }
        HiddenStates::new(hs, Array2::zeros((graph.num_nodes(), dim))).unwrap()
    }

    #[test]
    fn traces_groups_in_level_then_binding_order() {
        let mut b = CircuitBuilder::new();
        let x = b.add_input();
        let y = b.add_input();
        let g = b.and(x, y).unwrap();
        let nx = b.not(x).unwrap();
        let h = b.and(g, nx).unwrap();
        let graph = b.build().unwrap();

        let bindings = bindings(4);
        let out = Propagator::new(&bindings, 2)
            .run(&ExecutionContext::cpu().with_trace(), &graph, seeded_states(&graph, 4))
            .unwrap();
        let steps: Vec<(usize, usize, GateType, Vec<usize>)> = out
            .trace
            .unwrap()
            .into_iter()
            .map(|e| (e.round, e.level, e.gate, e.nodes))
            .collect();
        assert_eq!(
            steps,
            vec![
                (0, 1, GateType::And, vec![g]),
                (0, 1, GateType::Not, vec![nx]),
                (0, 2, GateType::And, vec![h]),
                (1, 1, GateType::And, vec![g]),
                (1, 1, GateType::Not, vec![nx]),
                (1, 2, GateType::And, vec![h]),
            ]
        );
    }

    #[test]
    fn trace_is_absent_unless_enabled() {
        let mut b = CircuitBuilder::new();
        let x = b.add_input();
        b.not(x).unwrap();
        let graph = b.build().unwrap();
        let bindings = bindings(4);
        let out = Propagator::new(&bindings, 1)
            .run(&ExecutionContext::cpu(), &graph, seeded_states(&graph, 4))
            .unwrap();
        assert!(out.trace.is_none());
    }

    #[test]
    fn unbound_gate_types_keep_initial_state() {
        let mut b = CircuitBuilder::new();
        let x = b.add_input();
        let y = b.add_input();
        let z = b.xor(x, y).unwrap();
        let graph = b.build().unwrap();

        let bindings = bindings(4);
        let init = seeded_states(&graph, 4);
        let out = Propagator::new(&bindings, 1)
            .run(&ExecutionContext::cpu().with_trace(), &graph, init.clone())
            .unwrap();
        assert_eq!(out.states, init);
        assert_eq!(out.trace, Some(vec![]));
        assert!(out.states.hs.row(z).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn rejects_state_table_of_wrong_size() {
        let mut b = CircuitBuilder::new();
        let x = b.add_input();
        b.not(x).unwrap();
        let graph = b.build().unwrap();
        let bindings = bindings(4);
        let states = HiddenStates::new(Array2::zeros((3, 4)), Array2::zeros((3, 4))).unwrap();
        assert!(matches!(
            Propagator::new(&bindings, 1).run(&ExecutionContext::cpu(), &graph, states),
            Err(ModelError::DimensionMismatch { .. })
        ));
        let states = HiddenStates::new(Array2::zeros((2, 3)), Array2::zeros((2, 4))).unwrap();
        assert!(matches!(
            Propagator::new(&bindings, 1).run(&ExecutionContext::cpu(), &graph, states),
            Err(ModelError::DimensionMismatch { context: "structural state width", .. })
        ));
    }
}
