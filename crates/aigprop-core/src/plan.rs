//! Level/gate-type grouping for level-synchronous propagation.
//!
//! A [`LevelPlan`] partitions the nodes of a circuit by forward level and,
//! within each level, by gate type. Groups hold forward-index identifiers in
//! ascending node order and are guaranteed to be disjoint within a level, so
//! the scheduler can gather and scatter hidden-state rows per group without
//! aliasing.

use std::collections::BTreeMap;

use crate::error::GraphError;
use crate::gate::GateType;
use crate::graph::{check_index, check_len, CircuitGraph};

/// Nodes of one gate type at one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelGroup {
    pub gate: GateType,
    pub nodes: Vec<usize>,
}

/// Groups of every populated level, keyed by level.
///
/// Levels without nodes take no space, so the plan stays proportional to the
/// node count however far apart the populated levels are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelPlan {
    levels: BTreeMap<u32, Vec<LevelGroup>>,
}

impl LevelPlan {
    /// Derives the plan for `graph`, checking every node identifier against a
    /// state table with `num_rows` rows.
    pub fn new(graph: &CircuitGraph, num_rows: usize) -> Result<Self, GraphError> {
        let n = graph.num_nodes();
        check_len("forward_level", n, graph.forward_levels().len())?;
        check_len("forward_index", n, graph.forward_index().len())?;

        let mut buckets: BTreeMap<u32, BTreeMap<GateType, Vec<usize>>> = BTreeMap::new();
        for ((&gate, &level), &id) in graph
            .gates()
            .iter()
            .zip(graph.forward_levels())
            .zip(graph.forward_index())
        {
            check_index(id, num_rows)?;
            buckets
                .entry(level)
                .or_default()
                .entry(gate)
                .or_default()
                .push(id);
        }

        let mut seen = vec![false; num_rows];
        let mut levels = BTreeMap::new();
        for (level, bucket) in buckets {
            let groups: Vec<LevelGroup> = bucket
                .into_iter()
                .map(|(gate, nodes)| LevelGroup { gate, nodes })
                .collect();
            for node in groups.iter().flat_map(|g| &g.nodes) {
                if std::mem::replace(&mut seen[*node], true) {
                    return Err(GraphError::OverlappingGroups { node: *node, level });
                }
            }
            for node in groups.iter().flat_map(|g| &g.nodes) {
                seen[*node] = false;
            }
            levels.insert(level, groups);
        }

        Ok(LevelPlan { levels })
    }

    /// `max(forward_level) + 1`, or 0 for an empty graph.
    pub fn num_levels(&self) -> usize {
        self.levels
            .last_key_value()
            .map_or(0, |(&max, _)| max as usize + 1)
    }

    /// Populated levels in ascending order with their groups.
    pub fn levels(&self) -> impl Iterator<Item = (usize, &[LevelGroup])> + '_ {
        self.levels
            .iter()
            .map(|(&level, groups)| (level as usize, groups.as_slice()))
    }

    /// All non-empty groups of `level`, in gate-type order.
    pub fn groups(&self, level: usize) -> &[LevelGroup] {
        u32::try_from(level)
            .ok()
            .and_then(|level| self.levels.get(&level))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Nodes of `gate` at `level`; empty when there are none.
    pub fn group(&self, level: usize, gate: GateType) -> &[usize] {
        self.groups(level)
            .iter()
            .find(|g| g.gate == gate)
            .map(|g| g.nodes.as_slice())
            .unwrap_or(&[])
    }
}
