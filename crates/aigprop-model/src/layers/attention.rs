//! Attention-style message aggregator.
//!
//! For a destination `d` with incoming sources `s_1..s_k`:
//!
//! ```text
//! score_j = msg_q(x_d) * msg_k(x_sj)          (element-wise)
//! a       = softmax_j(score)                  (per feature)
//! m_d     = sum_j a_j * msg_v(x_sj)
//! ```
//!
//! Incoming edges are folded in ascending source order, so the message is
//! bit-identical for any permutation of the edge list.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView2, Axis};
use rand_chacha::ChaCha8Rng;

use aigprop_core::{GraphError, SubGraph};

use crate::error::ModelError;
use crate::layers::mlp::Mlp;
use crate::params::{join, ParamSet, Parameterized};

const MLP_LAYERS: usize = 3;

/// Query/key/value MLP aggregator over the incoming edges of each node.
#[derive(Debug, Clone, PartialEq)]
pub struct TfAggregator {
    in_dim: usize,
    out_dim: usize,
    msg_q: Mlp,
    msg_k: Mlp,
    msg_v: Mlp,
}

impl TfAggregator {
    pub fn new(in_dim: usize, out_dim: usize, dim_mlp: usize, rng: &mut ChaCha8Rng) -> Self {
        TfAggregator {
            in_dim,
            out_dim,
            msg_q: Mlp::new(in_dim, dim_mlp, out_dim, MLP_LAYERS, false, rng),
            msg_k: Mlp::new(in_dim, dim_mlp, out_dim, MLP_LAYERS, false, rng),
            msg_v: Mlp::new(in_dim, dim_mlp, out_dim, MLP_LAYERS, false, rng),
        }
    }

    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// Aggregates messages into every destination of `edges`.
    ///
    /// The result has one row per row of `state`; rows of nodes without an
    /// incoming edge in `edges` are zero.
    pub fn forward(
        &self,
        state: ArrayView2<'_, f32>,
        edges: &SubGraph,
    ) -> Result<Array2<f32>, ModelError> {
        ModelError::dims("aggregator input", self.in_dim, state.ncols())?;
        let num_rows = state.nrows();
        let mut out = Array2::<f32>::zeros((num_rows, self.out_dim));
        if edges.is_empty() {
            return Ok(out);
        }

        let mut incoming: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &(src, dst) in &edges.edges {
            for index in [src, dst] {
                if index >= num_rows {
                    return Err(GraphError::InvalidIndex {
                        index,
                        num_nodes: num_rows,
                    }
                    .into());
                }
            }
            incoming.entry(dst).or_default().push(src);
        }
        for sources in incoming.values_mut() {
            sources.sort_unstable();
        }

        // Keys and values are computed once per distinct source row.
        let mut sources: Vec<usize> = incoming.values().flatten().copied().collect();
        sources.sort_unstable();
        sources.dedup();
        let row_of: BTreeMap<usize, usize> =
            sources.iter().enumerate().map(|(row, &src)| (src, row)).collect();
        let src_rows = state.select(Axis(0), &sources);
        let keys = self.msg_k.forward(src_rows.view())?;
        let values = self.msg_v.forward(src_rows.view())?;

        let dests: Vec<usize> = incoming.keys().copied().collect();
        let queries = self.msg_q.forward(state.select(Axis(0), &dests).view())?;

        let mut scores: Vec<f32> = Vec::new();
        for (qi, (&dst, srcs)) in incoming.iter().enumerate() {
            let rows: Vec<usize> = srcs.iter().map(|src| row_of[src]).collect();
            let query = queries.row(qi);
            let mut message = out.row_mut(dst);
            for f in 0..self.out_dim {
                scores.clear();
                let mut max = f32::NEG_INFINITY;
                for &row in &rows {
                    let score = query[f] * keys[[row, f]];
                    max = max.max(score);
                    scores.push(score);
                }
                let mut denom = 0.0f32;
                for score in scores.iter_mut() {
                    *score = (*score - max).exp();
                    denom += *score;
                }
                let mut acc = 0.0f32;
                for (&row, &weight) in rows.iter().zip(&scores) {
                    acc += weight / denom * values[[row, f]];
                }
                message[f] = acc;
            }
        }
        Ok(out)
    }
}

impl Parameterized for TfAggregator {
    fn export_params(&self, prefix: &str, out: &mut ParamSet) {
        self.msg_q.export_params(&join(prefix, "msg_q"), out);
        self.msg_k.export_params(&join(prefix, "msg_k"), out);
        self.msg_v.export_params(&join(prefix, "msg_v"), out);
    }

    fn import_params(&mut self, prefix: &str, params: &ParamSet) -> Result<(), ModelError> {
        let mut staged = self.clone();
        staged.msg_q.import_params(&join(prefix, "msg_q"), params)?;
        staged.msg_k.import_params(&join(prefix, "msg_k"), params)?;
        staged.msg_v.import_params(&join(prefix, "msg_v"), params)?;
        *self = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigprop_core::extract;
    use rand::SeedableRng;

    fn aggregator(in_dim: usize, out_dim: usize) -> TfAggregator {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        TfAggregator::new(in_dim, out_dim, 8, &mut rng)
    }

    fn state(rows: usize, cols: usize) -> Array2<f32> {
        Array2::from_shape_fn((rows, cols), |(r, c)| ((r * 7 + c * 3) % 5) as f32 * 0.25 - 0.5)
    }

    #[test]
    fn non_destination_rows_are_zero() {
        let agg = aggregator(4, 3);
        let edges = [(0, 2), (1, 2), (2, 3)];
        let sub = extract(&[2], &edges, 4).unwrap();
        let msg = agg.forward(state(4, 4).view(), &sub).unwrap();
        assert_eq!(msg.dim(), (4, 3));
        for row in [0, 1, 3] {
            assert!(msg.row(row).iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn single_source_passes_value_through() {
        // With one incoming edge the softmax weight is exactly 1.
        let agg = aggregator(4, 3);
        let x = state(2, 4);
        let sub = extract(&[1], &[(0, 1)], 2).unwrap();
        let msg = agg.forward(x.view(), &sub).unwrap();
        let value = agg.msg_v.forward(x.select(Axis(0), &[0]).view()).unwrap();
        assert_eq!(msg.row(1), value.row(0));
    }

    #[test]
    fn edge_order_does_not_matter() {
        let agg = aggregator(4, 4);
        let x = state(5, 4);
        let a = extract(&[4], &[(0, 4), (1, 4), (3, 4), (1, 4)], 5).unwrap();
        let b = extract(&[4], &[(3, 4), (1, 4), (1, 4), (0, 4)], 5).unwrap();
        assert_eq!(
            agg.forward(x.view(), &a).unwrap(),
            agg.forward(x.view(), &b).unwrap()
        );
    }

    #[test]
    fn shared_sources_resolve_to_their_own_rows() {
        let agg = aggregator(4, 3);
        let x = state(5, 4);
        let edges = [(0, 3), (2, 3), (2, 4), (1, 4), (1, 4)];
        let both = agg.forward(x.view(), &extract(&[3, 4], &edges, 5).unwrap()).unwrap();
        let only_3 = agg.forward(x.view(), &extract(&[3], &edges, 5).unwrap()).unwrap();
        let only_4 = agg.forward(x.view(), &extract(&[4], &edges, 5).unwrap()).unwrap();
        let close = |a: ndarray::ArrayView1<'_, f32>, b: ndarray::ArrayView1<'_, f32>| {
            a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-6)
        };
        assert!(close(both.row(3), only_3.row(3)));
        assert!(close(both.row(4), only_4.row(4)));
        assert!(!close(both.row(3), both.row(4)));
    }

    #[test]
    fn empty_subgraph_yields_zeros() {
        let agg = aggregator(4, 2);
        let msg = agg.forward(state(3, 4).view(), &SubGraph::default()).unwrap();
        assert_eq!(msg, Array2::<f32>::zeros((3, 2)));
    }

    #[test]
    fn rejects_out_of_range_endpoint() {
        let agg = aggregator(4, 2);
        let sub = SubGraph {
            edges: vec![(0, 7)],
            edge_ids: vec![0],
        };
        assert!(matches!(
            agg.forward(state(3, 4).view(), &sub),
            Err(ModelError::Graph(GraphError::InvalidIndex { index: 7, num_nodes: 3 }))
        ));
    }

    #[test]
    fn rejects_wrong_width() {
        let agg = aggregator(4, 2);
        let sub = extract(&[1], &[(0, 1)], 2).unwrap();
        assert!(matches!(
            agg.forward(state(2, 3).view(), &sub),
            Err(ModelError::DimensionMismatch { expected: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn parameter_names() {
        let agg = aggregator(4, 2);
        let mut set = ParamSet::new();
        agg.export_params("aggr_and_strc", &mut set);
        assert_eq!(set.len(), 18);
        assert!(set.contains("aggr_and_strc.msg_q.layers.0.weight"));
        assert_eq!(set.shape("aggr_and_strc.msg_v.layers.2.weight"), Some(&[2, 8][..]));
    }
}
