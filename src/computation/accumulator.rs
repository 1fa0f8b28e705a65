// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental summation of scalar children.
//!
//! Grounded on `Likelihood::value()`'s subtract-old/add-new update: only the
//! children recorded dirty since the accumulator's own last clean read are
//! re-pulled, and each is removed from the running total at the value it
//! held at the moment it was marked dirty (snapshotted by `mark_dirty_from`,
//! since a leaf child's slot is overwritten before the accumulator ever
//! runs) before being re-added at its fresh (recomputed) one. The first ever
//! read instead sums every child from scratch (the original source's
//! `reinitialize()` path), since there is no running total yet to adjust
//! incrementally.

use crate::graph::{Graph, NodeId};
use crate::value::NodeValue;

/// Registers an accumulator node that sums the scalar values of `children`.
///
/// Used for the top-level log-likelihood and log-posterior totals, where
/// each child is itself a likelihood contribution that may independently
/// become dirty as the parameters it depends on are perturbed. Callers must
/// also wire `graph.add_dependency(child, id)` for each child so that a
/// child becoming dirty actually reaches this node.
pub fn add_accumulator(graph: &mut Graph, name: impl Into<Box<str>>, children: Vec<NodeId>) -> NodeId {
    graph.add_computation(
        name,
        Box::new(move |g: &Graph, id: NodeId| {
            let previous = g.peek(id);
            if matches!(previous, NodeValue::Unit) {
                let total: f64 = children.iter().map(|c| g.value(*c).as_scalar()).sum();
                return NodeValue::Scalar(total);
            }
            let mut total = previous.as_scalar();
            for (child, old_value) in g.take_dirty_upstream(id) {
                total -= old_value.as_scalar();
                total += g.value(child).as_scalar();
            }
            NodeValue::Scalar(total)
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    #[test]
    fn sums_children_on_first_read() {
        let mut graph = Graph::new();
        let a = graph.add_leaf("a", NodeValue::Scalar(1.0));
        let b = graph.add_leaf("b", NodeValue::Scalar(2.0));
        let sum = add_accumulator(&mut graph, "sum", vec![a, b]);
        graph.add_dependency(a, sum);
        graph.add_dependency(b, sum);
        assert_eq!(graph.value(sum), NodeValue::Scalar(3.0));
    }

    #[test]
    fn incremental_update_reflects_only_changed_children() {
        let mut graph = Graph::new();
        let a = graph.add_leaf("a", NodeValue::Scalar(1.0));
        let b = graph.add_leaf("b", NodeValue::Scalar(2.0));
        let c = graph.add_leaf("c", NodeValue::Scalar(3.0));
        let sum = add_accumulator(&mut graph, "sum", vec![a, b, c]);
        graph.add_dependency(a, sum);
        graph.add_dependency(b, sum);
        graph.add_dependency(c, sum);
        assert_eq!(graph.value(sum), NodeValue::Scalar(6.0));

        graph.set_value(b, NodeValue::Scalar(10.0));
        assert_eq!(graph.value(sum), NodeValue::Scalar(14.0));
    }
}
