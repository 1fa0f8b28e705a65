// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The order-derived eligible-parent set for one infection.
//!
//! Grounded on `ConstrainedOrderDerivedParentSet`: a child's eligible
//! parents are every infection ordered strictly before it, minus any
//! infection listed in the child's disallowed-parent configuration
//! (captured once at model-construction time, not itself a graph node).
//!
//! Maintained incrementally rather than recomputed: the set is seeded once
//! from the initial order, then a post-change observer registered on
//! `ordering_node` turns each `movedLeft`/`movedRight` event the order
//! produces into a single parent-added or parent-removed delta, mirroring
//! `OrderDerivedParentSet`'s subscription to those same two notifications
//! instead of rescanning `predecessors()` on every read.

use std::sync::Arc;

use crate::graph::{Graph, NodeId, PostChangeObserver};
use crate::infection::InfectionId;
use crate::ordering::{Ordering, OrderingEvent};
use crate::value::{NodeValue, ParentSet};

/// Registers a leaf node holding the eligible-parent set for `child`, kept
/// in step with the order published by `ordering_node` via an observer.
///
/// `ordering` must be `ordering_node`'s current value, used to seed the
/// initial set. The caller must additionally call
/// `graph.add_dependency(ordering_node, id)`: the edge is no longer needed
/// to drive a recompute (this node is a leaf), but checkpoint save/restore
/// still walks it to carry a reorder's parent-set side effects through a
/// rejected proposal.
pub fn add_parent_set(
    graph: &mut Graph,
    name: impl Into<Box<str>>,
    ordering_node: NodeId,
    ordering: &Ordering,
    child: InfectionId,
    disallowed: Vec<InfectionId>,
) -> NodeId {
    let initial: ParentSet = ordering
        .predecessors(child)
        .into_iter()
        .filter(|candidate| *candidate != child && !disallowed.contains(candidate))
        .collect();
    let node = graph.add_leaf(name, NodeValue::ParentSet(initial));

    let observer: PostChangeObserver = Arc::new(move |g: &Graph, old: &NodeValue, new: &NodeValue| {
        let old_ordering = old.as_ordering();
        let new_ordering = new.as_ordering();
        for event in new_ordering.events_since(old_ordering) {
            apply_event(g, node, child, &disallowed, event);
        }
    });
    graph.register_post_change_observer(ordering_node, observer);
    node
}

/// Translates one ordering event into an add/remove delta for `node`, if
/// the event involves `child` at all.
///
/// `mover` passing right over `over` means `mover` now sits after `over`,
/// so `mover` gains `over` as an eligible parent and `over` loses `mover`.
/// Passing left is the mirror image.
fn apply_event(graph: &Graph, node: NodeId, child: InfectionId, disallowed: &[InfectionId], event: OrderingEvent) {
    let (other, becomes_parent) = match event {
        OrderingEvent::MovedRight { mover, over } if mover == child => (over, true),
        OrderingEvent::MovedRight { mover, over } if over == child => (mover, false),
        OrderingEvent::MovedLeft { mover, over } if over == child => (mover, true),
        OrderingEvent::MovedLeft { mover, over } if mover == child => (over, false),
        _ => return,
    };
    if becomes_parent && disallowed.contains(&other) {
        return;
    }
    let mut set = graph.value(node).as_parent_set().clone();
    if becomes_parent {
        set.insert(other);
    } else {
        set.remove(&other);
    }
    graph.set_value(node, NodeValue::ParentSet(set));
}
