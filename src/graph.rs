// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The reactive dependency-graph arena.
//!
//! Nodes live in a single [`Graph`] arena and are addressed by the `Copy`
//! handle [`NodeId`] rather than through shared pointers. Each slot owns a
//! [`NodeKernel`] (dirty flag, dependents, dirty-upstream set, nested saved
//! states) plus a [`NodeValue`] and, for computation nodes, a closure that
//! rebuilds the value from its dependencies.
//!
//! Dirty propagation is push-based and capped at O(edges): marking a node
//! dirty stops recursing into dependents the moment it finds one that is
//! already dirty. Recomputation is pull-based and lazy: `Graph::value` only
//! calls a node's recompute closure when the node is actually read while
//! dirty.

use hashbrown::HashMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::Arc;

use crate::value::NodeValue;

/// A `Copy` handle into a [`Graph`] arena.
///
/// Handles are never reused within a single `Graph`; arena slots grow
/// monotonically for the lifetime of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    #[must_use]
    pub(crate) fn new(index: u32) -> Self {
        NodeId(index)
    }

    #[inline]
    #[must_use]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A nested checkpoint identifier.
///
/// Proposal kernels open a new checkpoint before perturbing state and either
/// restore or accept it afterward; checkpoints can nest when a scheduler
/// allows multiple kernels in flight (the replica-exchange chain stepping
/// a proposal while another thread observes published state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(u64);

impl StateId {
    #[inline]
    #[must_use]
    pub(crate) fn new(generation: u64) -> Self {
        StateId(generation)
    }
}

/// A function that recomputes a computation node's value from the graph.
///
/// Boxed so that [`Graph`] can hold a heterogeneous set of computation
/// kernels in one arena, mirroring the way the original source's
/// `AbstractNode*` dependent lists hold a common interface over
/// heterogeneous concrete node types. Required to be `Send` so that a whole
/// `Graph` (one per replica-exchange rung) can be moved into a scoped thread
/// for concurrent stepping; every recompute closure in this crate only ever
/// captures `Copy` handles and plain numbers, so this bound costs nothing in
/// practice.
pub type RecomputeFn = Box<dyn Fn(&Graph, NodeId) -> NodeValue + Send>;

/// A callback fired after `set_value` commits a leaf's new value, once that
/// value is already visible to `Graph::value`/`Graph::peek`. Observers run
/// synchronously in registration order and are handed the graph itself so
/// they can read or write *other* nodes (never the node that just changed,
/// which would re-enter the borrow that invoked them).
///
/// Mirrors `Parameter<T>::setValue`'s post-change observer callbacks and
/// `registerPostChangeObserver` from the data model. `Arc` rather than
/// `Box` so a registered observer can be cheaply shared out of the slot's
/// `RefCell` before being invoked, rather than invoked while the `RefCell`
/// holding it is still borrowed.
pub type PostChangeObserver = Arc<dyn Fn(&Graph, &NodeValue, &NodeValue) + Send + Sync>;

/// Bookkeeping shared by every arena slot: dirty flag, dependents, the
/// dirty-upstream set used by incremental accumulators, nested saved
/// states, and registered post-change observers.
///
/// This is the `Observable` + `Checkpointable` capability pair from the
/// data model, implemented as a struct a node embeds rather than a base
/// class a node inherits from.
#[derive(Default)]
struct NodeKernel {
    dirty: bool,
    dependents: Vec<NodeId>,
    /// Upstream dependencies currently known to be dirty, paired with the
    /// value each held the moment it was marked (i.e. before its own
    /// change was written), used by accumulator-style nodes to subtract an
    /// old contribution and add the fresh one. A sorted `Vec` stands in
    /// for the original source's `flat_set`.
    dirty_upstream: Vec<(NodeId, NodeValue)>,
    saved: Vec<(StateId, NodeValue)>,
    observers: Vec<PostChangeObserver>,
}

impl fmt::Debug for NodeKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeKernel")
            .field("dirty", &self.dirty)
            .field("dependents", &self.dependents)
            .field("dirty_upstream", &self.dirty_upstream)
            .field("saved", &self.saved)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl NodeKernel {
    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn add_dependent(&mut self, dependent: NodeId) {
        if !self.dependents.contains(&dependent) {
            self.dependents.push(dependent);
        }
    }

    /// Records `source` as dirty, capturing `old_value` as the value it
    /// held at the moment it was marked. A source already pending in the
    /// list keeps its first-recorded value: if it changes twice before an
    /// accumulator ever reads, only the value from *before the first*
    /// change is the correct subtrahend.
    fn add_dirty_upstream(&mut self, source: NodeId, old_value: NodeValue) {
        if let Err(pos) = self.dirty_upstream.binary_search_by_key(&source, |(id, _)| *id) {
            self.dirty_upstream.insert(pos, (source, old_value));
        }
    }

    fn take_dirty_upstream(&mut self) -> Vec<(NodeId, NodeValue)> {
        core::mem::take(&mut self.dirty_upstream)
    }

    fn set_clean(&mut self) {
        self.dirty = false;
        self.dirty_upstream.clear();
    }

    fn save(&mut self, state: StateId, value: NodeValue) {
        debug_assert!(
            !self.dirty,
            "saveState called on a node that has not been brought up to date"
        );
        if self.saved.iter().any(|(id, _)| *id == state) {
            return;
        }
        self.saved.push((state, value));
    }

    fn take_save(&mut self, state: StateId) -> Option<NodeValue> {
        let pos = self.saved.iter().position(|(id, _)| *id == state)?;
        Some(self.saved.remove(pos).1)
    }

    fn discard_save(&mut self, state: StateId) {
        self.saved.retain(|(id, _)| *id != state);
    }
}

struct Slot {
    kernel: RefCell<NodeKernel>,
    value: RefCell<NodeValue>,
    recompute: Option<RecomputeFn>,
    name: Box<str>,
}

/// The arena holding every node in a model.
///
/// `Graph` hands out [`NodeId`] handles from `add_leaf`/`add_computation` and
/// is otherwise read through shared references: recomputation uses
/// `RefCell`-per-slot interior mutability so that a computation node's
/// recompute closure can call back into `Graph::value` for its own
/// dependencies without the caller needing `&mut Graph`. Safety relies on
/// the model graph being acyclic, which `add_dependency` checks in debug
/// builds.
#[derive(Default)]
pub struct Graph {
    slots: Vec<Slot>,
    next_state: Cell<u64>,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Graph {
            slots: Vec::new(),
            next_state: Cell::new(0),
        }
    }

    /// Adds a leaf (`Parameter`-like) node with an initial value and no
    /// recompute function; its value only ever changes via `set_value`.
    pub fn add_leaf(&mut self, name: impl Into<Box<str>>, initial: NodeValue) -> NodeId {
        let id = NodeId::new(self.slots.len() as u32);
        self.slots.push(Slot {
            kernel: RefCell::new(NodeKernel::default()),
            value: RefCell::new(initial),
            recompute: None,
            name: name.into(),
        });
        id
    }

    /// Adds a computation node that starts dirty and recomputes its value
    /// from `recompute` the first time it is read.
    pub fn add_computation(
        &mut self,
        name: impl Into<Box<str>>,
        recompute: RecomputeFn,
    ) -> NodeId {
        let id = NodeId::new(self.slots.len() as u32);
        let mut kernel = NodeKernel::default();
        kernel.dirty = true;
        self.slots.push(Slot {
            kernel: RefCell::new(kernel),
            value: RefCell::new(NodeValue::Unit),
            recompute: Some(recompute),
            name: name.into(),
        });
        id
    }

    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.index()]
    }

    /// The human-readable name a node was registered under, for logging.
    #[must_use]
    pub fn name(&self, id: NodeId) -> &str {
        &self.slot(id).name
    }

    /// Declares that `dependent` reads `source`, so that `source` becoming
    /// dirty must propagate to `dependent`.
    ///
    /// Debug builds assert this does not create a cycle by walking
    /// `dependent`'s existing dependents and refusing to add an edge that
    /// would make `source` reachable from itself.
    pub fn add_dependency(&self, source: NodeId, dependent: NodeId) {
        debug_assert!(
            !self.reaches(dependent, source),
            "add_dependency({source}, {dependent}) would create a cycle"
        );
        self.slot(source).kernel.borrow_mut().add_dependent(dependent);
    }

    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }
        let dependents = self.slot(from).kernel.borrow().dependents.clone();
        dependents.into_iter().any(|d| self.reaches(d, to))
    }

    /// Whether a node's cached value is stale.
    #[must_use]
    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.slot(id).kernel.borrow().is_dirty()
    }

    /// Marks `id` dirty because `source` changed, propagating to `id`'s own
    /// dependents only the first time `id` transitions from clean to dirty.
    ///
    /// This mirrors `AbstractNode::setDirty(AbstractNode*)`: the recursion
    /// is capped at O(edges) because a node already marked dirty does not
    /// re-notify its dependents. `source`'s value is snapshotted *here*,
    /// before the caller overwrites it, since `source.peek()` would
    /// otherwise already reflect the new value by the time an accumulator
    /// gets around to reading it.
    pub fn mark_dirty_from(&self, id: NodeId, source: NodeId) {
        let old_value = self.peek(source);
        let (became_dirty, dependents) = {
            let mut kernel = self.slot(id).kernel.borrow_mut();
            let was_clean = !kernel.is_dirty();
            kernel.dirty = true;
            kernel.add_dirty_upstream(source, old_value);
            (was_clean, kernel.dependents.clone())
        };
        if became_dirty {
            for dependent in dependents {
                self.mark_dirty_from(dependent, id);
            }
        }
    }

    /// Marks `id` itself dirty (no upstream source), propagating to
    /// dependents. Used by leaves when their own value changes directly.
    pub fn mark_dirty(&self, id: NodeId) {
        let (became_dirty, dependents) = {
            let mut kernel = self.slot(id).kernel.borrow_mut();
            let was_clean = !kernel.is_dirty();
            kernel.dirty = true;
            (was_clean, kernel.dependents.clone())
        };
        if became_dirty {
            for dependent in dependents {
                self.mark_dirty_from(dependent, id);
            }
        }
    }

    /// The upstream dependencies currently flagged dirty for `id`, paired
    /// with the value each held just before it changed, cleared as a side
    /// effect. Used by `Accumulator::value` to know which children's
    /// contributions need re-pulling and what to subtract for each.
    pub(crate) fn take_dirty_upstream(&self, id: NodeId) -> Vec<(NodeId, NodeValue)> {
        self.slot(id).kernel.borrow_mut().take_dirty_upstream()
    }

    /// Registers `observer` to run after every future `set_value(id, ...)`
    /// call on this node, once the new value is already visible, in
    /// registration order. Mirrors `registerPostChangeObserver`.
    pub fn register_post_change_observer(&self, id: NodeId, observer: PostChangeObserver) {
        self.slot(id).kernel.borrow_mut().observers.push(observer);
    }

    /// Sets a leaf's value directly: mark dirty, write, mark clean, fire
    /// post-change observers, matching `Parameter<T>::setValue`.
    ///
    /// # Panics
    /// Panics (via `debug_assert!`) if `id` was registered as a computation
    /// node, since those only change through their recompute closure.
    pub fn set_value(&self, id: NodeId, value: NodeValue) {
        debug_assert!(
            self.slot(id).recompute.is_none(),
            "set_value called on computation node {id}"
        );
        self.mark_dirty(id);
        let old_value = self.slot(id).value.borrow().clone();
        *self.slot(id).value.borrow_mut() = value.clone();
        self.slot(id).kernel.borrow_mut().set_clean();

        let observers = self.slot(id).kernel.borrow().observers.clone();
        for observer in &observers {
            observer(self, &old_value, &value);
        }
    }

    /// Sets a leaf's initial value without marking dependents dirty or
    /// firing observers — the hot-restart path.
    pub fn initialize_value(&self, id: NodeId, value: NodeValue) {
        *self.slot(id).value.borrow_mut() = value;
        self.slot(id).kernel.borrow_mut().set_clean();
    }

    /// Returns the up-to-date value of `id`, recomputing it first if dirty.
    ///
    /// Recursion into dependency values happens through further calls to
    /// `Graph::value`, each of which only holds its own slot's `RefCell`
    /// borrow for the duration of that one call.
    #[must_use]
    pub fn value(&self, id: NodeId) -> NodeValue {
        let needs_recompute = self.slot(id).kernel.borrow().is_dirty();
        if needs_recompute {
            if let Some(recompute) = &self.slot(id).recompute {
                let fresh = recompute(self, id);
                *self.slot(id).value.borrow_mut() = fresh;
            }
            self.slot(id).kernel.borrow_mut().set_clean();
        }
        self.slot(id).value.borrow().clone()
    }

    /// Returns the last committed value without triggering recomputation,
    /// even if the node is dirty.
    ///
    /// This is the staleness invariant `Accumulator` relies on for its
    /// subtract-old/add-new incremental update.
    #[must_use]
    pub fn peek(&self, id: NodeId) -> NodeValue {
        self.slot(id).value.borrow().clone()
    }

    /// Opens a new checkpoint generation for a proposal.
    #[must_use]
    pub fn begin_checkpoint(&self) -> StateId {
        let generation = self.next_state.get();
        self.next_state.set(generation + 1);
        StateId::new(generation)
    }

    /// Snapshots `id`'s current value under `state`, recursing into
    /// dependents first so that a dependent is never saved "under" a value
    /// that is about to change beneath it — matching
    /// `Node<T>::saveState`'s dependents-first recursion order.
    ///
    /// Requires `id` to be clean (`debug_assert!`), matching the original
    /// source's `assert(!is_dirty_)`.
    pub fn save_state(&self, id: NodeId, state: StateId) {
        let dependents = self.slot(id).kernel.borrow().dependents.clone();
        for dependent in dependents {
            self.save_state(dependent, state);
        }
        let value = self.slot(id).value.borrow().clone();
        self.slot(id).kernel.borrow_mut().save(state, value);
    }

    /// Restores `id` (and its dependents, recursively, dependents-first) to
    /// the value captured under `state`, marking each restored node clean.
    pub fn restore_state(&self, id: NodeId, state: StateId) {
        let dependents = self.slot(id).kernel.borrow().dependents.clone();
        for dependent in dependents {
            self.restore_state(dependent, state);
        }
        let mut kernel = self.slot(id).kernel.borrow_mut();
        if let Some(value) = kernel.take_save(state) {
            *self.slot(id).value.borrow_mut() = value;
        }
        kernel.set_clean();
    }

    /// Commits `id`'s (and its dependents', recursively) current value as
    /// permanent, discarding the saved snapshot under `state`.
    pub fn accept_state(&self, id: NodeId, state: StateId) {
        let dependents = self.slot(id).kernel.borrow().dependents.clone();
        for dependent in dependents {
            self.accept_state(dependent, state);
        }
        let mut kernel = self.slot(id).kernel.borrow_mut();
        kernel.discard_save(state);
        kernel.set_clean();
    }
}

/// A handle-keyed table for attaching arbitrary per-node book-keeping (for
/// example, scheduler eligibility windows or per-kernel acceptance
/// counters) without widening `Graph` itself.
pub type NodeTable<V> = HashMap<NodeId, V>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::NodeValue;

    fn scalar(graph: &mut Graph, name: &str, v: f64) -> NodeId {
        graph.add_leaf(name, NodeValue::Scalar(v))
    }

    #[test]
    fn leaf_starts_clean_and_set_value_is_visible_immediately() {
        let mut graph = Graph::new();
        let a = scalar(&mut graph, "a", 1.0);
        assert!(!graph.is_dirty(a));
        graph.set_value(a, NodeValue::Scalar(2.0));
        assert!(!graph.is_dirty(a));
        assert_eq!(graph.value(a), NodeValue::Scalar(2.0));
    }

    #[test]
    fn computation_recomputes_lazily_and_caches() {
        let mut graph = Graph::new();
        let a = scalar(&mut graph, "a", 1.0);
        let b = scalar(&mut graph, "b", 2.0);
        let sum = graph.add_computation(
            "sum",
            Box::new(move |g: &Graph, _id: NodeId| {
                let NodeValue::Scalar(a) = g.value(a) else {
                    unreachable!()
                };
                let NodeValue::Scalar(b) = g.value(b) else {
                    unreachable!()
                };
                NodeValue::Scalar(a + b)
            }),
        );
        graph.add_dependency(a, sum);
        graph.add_dependency(b, sum);
        assert!(graph.is_dirty(sum));
        assert_eq!(graph.value(sum), NodeValue::Scalar(3.0));
        assert!(!graph.is_dirty(sum));
    }

    #[test]
    fn dirty_propagates_through_chain_and_stops_once_marked() {
        let mut graph = Graph::new();
        let a = scalar(&mut graph, "a", 1.0);
        let b = graph.add_computation("b", Box::new(move |g, _| g.value(a)));
        let c = graph.add_computation("c", Box::new(move |g, _| g.value(b)));
        graph.add_dependency(a, b);
        graph.add_dependency(b, c);
        let _ = graph.value(c);
        assert!(!graph.is_dirty(c));
        graph.set_value(a, NodeValue::Scalar(5.0));
        assert!(graph.is_dirty(b));
        assert!(graph.is_dirty(c));
        assert_eq!(graph.value(c), NodeValue::Scalar(5.0));
    }

    #[test]
    fn save_restore_round_trips_and_restores_dependents() {
        let mut graph = Graph::new();
        let a = scalar(&mut graph, "a", 1.0);
        let b = graph.add_computation("b", Box::new(move |g, _| g.value(a)));
        graph.add_dependency(a, b);
        let _ = graph.value(b);
        let state = graph.begin_checkpoint();
        graph.save_state(a, state);
        graph.set_value(a, NodeValue::Scalar(42.0));
        let _ = graph.value(b);
        assert_eq!(graph.value(b), NodeValue::Scalar(42.0));
        graph.restore_state(a, state);
        assert_eq!(graph.value(a), NodeValue::Scalar(1.0));
        assert_eq!(graph.value(b), NodeValue::Scalar(1.0));
    }

    #[test]
    fn accept_state_discards_snapshot_and_keeps_new_value() {
        let mut graph = Graph::new();
        let a = scalar(&mut graph, "a", 1.0);
        let state = graph.begin_checkpoint();
        graph.save_state(a, state);
        graph.set_value(a, NodeValue::Scalar(9.0));
        graph.accept_state(a, state);
        assert_eq!(graph.value(a), NodeValue::Scalar(9.0));
    }

    #[test]
    fn peek_never_triggers_recomputation() {
        let mut graph = Graph::new();
        let a = scalar(&mut graph, "a", 1.0);
        let b = graph.add_computation("b", Box::new(move |g, _| g.value(a)));
        graph.add_dependency(a, b);
        let _ = graph.value(b);
        graph.set_value(a, NodeValue::Scalar(7.0));
        assert!(graph.is_dirty(b));
        assert_eq!(graph.peek(b), NodeValue::Scalar(1.0));
    }

    #[test]
    fn dirty_upstream_snapshot_captures_the_pre_change_value() {
        let mut graph = Graph::new();
        let a = scalar(&mut graph, "a", 1.0);
        let dependent = graph.add_computation("dependent", Box::new(|_, _| NodeValue::Unit));
        graph.add_dependency(a, dependent);
        assert!(graph.is_dirty(dependent));
        graph.take_dirty_upstream(dependent);

        graph.set_value(a, NodeValue::Scalar(9.0));
        let snapshot = graph.take_dirty_upstream(dependent);
        assert_eq!(snapshot, vec![(a, NodeValue::Scalar(1.0))]);
    }

    #[test]
    fn post_change_observers_fire_in_registration_order_after_the_new_value_is_visible() {
        use std::sync::Mutex;

        let mut graph = Graph::new();
        let a = scalar(&mut graph, "a", 1.0);
        let calls: Arc<Mutex<Vec<(&'static str, f64, f64)>>> = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&calls);
        graph.register_post_change_observer(
            a,
            Arc::new(move |g, old, new| {
                first.lock().unwrap().push(("first", old.as_scalar(), new.as_scalar()));
                assert_eq!(g.value(a), *new, "observer must see the new value already committed");
            }),
        );
        let second = Arc::clone(&calls);
        graph.register_post_change_observer(
            a,
            Arc::new(move |_, old, new| {
                second.lock().unwrap().push(("second", old.as_scalar(), new.as_scalar()));
            }),
        );

        graph.set_value(a, NodeValue::Scalar(2.0));
        let log = calls.lock().unwrap().clone();
        assert_eq!(log, vec![("first", 1.0, 2.0), ("second", 1.0, 2.0)]);
    }
}
