// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The observation-time-derived total order over infections.
//!
//! Each infection's *inferred* infection time is its observation time minus
//! its (latent, sampled) infection duration. [`Ordering`] keeps infections
//! sorted by that derived time and reports which neighbors a changed
//! infection passed over, mirroring
//! `ObservationTimeDerivedOrdering::infectionDurationChanged`'s
//! moved-left/moved-right walk.

use crate::infection::InfectionId;

/// One step of a reposition: `mover` passed over `over` while moving left
/// or right in the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingEvent {
    MovedLeft { mover: InfectionId, over: InfectionId },
    MovedRight { mover: InfectionId, over: InfectionId },
}

/// The current total order, ascending by inferred infection time.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    entries: Vec<(InfectionId, f64)>,
}

impl Ordering {
    /// Builds the initial order from `(infection, infection_time)` pairs.
    #[must_use]
    pub fn new(mut entries: Vec<(InfectionId, f64)>) -> Self {
        entries.sort_by(|a, b| a.1.total_cmp(&b.1));
        Ordering { entries }
    }

    /// Infections in ascending order of inferred infection time.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = InfectionId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// The number of infections tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Infections ordered strictly before `id`, nearest first then farther.
    #[must_use]
    pub fn predecessors(&self, id: InfectionId) -> Vec<InfectionId> {
        match self.position(id) {
            Some(pos) => self.entries[..pos].iter().map(|(i, _)| *i).collect(),
            None => Vec::new(),
        }
    }

    fn position(&self, id: InfectionId) -> Option<usize> {
        self.entries.iter().position(|(i, _)| *i == id)
    }

    /// Updates `id`'s inferred infection time, re-sorting it into place by
    /// adjacent swaps and returning the sequence of neighbors it passed
    /// over, in the order it passed them.
    ///
    /// Swap-based repositioning costs time proportional to the distance
    /// moved rather than a full re-sort, matching the original source's
    /// walk-and-swap maintenance of the order.
    pub fn update_time(&mut self, id: InfectionId, new_time: f64) -> Vec<OrderingEvent> {
        let Some(mut i) = self.position(id) else {
            return Vec::new();
        };
        self.entries[i].1 = new_time;
        let mut events = Vec::new();

        while i + 1 < self.entries.len() && self.entries[i + 1].1 < new_time {
            let over = self.entries[i + 1].0;
            events.push(OrderingEvent::MovedRight { mover: id, over });
            self.entries.swap(i, i + 1);
            i += 1;
        }
        while i > 0 && self.entries[i - 1].1 > new_time {
            let over = self.entries[i - 1].0;
            events.push(OrderingEvent::MovedLeft { mover: id, over });
            self.entries.swap(i, i - 1);
            i -= 1;
        }
        events
    }

    /// Recovers the event sequence a single `update_time` call produced,
    /// given only the before (`previous`) and after (`self`) orderings.
    ///
    /// An `Ordering`'s value changes in exactly one way in this crate: one
    /// infection's inferred time is updated and it is walked into its new
    /// position. So the infection whose recorded time differs between
    /// `previous` and `self` is that call's `id`, and replaying
    /// `update_time` on a clone of `previous` with that infection's new
    /// time reproduces the identical swap sequence. Used by observers that
    /// only ever see generic before/after value snapshots (see
    /// [`crate::graph::PostChangeObserver`]) and so have no other way to
    /// recover what moved past what.
    #[must_use]
    pub fn events_since(&self, previous: &Ordering) -> Vec<OrderingEvent> {
        let changed = self.entries.iter().find_map(|(id, time)| {
            previous
                .entries
                .iter()
                .find(|(prev_id, _)| prev_id == id)
                .filter(|(_, prev_time)| prev_time != time)
                .map(|_| (*id, *time))
        });
        let Some((mover, new_time)) = changed else {
            return Vec::new();
        };
        previous.clone().update_time(mover, new_time)
    }
}
