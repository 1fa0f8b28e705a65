// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The dynamic value carried by a graph node.
//!
//! The model only ever needs a small fixed set of concrete payload types, so
//! rather than making [`crate::graph::Graph`] generic over a node's value
//! type (which would force a separate arena per type and make cross-type
//! dependencies awkward), every slot holds one [`NodeValue`]. This mirrors
//! the teacher's own `Value` enum sitting inside a single node arena, just
//! with a different set of variants.

use crate::genotype::Genotype;
use crate::infection::InfectionId;
use crate::ordering::Ordering as EventOrdering;
use crate::simplex::Simplex;

use std::collections::BTreeSet;

/// A parent-set realization: the set of infections eligible as a parent of
/// a given infection under the order-derived constraint.
pub type ParentSet = BTreeSet<InfectionId>;

/// The payload carried by a single arena slot.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    /// Placeholder for a not-yet-computed computation node.
    Unit,
    /// A continuous scalar: durations, rates, log-likelihood contributions.
    Scalar(f64),
    /// A bounded non-negative integer: COI, strain counts.
    Count(i64),
    /// A boolean flag, e.g. "null model" toggles.
    Flag(bool),
    /// A fixed-width allele bitset.
    Genotype(Genotype),
    /// An allele-frequency simplex.
    Simplex(Simplex),
    /// The observation-time-derived total order over infections.
    Ordering(EventOrdering),
    /// A derived eligible-parent set for one infection.
    ParentSet(ParentSet),
}

impl NodeValue {
    /// Unwraps a [`NodeValue::Scalar`], panicking on any other variant.
    ///
    /// Graph wiring is internal to this crate and each computation closure
    /// knows the shape of its own dependencies, so a mismatch here is a
    /// programming error, not a user-facing one.
    #[must_use]
    pub fn as_scalar(&self) -> f64 {
        match self {
            NodeValue::Scalar(v) => *v,
            other => panic!("expected NodeValue::Scalar, found {other:?}"),
        }
    }

    #[must_use]
    pub fn as_count(&self) -> i64 {
        match self {
            NodeValue::Count(v) => *v,
            other => panic!("expected NodeValue::Count, found {other:?}"),
        }
    }

    #[must_use]
    pub fn as_flag(&self) -> bool {
        match self {
            NodeValue::Flag(v) => *v,
            other => panic!("expected NodeValue::Flag, found {other:?}"),
        }
    }

    #[must_use]
    pub fn as_genotype(&self) -> &Genotype {
        match self {
            NodeValue::Genotype(v) => v,
            other => panic!("expected NodeValue::Genotype, found {other:?}"),
        }
    }

    #[must_use]
    pub fn as_simplex(&self) -> &Simplex {
        match self {
            NodeValue::Simplex(v) => v,
            other => panic!("expected NodeValue::Simplex, found {other:?}"),
        }
    }

    #[must_use]
    pub fn as_ordering(&self) -> &EventOrdering {
        match self {
            NodeValue::Ordering(v) => v,
            other => panic!("expected NodeValue::Ordering, found {other:?}"),
        }
    }

    #[must_use]
    pub fn as_parent_set(&self) -> &ParentSet {
        match self {
            NodeValue::ParentSet(v) => v,
            other => panic!("expected NodeValue::ParentSet, found {other:?}"),
        }
    }
}
