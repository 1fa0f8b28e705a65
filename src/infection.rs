// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Infection events: the per-patient unit the transmission network links.
//!
//! An [`InfectionEvent`] bundles the graph handles for one observed
//! infection's mutable state (infection duration, per-locus observed and
//! latent genotypes) along with the static facts about it (symptomatic
//! status, observation time). This mirrors `Infection<GeneticImpl,
//! LocusImpl>` in the original source, generalized from a `flat_map<Locus*,
//! ...>` keyed by raw pointer to a `Vec<(LocusId, NodeId)>` keyed by a
//! `Copy` id.

use crate::graph::NodeId;

/// Identifies one locus (genetic marker) tracked across all infections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocusId(u32);

impl LocusId {
    #[must_use]
    pub fn new(index: u32) -> Self {
        LocusId(index)
    }
}

/// Identifies one infection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InfectionId(u32);

impl InfectionId {
    #[must_use]
    pub fn new(index: u32) -> Self {
        InfectionId(index)
    }
}

/// A single infection's state: the mutable graph nodes that describe it,
/// plus the immutable facts recorded at input time.
#[derive(Debug, Clone)]
pub struct InfectionEvent {
    id: InfectionId,
    symptomatic: bool,
    observation_time: f64,
    /// Graph handle for the (possibly latent) infection-duration parameter.
    infection_duration: NodeId,
    /// Per-locus observed genotype parameter handles.
    observed_genotypes: Vec<(LocusId, NodeId)>,
    /// Per-locus latent genotype parameter handles.
    latent_genotypes: Vec<(LocusId, NodeId)>,
    /// Infection ids this infection is disallowed from naming as a parent
    /// (e.g. geographically infeasible source), consulted when building the
    /// constrained parent set.
    disallowed_parents: Vec<InfectionId>,
}

impl InfectionEvent {
    #[must_use]
    pub fn new(
        id: InfectionId,
        symptomatic: bool,
        observation_time: f64,
        infection_duration: NodeId,
    ) -> Self {
        InfectionEvent {
            id,
            symptomatic,
            observation_time,
            infection_duration,
            observed_genotypes: Vec::new(),
            latent_genotypes: Vec::new(),
            disallowed_parents: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> InfectionId {
        self.id
    }

    #[must_use]
    pub fn is_symptomatic(&self) -> bool {
        self.symptomatic
    }

    /// The time this infection was observed (diagnosed/sampled), used to
    /// derive the total order over infections.
    #[must_use]
    pub fn observation_time(&self) -> f64 {
        self.observation_time
    }

    #[must_use]
    pub fn infection_duration(&self) -> NodeId {
        self.infection_duration
    }

    pub fn add_observed_genotype(&mut self, locus: LocusId, node: NodeId) {
        self.observed_genotypes.push((locus, node));
    }

    pub fn add_latent_genotype(&mut self, locus: LocusId, node: NodeId) {
        self.latent_genotypes.push((locus, node));
    }

    #[must_use]
    pub fn observed_genotype(&self, locus: LocusId) -> Option<NodeId> {
        self.observed_genotypes
            .iter()
            .find(|(l, _)| *l == locus)
            .map(|(_, n)| *n)
    }

    #[must_use]
    pub fn latent_genotype(&self, locus: LocusId) -> Option<NodeId> {
        self.latent_genotypes
            .iter()
            .find(|(l, _)| *l == locus)
            .map(|(_, n)| *n)
    }

    #[must_use]
    pub fn loci(&self) -> impl Iterator<Item = LocusId> + '_ {
        self.latent_genotypes.iter().map(|(l, _)| *l)
    }

    pub fn disallow_parent(&mut self, parent: InfectionId) {
        self.disallowed_parents.push(parent);
    }

    #[must_use]
    pub fn is_parent_disallowed(&self, candidate: InfectionId) -> bool {
        self.disallowed_parents.contains(&candidate)
    }
}
