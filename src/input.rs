// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deserialization and validation of the input JSON document.
//!
//! Mirrors the external JSON shape directly with `serde`-derived structs;
//! [`RawModel::validate`] checks the cross-reference invariants the format
//! relies on (locus references, genotype lengths, allele-frequency sums)
//! and turns a violation into a [`ConfigError`] rather than a panic, since
//! these are configuration errors that originate outside the process. This
//! is the minimum needed to build a [`crate::graph::Graph`] from a document;
//! it is not a general JSON-schema validator.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::error::ConfigError;

/// One declared locus and its allele count.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLocus {
    pub locus: String,
    pub num_alleles: usize,
}

/// A single-locus genotype call on one node.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGenotypeCall {
    pub locus: String,
    /// A binary string of length `num_alleles`; all-zero or empty denotes
    /// missing data at this locus.
    pub genotype: String,
}

/// One observed infection event.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    pub id: String,
    pub observation_time: f64,
    #[serde(default)]
    pub symptomatic: Option<bool>,
    #[serde(default)]
    pub observed_genotype: Vec<RawGenotypeCall>,
    #[serde(default)]
    pub disallowed_parents: Vec<String>,
}

/// A locus's allele-frequency simplex, as given in the input.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAlleleFrequencies {
    pub locus: String,
    pub frequencies: Vec<f64>,
}

/// The top-level input document.
#[derive(Debug, Clone, Deserialize)]
pub struct RawModel {
    pub loci: Vec<RawLocus>,
    pub nodes: Vec<RawNode>,
    pub allele_frequencies: Vec<RawAlleleFrequencies>,
}

impl RawModel {
    /// Parses a JSON document, returning [`ConfigError::Malformed`] on a
    /// syntax or type error.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Checks the cross-reference invariants the JSON shape relies on:
    /// every locus referenced by a node or an allele-frequency entry is
    /// declared, genotype strings match their locus's allele count, no
    /// locus exceeds the 64-bit genotype representation, every disallowed
    /// parent id resolves to a declared node, and every declared allele
    /// frequency simplex has a usable (finite, positive) sum.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_alleles: HashMap<&str, usize> =
            self.loci.iter().map(|l| (l.locus.as_str(), l.num_alleles)).collect();

        for locus in &self.loci {
            if locus.num_alleles > 64 {
                return Err(ConfigError::TooManyAlleles {
                    locus: locus.locus.clone(),
                    num_alleles: locus.num_alleles,
                    max: 64,
                });
            }
        }

        let node_ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();

        for node in &self.nodes {
            for call in &node.observed_genotype {
                let Some(&expected) = max_alleles.get(call.locus.as_str()) else {
                    return Err(ConfigError::UnknownLocus {
                        node_id: node.id.clone(),
                        locus: call.locus.clone(),
                    });
                };
                let actual = call.genotype.chars().count();
                if actual != 0 && actual != expected {
                    return Err(ConfigError::GenotypeLengthMismatch {
                        node_id: node.id.clone(),
                        locus: call.locus.clone(),
                        expected,
                        actual,
                    });
                }
            }
            for parent_id in &node.disallowed_parents {
                if !node_ids.contains(parent_id.as_str()) {
                    return Err(ConfigError::UnknownParentReference {
                        node_id: node.id.clone(),
                        parent_id: parent_id.clone(),
                    });
                }
            }
        }

        for entry in &self.allele_frequencies {
            if !max_alleles.contains_key(entry.locus.as_str()) {
                return Err(ConfigError::UnknownLocus {
                    node_id: String::from("<allele_frequencies>"),
                    locus: entry.locus.clone(),
                });
            }
            let sum: f64 = entry.frequencies.iter().sum();
            if !sum.is_finite() || sum <= 0.0 {
                return Err(ConfigError::DegenerateFrequencies {
                    locus: entry.locus.clone(),
                    sum,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "loci": [ { "locus": "msp1", "num_alleles": 4 } ],
            "nodes": [
                { "id": "a", "observation_time": 10.0,
                  "observed_genotype": [ { "locus": "msp1", "genotype": "1010" } ],
                  "disallowed_parents": [] },
                { "id": "b", "observation_time": 20.0,
                  "observed_genotype": [ { "locus": "msp1", "genotype": "1010" } ],
                  "disallowed_parents": [ "a" ] }
            ],
            "allele_frequencies": [ { "locus": "msp1", "frequencies": [0.25, 0.25, 0.25, 0.25] } ]
        }"#
    }

    #[test]
    fn well_formed_document_parses_and_validates() {
        let model = RawModel::from_json(sample_json()).unwrap();
        model.validate().unwrap();
    }

    #[test]
    fn unknown_locus_reference_is_rejected() {
        let mut model = RawModel::from_json(sample_json()).unwrap();
        model.nodes[0].observed_genotype[0].locus = String::from("nope");
        assert!(matches!(model.validate(), Err(ConfigError::UnknownLocus { .. })));
    }

    #[test]
    fn genotype_length_mismatch_is_rejected() {
        let mut model = RawModel::from_json(sample_json()).unwrap();
        model.nodes[0].observed_genotype[0].genotype = String::from("101");
        assert!(matches!(model.validate(), Err(ConfigError::GenotypeLengthMismatch { .. })));
    }

    #[test]
    fn all_zero_genotype_denotes_missing_data_and_is_not_length_checked() {
        let mut model = RawModel::from_json(sample_json()).unwrap();
        model.nodes[0].observed_genotype[0].genotype = String::new();
        model.validate().unwrap();
    }

    #[test]
    fn too_many_alleles_is_rejected() {
        let mut model = RawModel::from_json(sample_json()).unwrap();
        model.loci[0].num_alleles = 65;
        assert!(matches!(model.validate(), Err(ConfigError::TooManyAlleles { .. })));
    }

    #[test]
    fn unknown_disallowed_parent_is_rejected() {
        let mut model = RawModel::from_json(sample_json()).unwrap();
        model.nodes[1].disallowed_parents.push(String::from("ghost"));
        assert!(matches!(model.validate(), Err(ConfigError::UnknownParentReference { .. })));
    }

    #[test]
    fn degenerate_allele_frequencies_are_rejected() {
        let mut model = RawModel::from_json(sample_json()).unwrap();
        model.allele_frequencies[0].frequencies = vec![0.0, 0.0, 0.0, 0.0];
        assert!(matches!(model.validate(), Err(ConfigError::DegenerateFrequencies { .. })));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(RawModel::from_json("{ not json"), Err(ConfigError::Malformed(_))));
    }
}
