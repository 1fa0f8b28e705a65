//! Error types surfaced at the process boundary.
//!
//! Per the error taxonomy: configuration errors are the only category that
//! reaches a `Result`. Numerical underflow is absorbed as `-infinity` inline
//! (see [`crate::likelihood`]); invariant violations are
//! `debug_assert!`/`panic!` (see [`crate::graph`]).

use thiserror::Error;

/// Errors produced while validating or constructing a model from input data.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A node referenced a locus that was not declared in `loci`.
    #[error("node {node_id:?} references unknown locus {locus:?}")]
    UnknownLocus {
        /// The offending node's identifier.
        node_id: String,
        /// The locus name that could not be resolved.
        locus: String,
    },

    /// An observed or latent genotype string did not match its locus's allele count.
    #[error("locus {locus:?} expects genotype length {expected} but node {node_id:?} has {actual}")]
    GenotypeLengthMismatch {
        /// The offending node's identifier.
        node_id: String,
        /// The locus name.
        locus: String,
        /// The expected length (`num_alleles`).
        expected: usize,
        /// The length actually observed in the input.
        actual: usize,
    },

    /// A locus declared more alleles than the genotype bitset can represent.
    #[error("locus {locus:?} declares {num_alleles} alleles, exceeding the {max} bit limit")]
    TooManyAlleles {
        /// The locus name.
        locus: String,
        /// The declared allele count.
        num_alleles: usize,
        /// The hard limit (64).
        max: usize,
    },

    /// A node referenced another node id in `disallowed_parents` that does not exist.
    #[error("node {node_id:?} lists unknown disallowed parent {parent_id:?}")]
    UnknownParentReference {
        /// The offending node's identifier.
        node_id: String,
        /// The referenced id that could not be resolved.
        parent_id: String,
    },

    /// The allele-frequency simplex for a locus did not sum to a usable total.
    #[error("locus {locus:?} allele frequencies sum to {sum}, which cannot be normalized")]
    DegenerateFrequencies {
        /// The locus name.
        locus: String,
        /// The observed sum.
        sum: f64,
    },

    /// The raw JSON failed to deserialize.
    #[error("malformed input: {0}")]
    Malformed(#[from] serde_json::Error),
}
