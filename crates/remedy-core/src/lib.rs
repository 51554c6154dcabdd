//! # remedy-core
//!
//! Core types for the Remedy pattern-mining pipeline.
//!
//! Remedy mines merged pull requests for recurring, low-risk remediations and
//! scores each recurring pattern with a transparent, auditable formula.
//!
//! ## Pipeline
//!
//! - Collector writes one [`PrRecord`] per line to a JSONL store
//! - Extractor clusters records into [`CandidatePattern`]s
//! - Scorer turns each pattern's [`PatternEvidence`] into a confidence
//! - Fix templates are validated before anything trusts them
//!
//! Every stage reads the previous stage's output and produces new values;
//! nothing is shared or mutated in place.

pub mod config;
mod error;
pub mod fail_open;
pub mod fingerprint;
pub mod stats;
pub mod store;
mod types;

pub use config::{
    CollectorConfig, EmbeddingBackend, EmbeddingConfig, ExtractorConfig, GitHubConfig,
    OutputConfig, RemedyConfig, ScoringPolicy, ScoringWeights, MIN_CLUSTER_SIZE,
};
pub use error::{RemedyError, Result};
pub use fingerprint::DiffFingerprinter;
pub use stats::{median, CollectionStats};
pub use store::{read_json_array, write_json_array, PrStore, PrWriter};
pub use types::*;
