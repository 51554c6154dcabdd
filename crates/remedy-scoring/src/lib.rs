//! # remedy-scoring
//!
//! Formula-based confidence for candidate patterns. No model, no I/O: every
//! score is a weighted sum of five bounded sub-scores computed from the
//! pattern's evidence under a [`remedy_core::ScoringPolicy`].

mod scorer;

pub use scorer::{rank, ConfidenceScorer};
