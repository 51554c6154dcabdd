//! # remedy-extractor
//!
//! Turns collected PR records into candidate remediation patterns.
//!
//! Titles are embedded, standardized per dimension, and clustered with
//! DBSCAN over cosine distance. Each dense cluster of at least
//! `min_cluster_size` PRs becomes a [`remedy_core::CandidatePattern`] carrying
//! the evidence the scorer needs.

mod analysis;
mod dbscan;
mod embed;
mod extractor;
mod scale;

pub use analysis::{analyze, discussion_density};
pub use dbscan::{cosine_distance, dbscan};
pub use embed::{build_embedder, Embedder, HashingEmbedder, OllamaEmbedder};
pub use extractor::{build_pattern, PatternExtractor};
pub use scale::standardize;
