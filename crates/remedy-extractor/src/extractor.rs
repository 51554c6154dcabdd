//! Pattern extraction from collected PRs

use crate::analysis::analyze;
use crate::dbscan::dbscan;
use crate::embed::Embedder;
use crate::scale::standardize;
use remedy_core::{
    median, write_json_array, CandidatePattern, DiffAnalysis, ExtractorConfig, PatternEvidence,
    PrRecord, PrStore, RemedyError, Result, MIN_CLUSTER_SIZE,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Clusters PR titles into candidate remediation patterns
pub struct PatternExtractor {
    embedder: Box<dyn Embedder>,
    config: ExtractorConfig,
}

impl std::fmt::Debug for PatternExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternExtractor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PatternExtractor {
    pub fn new(embedder: Box<dyn Embedder>, config: ExtractorConfig) -> Result<Self> {
        if config.eps.is_nan() || config.eps <= 0.0 {
            return Err(RemedyError::Config(format!(
                "extractor eps must be positive, got {}",
                config.eps
            )));
        }
        if config.min_samples == 0 {
            return Err(RemedyError::Config(
                "extractor min_samples must be at least 1".to_string(),
            ));
        }
        if config.min_cluster_size < MIN_CLUSTER_SIZE {
            return Err(RemedyError::Config(format!(
                "extractor min_cluster_size must be at least {}, got {}",
                MIN_CLUSTER_SIZE, config.min_cluster_size
            )));
        }

        Ok(Self { embedder, config })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Load the configured record store
    pub async fn load_records(&self) -> Result<Vec<PrRecord>> {
        let records = PrStore::new(&self.config.input_file).load().await?;
        info!("Loaded {} PRs", records.len());
        Ok(records)
    }

    /// Load records and extract patterns
    pub async fn extract(&self) -> Result<Vec<CandidatePattern>> {
        let records = self.load_records().await?;
        self.extract_from_records(&records).await
    }

    /// Extract patterns and write them to the configured output file
    pub async fn extract_and_save(&self) -> Result<Vec<CandidatePattern>> {
        let patterns = self.extract().await?;
        write_json_array(&self.config.output_file, &patterns).await?;
        info!(
            "Saved {} patterns to {}",
            patterns.len(),
            self.config.output_file.display()
        );
        Ok(patterns)
    }

    pub async fn extract_from_records(&self, records: &[PrRecord]) -> Result<Vec<CandidatePattern>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let analyses: Vec<DiffAnalysis> = records.iter().map(analyze).collect();

        let titles: Vec<String> = analyses.iter().map(|a| a.title.clone()).collect();
        debug!("Embedding {} titles with {}", titles.len(), self.embedder.describe());
        let embeddings = self.embedder.embed(&titles).await?;
        let rows = check_embeddings(embeddings, titles.len())?;

        let scaled = standardize(&rows);
        let labels = dbscan(&scaled, self.config.eps, self.config.min_samples)?;

        let mut clusters: BTreeMap<usize, Vec<&DiffAnalysis>> = BTreeMap::new();
        for (analysis, label) in analyses.iter().zip(&labels) {
            if let Some(cluster_id) = label {
                clusters.entry(*cluster_id).or_default().push(analysis);
            }
        }

        let noise = labels.iter().filter(|l| l.is_none()).count();
        debug!("{} clusters, {} noise points", clusters.len(), noise);

        let patterns: Vec<CandidatePattern> = clusters
            .into_iter()
            .filter(|(_, members)| members.len() >= self.config.min_cluster_size)
            .map(|(cluster_id, members)| build_pattern(cluster_id, &members))
            .collect();

        info!(
            "Extracted {} patterns from {} PRs",
            patterns.len(),
            records.len()
        );
        Ok(patterns)
    }
}

fn check_embeddings(embeddings: Vec<Vec<f32>>, expected: usize) -> Result<Vec<Vec<f64>>> {
    if embeddings.len() != expected {
        return Err(RemedyError::Embedding(format!(
            "expected {} embeddings, got {}",
            expected,
            embeddings.len()
        )));
    }

    let dims = embeddings.first().map(Vec::len).unwrap_or(0);
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dims) {
        return Err(RemedyError::Embedding(format!(
            "inconsistent embedding dimensions: {} and {}",
            dims,
            bad.len()
        )));
    }

    Ok(embeddings
        .into_iter()
        .map(|row| row.into_iter().map(f64::from).collect())
        .collect())
}

/// Aggregate evidence over one cluster's members
pub fn build_pattern(cluster_id: usize, members: &[&DiffAnalysis]) -> CandidatePattern {
    let size = members.len();

    let merge_hours: Vec<f64> = members.iter().map(|m| m.merge_time_hours).collect();
    let densities: Vec<f64> = members.iter().map(|m| m.discussion_density).collect();
    let repos: BTreeSet<&str> = members.iter().map(|m| m.repo.as_str()).collect();
    let reverted = members.iter().filter(|m| m.was_reverted).count();

    let mut fingerprints: Vec<String> = Vec::new();
    for member in members {
        if !fingerprints.contains(&member.fingerprint) {
            fingerprints.push(member.fingerprint.clone());
        }
    }

    CandidatePattern {
        cluster_id,
        size,
        fingerprints,
        evidence: PatternEvidence {
            occurrence_count: size,
            repo_count: repos.len(),
            median_merge_hours: median(&merge_hours).unwrap_or(0.0),
            median_discussion_density: median(&densities).unwrap_or(0.0),
            revert_rate: if size == 0 {
                0.0
            } else {
                reverted as f64 / size as f64
            },
            pr_examples: members.iter().map(|m| m.pr_id.clone()).collect(),
        },
    }
}
