//! Configuration management for Remedy
//!
//! One `RemedyConfig` drives the whole pipeline: GitHub access, collection
//! limits, clustering parameters, and the scoring policy. It is loaded from
//! `.remedy/config.toml` when present and validated once at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{RemedyError, RepoSpec, Result};

/// Smallest cluster that counts as a recurring pattern
pub const MIN_CLUSTER_SIZE: usize = 3;

/// Pipeline-level configuration
///
/// Loaded from `.remedy/config.toml` in the working directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemedyConfig {
    /// GitHub API access
    #[serde(default)]
    pub github: GitHubConfig,

    /// PR collection limits
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Pattern extraction
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Confidence formula constants
    #[serde(default)]
    pub scoring: ScoringPolicy,

    /// Downstream artifact locations
    #[serde(default)]
    pub output: OutputConfig,
}

/// GitHub API access settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Environment variable containing the API token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Seconds added to the provider's reset time before retrying
    #[serde(default = "default_rate_limit_buffer_secs")]
    pub rate_limit_buffer_secs: u64,

    #[serde(default = "default_max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,

    /// Pause after each accepted PR
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

/// PR collection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Repositories to walk, in order
    #[serde(default = "default_repositories")]
    pub repositories: Vec<RepoSpec>,

    /// JSONL output path (truncated on each run)
    #[serde(default = "default_records_file")]
    pub output_file: PathBuf,

    #[serde(default = "default_max_prs_per_repo")]
    pub max_prs_per_repo: usize,

    /// PRs merged faster than this are skipped
    #[serde(default = "default_min_merge_time_hours")]
    pub min_merge_time_hours: f64,

    /// Only keep security-related PRs
    #[serde(default = "default_security_only")]
    pub security_only: bool,

    /// Vocabulary used to flag security-related PRs
    #[serde(default = "default_security_keywords")]
    pub security_keywords: Vec<String>,
}

/// Pattern extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_records_file")]
    pub input_file: PathBuf,

    #[serde(default = "default_patterns_file")]
    pub output_file: PathBuf,

    /// DBSCAN neighborhood radius (cosine distance)
    #[serde(default = "default_eps")]
    pub eps: f64,

    /// DBSCAN minimum neighbors (including the point itself)
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Clusters smaller than this are dropped
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,

    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Which embedder turns PR titles into vectors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Sentence embeddings served by a local Ollama instance
    #[default]
    Ollama,
    /// Offline feature-hashing embedder
    Hashing,
}

impl std::fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::Hashing => write!(f, "hashing"),
        }
    }
}

impl std::str::FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hashing" => Ok(Self::Hashing),
            _ => Err(format!("Invalid embedding backend: {}", s)),
        }
    }
}

/// Embedding model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    #[serde(default = "default_embed_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_embed_model")]
    pub model: String,

    #[serde(default = "default_embed_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_embed_batch_size")]
    pub batch_size: usize,

    /// Inputs longer than this are truncated
    #[serde(default = "default_embed_max_chars")]
    pub max_chars: usize,

    /// Vector size for the hashing backend
    #[serde(default = "default_embed_dimensions")]
    pub dimensions: usize,
}

/// Relative weight of each evidence signal in the confidence score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Merge velocity weight (default 0.40)
    pub merge_velocity: f64,
    /// Stability weight (default 0.30)
    pub stability: f64,
    /// Discussion weight (default 0.15)
    pub discussion: f64,
    /// Frequency weight (default 0.10)
    pub frequency: f64,
    /// Diversity weight (default 0.05)
    pub diversity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            merge_velocity: 0.40,
            stability: 0.30,
            discussion: 0.15,
            frequency: 0.10,
            diversity: 0.05,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.merge_velocity + self.stability + self.discussion + self.frequency + self.diversity
    }

    /// Weighted sum of sub-scores (0.0 - 1.0 each)
    pub fn calculate(
        &self,
        merge_velocity: f64,
        stability: f64,
        discussion: f64,
        frequency: f64,
        diversity: f64,
    ) -> f64 {
        self.merge_velocity * merge_velocity
            + self.stability * stability
            + self.discussion * discussion
            + self.frequency * frequency
            + self.diversity * diversity
    }
}

/// Every constant of the confidence formula
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Merges taking this long or longer score zero velocity
    #[serde(default = "default_merge_horizon_hours")]
    pub merge_horizon_hours: f64,

    #[serde(default = "default_revert_penalty")]
    pub revert_penalty: f64,

    #[serde(default = "default_sub_score_floor")]
    pub stability_floor: f64,

    #[serde(default = "default_discussion_penalty")]
    pub discussion_penalty: f64,

    #[serde(default = "default_sub_score_floor")]
    pub discussion_floor: f64,

    /// log10(occurrences + 1) / divisor
    #[serde(default = "default_frequency_log_divisor")]
    pub frequency_log_divisor: f64,

    #[serde(default = "default_diversity_factor")]
    pub diversity_factor: f64,

    #[serde(default = "default_diversity_cap")]
    pub diversity_cap: f64,

    #[serde(default)]
    pub weights: ScoringWeights,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            merge_horizon_hours: default_merge_horizon_hours(),
            revert_penalty: default_revert_penalty(),
            stability_floor: default_sub_score_floor(),
            discussion_penalty: default_discussion_penalty(),
            discussion_floor: default_sub_score_floor(),
            frequency_log_divisor: default_frequency_log_divisor(),
            diversity_factor: default_diversity_factor(),
            diversity_cap: default_diversity_cap(),
            weights: ScoringWeights::default(),
        }
    }
}

impl ScoringPolicy {
    const WEIGHT_TOLERANCE: f64 = 1e-6;

    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        let weights = [
            ("merge_velocity", w.merge_velocity),
            ("stability", w.stability),
            ("discussion", w.discussion),
            ("frequency", w.frequency),
            ("diversity", w.diversity),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(RemedyError::Config(format!(
                    "scoring weight {} must be a finite non-negative number (got {})",
                    name, value
                )));
            }
        }

        let total = w.total();
        if (total - 1.0).abs() > Self::WEIGHT_TOLERANCE {
            return Err(RemedyError::Config(format!(
                "scoring weights must sum to 1.0 (got {:.4})",
                total
            )));
        }

        let constants = [
            ("merge_horizon_hours", self.merge_horizon_hours),
            ("revert_penalty", self.revert_penalty),
            ("stability_floor", self.stability_floor),
            ("discussion_penalty", self.discussion_penalty),
            ("discussion_floor", self.discussion_floor),
            ("frequency_log_divisor", self.frequency_log_divisor),
            ("diversity_factor", self.diversity_factor),
            ("diversity_cap", self.diversity_cap),
        ];
        for (name, value) in constants {
            if !value.is_finite() || value < 0.0 {
                return Err(RemedyError::Config(format!(
                    "scoring.{} must be a finite non-negative number (got {})",
                    name, value
                )));
            }
        }

        if self.merge_horizon_hours == 0.0 || self.frequency_log_divisor == 0.0 {
            return Err(RemedyError::Config(
                "merge_horizon_hours and frequency_log_divisor must be positive".to_string(),
            ));
        }

        // Floors and the cap bound sub-scores that live in 0-1
        for (name, value) in [
            ("stability_floor", self.stability_floor),
            ("discussion_floor", self.discussion_floor),
            ("diversity_cap", self.diversity_cap),
        ] {
            if value > 1.0 {
                return Err(RemedyError::Config(format!(
                    "scoring.{} must be within 0-1 (got {})",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Downstream artifact locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_scored_file")]
    pub scored_file: PathBuf,

    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
}

// Default value providers
fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_user_agent() -> String {
    "remedy-pattern-miner".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_rate_limit_buffer_secs() -> u64 {
    5
}

fn default_max_rate_limit_retries() -> u32 {
    3
}

fn default_request_delay_ms() -> u64 {
    500
}

fn default_repositories() -> Vec<RepoSpec> {
    vec![
        RepoSpec::new("eslint", "eslint"),
        RepoSpec::new("prettier", "prettier"),
        RepoSpec::new("typescript-eslint", "typescript-eslint"),
        RepoSpec::new("nodejs", "node"),
    ]
}

fn default_records_file() -> PathBuf {
    PathBuf::from("data/raw_prs.jsonl")
}

fn default_patterns_file() -> PathBuf {
    PathBuf::from("data/extracted_patterns.json")
}

fn default_scored_file() -> PathBuf {
    PathBuf::from("data/scored_patterns.json")
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_max_prs_per_repo() -> usize {
    100
}

fn default_min_merge_time_hours() -> f64 {
    0.5
}

fn default_security_only() -> bool {
    true
}

pub fn default_security_keywords() -> Vec<String> {
    [
        "security",
        "vulnerability",
        "cve",
        "xss",
        "sql injection",
        "csrf",
        "secret",
        "credential",
        "auth",
        "password",
        "encryption",
        "hash",
        "sensitive",
        "dependency",
        "dependencies",
        "npm",
        "package",
        "deprecated",
        "warning",
        "critical",
        "fix",
    ]
    .iter()
    .map(|k| k.to_string())
    .collect()
}

fn default_eps() -> f64 {
    0.5
}

fn default_min_samples() -> usize {
    3
}

fn default_min_cluster_size() -> usize {
    MIN_CLUSTER_SIZE
}

fn default_embed_endpoint() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_embed_model() -> String {
    "all-minilm".to_string()
}

fn default_embed_timeout_ms() -> u64 {
    60_000
}

fn default_embed_batch_size() -> usize {
    32
}

fn default_embed_max_chars() -> usize {
    2_000
}

fn default_embed_dimensions() -> usize {
    384
}

fn default_merge_horizon_hours() -> f64 {
    24.0
}

fn default_revert_penalty() -> f64 {
    10.0
}

fn default_sub_score_floor() -> f64 {
    0.1
}

fn default_discussion_penalty() -> f64 {
    2.0
}

fn default_frequency_log_divisor() -> f64 {
    3.0
}

fn default_diversity_factor() -> f64 {
    0.5
}

fn default_diversity_cap() -> f64 {
    0.95
}

impl RemedyConfig {
    /// Relative location of the config file inside a working directory
    pub const CONFIG_PATH: &'static str = ".remedy/config.toml";

    /// Load configuration from `.remedy/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(Self::CONFIG_PATH);

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            RemedyError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Write default configuration to `.remedy/config.toml`
    pub fn write_default(root: &Path) -> Result<PathBuf> {
        let config_path = root.join(Self::CONFIG_PATH);
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| RemedyError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    /// Startup check: reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.collector.repositories.is_empty() {
            return Err(RemedyError::Config(
                "collector.repositories must name at least one owner/repo".to_string(),
            ));
        }
        if self.collector.max_prs_per_repo == 0 {
            return Err(RemedyError::Config(
                "collector.max_prs_per_repo must be at least 1".to_string(),
            ));
        }
        if self.collector.min_merge_time_hours < 0.0 {
            return Err(RemedyError::Config(
                "collector.min_merge_time_hours must be non-negative".to_string(),
            ));
        }
        if self.extractor.eps.is_nan() || self.extractor.eps <= 0.0 {
            return Err(RemedyError::Config(
                "extractor.eps must be positive".to_string(),
            ));
        }
        if self.extractor.min_samples == 0 {
            return Err(RemedyError::Config(
                "extractor.min_samples must be at least 1".to_string(),
            ));
        }
        if self.extractor.min_cluster_size < MIN_CLUSTER_SIZE {
            return Err(RemedyError::Config(format!(
                "extractor.min_cluster_size must be at least {}",
                MIN_CLUSTER_SIZE
            )));
        }
        if self.extractor.embedding.batch_size == 0 || self.extractor.embedding.dimensions == 0 {
            return Err(RemedyError::Config(
                "extractor.embedding batch_size and dimensions must be positive".to_string(),
            ));
        }
        self.scoring.validate()
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token_env: default_token_env(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            rate_limit_buffer_secs: default_rate_limit_buffer_secs(),
            max_rate_limit_retries: default_max_rate_limit_retries(),
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            repositories: default_repositories(),
            output_file: default_records_file(),
            max_prs_per_repo: default_max_prs_per_repo(),
            min_merge_time_hours: default_min_merge_time_hours(),
            security_only: default_security_only(),
            security_keywords: default_security_keywords(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            input_file: default_records_file(),
            output_file: default_patterns_file(),
            eps: default_eps(),
            min_samples: default_min_samples(),
            min_cluster_size: default_min_cluster_size(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            endpoint: default_embed_endpoint(),
            model: default_embed_model(),
            timeout_ms: default_embed_timeout_ms(),
            batch_size: default_embed_batch_size(),
            max_chars: default_embed_max_chars(),
            dimensions: default_embed_dimensions(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            scored_file: default_scored_file(),
            templates_dir: default_templates_dir(),
        }
    }
}
