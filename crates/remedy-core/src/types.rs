//! Core type definitions for the Remedy pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::RemedyError;

/// A repository specifier in `owner/repo` form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoSpec {
    pub owner: String,
    pub name: String,
}

impl RepoSpec {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RepoSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl std::str::FromStr for RepoSpec {
    type Err = RemedyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self::new(owner, name))
            }
            _ => Err(RemedyError::InvalidRepoSpec(s.to_string())),
        }
    }
}

impl TryFrom<String> for RepoSpec {
    type Error = RemedyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepoSpec> for String {
    fn from(spec: RepoSpec) -> Self {
        spec.to_string()
    }
}

/// Immutable facts about one merged pull request.
///
/// Field names are the persisted JSONL schema; renaming any of them breaks
/// existing record stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrRecord {
    /// Repository name (without owner)
    pub repo: String,
    /// Repository owner
    pub owner: String,
    pub pr_number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    /// Hours from creation to merge (non-negative)
    pub merge_time_hours: f64,
    #[serde(default)]
    pub author: String,
    pub files_changed: u64,
    pub additions: u64,
    pub deletions: u64,
    pub comments: u64,
    pub review_comments: u64,
    pub commits: u64,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default = "default_merged")]
    pub merged: bool,
    pub is_security_related: bool,
    pub has_revert: bool,
    #[serde(default)]
    pub revert_time_hours: Option<f64>,
}

fn default_merged() -> bool {
    true
}

impl PrRecord {
    /// `owner/repo#number`
    pub fn pr_id(&self) -> String {
        format!("{}/{}#{}", self.owner, self.repo, self.pr_number)
    }

    /// `owner/repo`
    pub fn full_repo(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Lines touched by the PR
    pub fn churn(&self) -> u64 {
        self.additions + self.deletions
    }
}

/// Per-PR derived view, computed fresh on every extraction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffAnalysis {
    pub pr_id: String,
    pub repo: String,
    pub title: String,
    pub merge_time_hours: f64,
    /// Review comments per changed line
    pub discussion_density: f64,
    pub is_security: bool,
    pub was_reverted: bool,
    pub fingerprint: String,
}

/// Statistical evidence for a pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEvidence {
    /// How many times the pattern was seen
    pub occurrence_count: usize,
    /// How many distinct repositories it was seen in
    pub repo_count: usize,
    pub median_merge_hours: f64,
    pub median_discussion_density: f64,
    /// Fraction of occurrences that were later reverted (0.0 to 1.0)
    pub revert_rate: f64,
    /// Example PR ids (`owner/repo#number`)
    #[serde(default)]
    pub pr_examples: Vec<String>,
}

/// A cluster of similar PRs treated as one recurring remediation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePattern {
    pub cluster_id: usize,
    pub size: usize,
    /// Distinct structural fingerprints of the members
    #[serde(default)]
    pub fingerprints: Vec<String>,
    pub evidence: PatternEvidence,
}

/// The individual sub-scores behind a confidence value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub merge_velocity: f64,
    pub stability: f64,
    pub discussion: f64,
    pub frequency: f64,
    pub diversity: f64,
}

/// A candidate pattern with its confidence score attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPattern {
    #[serde(flatten)]
    pub pattern: CandidatePattern,
    /// Confidence (0.0 - 1.0)
    pub confidence: f64,
    pub breakdown: ScoreBreakdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> PrRecord {
        let created = "2024-03-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let merged = "2024-03-01T14:30:00Z".parse::<DateTime<Utc>>().unwrap();
        PrRecord {
            repo: "eslint".to_string(),
            owner: "eslint".to_string(),
            pr_number: 1234,
            title: "Fix: escape user input".to_string(),
            body: "Fixes CVE-2024-1234".to_string(),
            created_at: created,
            merged_at: merged,
            closed_at: Some(merged),
            merge_time_hours: 4.5,
            author: "octocat".to_string(),
            files_changed: 2,
            additions: 10,
            deletions: 3,
            comments: 1,
            review_comments: 2,
            commits: 1,
            labels: vec!["security".to_string()],
            merged: true,
            is_security_related: true,
            has_revert: false,
            revert_time_hours: None,
        }
    }

    #[test]
    fn test_repo_spec_parse() {
        let spec: RepoSpec = "nodejs/node".parse().unwrap();
        assert_eq!(spec.owner, "nodejs");
        assert_eq!(spec.name, "node");
        assert_eq!(spec.to_string(), "nodejs/node");

        assert!("nodejs".parse::<RepoSpec>().is_err());
        assert!("a/b/c".parse::<RepoSpec>().is_err());
        assert!("/node".parse::<RepoSpec>().is_err());
    }

    #[test]
    fn test_record_field_names() {
        let json = serde_json::to_value(sample_record()).unwrap();
        for field in [
            "repo",
            "owner",
            "pr_number",
            "created_at",
            "merged_at",
            "closed_at",
            "merge_time_hours",
            "files_changed",
            "review_comments",
            "labels",
            "is_security_related",
            "has_revert",
            "revert_time_hours",
        ] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
    }

    #[test]
    fn test_record_ids() {
        let record = sample_record();
        assert_eq!(record.pr_id(), "eslint/eslint#1234");
        assert_eq!(record.full_repo(), "eslint/eslint");
        assert_eq!(record.churn(), 13);
    }

    #[test]
    fn test_scored_pattern_flattens() {
        let scored = ScoredPattern {
            pattern: CandidatePattern {
                cluster_id: 0,
                size: 3,
                fingerprints: vec![],
                evidence: PatternEvidence {
                    occurrence_count: 3,
                    repo_count: 2,
                    median_merge_hours: 2.0,
                    median_discussion_density: 0.0,
                    revert_rate: 0.0,
                    pr_examples: vec![],
                },
            },
            confidence: 0.8,
            breakdown: ScoreBreakdown {
                merge_velocity: 0.9,
                stability: 1.0,
                discussion: 1.0,
                frequency: 0.2,
                diversity: 0.33,
            },
        };
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["cluster_id"], 0);
        assert_eq!(json["evidence"]["repo_count"], 2);
        assert_eq!(json["confidence"], 0.8);
    }
}
