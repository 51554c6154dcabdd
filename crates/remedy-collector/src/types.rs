//! GitHub REST payloads consumed by the collector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry from the "list pull requests" endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullSummary {
    pub number: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubLabel {
    pub name: String,
}

/// Full pull request from the "get a pull request" endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullDetail {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    #[serde(default)]
    pub changed_files: u64,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub review_comments: u64,
    #[serde(default)]
    pub commits: u64,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    #[serde(default)]
    pub merged: bool,
}

impl PullDetail {
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    pub fn label_names(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.name.clone()).collect()
    }
}

/// Result page from the issue search endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

/// Issue search hit; PRs carry a `pull_request` object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchItem {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub pull_request: Option<SearchPullRef>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
}

impl SearchItem {
    /// Merge time from the nested `pull_request` object, falling back to the top level
    pub fn merged_at(&self) -> Option<DateTime<Utc>> {
        self.pull_request
            .as_ref()
            .and_then(|pr| pr.merged_at)
            .or(self.merged_at)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPullRef {
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
}

/// Raw HTTP response as seen by the client's retry loop
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// `x-ratelimit-reset`, epoch seconds
    pub rate_limit_reset: Option<i64>,
    /// `x-ratelimit-remaining`
    pub rate_limit_remaining: Option<u64>,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            rate_limit_reset: None,
            rate_limit_remaining: None,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            rate_limit_reset: None,
            rate_limit_remaining: None,
            body: String::new(),
        }
    }

    /// 403/429 with no quota left (or no quota header at all)
    pub fn is_rate_limited(&self) -> bool {
        matches!(self.status, 403 | 429) && self.rate_limit_remaining.map_or(true, |r| r == 0)
    }
}
