//! PR collection across repositories
//!
//! Walks each repository's closed PRs newest-first, keeps the merged ones
//! that pass the configured filters, and appends each accepted record to the
//! JSONL store the moment it is accepted. The result is a lazy stream in
//! provider order.

use crate::client::GitHubClient;
use crate::security::SecurityClassifier;
use crate::types::{PullDetail, SearchResults};
use async_stream::try_stream;
use chrono::{DateTime, Utc};
use futures::Stream;
use remedy_core::fail_open::fail_open;
use remedy_core::{
    CollectionStats, CollectorConfig, PrRecord, PrStore, RemedyError, RepoSpec, Result,
};
use tracing::{debug, info, warn};

/// Why a fetched PR was not kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotMerged,
    BelowMergeFloor,
    NotSecurityRelated,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotMerged => write!(f, "not merged"),
            Self::BelowMergeFloor => write!(f, "merged below the minimum merge time"),
            Self::NotSecurityRelated => write!(f, "not security related"),
        }
    }
}

/// Outcome of fetching one PR
#[derive(Debug, Clone)]
pub enum Fetched {
    Accepted(PrRecord),
    Skipped(SkipReason),
}

/// Collects merged PRs from GitHub into a JSONL store
pub struct PrCollector {
    client: GitHubClient,
    config: CollectorConfig,
    classifier: SecurityClassifier,
    store: PrStore,
    collected_count: usize,
    skipped_count: usize,
}

impl PrCollector {
    pub fn new(config: CollectorConfig, client: GitHubClient) -> Result<Self> {
        if config.max_prs_per_repo == 0 {
            return Err(RemedyError::Config(
                "max_prs_per_repo must be at least 1".to_string(),
            ));
        }
        if config.min_merge_time_hours < 0.0 {
            return Err(RemedyError::Config(
                "min_merge_time_hours must be non-negative".to_string(),
            ));
        }

        Ok(Self {
            classifier: SecurityClassifier::new(&config.security_keywords),
            store: PrStore::new(config.output_file.clone()),
            client,
            config,
            collected_count: 0,
            skipped_count: 0,
        })
    }

    pub fn repositories(&self) -> &[RepoSpec] {
        &self.config.repositories
    }

    pub fn store(&self) -> &PrStore {
        &self.store
    }

    /// Records written so far
    pub fn collected_count(&self) -> usize {
        self.collected_count
    }

    /// PRs fetched (or attempted) and rejected so far
    pub fn skipped_count(&self) -> usize {
        self.skipped_count
    }

    /// Stream accepted records, appending each to the store before yielding it.
    ///
    /// The store is truncated when the stream is first polled. Store write
    /// failures end the stream with an error; provider failures on a single
    /// PR only skip that PR.
    pub fn collect(&mut self) -> impl Stream<Item = Result<PrRecord>> + '_ {
        try_stream! {
            let mut writer = self.store.create().await?;
            let max = self.config.max_prs_per_repo;

            for repo in self.config.repositories.clone() {
                info!("Collecting from {}", repo);

                let mut collected_here = 0usize;
                let mut page = 1u32;

                'pages: while collected_here < max {
                    let prs = match self.client.list_closed_pulls(&repo, page).await {
                        Ok(prs) => prs,
                        Err(e) => {
                            warn!("Failed to fetch PR list page {} for {}: {}", page, repo, e);
                            break;
                        }
                    };

                    if prs.is_empty() {
                        break;
                    }

                    for pr in prs {
                        if collected_here >= max {
                            break 'pages;
                        }

                        let operation = format!("fetch {}#{}", repo, pr.number);
                        match fail_open(&operation, || self.fetch_record(&repo, pr.number)).await {
                            Some(Fetched::Accepted(record)) => {
                                writer.append(&record).await?;
                                self.collected_count += 1;
                                collected_here += 1;
                                yield record;
                                self.client.pause().await;
                            }
                            Some(Fetched::Skipped(reason)) => {
                                debug!("Skipping {}#{}: {}", repo, pr.number, reason);
                                self.skipped_count += 1;
                            }
                            None => {
                                self.skipped_count += 1;
                            }
                        }
                    }

                    page += 1;
                }

                info!(
                    "Completed {}: collected={}, skipped={}",
                    repo, self.collected_count, self.skipped_count
                );
            }
        }
    }

    /// Fetch one PR and decide whether to keep it
    pub async fn fetch_record(&self, repo: &RepoSpec, number: u64) -> Result<Fetched> {
        let pr = self.client.get_pull(repo, number).await?;

        let Some(merged_at) = pr.merged_at else {
            return Ok(Fetched::Skipped(SkipReason::NotMerged));
        };

        let merge_time_hours = hours_between(pr.created_at, merged_at).max(0.0);
        if merge_time_hours < self.config.min_merge_time_hours {
            return Ok(Fetched::Skipped(SkipReason::BelowMergeFloor));
        }

        let labels = pr.label_names();
        let is_security_related = self.classifier.classify(&pr.title, pr.body_text(), &labels);
        if self.config.security_only && !is_security_related {
            return Ok(Fetched::Skipped(SkipReason::NotSecurityRelated));
        }

        let revert_time_hours = self.detect_revert(repo, pr.number, merged_at).await;

        Ok(Fetched::Accepted(build_record(
            repo,
            pr,
            merged_at,
            merge_time_hours,
            labels,
            is_security_related,
            revert_time_hours,
        )))
    }

    /// Hours until the PR was reverted, if a revert was found
    pub async fn detect_revert(
        &self,
        repo: &RepoSpec,
        number: u64,
        merged_at: DateTime<Utc>,
    ) -> Option<f64> {
        match self.client.search_references(repo, number).await {
            Ok(results) => find_revert(&results, number, merged_at),
            Err(e) => {
                debug!("Revert detection failed for {}#{}: {}", repo, number, e);
                None
            }
        }
    }

    /// Statistics over whatever the store currently holds
    pub async fn statistics(&self) -> Result<Option<CollectionStats>> {
        let records = self.store.load().await?;
        Ok(CollectionStats::compute(&records))
    }
}

fn build_record(
    repo: &RepoSpec,
    pr: PullDetail,
    merged_at: DateTime<Utc>,
    merge_time_hours: f64,
    labels: Vec<String>,
    is_security_related: bool,
    revert_time_hours: Option<f64>,
) -> PrRecord {
    PrRecord {
        repo: repo.name.clone(),
        owner: repo.owner.clone(),
        pr_number: pr.number,
        body: pr.body.unwrap_or_default(),
        title: pr.title,
        created_at: pr.created_at,
        merged_at,
        closed_at: pr.closed_at,
        merge_time_hours,
        author: pr.user.map(|u| u.login).unwrap_or_default(),
        files_changed: pr.changed_files,
        additions: pr.additions,
        deletions: pr.deletions,
        comments: pr.comments,
        review_comments: pr.review_comments,
        commits: pr.commits,
        labels,
        merged: true,
        is_security_related,
        has_revert: revert_time_hours.is_some(),
        revert_time_hours,
    }
}

/// Earliest referencing PR titled as a revert and merged after the original.
///
/// A heuristic: reverts phrased differently are missed, and unrelated PRs
/// that mention the number with "revert" in the title are counted.
pub fn find_revert(
    results: &SearchResults,
    original: u64,
    original_merged_at: DateTime<Utc>,
) -> Option<f64> {
    results
        .items
        .iter()
        .filter(|item| item.number != original)
        .filter(|item| item.title.to_lowercase().contains("revert"))
        .filter_map(|item| item.merged_at())
        .filter(|at| *at > original_merged_at)
        .min()
        .map(|at| hours_between(original_merged_at, at))
}

fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 3_600_000.0
}
