//! Summary statistics over collected PR records

use serde::{Deserialize, Serialize};

use crate::PrRecord;

/// Median of a set of values; the mean of the two middle values for even sizes.
///
/// Returns `None` for an empty set. NaN values sort last.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Aggregate view of a PR record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_prs: usize,
    pub security_prs: usize,
    /// Security PRs as a percentage of all PRs (0 - 100)
    pub security_percentage: f64,
    pub median_merge_hours: f64,
    pub mean_merge_hours: f64,
    pub min_merge_hours: f64,
    pub max_merge_hours: f64,
    pub revert_count: usize,
    /// Fraction of PRs that were reverted (0.0 - 1.0)
    pub revert_rate: f64,
}

impl CollectionStats {
    /// Compute statistics; `None` when there are no records
    pub fn compute(records: &[PrRecord]) -> Option<Self> {
        let merge_times: Vec<f64> = records.iter().map(|r| r.merge_time_hours).collect();
        let median_merge_hours = median(&merge_times)?;

        let total = records.len();
        let security_prs = records.iter().filter(|r| r.is_security_related).count();
        let revert_count = records.iter().filter(|r| r.has_revert).count();

        Some(Self {
            total_prs: total,
            security_prs,
            security_percentage: security_prs as f64 / total as f64 * 100.0,
            median_merge_hours,
            mean_merge_hours: merge_times.iter().sum::<f64>() / total as f64,
            min_merge_hours: merge_times.iter().copied().fold(f64::INFINITY, f64::min),
            max_merge_hours: merge_times.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            revert_count,
            revert_rate: revert_count as f64 / total as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn record(merge_hours: f64, security: bool, reverted: bool) -> PrRecord {
        let at = "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        PrRecord {
            repo: "repo".to_string(),
            owner: "owner".to_string(),
            pr_number: 1,
            title: "title".to_string(),
            body: String::new(),
            created_at: at,
            merged_at: at,
            closed_at: None,
            merge_time_hours: merge_hours,
            author: String::new(),
            files_changed: 1,
            additions: 1,
            deletions: 0,
            comments: 0,
            review_comments: 0,
            commits: 1,
            labels: vec![],
            merged: true,
            is_security_related: security,
            has_revert: reverted,
            revert_time_hours: None,
        }
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[7.0]), Some(7.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_stats_empty() {
        assert!(CollectionStats::compute(&[]).is_none());
    }

    #[test]
    fn test_stats_values() {
        let records = vec![
            record(1.0, true, false),
            record(2.0, true, true),
            record(6.0, false, false),
            record(3.0, true, false),
        ];

        let stats = CollectionStats::compute(&records).unwrap();
        assert_eq!(stats.total_prs, 4);
        assert_eq!(stats.security_prs, 3);
        assert!((stats.security_percentage - 75.0).abs() < 1e-9);
        assert!((stats.median_merge_hours - 2.5).abs() < 1e-9);
        assert!((stats.mean_merge_hours - 3.0).abs() < 1e-9);
        assert_eq!(stats.min_merge_hours, 1.0);
        assert_eq!(stats.max_merge_hours, 6.0);
        assert_eq!(stats.revert_count, 1);
        assert!((stats.revert_rate - 0.25).abs() < 1e-9);
    }
}
