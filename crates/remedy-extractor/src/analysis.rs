//! Per-PR derived view used for clustering

use remedy_core::{DiffAnalysis, DiffFingerprinter, PrRecord};

/// Review comments per changed line; churn is floored at 1
pub fn discussion_density(record: &PrRecord) -> f64 {
    record.review_comments as f64 / record.churn().max(1) as f64
}

/// Derive the analysis for one record.
///
/// Records carry no diff text, so the fingerprint is taken over the title as
/// a single added line.
pub fn analyze(record: &PrRecord) -> DiffAnalysis {
    DiffAnalysis {
        pr_id: record.pr_id(),
        repo: record.full_repo(),
        title: record.title.clone(),
        merge_time_hours: record.merge_time_hours,
        discussion_density: discussion_density(record),
        is_security: record.is_security_related,
        was_reverted: record.has_revert,
        fingerprint: DiffFingerprinter::fingerprint(&[record.title.as_str()], &[] as &[&str]),
    }
}
