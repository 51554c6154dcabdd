//! Confidence scorer

use remedy_core::{
    CandidatePattern, PatternEvidence, Result, ScoreBreakdown, ScoredPattern, ScoringPolicy,
};
use tracing::debug;

/// Scores pattern evidence under a validated policy
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    policy: ScoringPolicy,
}

impl ConfidenceScorer {
    /// Create a scorer; the policy must pass [`ScoringPolicy::validate`]
    pub fn new(policy: ScoringPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Fast merges score high; at or past the horizon, zero
    pub fn merge_velocity(&self, median_merge_hours: f64) -> f64 {
        (1.0 - median_merge_hours / self.policy.merge_horizon_hours).clamp(0.0, 1.0)
    }

    /// Penalizes reverts heavily
    pub fn stability(&self, revert_rate: f64) -> f64 {
        (1.0 - revert_rate * self.policy.revert_penalty)
            .max(self.policy.stability_floor)
            .min(1.0)
    }

    /// Heavy review discussion reads as controversy
    pub fn discussion(&self, median_discussion_density: f64) -> f64 {
        (1.0 - median_discussion_density * self.policy.discussion_penalty)
            .max(self.policy.discussion_floor)
            .min(1.0)
    }

    /// Logarithmic in occurrences
    pub fn frequency(&self, occurrence_count: usize) -> f64 {
        ((occurrence_count as f64 + 1.0).log10() / self.policy.frequency_log_divisor)
            .clamp(0.0, 1.0)
    }

    /// Spread across repositories relative to occurrences
    pub fn diversity(&self, repo_count: usize, occurrence_count: usize) -> f64 {
        let ratio = repo_count as f64 / occurrence_count.max(1) as f64;
        (ratio * self.policy.diversity_factor).clamp(0.0, self.policy.diversity_cap)
    }

    pub fn breakdown(&self, evidence: &PatternEvidence) -> ScoreBreakdown {
        ScoreBreakdown {
            merge_velocity: self.merge_velocity(evidence.median_merge_hours),
            stability: self.stability(evidence.revert_rate),
            discussion: self.discussion(evidence.median_discussion_density),
            frequency: self.frequency(evidence.occurrence_count),
            diversity: self.diversity(evidence.repo_count, evidence.occurrence_count),
        }
    }

    /// Confidence in [0, 1]
    pub fn score(&self, evidence: &PatternEvidence) -> f64 {
        self.combine(&self.breakdown(evidence))
    }

    fn combine(&self, b: &ScoreBreakdown) -> f64 {
        self.policy
            .weights
            .calculate(
                b.merge_velocity,
                b.stability,
                b.discussion,
                b.frequency,
                b.diversity,
            )
            .clamp(0.0, 1.0)
    }

    pub fn score_pattern(&self, pattern: CandidatePattern) -> ScoredPattern {
        let breakdown = self.breakdown(&pattern.evidence);
        let confidence = self.combine(&breakdown);
        debug!(
            "Pattern {} ({} PRs): confidence {:.3}",
            pattern.cluster_id, pattern.size, confidence
        );

        ScoredPattern {
            pattern,
            confidence,
            breakdown,
        }
    }

    /// Score every pattern, preserving input order
    pub fn score_patterns(&self, patterns: Vec<CandidatePattern>) -> Vec<ScoredPattern> {
        patterns
            .into_iter()
            .map(|p| self.score_pattern(p))
            .collect()
    }
}

/// Sort by confidence, highest first; ties keep cluster order
pub fn rank(mut scored: Vec<ScoredPattern>) -> Vec<ScoredPattern> {
    scored.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use remedy_core::ScoringWeights;

    fn evidence(
        occurrence_count: usize,
        repo_count: usize,
        median_merge_hours: f64,
        median_discussion_density: f64,
        revert_rate: f64,
    ) -> PatternEvidence {
        PatternEvidence {
            occurrence_count,
            repo_count,
            median_merge_hours,
            median_discussion_density,
            revert_rate,
            pr_examples: Vec::new(),
        }
    }

    #[test]
    fn test_merge_velocity_decreases() {
        let scorer = ConfidenceScorer::default();
        let mut previous = scorer.merge_velocity(1.0);
        for hours in 2..24 {
            let current = scorer.merge_velocity(hours as f64);
            assert!(current < previous, "{}h not below {}h", hours, hours - 1);
            previous = current;
        }
        assert_eq!(scorer.merge_velocity(24.0), 0.0);
        assert_eq!(scorer.merge_velocity(48.0), 0.0);
        assert_eq!(scorer.merge_velocity(0.0), 1.0);
    }

    #[test]
    fn test_stability() {
        let scorer = ConfidenceScorer::default();
        assert_eq!(scorer.stability(0.0), 1.0);
        assert!(scorer.stability(0.1) < 0.5);
        assert_eq!(scorer.stability(1.0), 0.1);
    }

    #[test]
    fn test_discussion_floor() {
        let scorer = ConfidenceScorer::default();
        assert_eq!(scorer.discussion(0.0), 1.0);
        assert!((scorer.discussion(0.25) - 0.5).abs() < 1e-12);
        assert_eq!(scorer.discussion(3.0), 0.1);
    }

    #[test]
    fn test_frequency_and_diversity() {
        let scorer = ConfidenceScorer::default();
        assert!((scorer.frequency(9) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(scorer.frequency(5000), 1.0);
        assert_eq!(scorer.diversity(2, 4), 0.25);
        assert_eq!(scorer.diversity(1, 0), 0.5);
    }

    #[test]
    fn test_score_bounds() {
        let scorer = ConfidenceScorer::default();
        let cases = [
            evidence(1, 1, 0.0, 0.0, 0.0),
            evidence(1000, 1000, 0.0, 0.0, 0.0),
            evidence(3, 1, 500.0, 10.0, 1.0),
            evidence(0, 0, 0.0, 0.0, 0.0),
        ];
        for case in &cases {
            let score = scorer.score(case);
            assert!((0.0..=1.0).contains(&score), "{:?} -> {}", case, score);
        }
    }

    #[test]
    fn test_single_occurrence_boundary() {
        let scorer = ConfidenceScorer::default();
        let b = scorer.breakdown(&evidence(1, 1, 0.0, 0.0, 0.0));
        assert_eq!(b.diversity, 0.5);
        assert!((b.frequency - 2f64.log10() / 3.0).abs() < 1e-12);
        assert!(scorer.score(&evidence(1, 1, 0.0, 0.0, 0.0)) <= 1.0);
    }

    #[test]
    fn test_good_pattern_scores_high() {
        let scorer = ConfidenceScorer::default();
        let score = scorer.score(&evidence(4, 2, 2.0, 0.0, 0.0));
        assert!(score > 0.7, "score {}", score);
    }

    #[test]
    fn test_reverted_pattern_scores_lower() {
        let scorer = ConfidenceScorer::default();
        let clean = scorer.score(&evidence(10, 3, 4.0, 0.1, 0.0));
        let reverted = scorer.score(&evidence(10, 3, 4.0, 0.1, 0.2));
        assert!(reverted < clean);
    }

    #[test]
    fn test_unbalanced_policy_rejected() {
        let policy = ScoringPolicy {
            weights: ScoringWeights {
                merge_velocity: 0.9,
                ..ScoringWeights::default()
            },
            ..ScoringPolicy::default()
        };
        assert!(ConfidenceScorer::new(policy).is_err());
    }

    #[test]
    fn test_policy_that_would_break_bounds_rejected() {
        let negative_cap = ScoringPolicy {
            diversity_cap: -0.5,
            ..ScoringPolicy::default()
        };
        assert!(ConfidenceScorer::new(negative_cap).is_err());

        let nan_weight = ScoringPolicy {
            weights: ScoringWeights {
                diversity: f64::NAN,
                ..ScoringWeights::default()
            },
            ..ScoringPolicy::default()
        };
        assert!(ConfidenceScorer::new(nan_weight).is_err());

        let nan_horizon = ScoringPolicy {
            merge_horizon_hours: f64::NAN,
            ..ScoringPolicy::default()
        };
        assert!(ConfidenceScorer::new(nan_horizon).is_err());
    }

    #[test]
    fn test_custom_policy_changes_score() {
        let policy = ScoringPolicy {
            merge_horizon_hours: 48.0,
            ..ScoringPolicy::default()
        };
        let scorer = ConfidenceScorer::new(policy).unwrap();
        assert_eq!(scorer.merge_velocity(24.0), 0.5);
    }

    fn pattern(cluster_id: usize, ev: PatternEvidence) -> CandidatePattern {
        CandidatePattern {
            cluster_id,
            size: ev.occurrence_count,
            fingerprints: Vec::new(),
            evidence: ev,
        }
    }

    #[test]
    fn test_score_patterns_and_rank() {
        let scorer = ConfidenceScorer::default();
        let scored = scorer.score_patterns(vec![
            pattern(0, evidence(3, 1, 20.0, 0.5, 0.3)),
            pattern(1, evidence(6, 3, 1.0, 0.0, 0.0)),
        ]);
        assert_eq!(scored[0].pattern.cluster_id, 0);
        assert_eq!(scored[0].confidence, scorer.score(&scored[0].pattern.evidence));

        let ranked = rank(scored);
        assert_eq!(ranked[0].pattern.cluster_id, 1);
    }

    #[test]
    fn test_scored_pattern_serializes_flat() {
        let scorer = ConfidenceScorer::default();
        let scored = scorer.score_pattern(pattern(7, evidence(3, 2, 1.0, 0.0, 0.0)));
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["cluster_id"], 7);
        assert_eq!(json["evidence"]["occurrence_count"], 3);
        assert!(json["confidence"].is_number());
        assert!(json["breakdown"]["stability"].is_number());
    }
}
