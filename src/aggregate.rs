//! Confidence aggregation across analyzers.
//!
//! Takes the maximum of the weighted analyzer confidences rather than their
//! sum, so one strong analyzer is never diluted by two quiet ones and three
//! weak hunches never add up to a block.

use crate::analyzers::identity::IdentityMatch;
use crate::config::{AggregationWeights, ThresholdConfig};
use crate::verdict::{AnalyzerVerdict, RiskLevel, Verdict};

/// Combines per-analyzer verdicts into one classification.
pub struct ConfidenceAggregator {
    weights: AggregationWeights,
    thresholds: ThresholdConfig,
}

impl ConfidenceAggregator {
    pub fn new(weights: &AggregationWeights, thresholds: &ThresholdConfig) -> Self {
        Self {
            weights: weights.clone(),
            thresholds: thresholds.clone(),
        }
    }

    /// Aggregate the three analyzer verdicts, in fixed analyzer order.
    pub fn aggregate(
        &self,
        identity: &IdentityMatch,
        environment: &AnalyzerVerdict,
        behavior: &AnalyzerVerdict,
    ) -> Verdict {
        let weighted = [
            identity.verdict.confidence * self.weights.identity,
            environment.confidence * self.weights.environment,
            behavior.confidence * self.weights.behavior,
        ];
        let mut confidence = weighted
            .into_iter()
            .fold(0.0f32, f32::max)
            .clamp(0.0, 1.0);

        // A recognized crawler is the whole story: link-preview fetchers
        // run no scripts, so their silent behavior and bare environment
        // must neither raise nor lower the verdict.
        let is_known_crawler = identity.verdict.is_known_crawler;
        if is_known_crawler {
            confidence = identity.verdict.confidence;
        }

        // Only an unambiguous automation identity denies locally. High
        // confidence from any other source stays advisory.
        let should_block = identity.category.is_some_and(|c| c.is_automation())
            && identity.verdict.confidence >= self.thresholds.authoritative_deny;

        let mut reasons = Vec::with_capacity(
            identity.verdict.reasons.len() + environment.reasons.len() + behavior.reasons.len(),
        );
        reasons.extend_from_slice(&identity.verdict.reasons);
        reasons.extend_from_slice(&environment.reasons);
        reasons.extend_from_slice(&behavior.reasons);

        Verdict {
            is_bot: is_known_crawler || confidence >= self.thresholds.bot,
            confidence,
            risk_level: RiskLevel::from_confidence(confidence),
            reasons,
            is_known_crawler,
            should_block,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatternCategory;

    fn aggregator() -> ConfidenceAggregator {
        ConfidenceAggregator::new(
            &AggregationWeights::default(),
            &ThresholdConfig::default(),
        )
    }

    fn identity(confidence: f32, category: Option<PatternCategory>) -> IdentityMatch {
        let mut verdict = AnalyzerVerdict::new(confidence);
        if confidence > 0.0 {
            verdict.reasons.push("identity_reason".to_string());
        }
        verdict.is_known_crawler = category.is_some_and(|c| c.is_known_crawler());
        IdentityMatch { verdict, category }
    }

    #[test]
    fn test_max_not_sum() {
        let verdict = aggregator().aggregate(
            &identity(0.4, None),
            &AnalyzerVerdict::new(0.4),
            &AnalyzerVerdict::new(0.4),
        );
        // Three weak hunches stay one weak hunch
        assert!((verdict.confidence - 0.4).abs() < 1e-6);
        assert!(!verdict.is_bot);
        assert!(!verdict.should_block);
        assert_eq!(verdict.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_weights_scale_each_analyzer() {
        let verdict = aggregator().aggregate(
            &identity(0.0, None),
            &AnalyzerVerdict::clean(),
            &AnalyzerVerdict::new(1.0),
        );
        assert!((verdict.confidence - 0.75).abs() < 1e-6);
        assert!(verdict.is_bot);
        assert_eq!(verdict.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_crawler_pins_confidence() {
        let verdict = aggregator().aggregate(
            &identity(0.92, Some(PatternCategory::SearchEngine)),
            &AnalyzerVerdict::new(1.0).with_reason("webdriver_flag"),
            &AnalyzerVerdict::new(1.0).with_reason("no_pointer_activity"),
        );
        // Weighted environment (0.95) would beat the pattern weight, the
        // pin holds it at the matched weight
        assert_eq!(verdict.confidence, 0.92);
        assert!(verdict.is_bot);
        assert!(verdict.is_known_crawler);
        assert!(!verdict.should_block);
    }

    #[test]
    fn test_automation_identity_denies() {
        let verdict = aggregator().aggregate(
            &identity(0.99, Some(PatternCategory::Automation)),
            &AnalyzerVerdict::clean(),
            &AnalyzerVerdict::clean(),
        );
        assert!(verdict.should_block);
        assert!(verdict.is_bot);
        assert!(!verdict.is_known_crawler);
        assert_eq!(verdict.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_automation_below_deny_threshold_is_advisory() {
        let verdict = aggregator().aggregate(
            &identity(0.91, Some(PatternCategory::ScriptedClient)),
            &AnalyzerVerdict::clean(),
            &AnalyzerVerdict::clean(),
        );
        assert!(!verdict.should_block);
        assert!(verdict.is_bot);
    }

    #[test]
    fn test_high_environment_does_not_deny() {
        let verdict = aggregator().aggregate(
            &identity(0.0, None),
            &AnalyzerVerdict::new(1.0).with_reason("webdriver_flag"),
            &AnalyzerVerdict::clean(),
        );
        assert!((verdict.confidence - 0.95).abs() < 1e-6);
        assert_eq!(verdict.risk_level, RiskLevel::Critical);
        assert!(!verdict.should_block);
    }

    #[test]
    fn test_reasons_keep_analyzer_order() {
        let verdict = aggregator().aggregate(
            &identity(0.5, None),
            &AnalyzerVerdict::clean().with_reason("env_reason"),
            &AnalyzerVerdict::clean().with_reason("behavior_reason"),
        );
        assert_eq!(
            verdict.reasons,
            vec![
                "identity_reason".to_string(),
                "env_reason".to_string(),
                "behavior_reason".to_string(),
            ]
        );
    }

    #[test]
    fn test_all_clean_is_human() {
        let verdict = aggregator().aggregate(
            &identity(0.0, None),
            &AnalyzerVerdict::clean(),
            &AnalyzerVerdict::clean(),
        );
        assert_eq!(verdict.confidence, 0.0);
        assert!(!verdict.is_bot);
        assert!(!verdict.should_block);
        assert!(verdict.reasons.is_empty());
        assert_eq!(verdict.risk_level, RiskLevel::Minimal);
    }
}
