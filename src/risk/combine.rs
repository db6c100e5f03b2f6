//! Rule/statistical blending.
//!
//! Both tiers are mapped to ordinal indices and blended with fixed weights:
//!
//! ```text
//! index      = round(w_rule · rule_index + w_stat · stat_index)
//! multiplier = min(w_rule · rule_multiplier + w_stat · stat_multiplier, 2.0)
//! ```
//!
//! `round` is `f64::round`: halves go away from zero, so an exact `.5` rounds up.
//! The justification is whichever input text is longer (ties keep the rule text).

use crate::domain::{MAX_MULTIPLIER, RiskResult, RiskTier};

/// Relative confidence given to each classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendWeights {
    pub rule: f64,
    pub statistical: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            rule: 0.7,
            statistical: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskCombiner {
    weights: BlendWeights,
}

impl RiskCombiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: BlendWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> BlendWeights {
        self.weights
    }

    /// Merge the two classifier outputs. Without a statistical result the rule
    /// result passes through unchanged.
    pub fn combine(&self, rule: &RiskResult, statistical: Option<&RiskResult>) -> RiskResult {
        let Some(stat) = statistical else {
            return rule.clone();
        };

        let tier = blend_tier(rule.tier, stat.tier, self.weights);
        let multiplier = (self.weights.rule * rule.multiplier
            + self.weights.statistical * stat.multiplier)
            .min(MAX_MULTIPLIER);
        let justification = if stat.justification.chars().count() > rule.justification.chars().count() {
            stat.justification.clone()
        } else {
            rule.justification.clone()
        };

        RiskResult {
            tier,
            multiplier,
            justification,
        }
    }
}

/// Weighted ordinal blend of two tiers.
pub fn blend_tier(rule: RiskTier, statistical: RiskTier, weights: BlendWeights) -> RiskTier {
    let raw = weights.rule * rule.index() as f64 + weights.statistical * statistical.index() as f64;
    let index = raw.round().clamp(0.0, 3.0) as usize;
    RiskTier::from_index(index).unwrap_or(RiskTier::VeryHigh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(tier: RiskTier, multiplier: f64, justification: &str) -> RiskResult {
        RiskResult {
            tier,
            multiplier,
            justification: justification.to_string(),
        }
    }

    #[test]
    fn passes_rule_result_through_without_statistics() {
        let rule = result(RiskTier::High, 1.6, "rule");
        assert_eq!(RiskCombiner::new().combine(&rule, None), rule);
    }

    #[test]
    fn medium_rule_high_model_stays_medium() {
        // 0.7·1 + 0.3·2 = 1.3 → 1
        let tier = blend_tier(RiskTier::Medium, RiskTier::High, BlendWeights::default());
        assert_eq!(tier, RiskTier::Medium);
    }

    #[test]
    fn exact_half_rounds_away_from_zero() {
        let even = BlendWeights {
            rule: 0.5,
            statistical: 0.5,
        };
        assert_eq!(blend_tier(RiskTier::Low, RiskTier::Medium, even), RiskTier::Medium);
        assert_eq!(blend_tier(RiskTier::High, RiskTier::VeryHigh, even), RiskTier::VeryHigh);
    }

    #[test]
    fn default_weights_follow_rule_side() {
        // 0.7·0 + 0.3·3 = 0.9 → 1
        assert_eq!(
            blend_tier(RiskTier::Low, RiskTier::VeryHigh, BlendWeights::default()),
            RiskTier::Medium
        );
        // 0.7·3 + 0.3·0 = 2.1 → 2
        assert_eq!(
            blend_tier(RiskTier::VeryHigh, RiskTier::Low, BlendWeights::default()),
            RiskTier::High
        );
    }

    #[test]
    fn multiplier_is_weighted_and_capped() {
        let combiner = RiskCombiner::new();
        let out = combiner.combine(
            &result(RiskTier::High, 1.4, "a"),
            Some(&result(RiskTier::VeryHigh, 1.8, "b")),
        );
        assert!((out.multiplier - (0.7 * 1.4 + 0.3 * 1.8)).abs() < 1e-12);

        let capped = RiskCombiner::with_weights(BlendWeights {
            rule: 1.0,
            statistical: 1.0,
        })
        .combine(
            &result(RiskTier::VeryHigh, 2.0, "a"),
            Some(&result(RiskTier::VeryHigh, 2.0, "b")),
        );
        assert_eq!(capped.multiplier, 2.0);
    }

    #[test]
    fn keeps_the_longer_justification() {
        let out = RiskCombiner::new().combine(
            &result(RiskTier::Low, 1.0, "short"),
            Some(&result(RiskTier::Low, 1.0, "a much longer text")),
        );
        assert_eq!(out.justification, "a much longer text");

        let tie = RiskCombiner::new().combine(
            &result(RiskTier::Low, 1.0, "rule"),
            Some(&result(RiskTier::Low, 1.0, "stat")),
        );
        assert_eq!(tie.justification, "rule");
    }
}
