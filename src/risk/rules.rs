//! Threshold-based risk rules.
//!
//! Height decides the tier:
//!
//! ```text
//! h ≤ 0.5        low        1.0
//! 0.5 < h ≤ 2.0  medium     1.2
//! 2.0 < h ≤ 6.0  high       1.4
//! h > 6.0        very_high  1.8
//! ```
//!
//! then complexity and environment scores above [`ADJUSTMENT_CUTOFF`] each add
//! [`ADJUSTMENT_STEP`] to the multiplier, which is capped at 2.0.

use crate::domain::{FeatureVector, MAX_MULTIPLIER, RiskResult, RiskTier};

/// Score above which complexity/environment raise the multiplier.
pub const ADJUSTMENT_CUTOFF: f64 = 0.7;
pub const ADJUSTMENT_STEP: f64 = 0.1;

pub const HIGH_COMPLEXITY_CLAUSE: &str = " High complexity increases the risk.";
pub const ADVERSE_ENVIRONMENT_CLAUSE: &str = " Adverse environmental conditions increase the risk.";

/// Deterministic classifier; needs no trained state.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, features: &FeatureVector) -> RiskResult {
        let tier = tier_for_height(features.height_m);
        let mut justification = tier.height_clause().to_string();
        if features.complexity_score > ADJUSTMENT_CUTOFF {
            justification.push_str(HIGH_COMPLEXITY_CLAUSE);
        }
        if features.environment_score > ADJUSTMENT_CUTOFF {
            justification.push_str(ADVERSE_ENVIRONMENT_CLAUSE);
        }

        RiskResult {
            tier,
            multiplier: adjusted_multiplier(tier, features),
            justification,
        }
    }
}

/// Tier implied by working height alone.
pub fn tier_for_height(height_m: f64) -> RiskTier {
    if height_m <= 0.5 {
        RiskTier::Low
    } else if height_m <= 2.0 {
        RiskTier::Medium
    } else if height_m <= 6.0 {
        RiskTier::High
    } else {
        RiskTier::VeryHigh
    }
}

/// Apply the complexity/environment fine adjustment to a tier's base multiplier.
///
/// Uses raw (unscaled) scores, so rule and statistical paths agree on it.
pub fn adjusted_multiplier(tier: RiskTier, features: &FeatureVector) -> f64 {
    let mut adjustment = 0.0;
    if features.complexity_score > ADJUSTMENT_CUTOFF {
        adjustment += ADJUSTMENT_STEP;
    }
    if features.environment_score > ADJUSTMENT_CUTOFF {
        adjustment += ADJUSTMENT_STEP;
    }
    (tier.base_multiplier() + adjustment).min(MAX_MULTIPLIER)
}
