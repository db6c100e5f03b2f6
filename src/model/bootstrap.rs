//! Synthetic training data for cold start.
//!
//! Every tier draws its features uniformly from ranges that sit inside the
//! rule thresholds, so a model trained on this set agrees with the rules:
//!
//! ```text
//! tier        height       complexity   environment
//! low         [0, 0.5)     [0, 0.3)     [0, 0.3)
//! medium      [0.5, 2)     [0, 0.6)     [0, 0.6)
//! high        [2, 6)       [0.3, 0.8)   [0.3, 0.8)
//! very_high   [6, 15)      [0.5, 1]     [0.5, 1]
//! ```

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::domain::{FeatureVector, LabeledSample, RiskTier};

/// Samples per tier unless configured otherwise.
pub const DEFAULT_SAMPLES_PER_TIER: usize = 50;

/// A uniform sampling interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub lo: f64,
    pub hi: f64,
    /// Whether `hi` itself can be drawn.
    pub closed: bool,
}

impl Span {
    const fn open(lo: f64, hi: f64) -> Self {
        Self { lo, hi, closed: false }
    }

    const fn closed(lo: f64, hi: f64) -> Self {
        Self { lo, hi, closed: true }
    }

    pub fn sample(&self, rng: &mut StdRng) -> f64 {
        if self.closed {
            rng.gen_range(self.lo..=self.hi)
        } else {
            rng.gen_range(self.lo..self.hi)
        }
    }

    pub fn center(&self) -> f64 {
        (self.lo + self.hi) / 2.0
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lo && (v < self.hi || (self.closed && v == self.hi))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierRegion {
    pub tier: RiskTier,
    pub height: Span,
    pub complexity: Span,
    pub environment: Span,
}

impl TierRegion {
    pub fn sample(&self, rng: &mut StdRng) -> FeatureVector {
        FeatureVector::new(
            self.height.sample(rng),
            self.complexity.sample(rng),
            self.environment.sample(rng),
        )
    }

    pub fn center(&self) -> FeatureVector {
        FeatureVector::new(self.height.center(), self.complexity.center(), self.environment.center())
    }
}

pub const TIER_REGIONS: [TierRegion; 4] = [
    TierRegion {
        tier: RiskTier::Low,
        height: Span::open(0.0, 0.5),
        complexity: Span::open(0.0, 0.3),
        environment: Span::open(0.0, 0.3),
    },
    TierRegion {
        tier: RiskTier::Medium,
        height: Span::open(0.5, 2.0),
        complexity: Span::open(0.0, 0.6),
        environment: Span::open(0.0, 0.6),
    },
    TierRegion {
        tier: RiskTier::High,
        height: Span::open(2.0, 6.0),
        complexity: Span::open(0.3, 0.8),
        environment: Span::open(0.3, 0.8),
    },
    TierRegion {
        tier: RiskTier::VeryHigh,
        height: Span::open(6.0, 15.0),
        complexity: Span::closed(0.5, 1.0),
        environment: Span::closed(0.5, 1.0),
    },
];

pub fn region_for(tier: RiskTier) -> &'static TierRegion {
    &TIER_REGIONS[tier.index()]
}

/// Generate the labelled bootstrap set, tier by tier, from a fixed seed.
pub fn generate_bootstrap(samples_per_tier: usize, seed: u64) -> Vec<LabeledSample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(samples_per_tier * TIER_REGIONS.len());
    for region in &TIER_REGIONS {
        for _ in 0..samples_per_tier {
            out.push(LabeledSample::new(region.sample(&mut rng), region.tier));
        }
    }
    out
}
