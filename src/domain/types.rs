//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - passed between the classifiers and the pricing pipeline
//! - exported to JSON for storage or report rendering
//! - reloaded later (model artifacts, update batches, catalogs)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Upper bound of every risk multiplier.
pub const MAX_MULTIPLIER: f64 = 2.0;

/// Structural complexity of a job.
///
/// Deserialization is lenient: labels are matched case-insensitively, the
/// legacy labels (`baixa`, `media`, `alta`) are accepted, and anything else
/// falls back to `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" | "baixa" => Complexity::Low,
            "medium" | "media" | "média" => Complexity::Medium,
            "high" | "alta" => Complexity::High,
            other => {
                tracing::debug!(label = other, "unrecognized complexity, using low");
                Complexity::Low
            }
        }
    }

    /// Numeric score in `[0, 1]` used by the feature vector.
    pub fn score(self) -> f64 {
        match self {
            Complexity::Low => 0.0,
            Complexity::Medium => 0.5,
            Complexity::High => 1.0,
        }
    }
}

impl From<String> for Complexity {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

/// Environmental exposure of the job site.
///
/// Same lenient parsing policy as [`Complexity`]; legacy labels are
/// `controlado`, `externo` and `externo_adverso`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Environment {
    Controlled,
    Outdoor,
    OutdoorAdverse,
}

impl Environment {
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "controlled" | "controlado" => Environment::Controlled,
            "outdoor" | "externo" => Environment::Outdoor,
            "outdoor_adverse" | "externo_adverso" => Environment::OutdoorAdverse,
            other => {
                tracing::debug!(label = other, "unrecognized environment, using controlled");
                Environment::Controlled
            }
        }
    }

    pub fn score(self) -> f64 {
        match self {
            Environment::Controlled => 0.0,
            Environment::Outdoor => 0.5,
            Environment::OutdoorAdverse => 1.0,
        }
    }
}

impl From<String> for Environment {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

/// Caller-supplied description of a proposed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectAttributes {
    /// Maximum working height in metres.
    pub height_m: f64,
    #[serde(default = "default_complexity")]
    pub complexity: Complexity,
    #[serde(default = "default_environment")]
    pub environment: Environment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_complexity() -> Complexity {
    Complexity::Low
}

fn default_environment() -> Environment {
    Environment::Controlled
}

impl ProjectAttributes {
    pub fn new(height_m: f64, complexity: Complexity, environment: Environment) -> Self {
        Self {
            height_m,
            complexity,
            environment,
            description: None,
        }
    }
}

/// Numeric triple shared by both classifiers.
///
/// Serialized as a `[height, complexity, environment]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct FeatureVector {
    pub height_m: f64,
    pub complexity_score: f64,
    pub environment_score: f64,
}

impl FeatureVector {
    pub fn new(height_m: f64, complexity_score: f64, environment_score: f64) -> Self {
        Self {
            height_m,
            complexity_score,
            environment_score,
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.height_m, self.complexity_score, self.environment_score]
    }
}

impl From<[f64; 3]> for FeatureVector {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<FeatureVector> for [f64; 3] {
    fn from(v: FeatureVector) -> Self {
        v.as_array()
    }
}

/// Ordered risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskTier {
    pub const ALL: [RiskTier; 4] = [
        RiskTier::Low,
        RiskTier::Medium,
        RiskTier::High,
        RiskTier::VeryHigh,
    ];

    /// Ordinal index (0–3).
    pub fn index(self) -> usize {
        match self {
            RiskTier::Low => 0,
            RiskTier::Medium => 1,
            RiskTier::High => 2,
            RiskTier::VeryHigh => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Multiplier before complexity/environment adjustments.
    pub fn base_multiplier(self) -> f64 {
        match self {
            RiskTier::Low => 1.0,
            RiskTier::Medium => 1.2,
            RiskTier::High => 1.4,
            RiskTier::VeryHigh => 1.8,
        }
    }

    /// Opening clause of every justification for this tier.
    pub fn height_clause(self) -> &'static str {
        match self {
            RiskTier::Low => "Work at ground level or minimal height.",
            RiskTier::Medium => "Low-height work, below the 2 m work-at-height limit (NR-35).",
            RiskTier::High => "Work at height under NR-35 (above 2 m).",
            RiskTier::VeryHigh => "Work at great height (above 6 m).",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::VeryHigh => "very_high",
        }
    }
}

/// Outcome of a classification call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub tier: RiskTier,
    /// Price multiplier in `[1.0, 2.0]`.
    pub multiplier: f64,
    pub justification: String,
}

/// A labelled training example for the statistical classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub features: FeatureVector,
    /// Tier index (0–3).
    pub tier: usize,
}

impl LabeledSample {
    pub fn new(features: FeatureVector, tier: RiskTier) -> Self {
        Self {
            features,
            tier: tier.index(),
        }
    }

    /// Reject tier indices outside `0..=3` and non-finite features.
    pub fn check(&self) -> Result<(), String> {
        if RiskTier::from_index(self.tier).is_none() {
            return Err(format!("tier {} outside 0..={}", self.tier, RiskTier::ALL.len() - 1));
        }
        if !self.features.as_array().iter().all(|v| v.is_finite()) {
            return Err("non-finite feature value".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLineItem {
    pub material_name: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_price: f64,
    /// `quantity × unit_price`.
    pub line_total: f64,
}

impl MaterialLineItem {
    pub fn new(material_name: impl Into<String>, quantity: f64, unit: impl Into<String>, unit_price: f64) -> Self {
        Self {
            material_name: material_name.into(),
            quantity,
            unit: unit.into(),
            unit_price,
            line_total: quantity * unit_price,
        }
    }
}

/// Tax owed on a risk-adjusted subtotal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxAssessment {
    pub regime: String,
    pub rate_percent: f64,
    pub amount: f64,
}

/// Full cost → tax → margin derivation for one quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteBreakdown {
    pub materials_cost: f64,
    pub labor_percent: f64,
    pub labor_cost: f64,
    pub subtotal: f64,
    pub risk_adjusted_subtotal: f64,
    pub tax_rate_percent: f64,
    pub tax: f64,
    pub cost_with_tax: f64,
    pub margin_percent: f64,
    pub margin_amount: f64,
    pub total: f64,
    pub risk: RiskResult,
    pub materials: Vec<MaterialLineItem>,
}

/// One explicitly priced item of an item-based quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub material_name: String,
    pub quantity: f64,
}

/// Request to analyze a project end to end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRequest {
    pub name: String,
    #[serde(default)]
    pub client: String,
    pub attributes: ProjectAttributes,
    #[serde(default)]
    pub area_m2: f64,
    #[serde(default)]
    pub length_m: f64,
    #[serde(default)]
    pub width_m: f64,
    /// Labor as a percent of materials; the configured default when absent.
    #[serde(default)]
    pub labor_percent: Option<f64>,
    #[serde(default)]
    pub margin_percent: Option<f64>,
}

impl ProjectRequest {
    /// Area in m², derived from length × width when not given directly.
    pub fn effective_area(&self) -> f64 {
        if self.area_m2 == 0.0 && self.length_m > 0.0 && self.width_m > 0.0 {
            self.length_m * self.width_m
        } else {
            self.area_m2
        }
    }
}

/// Output of a full project analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectQuote {
    pub project_name: String,
    pub client: String,
    pub attributes: ProjectAttributes,
    pub area_m2: f64,
    pub issued_on: NaiveDate,
    pub tax: TaxAssessment,
    pub breakdown: QuoteBreakdown,
}
