//! Engine configuration from the environment.
//!
//! `.env` is loaded best-effort, then `QUOTE_*` variables override the
//! built-in defaults. CLI flags override these per call.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{QuoteError, QuoteResult};
use crate::model::{StatisticalSettings, TrainingHistory};
use crate::pricing::{
    DEFAULT_LABOR_PERCENT, DEFAULT_MARGIN_PERCENT, DEFAULT_TAX_RATE_PERCENT, DEFAULT_TAX_REGIME, TaxPolicy,
};

pub const DEFAULT_MODEL_DIR: &str = "models";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub model_dir: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub tax: TaxPolicy,
    pub labor_percent: f64,
    pub margin_percent: f64,
    pub statistical: StatisticalSettings,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            catalog_path: None,
            tax: TaxPolicy::default(),
            labor_percent: DEFAULT_LABOR_PERCENT,
            margin_percent: DEFAULT_MARGIN_PERCENT,
            statistical: StatisticalSettings::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl EngineConfig {
    /// Read configuration from the process environment (after `.env`).
    pub fn from_env() -> QuoteResult<Self> {
        // Missing .env is fine.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> QuoteResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();
        let stat = defaults.statistical;

        Ok(Self {
            model_dir: get("QUOTE_MODEL_DIR").map(PathBuf::from).unwrap_or(defaults.model_dir),
            catalog_path: get("QUOTE_CATALOG").map(PathBuf::from),
            tax: TaxPolicy {
                regime: get("QUOTE_TAX_REGIME").unwrap_or_else(|| DEFAULT_TAX_REGIME.to_string()),
                rate_percent: parse_percent("QUOTE_TAX_RATE", get("QUOTE_TAX_RATE"), DEFAULT_TAX_RATE_PERCENT)?,
            },
            labor_percent: parse_percent("QUOTE_LABOR_PERCENT", get("QUOTE_LABOR_PERCENT"), defaults.labor_percent)?,
            margin_percent: parse_percent(
                "QUOTE_MARGIN_PERCENT",
                get("QUOTE_MARGIN_PERCENT"),
                defaults.margin_percent,
            )?,
            statistical: StatisticalSettings {
                bootstrap_seed: parse_or("QUOTE_BOOTSTRAP_SEED", get("QUOTE_BOOTSTRAP_SEED"), stat.bootstrap_seed)?,
                samples_per_tier: parse_positive(
                    "QUOTE_BOOTSTRAP_SAMPLES",
                    get("QUOTE_BOOTSTRAP_SAMPLES"),
                    stat.samples_per_tier,
                )?,
                trees: parse_positive("QUOTE_FOREST_TREES", get("QUOTE_FOREST_TREES"), stat.trees)?,
                history: match get("QUOTE_TRAINING_HISTORY") {
                    Some(v) => v.parse()?,
                    None => TrainingHistory::Accumulate,
                },
            },
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> QuoteResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|e| QuoteError::Config(format!("invalid {key} '{v}': {e}"))),
    }
}

fn parse_percent(key: &str, raw: Option<String>, default: f64) -> QuoteResult<f64> {
    let value: f64 = parse_or(key, raw, default)?;
    if !value.is_finite() || value < 0.0 {
        return Err(QuoteError::Config(format!("{key} must be a non-negative number, got {value}")));
    }
    Ok(value)
}

fn parse_positive(key: &str, raw: Option<String>, default: usize) -> QuoteResult<usize> {
    let value: usize = parse_or(key, raw, default)?;
    if value == 0 {
        return Err(QuoteError::Config(format!("{key} must be at least 1")));
    }
    Ok(value)
}
