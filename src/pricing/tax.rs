//! Tax regime applied to the risk-adjusted subtotal.
//!
//! The default regime is a simplified small-business rate: a flat 6 % on the
//! risk-adjusted amount.

use serde::{Deserialize, Serialize};

use crate::domain::TaxAssessment;

pub const DEFAULT_TAX_RATE_PERCENT: f64 = 6.0;
pub const DEFAULT_TAX_REGIME: &str = "ME - Simples Nacional";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxPolicy {
    pub regime: String,
    pub rate_percent: f64,
}

impl Default for TaxPolicy {
    fn default() -> Self {
        Self {
            regime: DEFAULT_TAX_REGIME.to_string(),
            rate_percent: DEFAULT_TAX_RATE_PERCENT,
        }
    }
}

impl TaxPolicy {
    pub fn assess(&self, taxable: f64) -> TaxAssessment {
        TaxAssessment {
            regime: self.regime.clone(),
            rate_percent: self.rate_percent,
            amount: taxable * (self.rate_percent / 100.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_regime_charges_six_percent() {
        let t = TaxPolicy::default().assess(13_440.0);
        assert_eq!(t.regime, "ME - Simples Nacional");
        assert!((t.amount - 806.4).abs() < 1e-9);
    }
}
