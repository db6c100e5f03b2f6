//! Quote derivation.
//!
//! ```text
//! labor          = materials × labor% / 100
//! subtotal       = materials + labor
//! risk_adjusted  = subtotal × multiplier
//! tax            = risk_adjusted × tax% / 100
//! cost_with_tax  = risk_adjusted + tax
//! margin         = cost_with_tax × margin% / 100
//! total          = cost_with_tax + margin
//! ```
//!
//! Every step is linear in `materials`, so doubling the material cost doubles
//! the total for fixed percentages and multiplier.

use crate::domain::{QuoteBreakdown, RiskResult};
use crate::error::{QuoteError, QuoteResult};

pub const DEFAULT_LABOR_PERCENT: f64 = 40.0;
pub const DEFAULT_MARGIN_PERCENT: f64 = 30.0;

/// Run the pricing pipeline.
///
/// All inputs (including the risk multiplier) must be finite and non-negative.
/// The returned breakdown has no material lines; callers attach them.
pub fn price(
    materials_cost: f64,
    labor_percent: f64,
    risk: &RiskResult,
    tax_rate_percent: f64,
    margin_percent: f64,
) -> QuoteResult<QuoteBreakdown> {
    check_input("materials_cost", materials_cost)?;
    check_input("labor_percent", labor_percent)?;
    check_input("risk multiplier", risk.multiplier)?;
    check_input("tax_rate_percent", tax_rate_percent)?;
    check_input("margin_percent", margin_percent)?;

    let labor_cost = materials_cost * (labor_percent / 100.0);
    let subtotal = materials_cost + labor_cost;
    let risk_adjusted_subtotal = subtotal * risk.multiplier;
    let tax = risk_adjusted_subtotal * (tax_rate_percent / 100.0);
    let cost_with_tax = risk_adjusted_subtotal + tax;
    let margin_amount = cost_with_tax * (margin_percent / 100.0);
    let total = cost_with_tax + margin_amount;

    Ok(QuoteBreakdown {
        materials_cost,
        labor_percent,
        labor_cost,
        subtotal,
        risk_adjusted_subtotal,
        tax_rate_percent,
        tax,
        cost_with_tax,
        margin_percent,
        margin_amount,
        total,
        risk: risk.clone(),
        materials: Vec::new(),
    })
}

fn check_input(name: &str, value: f64) -> QuoteResult<()> {
    if !value.is_finite() {
        return Err(QuoteError::InvalidQuoteInput(format!("{name} must be finite, got {value}")));
    }
    if value < 0.0 {
        return Err(QuoteError::InvalidQuoteInput(format!("{name} must be >= 0, got {value}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RiskTier;

    fn risk(multiplier: f64) -> RiskResult {
        RiskResult {
            tier: RiskTier::High,
            multiplier,
            justification: String::new(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn high_risk_job_at_six_thousand() {
        let q = price(6000.0, 40.0, &risk(1.6), 6.0, 30.0).unwrap();
        assert!(close(q.labor_cost, 2400.0));
        assert!(close(q.subtotal, 8400.0));
        assert!(close(q.risk_adjusted_subtotal, 13_440.0));
        assert!(close(q.tax, 806.4));
        assert!(close(q.cost_with_tax, 14_246.4));
        assert!(close(q.margin_amount, 4273.92));
        assert!(close(q.total, 18_520.32));
        assert!(q.materials.is_empty());
    }

    #[test]
    fn total_is_linear_in_materials() {
        for m in [1.0, 123.45, 6000.0, 1e6] {
            let single = price(m, 40.0, &risk(1.3), 6.0, 30.0).unwrap();
            let double = price(2.0 * m, 40.0, &risk(1.3), 6.0, 30.0).unwrap();
            assert!((double.total - 2.0 * single.total).abs() <= 1e-9 * double.total);
        }
    }

    #[test]
    fn zero_materials_prices_to_zero() {
        let q = price(0.0, 40.0, &risk(1.8), 6.0, 30.0).unwrap();
        assert_eq!(q.total, 0.0);
    }

    #[test]
    fn rejects_negative_and_non_finite_inputs() {
        for (m, l, x, t, g) in [
            (-1.0, 40.0, 1.0, 6.0, 30.0),
            (100.0, -5.0, 1.0, 6.0, 30.0),
            (100.0, 40.0, 1.0, -6.0, 30.0),
            (100.0, 40.0, 1.0, 6.0, -30.0),
            (f64::NAN, 40.0, 1.0, 6.0, 30.0),
            (f64::INFINITY, 40.0, 1.0, 6.0, 30.0),
            (100.0, 40.0, f64::NAN, 6.0, 30.0),
        ] {
            let err = price(m, l, &risk(x), t, g).unwrap_err();
            assert!(matches!(err, QuoteError::InvalidQuoteInput(_)));
        }
    }
}
