//! Formatted terminal output for classifications, estimates and quotes.
//!
//! Tables are left-aligned names with right-aligned amounts, two decimals.

use crate::domain::{MaterialLineItem, ProjectQuote, RiskResult};
use crate::pricing::{MaterialCatalog, MaterialEstimate};

pub fn format_risk(risk: &RiskResult) -> String {
    format!(
        "Risk: {} (x{:.2})\n{}\n",
        risk.tier.display_name(),
        risk.multiplier,
        risk.justification
    )
}

pub fn format_estimate(area_m2: f64, estimate: &MaterialEstimate) -> String {
    let mut out = format!("Materials for {area_m2:.2} m²:\n");
    out.push_str(&format_lines(&estimate.items));
    out.push_str(&format!("{:<28} {:>38.2}\n", "Total", estimate.total_cost));
    out
}

pub fn format_quote(quote: &ProjectQuote) -> String {
    let b = &quote.breakdown;
    let mut out = String::new();

    out.push_str(&format!("=== Quote: {} ===\n", quote.project_name));
    if !quote.client.is_empty() {
        out.push_str(&format!("Client: {}\n", quote.client));
    }
    out.push_str(&format!("Issued: {}\n", quote.issued_on));
    out.push_str(&format!(
        "Job: height={:.2}m complexity={:?} environment={:?} area={:.2}m²\n\n",
        quote.attributes.height_m, quote.attributes.complexity, quote.attributes.environment, quote.area_m2
    ));
    out.push_str(&format_risk(&b.risk));
    out.push('\n');

    if !b.materials.is_empty() {
        out.push_str(&format_lines(&b.materials));
        out.push('\n');
    }

    let rows = [
        ("Materials".to_string(), b.materials_cost),
        (format!("Labor ({}%)", b.labor_percent), b.labor_cost),
        ("Subtotal".to_string(), b.subtotal),
        (format!("Risk-adjusted (x{:.2})", b.risk.multiplier), b.risk_adjusted_subtotal),
        (format!("Tax {} ({}%)", quote.tax.regime, b.tax_rate_percent), b.tax),
        ("Cost with tax".to_string(), b.cost_with_tax),
        (format!("Margin ({}%)", b.margin_percent), b.margin_amount),
        ("TOTAL".to_string(), b.total),
    ];
    for (label, amount) in rows {
        out.push_str(&format!("{:<40} {:>14.2}\n", truncate(&label, 40), amount));
    }
    out
}

pub fn format_catalog(catalog: &MaterialCatalog) -> String {
    let mut out = format!("{:<28} {:<12} {:>10} {:<6} {:<10}\n", "material", "category", "price", "unit", "supplier");
    out.push_str(&format!("{:-<28} {:-<12} {:-<10} {:-<6} {:-<10}\n", "", "", "", "", ""));
    for r in catalog.iter() {
        let line = format!(
            "{:<28} {:<12} {:>10.2} {:<6} {:<10}",
            truncate(&r.name, 28),
            truncate(&r.category, 12),
            r.unit_price,
            r.unit,
            r.supplier.as_deref().unwrap_or(""),
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn format_lines(items: &[MaterialLineItem]) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(&format!(
            "{:<28} {:>10.2} {:<5} x {:>8.2} = {:>10.2}\n",
            truncate(&item.material_name, 28),
            item.quantity,
            item.unit,
            item.unit_price,
            item.line_total
        ));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
