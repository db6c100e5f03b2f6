//! Bill of quantities.
//!
//! Area-based estimates use fixed consumption per m² of project area:
//!
//! ```text
//! Metalon Tube 40x40     0.8  m/m²    32.90
//! Metalon Tube 20x20     1.2  m/m²    15.50
//! Galvanized Sheet #20   0.7  m²/m²   95.00
//! Self-Drilling Screw    15   unit/m²  0.35
//! Anticorrosive Paint    0.1  L/m²    85.00
//! ```
//!
//! The last column is the fallback unit price when the catalog has no entry.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{MaterialLineItem, QuoteItem};
use crate::error::{QuoteError, QuoteResult};
use crate::pricing::catalog::{
    ANTICORROSIVE_PAINT, GALVANIZED_SHEET_20, MaterialCatalog, PriceLookup, SELF_DRILLING_SCREW,
    TUBE_20X20, TUBE_40X40,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumptionRatio {
    pub material: &'static str,
    pub per_m2: f64,
    pub unit: &'static str,
    pub default_price: f64,
}

pub const CONSUMPTION_RATIOS: [ConsumptionRatio; 5] = [
    ConsumptionRatio {
        material: TUBE_40X40,
        per_m2: 0.8,
        unit: "m",
        default_price: 32.90,
    },
    ConsumptionRatio {
        material: TUBE_20X20,
        per_m2: 1.2,
        unit: "m",
        default_price: 15.50,
    },
    ConsumptionRatio {
        material: GALVANIZED_SHEET_20,
        per_m2: 0.7,
        unit: "m²",
        default_price: 95.00,
    },
    ConsumptionRatio {
        material: SELF_DRILLING_SCREW,
        per_m2: 15.0,
        unit: "unit",
        default_price: 0.35,
    },
    ConsumptionRatio {
        material: ANTICORROSIVE_PAINT,
        per_m2: 0.1,
        unit: "L",
        default_price: 85.00,
    },
];

/// Priced material lines and their sum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialEstimate {
    pub items: Vec<MaterialLineItem>,
    pub total_cost: f64,
}

impl MaterialEstimate {
    fn from_items(items: Vec<MaterialLineItem>) -> Self {
        let total_cost = items.iter().map(|i| i.line_total).sum();
        Self { items, total_cost }
    }
}

/// Estimate materials for `area_m2`. A non-positive (or NaN) area yields an
/// empty estimate.
pub fn estimate(area_m2: f64, catalog: &impl PriceLookup) -> MaterialEstimate {
    if !(area_m2 > 0.0) {
        return MaterialEstimate::default();
    }

    let items = CONSUMPTION_RATIOS
        .iter()
        .map(|ratio| {
            let unit_price = catalog.unit_price(ratio.material).unwrap_or_else(|| {
                warn!(material = ratio.material, price = ratio.default_price, "no catalog price, using default");
                ratio.default_price
            });
            MaterialLineItem::new(ratio.material, area_m2 * ratio.per_m2, ratio.unit, unit_price)
        })
        .collect();

    MaterialEstimate::from_items(items)
}

/// Price explicit items from the catalog. Every material must be listed.
pub fn price_items(items: &[QuoteItem], catalog: &MaterialCatalog) -> QuoteResult<MaterialEstimate> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let record = catalog
            .get(&item.material_name)
            .ok_or_else(|| QuoteError::UnknownMaterial(item.material_name.clone()))?;
        if !(item.quantity.is_finite() && item.quantity >= 0.0) {
            return Err(QuoteError::InvalidQuoteInput(format!(
                "quantity of '{}' must be finite and >= 0, got {}",
                item.material_name, item.quantity
            )));
        }
        lines.push(MaterialLineItem::new(
            record.name.clone(),
            item.quantity,
            record.unit.clone(),
            record.unit_price,
        ));
    }
    Ok(MaterialEstimate::from_items(lines))
}
