//! Material price catalog.
//!
//! Records are keyed by material name. The seeded catalog holds the shop's
//! standard stock; a JSON catalog file replaces it when configured.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const TUBE_40X40: &str = "Metalon Tube 40x40";
pub const TUBE_20X20: &str = "Metalon Tube 20x20";
pub const GALVANIZED_SHEET_20: &str = "Galvanized Sheet #20";
pub const SELF_DRILLING_SCREW: &str = "Self-Drilling Screw";
pub const ANTICORROSIVE_PAINT: &str = "Anticorrosive Paint";

/// Anything that can price a material by name.
pub trait PriceLookup {
    fn unit_price(&self, material_name: &str) -> Option<f64>;
}

impl PriceLookup for HashMap<String, f64> {
    fn unit_price(&self, material_name: &str) -> Option<f64> {
        self.get(material_name).copied()
    }
}

impl PriceLookup for BTreeMap<String, f64> {
    fn unit_price(&self, material_name: &str) -> Option<f64> {
        self.get(material_name).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub name: String,
    pub category: String,
    pub unit_price: f64,
    pub unit: String,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub updated_on: Option<NaiveDate>,
}

impl MaterialRecord {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        unit_price: f64,
        unit: impl Into<String>,
        supplier: Option<&str>,
        updated_on: Option<NaiveDate>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            unit_price,
            unit: unit.into(),
            supplier: supplier.map(str::to_string),
            updated_on,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialCatalog {
    records: BTreeMap<String, MaterialRecord>,
}

impl MaterialCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default stock list.
    pub fn seeded() -> Self {
        let today = Some(Utc::now().date_naive());
        let mut catalog = Self::new();
        for (name, category, price, unit, supplier) in [
            (TUBE_20X20, "Structural", 15.50, "m", "SILFER"),
            ("Metalon Tube 30x30", "Structural", 22.75, "m", "SILFER"),
            (TUBE_40X40, "Structural", 32.90, "m", "SILFER"),
            ("Metalon Tube 50x30", "Structural", 35.40, "m", "KASIFER"),
            ("Galvanized Sheet #18", "Roofing", 120.00, "m²", "GOLDONI"),
            (GALVANIZED_SHEET_20, "Roofing", 95.00, "m²", "GOLDONI"),
            ("Trapezoidal Roof Tile", "Roofing", 45.00, "m²", "KASIFER"),
            (SELF_DRILLING_SCREW, "Fastening", 0.35, "unit", "SILFER"),
            ("Electrode 6013", "Consumable", 25.00, "kg", "GOLDONI"),
            ("Cutting Disc 7in", "Consumable", 12.50, "unit", "SILFER"),
            (ANTICORROSIVE_PAINT, "Finishing", 85.00, "L", "KASIFER"),
        ] {
            catalog.upsert(MaterialRecord::new(name, category, price, unit, Some(supplier), today));
        }
        catalog
    }

    /// Insert or replace a record; returns the previous one.
    pub fn upsert(&mut self, record: MaterialRecord) -> Option<MaterialRecord> {
        self.records.insert(record.name.clone(), record)
    }

    pub fn get(&self, name: &str) -> Option<&MaterialRecord> {
        self.records.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<MaterialRecord> {
        self.records.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MaterialRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PriceLookup for MaterialCatalog {
    fn unit_price(&self, material_name: &str) -> Option<f64> {
        self.get(material_name).map(|r| r.unit_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_catalog_has_the_standard_stock() {
        let c = MaterialCatalog::seeded();
        assert_eq!(c.len(), 11);
        assert_eq!(c.unit_price(TUBE_40X40), Some(32.90));
        assert_eq!(c.get(ANTICORROSIVE_PAINT).map(|r| r.unit.as_str()), Some("L"));
    }

    #[test]
    fn crud_operations() {
        let mut c = MaterialCatalog::new();
        assert!(c.is_empty());
        assert!(c.upsert(MaterialRecord::new("Rivet", "Fastening", 0.10, "unit", None, None)).is_none());
        let prev = c.upsert(MaterialRecord::new("Rivet", "Fastening", 0.12, "unit", None, None));
        assert_eq!(prev.map(|r| r.unit_price), Some(0.10));
        assert_eq!(c.unit_price("Rivet"), Some(0.12));
        assert!(c.remove("Rivet").is_some());
        assert_eq!(c.unit_price("Rivet"), None);
    }

    #[test]
    fn plain_maps_are_price_lookups() {
        let mut m = HashMap::new();
        m.insert(TUBE_20X20.to_string(), 17.0);
        assert_eq!(m.unit_price(TUBE_20X20), Some(17.0));
        assert_eq!(m.unit_price(TUBE_40X40), None);
    }
}
