//! Read/write material catalog JSON files.
//!
//! The file is a JSON object keyed by material name, each value a
//! `MaterialRecord`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{QuoteError, QuoteResult};
use crate::pricing::MaterialCatalog;

pub fn read_catalog_json(path: &Path) -> QuoteResult<MaterialCatalog> {
    let file = File::open(path)
        .map_err(|e| QuoteError::io(format!("failed to open catalog '{}'", path.display()), e))?;
    let catalog: MaterialCatalog = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| QuoteError::Config(format!("invalid catalog JSON '{}': {e}", path.display())))?;

    for record in catalog.iter() {
        if !(record.unit_price.is_finite() && record.unit_price >= 0.0) {
            return Err(QuoteError::Config(format!(
                "catalog '{}': price of '{}' must be finite and >= 0",
                path.display(),
                record.name
            )));
        }
    }
    Ok(catalog)
}

pub fn write_catalog_json(path: &Path, catalog: &MaterialCatalog) -> QuoteResult<()> {
    let file = File::create(path)
        .map_err(|e| QuoteError::io(format!("failed to create catalog '{}'", path.display()), e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, catalog)
        .map_err(|e| QuoteError::io("failed to write catalog JSON", e.into()))?;
    writer
        .flush()
        .map_err(|e| QuoteError::io(format!("failed to flush catalog '{}'", path.display()), e))
}
