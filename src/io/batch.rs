//! Labelled training batches for model updates.
//!
//! Format: a JSON array of `{ "features": [height, complexity, environment], "tier": 0..=3 }`.
//! Tier validation happens in the classifier so the batch is rejected as a whole.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::domain::LabeledSample;
use crate::error::{QuoteError, QuoteResult};

pub fn read_batch_json(path: &Path) -> QuoteResult<Vec<LabeledSample>> {
    let file = File::open(path)
        .map_err(|e| QuoteError::io(format!("failed to open batch '{}'", path.display()), e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| QuoteError::InvalidQuoteInput(format!("invalid batch JSON '{}': {e}", path.display())))
}
