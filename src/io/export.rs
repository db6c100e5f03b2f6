//! Export a finished quote as pretty JSON.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::ProjectQuote;
use crate::error::{QuoteError, QuoteResult};

pub fn write_quote_json(path: &Path, quote: &ProjectQuote) -> QuoteResult<()> {
    let file = File::create(path)
        .map_err(|e| QuoteError::io(format!("failed to create quote export '{}'", path.display()), e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, quote)
        .map_err(|e| QuoteError::io("failed to write quote JSON", e.into()))?;
    writeln!(writer)
        .and_then(|_| writer.flush())
        .map_err(|e| QuoteError::io(format!("failed to flush quote export '{}'", path.display()), e))
}

pub fn read_quote_json(path: &Path) -> QuoteResult<ProjectQuote> {
    let file = File::open(path)
        .map_err(|e| QuoteError::io(format!("failed to open quote '{}'", path.display()), e))?;
    serde_json::from_reader(file)
        .map_err(|e| QuoteError::InvalidQuoteInput(format!("invalid quote JSON '{}': {e}", path.display())))
}
