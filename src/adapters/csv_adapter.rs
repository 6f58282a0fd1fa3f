//! CSV catalog adapter.
//!
//! Reads a header row of column names followed by one instrument per line and
//! hands both to [`InstrumentCatalog::bulk_load`]. Every cell arrives as text;
//! an empty cell marks a field that does not apply to the row's type.

use crate::domain::catalog::{CatalogCell, InstrumentCatalog};
use crate::domain::error::GbceError;
use std::fs;
use std::path::Path;

pub fn load_catalog_csv(path: &Path, catalog: &InstrumentCatalog) -> Result<usize, GbceError> {
    let content = fs::read_to_string(path)?;
    load_catalog_str(&content, catalog).map_err(|e| match e {
        GbceError::ConfigParse { reason, .. } => GbceError::ConfigParse {
            file: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

pub fn load_catalog_str(content: &str, catalog: &InstrumentCatalog) -> Result<usize, GbceError> {
    let parse_error = |e: csv::Error| GbceError::ConfigParse {
        file: "<inline>".to_string(),
        reason: format!("CSV parse error: {e}"),
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());
    let columns: Vec<String> = rdr
        .headers()
        .map_err(parse_error)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows: Vec<Vec<CatalogCell>> = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(parse_error)?;
        rows.push(record.iter().map(CatalogCell::from).collect());
    }

    let loaded = catalog.bulk_load(&columns, &rows)?;
    tracing::debug!(loaded, "loaded catalog from CSV");
    Ok(loaded)
}
