//! Instrument catalog: symbol-keyed registry shared by valuation and trade
//! validation.

use crate::domain::error::{ConfigError, LookupError};
use crate::domain::instrument::{Instrument, InstrumentKind};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub const COL_SYMBOL: &str = "symbol";
pub const COL_TYPE: &str = "type";
pub const COL_LAST_DIVIDEND: &str = "last_dividend";
pub const COL_FIXED_DIVIDEND: &str = "fixed_dividend";
pub const COL_PAR_VALUE: &str = "par_value";

/// One cell of a bulk-load row. `Text("")` marks a field that does not apply.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogCell {
    Text(String),
    Int(i64),
    Float(f64),
}

impl CatalogCell {
    fn is_blank(&self) -> bool {
        matches!(self, CatalogCell::Text(s) if s.trim().is_empty())
    }
}

impl From<&str> for CatalogCell {
    fn from(value: &str) -> Self {
        CatalogCell::Text(value.to_string())
    }
}

impl From<String> for CatalogCell {
    fn from(value: String) -> Self {
        CatalogCell::Text(value)
    }
}

impl From<i64> for CatalogCell {
    fn from(value: i64) -> Self {
        CatalogCell::Int(value)
    }
}

impl From<f64> for CatalogCell {
    fn from(value: f64) -> Self {
        CatalogCell::Float(value)
    }
}

#[derive(Debug, Default)]
pub struct InstrumentCatalog {
    instruments: RwLock<HashMap<String, Arc<Instrument>>>,
}

impl InstrumentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Result<Arc<Instrument>, LookupError> {
        self.read()
            .get(symbol)
            .cloned()
            .ok_or_else(|| LookupError {
                symbol: symbol.to_string(),
            })
    }

    /// Inserts or replaces the entry for the instrument's symbol.
    pub fn upsert(&self, instrument: Instrument) -> Option<Arc<Instrument>> {
        let symbol = instrument.symbol().to_string();
        self.write().insert(symbol, Arc::new(instrument))
    }

    pub fn remove(&self, symbol: &str) -> Option<Arc<Instrument>> {
        self.write().remove(symbol)
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.read().contains_key(symbol)
    }

    /// Sorted symbols.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.read().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Builds instruments from rows aligned to `columns` and upserts them.
    ///
    /// Every row is validated before any is inserted, so a failing load leaves
    /// the catalog unchanged. Returns the number of rows loaded.
    pub fn bulk_load<S: AsRef<str>>(
        &self,
        columns: &[S],
        rows: &[Vec<CatalogCell>],
    ) -> Result<usize, ConfigError> {
        let header = column_index(columns)?;
        let instruments = rows
            .iter()
            .enumerate()
            .map(|(i, row)| build_instrument(&header, i + 1, row))
            .collect::<Result<Vec<_>, _>>()?;

        let count = instruments.len();
        let mut guard = self.write();
        for instrument in instruments {
            guard.insert(instrument.symbol().to_string(), Arc::new(instrument));
        }
        drop(guard);

        tracing::debug!(count, "catalog bulk load");
        Ok(count)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Instrument>>> {
        self.instruments.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Instrument>>> {
        self.instruments
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

struct Header {
    width: usize,
    positions: HashMap<String, usize>,
}

fn column_index<S: AsRef<str>>(columns: &[S]) -> Result<Header, ConfigError> {
    let mut positions = HashMap::new();
    for (i, name) in columns.iter().enumerate() {
        let key = name.as_ref().trim().trim_end_matches('_').to_lowercase();
        if positions.insert(key.clone(), i).is_some() {
            return Err(ConfigError::DuplicateColumn(key));
        }
    }
    Ok(Header {
        width: columns.len(),
        positions,
    })
}

fn build_instrument(
    header: &Header,
    row_no: usize,
    row: &[CatalogCell],
) -> Result<Instrument, ConfigError> {
    if row.len() != header.width {
        return Err(ConfigError::RowWidth {
            row: row_no,
            expected: header.width,
            found: row.len(),
        });
    }

    // Blank cells are "not applicable" and behave as if the column were absent.
    let field = |name: &'static str| {
        header
            .positions
            .get(name)
            .map(|&i| &row[i])
            .filter(|cell| !cell.is_blank())
    };
    let required = |name: &'static str| {
        field(name).ok_or(ConfigError::MissingField {
            row: row_no,
            field: name,
        })
    };

    let symbol = text_field(row_no, COL_SYMBOL, required(COL_SYMBOL)?)?;
    let kind_text = text_field(row_no, COL_TYPE, required(COL_TYPE)?)?;
    let kind: InstrumentKind = kind_text.parse().map_err(|_| ConfigError::UnknownKind {
        row: row_no,
        value: kind_text.clone(),
    })?;
    let last_dividend = unsigned_field(row_no, COL_LAST_DIVIDEND, required(COL_LAST_DIVIDEND)?)?;
    let par_value = unsigned_field(row_no, COL_PAR_VALUE, required(COL_PAR_VALUE)?)?;

    match kind {
        InstrumentKind::Common => Instrument::common(symbol, last_dividend, par_value),
        InstrumentKind::Preferred => {
            let rate = float_field(row_no, COL_FIXED_DIVIDEND, required(COL_FIXED_DIVIDEND)?)?;
            Instrument::preferred(symbol, last_dividend, rate, par_value)
        }
    }
}

fn text_field(row: usize, field: &'static str, cell: &CatalogCell) -> Result<String, ConfigError> {
    match cell {
        CatalogCell::Text(s) => Ok(s.trim().to_string()),
        other => Err(ConfigError::InvalidField {
            row,
            field,
            reason: format!("expected text, got {other:?}"),
        }),
    }
}

fn unsigned_field(row: usize, field: &'static str, cell: &CatalogCell) -> Result<u64, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidField { row, field, reason };
    match cell {
        CatalogCell::Int(v) => u64::try_from(*v).map_err(|_| invalid(format!("{v} is negative"))),
        CatalogCell::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid(format!("{s:?}: {e}"))),
        CatalogCell::Float(v) => Err(invalid(format!("expected an integer, got {v}"))),
    }
}

fn float_field(row: usize, field: &'static str, cell: &CatalogCell) -> Result<f64, ConfigError> {
    match cell {
        CatalogCell::Float(v) => Ok(*v),
        CatalogCell::Int(v) => Ok(*v as f64),
        CatalogCell::Text(s) => s.trim().parse::<f64>().map_err(|e| ConfigError::InvalidField {
            row,
            field,
            reason: format!("{s:?}: {e}"),
        }),
    }
}
