//! Domain error types.

/// A trade field rejected during construction. Names the first failing field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid symbol: {0}")]
    Symbol(#[from] LookupError),

    #[error("invalid timestamp {value:?}: expected YYYY-MON-DD HH:MM:SS")]
    Timestamp { value: String },

    #[error("invalid quantity {0}: must be positive")]
    Quantity(i64),

    #[error("invalid price {0}: must be positive")]
    Price(i64),
}

impl ValidationError {
    /// Name of the field that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Symbol(_) => "symbol",
            ValidationError::Timestamp { .. } => "timestamp",
            ValidationError::Quantity(_) => "quantity",
            ValidationError::Price(_) => "price",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown instrument symbol: {symbol}")]
pub struct LookupError {
    pub symbol: String,
}

/// A malformed instrument definition or catalog row.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("row {row}: expected {expected} cells, found {found}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}: unrecognized instrument type {value:?}")]
    UnknownKind { row: usize, value: String },

    #[error("row {row}: missing required field {field}")]
    MissingField { row: usize, field: &'static str },

    #[error("row {row}: invalid value for {field}: {reason}")]
    InvalidField {
        row: usize,
        field: &'static str,
        reason: String,
    },

    #[error("duplicate column {0}")]
    DuplicateColumn(String),

    #[error("invalid instrument {symbol:?}: {reason}")]
    InvalidInstrument { symbol: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregationError {
    #[error("no trades in the last {window_seconds}s")]
    EmptyWindow { window_seconds: u64 },

    #[error("total quantity in the last {window_seconds}s is zero")]
    ZeroQuantity { window_seconds: u64 },

    #[error("window of {window_seconds}s covers {trades} trades, scan limit is {limit}")]
    ScanLimitExceeded {
        window_seconds: u64,
        trades: usize,
        limit: usize,
    },

    #[error("weighted price sum over the last {window_seconds}s overflows")]
    Overflow { window_seconds: u64 },
}

/// Top-level error type for gbce.
#[derive(Debug, thiserror::Error)]
pub enum GbceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&GbceError> for std::process::ExitCode {
    fn from(err: &GbceError) -> Self {
        let code: u8 = match err {
            GbceError::Io(_) => 1,
            GbceError::Config(_)
            | GbceError::ConfigParse { .. }
            | GbceError::ConfigInvalid { .. } => 2,
            GbceError::Lookup(_) => 3,
            GbceError::Validation(_) => 4,
            GbceError::Aggregation(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}
