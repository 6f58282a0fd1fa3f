//! Executed trades.
//!
//! A [`Trade`] is validated while it is built: the symbol must resolve in the
//! catalog, the timestamp must parse, and quantity and price must be positive.
//! There is no way to hold an invalid one.

use crate::domain::catalog::InstrumentCatalog;
use crate::domain::error::ValidationError;
use crate::domain::instrument::Instrument;
use crate::ports::clock_port::ClockPort;
use chrono::NaiveDateTime;
use std::fmt;
use std::sync::Arc;

/// Accepted textual timestamp layouts, tried in order.
pub const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%b-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// Timestamp input: human-readable text or an already structured value.
#[derive(Debug, Clone, Copy)]
pub enum TradeTime<'a> {
    Text(&'a str),
    At(NaiveDateTime),
}

impl<'a> From<&'a str> for TradeTime<'a> {
    fn from(value: &'a str) -> Self {
        TradeTime::Text(value)
    }
}

impl From<NaiveDateTime> for TradeTime<'_> {
    fn from(value: NaiveDateTime) -> Self {
        TradeTime::At(value)
    }
}

/// Parses `2015-JAN-21 00:12:11` (month name case-insensitive) or ISO
/// `2015-01-21 00:12:11`.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    instrument: Arc<Instrument>,
    timestamp: NaiveDateTime,
    quantity: u64,
    side: Side,
    price: u64,
}

impl Trade {
    /// Validates fields in order (symbol, timestamp, quantity, price) and
    /// reports the first failure.
    pub fn new<'a>(
        catalog: &InstrumentCatalog,
        symbol: &str,
        timestamp: impl Into<TradeTime<'a>>,
        quantity: i64,
        side: Side,
        price: i64,
    ) -> Result<Self, ValidationError> {
        let instrument = catalog.get(symbol)?;

        let timestamp = match timestamp.into() {
            TradeTime::At(at) => at,
            TradeTime::Text(text) => {
                parse_timestamp(text).ok_or_else(|| ValidationError::Timestamp {
                    value: text.to_string(),
                })?
            }
        };

        let quantity = positive(quantity).ok_or(ValidationError::Quantity(quantity))?;
        let price = positive(price).ok_or(ValidationError::Price(price))?;

        Ok(Self {
            instrument,
            timestamp,
            quantity,
            side,
            price,
        })
    }

    /// Same as [`Trade::new`], stamped with the clock's current time.
    pub fn now(
        catalog: &InstrumentCatalog,
        clock: &dyn ClockPort,
        symbol: &str,
        quantity: i64,
        side: Side,
        price: i64,
    ) -> Result<Self, ValidationError> {
        Self::new(catalog, symbol, clock.now(), quantity, side, price)
    }

    pub fn symbol(&self) -> &str {
        self.instrument.symbol()
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn is_valid(&self) -> bool {
        self.quantity > 0 && self.price > 0
    }
}

fn positive(value: i64) -> Option<u64> {
    if value > 0 { Some(value as u64) } else { None }
}
