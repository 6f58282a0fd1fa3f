//! Exchange instruments and their per-price valuation.
//!
//! Two closed categories: common and preferred. The P/E ratio is shared; the
//! dividend yield formula depends on the category.

use crate::domain::error::ConfigError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    Common,
    Preferred,
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentKind::Common => f.write_str("Common"),
            InstrumentKind::Preferred => f.write_str("Preferred"),
        }
    }
}

impl FromStr for InstrumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "common" => Ok(InstrumentKind::Common),
            "preferred" => Ok(InstrumentKind::Preferred),
            other => Err(format!("unknown instrument type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instrument {
    Common {
        symbol: String,
        last_dividend: u64,
        par_value: u64,
    },
    Preferred {
        symbol: String,
        last_dividend: u64,
        par_value: u64,
        /// Fraction of par value, e.g. 0.02 for 2%.
        fixed_dividend_rate: f64,
    },
}

impl Instrument {
    pub fn common(
        symbol: impl Into<String>,
        last_dividend: u64,
        par_value: u64,
    ) -> Result<Self, ConfigError> {
        let symbol = symbol.into();
        check_base(&symbol, par_value)?;
        Ok(Instrument::Common {
            symbol,
            last_dividend,
            par_value,
        })
    }

    pub fn preferred(
        symbol: impl Into<String>,
        last_dividend: u64,
        fixed_dividend_rate: f64,
        par_value: u64,
    ) -> Result<Self, ConfigError> {
        let symbol = symbol.into();
        check_base(&symbol, par_value)?;
        if !fixed_dividend_rate.is_finite() || fixed_dividend_rate < 0.0 {
            return Err(ConfigError::InvalidInstrument {
                symbol,
                reason: format!(
                    "fixed dividend rate must be a non-negative number, got {fixed_dividend_rate}"
                ),
            });
        }
        Ok(Instrument::Preferred {
            symbol,
            last_dividend,
            par_value,
            fixed_dividend_rate,
        })
    }

    pub fn symbol(&self) -> &str {
        match self {
            Instrument::Common { symbol, .. } | Instrument::Preferred { symbol, .. } => symbol,
        }
    }

    pub fn kind(&self) -> InstrumentKind {
        match self {
            Instrument::Common { .. } => InstrumentKind::Common,
            Instrument::Preferred { .. } => InstrumentKind::Preferred,
        }
    }

    pub fn last_dividend(&self) -> u64 {
        match self {
            Instrument::Common { last_dividend, .. }
            | Instrument::Preferred { last_dividend, .. } => *last_dividend,
        }
    }

    pub fn par_value(&self) -> u64 {
        match self {
            Instrument::Common { par_value, .. } | Instrument::Preferred { par_value, .. } => {
                *par_value
            }
        }
    }

    /// `None` for common instruments.
    pub fn fixed_dividend_rate(&self) -> Option<f64> {
        match self {
            Instrument::Common { .. } => None,
            Instrument::Preferred {
                fixed_dividend_rate,
                ..
            } => Some(*fixed_dividend_rate),
        }
    }

    /// market_price / last_dividend, or 0 when no dividend has been paid.
    pub fn pe_ratio(&self, market_price: f64) -> f64 {
        let dividend = self.last_dividend();
        if dividend == 0 {
            return 0.0;
        }
        market_price / dividend as f64
    }

    /// Common: last_dividend / price. Preferred: fixed_rate * par / price.
    /// Returns 0 for a zero price.
    pub fn dividend_yield(&self, market_price: f64) -> f64 {
        if market_price == 0.0 {
            return 0.0;
        }
        match self {
            Instrument::Common { last_dividend, .. } => *last_dividend as f64 / market_price,
            Instrument::Preferred {
                par_value,
                fixed_dividend_rate,
                ..
            } => fixed_dividend_rate * *par_value as f64 / market_price,
        }
    }
}

fn check_base(symbol: &str, par_value: u64) -> Result<(), ConfigError> {
    if symbol.trim().is_empty() {
        return Err(ConfigError::InvalidInstrument {
            symbol: symbol.to_string(),
            reason: "symbol must not be empty".to_string(),
        });
    }
    if par_value == 0 {
        return Err(ConfigError::InvalidInstrument {
            symbol: symbol.to_string(),
            reason: "par value must be positive".to_string(),
        });
    }
    Ok(())
}
