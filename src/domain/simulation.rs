//! Random trade simulation over the catalog.
//!
//! Draws trades uniformly over symbols, quantities, sides and prices, spaced
//! at a fixed interval starting some seconds before now. Each trade is valued
//! against its instrument, reported, and appended to the ledger; the run ends
//! with the windowed VWSP and the all-share index.

use crate::domain::catalog::{CatalogCell, InstrumentCatalog};
use crate::domain::error::{AggregationError, ConfigError, GbceError};
use crate::domain::ledger::TradeLedger;
use crate::domain::trade::{Side, Trade};
use crate::ports::clock_port::ClockPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;
use chrono::{NaiveDateTime, TimeDelta};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SECTION: &str = "simulation";

pub const DEFAULT_TRADES: usize = 1000;
pub const DEFAULT_QUANTITY: (i64, i64) = (1000, 2000);
pub const DEFAULT_PRICE: (i64, i64) = (500, 1000);
pub const DEFAULT_INTERVAL_MS: u64 = 200;
pub const DEFAULT_SHIFT_SECONDS: u64 = 60;
pub const DEFAULT_WINDOW_SECONDS: u64 = 15;

/// Upper bounds keeping simulated timestamps well inside chrono's range.
pub const MAX_INTERVAL_MS: u64 = 86_400_000;
pub const MAX_SHIFT_SECONDS: u64 = 3_153_600_000;

pub const CATALOG_HEADER: [&str; 5] = [
    "symbol",
    "type",
    "last_dividend",
    "fixed_dividend",
    "par_value",
];

/// The five-instrument sample exchange: TEA, POP, ALE, GIN, JOE.
pub fn default_catalog() -> Result<InstrumentCatalog, ConfigError> {
    let row = |symbol: &str, kind: &str, dividend: i64, fixed: CatalogCell, par: i64| {
        vec![
            CatalogCell::from(symbol),
            CatalogCell::from(kind),
            CatalogCell::Int(dividend),
            fixed,
            CatalogCell::Int(par),
        ]
    };
    let na = || CatalogCell::from("");
    let rows = vec![
        row("TEA", "Common", 0, na(), 100),
        row("POP", "Common", 8, na(), 100),
        row("ALE", "Common", 23, na(), 60),
        row("GIN", "Preferred", 8, CatalogCell::Float(0.02), 100),
        row("JOE", "Common", 13, na(), 250),
    ];
    let catalog = InstrumentCatalog::new();
    catalog.bulk_load(&CATALOG_HEADER, &rows)?;
    Ok(catalog)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub trades: usize,
    pub quantity_min: i64,
    pub quantity_max: i64,
    pub price_min: i64,
    pub price_max: i64,
    pub interval_ms: u64,
    pub shift_seconds: u64,
    pub window_seconds: u64,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trades: DEFAULT_TRADES,
            quantity_min: DEFAULT_QUANTITY.0,
            quantity_max: DEFAULT_QUANTITY.1,
            price_min: DEFAULT_PRICE.0,
            price_max: DEFAULT_PRICE.1,
            interval_ms: DEFAULT_INTERVAL_MS,
            shift_seconds: DEFAULT_SHIFT_SECONDS,
            window_seconds: DEFAULT_WINDOW_SECONDS,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Reads the `[simulation]` section, falling back to defaults per key.
    /// Values are expected to have passed `validate_simulation_config`.
    pub fn from_port(config: &dyn ConfigPort) -> Self {
        let defaults = Self::default();
        let int = |key: &str, default: i64| config.get_int(SECTION, key, default);
        let unsigned = |key: &str, default: u64| {
            u64::try_from(int(key, default as i64)).unwrap_or(default)
        };
        Self {
            trades: unsigned("trades", defaults.trades as u64) as usize,
            quantity_min: int("quantity_min", defaults.quantity_min),
            quantity_max: int("quantity_max", defaults.quantity_max),
            price_min: int("price_min", defaults.price_min),
            price_max: int("price_max", defaults.price_max),
            interval_ms: unsigned("interval_ms", defaults.interval_ms),
            shift_seconds: unsigned("shift_seconds", defaults.shift_seconds),
            window_seconds: unsigned("window_seconds", defaults.window_seconds),
            seed: config
                .get_string(SECTION, "seed")
                .and_then(|s| s.trim().parse().ok()),
        }
    }
}

/// Raw draw before validation into a [`Trade`].
#[derive(Debug, Clone, PartialEq)]
pub struct TradeDraw {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub quantity: i64,
    pub side: Side,
    pub price: i64,
}

fn out_of_range(key: &str, reason: String) -> GbceError {
    GbceError::ConfigInvalid {
        section: SECTION.to_string(),
        key: key.to_string(),
        reason,
    }
}

/// Fails when the trade spacing would carry timestamps past chrono's range.
pub fn generate_trades<R: Rng>(
    rng: &mut R,
    symbols: &[String],
    start: NaiveDateTime,
    config: &SimulationConfig,
) -> Result<Vec<TradeDraw>, GbceError> {
    if symbols.is_empty() {
        return Ok(Vec::new());
    }
    let step = i64::try_from(config.interval_ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .ok_or_else(|| {
            out_of_range(
                "interval_ms",
                format!("interval of {}ms is out of range", config.interval_ms),
            )
        })?;
    let mut timestamp = start;
    let mut draws = Vec::with_capacity(config.trades);
    for i in 0..config.trades {
        if i > 0 {
            timestamp = timestamp.checked_add_signed(step).ok_or_else(|| {
                out_of_range(
                    "interval_ms",
                    format!("trade {i} at {}ms spacing overflows the timestamp", config.interval_ms),
                )
            })?;
        }
        draws.push(TradeDraw {
            symbol: symbols[rng.gen_range(0..symbols.len())].clone(),
            timestamp,
            quantity: rng.gen_range(config.quantity_min..=config.quantity_max),
            side: if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell },
            price: rng.gen_range(config.price_min..=config.price_max),
        });
    }
    Ok(draws)
}

/// A trade together with its instrument's valuation at the trade price.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeValuation {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub quantity: u64,
    pub side: Side,
    pub price: u64,
    pub dividend_yield: f64,
    pub pe_ratio: f64,
}

impl TradeValuation {
    pub fn of(trade: &Trade) -> Self {
        let price = trade.price() as f64;
        Self {
            symbol: trade.symbol().to_string(),
            timestamp: trade.timestamp(),
            quantity: trade.quantity(),
            side: trade.side(),
            price: trade.price(),
            dividend_yield: trade.instrument().dividend_yield(price),
            pe_ratio: trade.instrument().pe_ratio(price),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSummary {
    pub trades: usize,
    pub rejected: usize,
    pub window_seconds: u64,
    pub volume_weighted_price: Result<f64, AggregationError>,
    pub gbce_all_share_index: f64,
}

pub fn run_simulation(
    catalog: &InstrumentCatalog,
    ledger: &TradeLedger,
    clock: &dyn ClockPort,
    config: &SimulationConfig,
    report: &mut dyn ReportPort,
) -> Result<SimulationSummary, GbceError> {
    let symbols = catalog.symbols();
    if symbols.is_empty() {
        return Err(GbceError::ConfigInvalid {
            section: "catalog".to_string(),
            key: "path".to_string(),
            reason: "catalog has no instruments".to_string(),
        });
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let start = i64::try_from(config.shift_seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|shift| clock.now().checked_sub_signed(shift))
        .ok_or_else(|| {
            out_of_range(
                "shift_seconds",
                format!("shift of {}s is out of range", config.shift_seconds),
            )
        })?;
    let draws = generate_trades(&mut rng, &symbols, start, config)?;

    let mut accepted = 0;
    let mut rejected = 0;
    for draw in draws {
        let trade = match Trade::new(
            catalog,
            &draw.symbol,
            draw.timestamp,
            draw.quantity,
            draw.side,
            draw.price,
        ) {
            Ok(trade) => trade,
            Err(e) => {
                tracing::warn!(symbol = %draw.symbol, error = %e, "rejected simulated trade");
                rejected += 1;
                continue;
            }
        };
        report.write_valuation(&TradeValuation::of(&trade))?;
        ledger.append(trade);
        accepted += 1;
    }

    let summary = SimulationSummary {
        trades: accepted,
        rejected,
        window_seconds: config.window_seconds,
        volume_weighted_price: ledger.volume_weighted_price(config.window_seconds),
        gbce_all_share_index: ledger.gbce_all_share_index(),
    };
    report.write_summary(&summary)?;
    Ok(summary)
}
