#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use gbce::adapters::clock_adapter::FixedClock;
use gbce::domain::catalog::{CatalogCell, InstrumentCatalog};
use gbce::domain::ledger::TradeLedger;
use gbce::domain::trade::{Side, Trade};
use std::sync::Arc;

pub const HEADER: [&str; 5] = ["symbol", "type", "last_dividend", "fixed_dividend", "par_value"];

pub fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2018, 5, 13)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// TEA (Common, dividend 0, par 100) and GIN (Preferred, dividend 8, 2%, par 100).
pub fn tea_and_gin() -> InstrumentCatalog {
    let catalog = InstrumentCatalog::new();
    let rows = vec![
        vec![
            CatalogCell::from("TEA"),
            CatalogCell::from("Common"),
            CatalogCell::Int(0),
            CatalogCell::from(""),
            CatalogCell::Int(100),
        ],
        vec![
            CatalogCell::from("GIN"),
            CatalogCell::from("Preferred"),
            CatalogCell::Int(8),
            CatalogCell::Float(0.02),
            CatalogCell::Int(100),
        ],
    ];
    catalog.bulk_load(&HEADER, &rows).unwrap();
    catalog
}

pub fn fixed_ledger() -> (TradeLedger, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(noon()));
    (TradeLedger::with_clock(clock.clone()), clock)
}

pub fn trade_at(
    catalog: &InstrumentCatalog,
    symbol: &str,
    secs_ago: i64,
    quantity: i64,
    price: i64,
) -> Trade {
    let at = noon() - TimeDelta::seconds(secs_ago);
    Trade::new(catalog, symbol, at, quantity, Side::Buy, price).unwrap()
}
