//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::clock_adapter::SystemClock;
use crate::adapters::csv_adapter::load_catalog_csv;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_report_adapter::TextReport;
use crate::domain::catalog::InstrumentCatalog;
use crate::domain::config_validation::validate_simulation_config;
use crate::domain::error::GbceError;
use crate::domain::ledger::TradeLedger;
use crate::domain::simulation::{default_catalog, run_simulation, SimulationConfig};
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "gbce", about = "Stock valuation and trade ledger simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate random trades, value each one and print market aggregates
    Simulate {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        trades: Option<u64>,
        #[arg(long)]
        seed: Option<u64>,
        /// Print only the closing summary
        #[arg(short, long)]
        quiet: bool,
    },
    /// Dividend yield and P/E ratio of one instrument at a market price
    Value {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// List catalog instruments
    Catalog {
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Simulate {
            config,
            catalog,
            trades,
            seed,
            quiet,
        } => run_simulate(config.as_deref(), catalog.as_deref(), trades, seed, quiet),
        Command::Value {
            symbol,
            price,
            catalog,
        } => run_value(&symbol, price, catalog.as_deref()),
        Command::Catalog { catalog } => run_catalog(catalog.as_deref()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, GbceError> {
    FileConfigAdapter::from_file(path).map_err(|e| GbceError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Catalog from the explicit CSV path, else the config's `[catalog] path`,
/// else the built-in sample exchange.
pub fn build_catalog(
    catalog_path: Option<&Path>,
    config: Option<&dyn ConfigPort>,
) -> Result<InstrumentCatalog, GbceError> {
    let configured = config
        .and_then(|c| c.get_string("catalog", "path"))
        .map(PathBuf::from);
    match catalog_path.map(Path::to_path_buf).or(configured) {
        Some(path) => {
            eprintln!("Loading catalog from {}", path.display());
            let catalog = InstrumentCatalog::new();
            load_catalog_csv(&path, &catalog)?;
            Ok(catalog)
        }
        None => Ok(default_catalog()?),
    }
}

/// Config file values (validated) with command-line overrides applied.
pub fn build_simulation_config(
    config: Option<&dyn ConfigPort>,
    trades: Option<u64>,
    seed: Option<u64>,
) -> Result<SimulationConfig, GbceError> {
    let mut sim = match config {
        Some(config) => {
            validate_simulation_config(config)?;
            SimulationConfig::from_port(config)
        }
        None => SimulationConfig::default(),
    };
    if let Some(trades) = trades {
        sim.trades = trades as usize;
    }
    if seed.is_some() {
        sim.seed = seed;
    }
    Ok(sim)
}

fn run_simulate(
    config_path: Option<&Path>,
    catalog_path: Option<&Path>,
    trades: Option<u64>,
    seed: Option<u64>,
    quiet: bool,
) -> Result<(), GbceError> {
    let adapter = match config_path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            Some(load_config(path)?)
        }
        None => None,
    };
    let config = adapter.as_ref().map(|a| a as &dyn ConfigPort);

    let catalog = build_catalog(catalog_path, config)?;
    let sim = build_simulation_config(config, trades, seed)?;
    eprintln!(
        "Simulating {} trades over {} instruments",
        sim.trades,
        catalog.len()
    );

    let clock = Arc::new(SystemClock);
    let ledger = TradeLedger::with_clock(clock.clone());
    let stdout = io::stdout().lock();
    let mut report = if quiet {
        TextReport::summary_only(stdout)
    } else {
        TextReport::new(stdout)
    };
    run_simulation(&catalog, &ledger, clock.as_ref(), &sim, &mut report)?;
    Ok(())
}

fn run_value(symbol: &str, price: f64, catalog_path: Option<&Path>) -> Result<(), GbceError> {
    if !price.is_finite() || price < 0.0 {
        return Err(GbceError::ConfigInvalid {
            section: "value".to_string(),
            key: "price".to_string(),
            reason: format!("market price must be a non-negative number, got {price}"),
        });
    }
    let catalog = build_catalog(catalog_path, None)?;
    let instrument = catalog.get(symbol)?;
    println!("{} ({})", instrument.symbol(), instrument.kind());
    println!("  market price:   {price}");
    println!("  dividend yield: {:.6}", instrument.dividend_yield(price));
    println!("  P/E ratio:      {:.4}", instrument.pe_ratio(price));
    Ok(())
}

fn run_catalog(catalog_path: Option<&Path>) -> Result<(), GbceError> {
    let catalog = build_catalog(catalog_path, None)?;
    println!(
        "{:<8} {:<10} {:>13} {:>14} {:>9}",
        "SYMBOL", "TYPE", "LAST DIVIDEND", "FIXED DIVIDEND", "PAR VALUE"
    );
    for symbol in catalog.symbols() {
        let instrument = catalog.get(&symbol)?;
        let fixed = instrument
            .fixed_dividend_rate()
            .map(|rate| format!("{:.2}%", rate * 100.0))
            .unwrap_or_default();
        println!(
            "{:<8} {:<10} {:>13} {:>14} {:>9}",
            symbol,
            instrument.kind().to_string(),
            instrument.last_dividend(),
            fixed,
            instrument.par_value()
        );
    }
    Ok(())
}
