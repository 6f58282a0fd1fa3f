//! Configuration validation.
//!
//! Checks the `[simulation]` section before a run. Missing keys fall back to
//! defaults and are not errors.

use crate::domain::error::GbceError;
use crate::domain::simulation::{
    DEFAULT_PRICE, DEFAULT_QUANTITY, DEFAULT_TRADES, DEFAULT_WINDOW_SECONDS, MAX_INTERVAL_MS,
    MAX_SHIFT_SECONDS, SECTION,
};
use crate::ports::config_port::ConfigPort;

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), GbceError> {
    validate_trades(config)?;
    validate_range(config, "quantity", DEFAULT_QUANTITY)?;
    validate_range(config, "price", DEFAULT_PRICE)?;
    validate_bounded(config, "interval_ms", MAX_INTERVAL_MS)?;
    validate_bounded(config, "shift_seconds", MAX_SHIFT_SECONDS)?;
    validate_window(config)?;
    validate_seed(config)?;
    Ok(())
}

fn invalid(key: &str, reason: impl Into<String>) -> GbceError {
    GbceError::ConfigInvalid {
        section: SECTION.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Rejects a present but non-numeric value instead of silently defaulting.
fn require_numeric(config: &dyn ConfigPort, key: &str) -> Result<(), GbceError> {
    match config.get_string(SECTION, key) {
        Some(raw) if raw.trim().parse::<i64>().is_err() => {
            Err(invalid(key, format!("{key} must be an integer, got {raw:?}")))
        }
        _ => Ok(()),
    }
}

fn validate_trades(config: &dyn ConfigPort) -> Result<(), GbceError> {
    require_numeric(config, "trades")?;
    if config.get_int(SECTION, "trades", DEFAULT_TRADES as i64) <= 0 {
        return Err(invalid("trades", "trades must be positive"));
    }
    Ok(())
}

fn validate_range(config: &dyn ConfigPort, name: &str, default: (i64, i64)) -> Result<(), GbceError> {
    let min_key = format!("{name}_min");
    let max_key = format!("{name}_max");
    require_numeric(config, &min_key)?;
    require_numeric(config, &max_key)?;

    let min = config.get_int(SECTION, &min_key, default.0);
    let max = config.get_int(SECTION, &max_key, default.1);
    if min <= 0 {
        return Err(invalid(&min_key, format!("{min_key} must be positive")));
    }
    if max < min {
        return Err(invalid(
            &max_key,
            format!("{max_key} ({max}) must not be below {min_key} ({min})"),
        ));
    }
    Ok(())
}

fn validate_bounded(config: &dyn ConfigPort, key: &str, max: u64) -> Result<(), GbceError> {
    require_numeric(config, key)?;
    let value = config.get_int(SECTION, key, 0);
    if value < 0 {
        return Err(invalid(key, format!("{key} must be non-negative")));
    }
    if value as u64 > max {
        return Err(invalid(key, format!("{key} ({value}) must not exceed {max}")));
    }
    Ok(())
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), GbceError> {
    require_numeric(config, "window_seconds")?;
    if config.get_int(SECTION, "window_seconds", DEFAULT_WINDOW_SECONDS as i64) <= 0 {
        return Err(invalid("window_seconds", "window_seconds must be positive"));
    }
    Ok(())
}

fn validate_seed(config: &dyn ConfigPort) -> Result<(), GbceError> {
    match config.get_string(SECTION, "seed") {
        Some(raw) if raw.trim().parse::<u64>().is_err() => Err(invalid(
            "seed",
            format!("seed must be a non-negative integer, got {raw:?}"),
        )),
        _ => Ok(()),
    }
}
