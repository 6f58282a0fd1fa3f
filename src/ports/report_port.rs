//! Report output port.

use crate::domain::error::GbceError;
use crate::domain::simulation::{SimulationSummary, TradeValuation};

/// Sink for per-trade valuations and the closing market summary.
pub trait ReportPort {
    fn write_valuation(&mut self, valuation: &TradeValuation) -> Result<(), GbceError>;

    fn write_summary(&mut self, summary: &SimulationSummary) -> Result<(), GbceError>;
}
