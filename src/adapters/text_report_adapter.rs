//! Plain-text report adapter.

use crate::domain::error::GbceError;
use crate::domain::simulation::{SimulationSummary, TradeValuation};
use crate::ports::report_port::ReportPort;
use std::io::Write;

pub struct TextReport<W: Write> {
    out: W,
    per_trade: bool,
}

impl<W: Write> TextReport<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            per_trade: true,
        }
    }

    /// Only the closing summary is written.
    pub fn summary_only(out: W) -> Self {
        Self {
            out,
            per_trade: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportPort for TextReport<W> {
    fn write_valuation(&mut self, v: &TradeValuation) -> Result<(), GbceError> {
        if !self.per_trade {
            return Ok(());
        }
        writeln!(
            self.out,
            "TRADE: {} {} qty={} {} price={}",
            v.symbol,
            v.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            v.quantity,
            v.side,
            v.price
        )?;
        writeln!(
            self.out,
            "  {}: dividend yield {:.6}, P/E ratio {:.4}",
            v.symbol, v.dividend_yield, v.pe_ratio
        )?;
        Ok(())
    }

    fn write_summary(&mut self, summary: &SimulationSummary) -> Result<(), GbceError> {
        writeln!(
            self.out,
            "Trades recorded: {} ({} rejected)",
            summary.trades, summary.rejected
        )?;
        match &summary.volume_weighted_price {
            Ok(vwsp) => writeln!(
                self.out,
                "Volume weighted stock price (last {}s): {:.4}",
                summary.window_seconds, vwsp
            )?,
            Err(e) => writeln!(
                self.out,
                "Volume weighted stock price (last {}s): unavailable ({e})",
                summary.window_seconds
            )?,
        }
        writeln!(
            self.out,
            "GBCE all share index: {:.4}",
            summary.gbce_all_share_index
        )?;
        self.out.flush()?;
        Ok(())
    }
}
