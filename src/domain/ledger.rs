//! Append-only trade ledger and its market-wide aggregates.
//!
//! Aggregates are computed from a columnar snapshot sorted by timestamp. The
//! snapshot is tagged with the ledger version it was built from and is only
//! rebuilt when an append has bumped the version since. Readers take a shared
//! handle to the current snapshot, so a rebuild swaps in a new one without
//! disturbing queries already running against the old one.

use crate::adapters::clock_adapter::SystemClock;
use crate::domain::error::AggregationError;
use crate::domain::trade::Trade;
use crate::ports::clock_port::ClockPort;
use chrono::{NaiveDateTime, TimeDelta};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

#[derive(Debug, Default)]
struct Snapshot {
    version: u64,
    timestamps: Vec<NaiveDateTime>,
    prices: Vec<u64>,
    quantities: Vec<u64>,
}

impl Snapshot {
    fn build(trades: &[Trade], version: u64) -> Self {
        let mut order: Vec<usize> = (0..trades.len()).collect();
        order.sort_by_key(|&i| trades[i].timestamp());

        let mut snapshot = Snapshot {
            version,
            timestamps: Vec::with_capacity(trades.len()),
            prices: Vec::with_capacity(trades.len()),
            quantities: Vec::with_capacity(trades.len()),
        };
        for i in order {
            let trade = &trades[i];
            snapshot.timestamps.push(trade.timestamp());
            snapshot.prices.push(trade.price());
            snapshot.quantities.push(trade.quantity());
        }
        snapshot
    }

    /// Index of the first trade at or after `cutoff`; `None` means no cutoff.
    fn window_start(&self, cutoff: Option<NaiveDateTime>) -> usize {
        match cutoff {
            Some(cutoff) => self.timestamps.partition_point(|t| *t < cutoff),
            None => 0,
        }
    }
}

pub struct TradeLedger {
    trades: Mutex<Vec<Trade>>,
    version: AtomicU64,
    snapshot: RwLock<Arc<Snapshot>>,
    rebuilds: AtomicUsize,
    clock: Arc<dyn ClockPort>,
}

impl Default for TradeLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TradeLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeLedger")
            .field("len", &self.len())
            .field("version", &self.version())
            .finish()
    }
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            trades: Mutex::new(Vec::new()),
            version: AtomicU64::new(0),
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            rebuilds: AtomicUsize::new(0),
            clock,
        }
    }

    /// Appends a trade and returns the new ledger version.
    pub fn append(&self, trade: Trade) -> u64 {
        let mut trades = self.lock_trades();
        tracing::trace!(symbol = trade.symbol(), price = trade.price(), "append trade");
        trades.push(trade);
        // Bumped under the lock so the version always matches the sequence.
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn len(&self) -> usize {
        self.lock_trades().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_trades().is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Trades in arrival order.
    pub fn trades(&self) -> Vec<Trade> {
        self.lock_trades().clone()
    }

    /// Number of times the aggregation snapshot has been rebuilt. A diagnostic
    /// counter for observing snapshot reuse; it plays no part in aggregation.
    pub fn snapshot_rebuilds(&self) -> usize {
        self.rebuilds.load(Ordering::Relaxed)
    }

    /// Drops every trade. The version still moves forward.
    pub fn clear(&self) {
        let mut trades = self.lock_trades();
        trades.clear();
        self.version.fetch_add(1, Ordering::AcqRel);
    }

    /// VWSP over trades stamped within the last `window_seconds`.
    pub fn volume_weighted_price(&self, window_seconds: u64) -> Result<f64, AggregationError> {
        self.volume_weighted_price_at(window_seconds, self.clock.now())
    }

    pub fn volume_weighted_price_at(
        &self,
        window_seconds: u64,
        now: NaiveDateTime,
    ) -> Result<f64, AggregationError> {
        self.vwsp(window_seconds, now, None)
    }

    /// Like [`TradeLedger::volume_weighted_price`], but fails instead of
    /// scanning more than `max_scan` trades.
    pub fn volume_weighted_price_bounded(
        &self,
        window_seconds: u64,
        max_scan: usize,
    ) -> Result<f64, AggregationError> {
        self.vwsp(window_seconds, self.clock.now(), Some(max_scan))
    }

    /// Quantity-weighted geometric mean of every trade price, 0 when empty.
    pub fn gbce_all_share_index(&self) -> f64 {
        let snapshot = self.snapshot();
        let total_quantity: u128 = snapshot.quantities.iter().map(|&q| q as u128).sum();
        if total_quantity == 0 {
            return 0.0;
        }
        // Sum of logs instead of a product of prices to stay in range.
        let log_sum: f64 = snapshot
            .prices
            .iter()
            .zip(&snapshot.quantities)
            .map(|(&p, &q)| q as f64 * (p as f64).ln())
            .sum();
        (log_sum / total_quantity as f64).exp()
    }

    fn vwsp(
        &self,
        window_seconds: u64,
        now: NaiveDateTime,
        limit: Option<usize>,
    ) -> Result<f64, AggregationError> {
        let snapshot = self.snapshot();
        let cutoff = i64::try_from(window_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|window| now.checked_sub_signed(window));
        let start = snapshot.window_start(cutoff);
        let count = snapshot.timestamps.len() - start;

        if count == 0 {
            return Err(AggregationError::EmptyWindow { window_seconds });
        }
        if let Some(limit) = limit.filter(|&limit| count > limit) {
            return Err(AggregationError::ScanLimitExceeded {
                window_seconds,
                trades: count,
                limit,
            });
        }

        // Each price * quantity fits in u128; only the running sums can overflow.
        let (weighted, total_quantity) = snapshot.prices[start..]
            .iter()
            .zip(&snapshot.quantities[start..])
            .try_fold((0u128, 0u128), |(pq, q_sum), (&p, &q)| {
                Some((
                    pq.checked_add(p as u128 * q as u128)?,
                    q_sum.checked_add(q as u128)?,
                ))
            })
            .ok_or(AggregationError::Overflow { window_seconds })?;
        if total_quantity == 0 {
            return Err(AggregationError::ZeroQuantity { window_seconds });
        }
        Ok(weighted as f64 / total_quantity as f64)
    }

    /// Current snapshot, rebuilt first if an append happened since it was made.
    fn snapshot(&self) -> Arc<Snapshot> {
        let wanted = self.version();
        let current = self.read_snapshot();
        if current.version >= wanted {
            return current;
        }

        let fresh = {
            let trades = self.lock_trades();
            Arc::new(Snapshot::build(&trades, self.version()))
        };
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            version = fresh.version,
            trades = fresh.timestamps.len(),
            "rebuilt ledger snapshot"
        );

        let mut slot = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // Another reader may have installed a newer one meanwhile.
        if slot.version < fresh.version {
            *slot = fresh;
        }
        Arc::clone(&slot)
    }

    fn read_snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn lock_trades(&self) -> MutexGuard<'_, Vec<Trade>> {
        self.trades.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock_adapter::FixedClock;
    use crate::domain::catalog::InstrumentCatalog;
    use crate::domain::instrument::Instrument;
    use crate::domain::trade::Side;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 5, 13)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn catalog() -> InstrumentCatalog {
        let catalog = InstrumentCatalog::new();
        catalog.upsert(Instrument::common("POP", 8, 100).unwrap());
        catalog.upsert(Instrument::preferred("GIN", 8, 0.02, 100).unwrap());
        catalog
    }

    fn trade(catalog: &InstrumentCatalog, secs_ago: i64, quantity: i64, price: i64) -> Trade {
        let at = noon() - TimeDelta::seconds(secs_ago);
        Trade::new(catalog, "POP", at, quantity, Side::Buy, price).unwrap()
    }

    fn ledger() -> (TradeLedger, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(noon()));
        (TradeLedger::with_clock(clock.clone()), clock)
    }

    #[test]
    fn append_bumps_version() {
        let (ledger, _) = ledger();
        let catalog = catalog();
        assert_eq!(ledger.version(), 0);
        assert_eq!(ledger.append(trade(&catalog, 1, 10, 10)), 1);
        assert_eq!(ledger.append(trade(&catalog, 1, 10, 10)), 2);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn trades_keep_arrival_order() {
        let (ledger, _) = ledger();
        let catalog = catalog();
        ledger.append(trade(&catalog, 1, 1, 11));
        ledger.append(trade(&catalog, 5, 1, 22));
        let prices: Vec<u64> = ledger.trades().iter().map(Trade::price).collect();
        assert_eq!(prices, vec![11, 22]);
    }

    #[test]
    fn vwsp_two_trades() {
        let (ledger, _) = ledger();
        let catalog = catalog();
        ledger.append(trade(&catalog, 3, 100, 10));
        ledger.append(trade(&catalog, 1, 200, 20));
        assert_relative_eq!(ledger.volume_weighted_price(15).unwrap(), 5000.0 / 300.0);
    }

    #[test]
    fn vwsp_weighted_sum_overflow_is_an_error() {
        let (ledger, _) = ledger();
        let catalog = catalog();
        for _ in 0..4 {
            ledger.append(trade(&catalog, 1, i64::MAX, i64::MAX));
        }
        assert_relative_eq!(
            ledger.volume_weighted_price(15).unwrap(),
            i64::MAX as f64,
            max_relative = 1e-12
        );

        ledger.append(trade(&catalog, 1, i64::MAX, i64::MAX));
        assert_eq!(
            ledger.volume_weighted_price(15),
            Err(AggregationError::Overflow { window_seconds: 15 })
        );
    }

    #[test]
    fn vwsp_ignores_trades_before_window() {
        let (ledger, _) = ledger();
        let catalog = catalog();
        ledger.append(trade(&catalog, 60, 1000, 999));
        ledger.append(trade(&catalog, 15, 100, 10));
        ledger.append(trade(&catalog, 2, 100, 30));
        // 15s ago sits exactly on the cutoff and counts.
        assert_relative_eq!(ledger.volume_weighted_price(15).unwrap(), 20.0);
    }

    #[test]
    fn vwsp_empty_window_fails() {
        let (ledger, _) = ledger();
        assert_eq!(
            ledger.volume_weighted_price(15),
            Err(AggregationError::EmptyWindow { window_seconds: 15 })
        );

        ledger.append(trade(&catalog(), 100, 10, 10));
        assert_eq!(
            ledger.volume_weighted_price(15),
            Err(AggregationError::EmptyWindow { window_seconds: 15 })
        );
    }

    #[test]
    fn vwsp_follows_clock() {
        let (ledger, clock) = ledger();
        ledger.append(trade(&catalog(), 0, 10, 10));
        assert!(ledger.volume_weighted_price(15).is_ok());
        clock.advance(TimeDelta::seconds(16));
        assert!(ledger.volume_weighted_price(15).is_err());
    }

    #[test]
    fn vwsp_huge_window_covers_everything() {
        let (ledger, _) = ledger();
        let catalog = catalog();
        ledger.append(trade(&catalog, 1_000_000, 1, 10));
        ledger.append(trade(&catalog, 0, 1, 30));
        assert_relative_eq!(ledger.volume_weighted_price(u64::MAX).unwrap(), 20.0);
    }

    #[test]
    fn vwsp_bounded_scan() {
        let (ledger, _) = ledger();
        let catalog = catalog();
        for i in 0..5 {
            ledger.append(trade(&catalog, i, 10, 10));
        }
        assert!(ledger.volume_weighted_price_bounded(15, 5).is_ok());
        assert_eq!(
            ledger.volume_weighted_price_bounded(15, 4),
            Err(AggregationError::ScanLimitExceeded {
                window_seconds: 15,
                trades: 5,
                limit: 4,
            })
        );
        // Only the two most recent trades fall in a 1s window.
        assert!(ledger.volume_weighted_price_bounded(1, 2).is_ok());
    }

    #[test]
    fn vwsp_at_explicit_instant() {
        let (ledger, _) = ledger();
        ledger.append(trade(&catalog(), 30, 10, 10));
        let earlier = noon() - TimeDelta::seconds(25);
        assert!(ledger.volume_weighted_price_at(15, earlier).is_ok());
        assert!(ledger.volume_weighted_price_at(15, noon()).is_err());
    }

    #[test]
    fn gbce_empty_is_zero() {
        let (ledger, _) = ledger();
        assert_eq!(ledger.gbce_all_share_index(), 0.0);
    }

    #[test]
    fn gbce_two_trades() {
        let (ledger, _) = ledger();
        let catalog = catalog();
        ledger.append(trade(&catalog, 3, 100, 10));
        ledger.append(trade(&catalog, 1, 200, 20));
        let expected = ((100.0 * 10f64.ln() + 200.0 * 20f64.ln()) / 300.0).exp();
        assert_relative_eq!(ledger.gbce_all_share_index(), expected, epsilon = 1e-12);
        assert_relative_eq!(ledger.gbce_all_share_index(), 15.874_010_519_682, epsilon = 1e-9);
    }

    #[test]
    fn gbce_ignores_window() {
        let (ledger, _) = ledger();
        ledger.append(trade(&catalog(), 10_000, 5, 64));
        assert_relative_eq!(ledger.gbce_all_share_index(), 64.0, epsilon = 1e-9);
    }

    #[test]
    fn gbce_large_ledger_stays_finite() {
        let (ledger, _) = ledger();
        let catalog = catalog();
        for _ in 0..2_000 {
            ledger.append(trade(&catalog, 1, 2_000, 1_000));
        }
        assert_relative_eq!(ledger.gbce_all_share_index(), 1_000.0, epsilon = 1e-6);
    }

    #[test]
    fn repeated_queries_reuse_snapshot() {
        let (ledger, _) = ledger();
        let catalog = catalog();
        ledger.append(trade(&catalog, 3, 100, 10));
        ledger.append(trade(&catalog, 1, 200, 20));

        let first = ledger.volume_weighted_price(15).unwrap();
        let first_index = ledger.gbce_all_share_index();
        let rebuilds = ledger.snapshot_rebuilds();
        assert_eq!(rebuilds, 1);

        for _ in 0..10 {
            assert_eq!(ledger.volume_weighted_price(15).unwrap().to_bits(), first.to_bits());
            assert_eq!(ledger.gbce_all_share_index().to_bits(), first_index.to_bits());
        }
        assert_eq!(ledger.snapshot_rebuilds(), rebuilds);
    }

    #[test]
    fn append_invalidates_snapshot() {
        let (ledger, _) = ledger();
        let catalog = catalog();
        ledger.append(trade(&catalog, 1, 100, 10));
        assert_relative_eq!(ledger.volume_weighted_price(15).unwrap(), 10.0);

        ledger.append(trade(&catalog, 1, 100, 30));
        assert_relative_eq!(ledger.volume_weighted_price(15).unwrap(), 20.0);
        assert_eq!(ledger.snapshot_rebuilds(), 2);
    }

    #[test]
    fn out_of_order_timestamps_are_sorted() {
        let (ledger, _) = ledger();
        let catalog = catalog();
        ledger.append(trade(&catalog, 1, 100, 30));
        ledger.append(trade(&catalog, 100, 100, 999));
        ledger.append(trade(&catalog, 2, 100, 10));
        assert_relative_eq!(ledger.volume_weighted_price(15).unwrap(), 20.0);
    }

    #[test]
    fn clear_resets() {
        let (ledger, _) = ledger();
        ledger.append(trade(&catalog(), 1, 100, 10));
        let before = ledger.version();
        ledger.clear();
        assert!(ledger.is_empty());
        assert!(ledger.version() > before);
        assert_eq!(ledger.gbce_all_share_index(), 0.0);
        assert!(ledger.volume_weighted_price(15).is_err());
    }

    #[test]
    fn concurrent_appends_and_reads() {
        let (ledger, _) = ledger();
        let catalog = catalog();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..250 {
                        ledger.append(trade(&catalog, 1, 10, 50));
                    }
                });
            }
            for _ in 0..2 {
                s.spawn(|| {
                    for _ in 0..100 {
                        if let Ok(vwsp) = ledger.volume_weighted_price(15) {
                            assert_relative_eq!(vwsp, 50.0);
                        }
                    }
                });
            }
        });
        assert_eq!(ledger.len(), 1000);
        assert_eq!(ledger.version(), 1000);
        assert_relative_eq!(ledger.gbce_all_share_index(), 50.0, epsilon = 1e-9);
    }
}
