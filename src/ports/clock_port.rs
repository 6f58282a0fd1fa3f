//! Wall-clock access port.

use chrono::NaiveDateTime;

/// Source of "now" for trade timestamps and windowed aggregation.
pub trait ClockPort: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}
