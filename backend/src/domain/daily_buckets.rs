//! Day-bucketed aggregation of transaction records.
//!
//! Buckets are keyed on the full calendar date (year, month, day) of each
//! record as seen from the viewer's offset, the same offset "today" comes
//! from. Records dated the same day and month of another year fall outside
//! the window like any other old record.

use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use shared::{DailySeries, TransactionRecord};
use tracing::trace;

use super::clock::Clock;
use super::errors::AggregationError;

/// Window used by the dashboard panels
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Sum `records` into one bucket per calendar day over the `window_days`
/// days ending at `reference_date`, converting each timestamp into `offset`
/// before taking its date.
///
/// Index 0 of the result is `reference_date`, index `window_days - 1` is
/// `window_days - 1` days before it. Days without records are zero; records
/// outside the window (including future-dated ones) are ignored.
pub fn aggregate(
    records: &[TransactionRecord],
    window_days: i64,
    reference_date: NaiveDate,
    offset: FixedOffset,
) -> Result<DailySeries, AggregationError> {
    if window_days <= 0 {
        return Err(AggregationError::InvalidWindow(window_days));
    }
    let len = usize::try_from(window_days).map_err(|_| AggregationError::InvalidWindow(window_days))?;
    let mut totals = vec![Decimal::ZERO; len];

    for record in records {
        let days_ago = (reference_date - record.local_date(offset)).num_days();
        if !(0..window_days).contains(&days_ago) {
            trace!(id = %record.id, days_ago, "record outside window");
            continue;
        }
        let bucket = &mut totals[days_ago as usize];
        *bucket = bucket.checked_add(record.amount).ok_or_else(|| {
            AggregationError::invalid_record(&record.id, "daily total overflows")
        })?;
    }

    Ok(DailySeries::new(reference_date, totals))
}

/// Aggregator bound to a validated window length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyBucketAggregator {
    window_days: i64,
}

impl DailyBucketAggregator {
    pub fn new(window_days: i64) -> Result<Self, AggregationError> {
        if window_days <= 0 {
            return Err(AggregationError::InvalidWindow(window_days));
        }
        Ok(Self { window_days })
    }

    pub fn window_days(&self) -> i64 {
        self.window_days
    }

    /// Aggregate against an explicit reference date and viewer offset
    pub fn aggregate(
        &self,
        records: &[TransactionRecord],
        reference_date: NaiveDate,
        offset: FixedOffset,
    ) -> Result<DailySeries, AggregationError> {
        aggregate(records, self.window_days, reference_date, offset)
    }

    /// Aggregate against the clock's current date
    pub fn aggregate_today(
        &self,
        records: &[TransactionRecord],
        clock: &dyn Clock,
    ) -> Result<DailySeries, AggregationError> {
        self.aggregate(records, clock.today(), clock.offset())
    }
}

impl Default for DailyBucketAggregator {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}
