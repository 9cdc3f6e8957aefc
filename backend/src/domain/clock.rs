//! Source of the reference date used for bucketing.
//!
//! Every aggregation takes its "today" from a [`Clock`] passed in by the
//! caller, never from the system time directly, so tests can pin it.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

pub trait Clock: Send + Sync {
    /// Today's calendar date
    fn today(&self) -> NaiveDate;

    /// Offset used to interpret calendar dates as instants
    fn offset(&self) -> FixedOffset;
}

/// Wall clock in a fixed UTC offset
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// Clock pinned to one date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    date: NaiveDate,
    offset: FixedOffset,
}

impl FixedClock {
    pub fn new(date: NaiveDate, offset: FixedOffset) -> Self {
        Self { date, offset }
    }

    pub fn utc(date: NaiveDate) -> Self {
        Self::new(date, Utc.fix())
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.date
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// Midnight at the start of the month containing `date`, in `offset`
pub fn month_start(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    let first = date.with_day0(0).unwrap_or(date);
    let midnight = first.and_time(NaiveTime::default());
    offset
        .from_local_datetime(&midnight)
        .single()
        .unwrap_or_else(|| offset.from_utc_datetime(&midnight))
}
