use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which per-user collection a record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Money earned (`users/{uid}/income`)
    Income,
    /// Money spent (`users/{uid}/spending`)
    Spending,
}

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [RecordKind::Income, RecordKind::Spending];

    /// Name of the collection under the user document
    pub fn collection_name(&self) -> &'static str {
        match self {
            RecordKind::Income => "income",
            RecordKind::Spending => "spending",
        }
    }

    /// Label used for the chart series
    pub fn chart_label(&self) -> &'static str {
        match self {
            RecordKind::Income => "Earnings",
            RecordKind::Spending => "Spending",
        }
    }

    /// Heading shown above the chart
    pub fn headline(&self) -> &'static str {
        match self {
            RecordKind::Income => "This month you have earned:",
            RecordKind::Spending => "This month you have spent:",
        }
    }

    /// Full collection path for a user, e.g. `users/abc/income`
    pub fn collection_path(&self, user_id: &str) -> String {
        format!("users/{}/{}", user_id, self.collection_name())
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection_name())
    }
}

/// One earning or spending event as read from the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Document ID inside its collection
    pub id: String,
    /// Exact amount of the event
    pub amount: Decimal,
    /// When the event happened, in the offset it was recorded in
    pub timestamp: DateTime<FixedOffset>,
}

impl TransactionRecord {
    /// Calendar date of the record as seen by a viewer in `offset`
    pub fn local_date(&self, offset: FixedOffset) -> NaiveDate {
        self.timestamp.with_timezone(&offset).date_naive()
    }
}

/// Signed-in user as exposed by the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
}

/// Iteration order for a [`DailySeries`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesOrder {
    /// Index 0 is the reference date
    MostRecentFirst,
    /// Index 0 is the oldest day in the window
    OldestFirst,
}

/// Per-day totals over a trailing window ending at `reference_date`.
///
/// Totals are stored most-recent-first: `totals[0]` is the reference date and
/// `totals[n - 1]` is `n - 1` days before it. Every day of the window has an
/// entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    reference_date: NaiveDate,
    totals: Vec<Decimal>,
}

impl DailySeries {
    pub fn new(reference_date: NaiveDate, totals: Vec<Decimal>) -> Self {
        Self { reference_date, totals }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    /// Number of days in the window
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Raw totals, most recent first
    pub fn totals(&self) -> &[Decimal] {
        &self.totals
    }

    /// Total for the day `days_ago` days before the reference date
    pub fn get(&self, days_ago: usize) -> Option<Decimal> {
        self.totals.get(days_ago).copied()
    }

    /// Calendar date of the bucket at `days_ago`
    pub fn date_at(&self, days_ago: usize) -> NaiveDate {
        self.reference_date - Duration::days(days_ago as i64)
    }

    /// Sum of every bucket in the window
    pub fn total(&self) -> Decimal {
        self.totals.iter().copied().sum()
    }

    /// `(date, total)` pairs in the requested order
    pub fn days(&self, order: SeriesOrder) -> Vec<DailyTotal> {
        let mut days: Vec<DailyTotal> = self
            .totals
            .iter()
            .enumerate()
            .map(|(days_ago, amount)| DailyTotal {
                date: self.date_at(days_ago),
                amount: *amount,
            })
            .collect();
        if order == SeriesOrder::OldestFirst {
            days.reverse();
        }
        days
    }

    /// Totals in the requested order
    pub fn to_vec(&self, order: SeriesOrder) -> Vec<Decimal> {
        match order {
            SeriesOrder::MostRecentFirst => self.totals.clone(),
            SeriesOrder::OldestFirst => self.totals.iter().rev().copied().collect(),
        }
    }
}

/// One bucket of a [`DailySeries`] paired with its date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub amount: Decimal,
}

/// Latest published state of one dashboard panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PanelState {
    /// No snapshot processed yet
    Pending,
    /// Series computed from the snapshot with the given generation
    Ready { generation: u64, series: DailySeries },
    /// The snapshot could not be aggregated
    Failed { generation: u64, message: String },
}

impl PanelState {
    pub fn generation(&self) -> Option<u64> {
        match self {
            PanelState::Pending => None,
            PanelState::Ready { generation, .. } | PanelState::Failed { generation, .. } => {
                Some(*generation)
            }
        }
    }

    pub fn series(&self) -> Option<&DailySeries> {
        match self {
            PanelState::Ready { series, .. } => Some(series),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, PanelState::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_collection_path() {
        assert_eq!(RecordKind::Income.collection_path("u1"), "users/u1/income");
        assert_eq!(RecordKind::Spending.collection_path("u1"), "users/u1/spending");
    }

    #[test]
    fn test_series_dates_cross_month_boundary() {
        let series = DailySeries::new(date(2024, 3, 1), vec![dec(1), dec(2), dec(3)]);
        assert_eq!(series.date_at(0), date(2024, 3, 1));
        assert_eq!(series.date_at(1), date(2024, 2, 29));
        assert_eq!(series.date_at(2), date(2024, 2, 28));
    }

    #[test]
    fn test_series_ordering() {
        let series = DailySeries::new(date(2024, 3, 15), vec![dec(20), dec(5), dec(0)]);
        assert_eq!(series.to_vec(SeriesOrder::MostRecentFirst), vec![dec(20), dec(5), dec(0)]);
        assert_eq!(series.to_vec(SeriesOrder::OldestFirst), vec![dec(0), dec(5), dec(20)]);

        let days = series.days(SeriesOrder::OldestFirst);
        assert_eq!(days[0].date, date(2024, 3, 13));
        assert_eq!(days[2].date, date(2024, 3, 15));
        assert_eq!(days[2].amount, dec(20));
        assert_eq!(series.total(), dec(25));
    }

    #[test]
    fn test_local_date_follows_viewer_offset() {
        let record = TransactionRecord {
            id: "r1".to_string(),
            amount: dec(10),
            timestamp: DateTime::parse_from_rfc3339("2024-03-15T23:30:00-05:00").unwrap(),
        };
        let new_york = FixedOffset::west_opt(5 * 3600).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let los_angeles = FixedOffset::west_opt(8 * 3600).unwrap();
        assert_eq!(record.local_date(new_york), date(2024, 3, 15));
        // 04:30 UTC on the 16th
        assert_eq!(record.local_date(utc), date(2024, 3, 16));
        assert_eq!(record.local_date(los_angeles), date(2024, 3, 15));
    }

    #[test]
    fn test_panel_state_accessors() {
        assert!(PanelState::Pending.is_pending());
        assert_eq!(PanelState::Pending.generation(), None);

        let ready = PanelState::Ready {
            generation: 4,
            series: DailySeries::new(date(2024, 1, 1), vec![dec(0)]),
        };
        assert_eq!(ready.generation(), Some(4));
        assert!(ready.series().is_some());

        let failed = PanelState::Failed { generation: 5, message: "bad".to_string() };
        assert!(failed.series().is_none());
    }
}
