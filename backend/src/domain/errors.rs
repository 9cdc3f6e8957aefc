use thiserror::Error;

/// Failures of the daily aggregation.
///
/// Neither is ever recovered from silently: a bad window is a caller bug and a
/// bad record would otherwise turn into a wrong financial total.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("window must be a positive number of days, got {0}")]
    InvalidWindow(i64),

    #[error("record '{id}' is invalid: {reason}")]
    InvalidRecord { id: String, reason: String },
}

impl AggregationError {
    pub fn invalid_record(id: impl Into<String>, reason: impl Into<String>) -> Self {
        AggregationError::InvalidRecord {
            id: id.into(),
            reason: reason.into(),
        }
    }
}
