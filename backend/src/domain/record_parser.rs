//! Conversion of raw store documents into [`TransactionRecord`]s.
//!
//! Policy: fail fast. An amount must be a JSON number or a string holding a
//! plain decimal; anything else (missing, boolean, null, `"ten"`, `"NaN"`)
//! is an `InvalidRecord`. Nothing is coerced to zero.

use chrono::DateTime;
use rust_decimal::Decimal;
use serde_json::Value;
use shared::TransactionRecord;
use std::str::FromStr;

use super::errors::AggregationError;
use crate::storage::traits::{Document, AMOUNT_FIELD, DATE_FIELD};

/// Parse a decimal amount out of a document field value
pub fn parse_amount(value: &Value) -> Result<Decimal, String> {
    match value {
        Value::Number(number) => {
            let text = number.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map_err(|e| format!("amount {} is out of range: {}", text, e))
        }
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err("amount is an empty string".to_string());
            }
            Decimal::from_str(trimmed).map_err(|_| format!("amount '{}' is not a number", text))
        }
        Value::Null => Err("amount is null".to_string()),
        other => Err(format!("amount has unsupported type: {}", other)),
    }
}

/// Parse one document into a record
pub fn parse_record(document: &Document) -> Result<TransactionRecord, AggregationError> {
    let amount = document
        .get(AMOUNT_FIELD)
        .ok_or_else(|| AggregationError::invalid_record(&document.id, "missing amount"))
        .and_then(|value| {
            parse_amount(value).map_err(|reason| AggregationError::invalid_record(&document.id, reason))
        })?;

    let raw_date = document
        .get(DATE_FIELD)
        .ok_or_else(|| AggregationError::invalid_record(&document.id, "missing date"))?;
    let timestamp = raw_date
        .as_str()
        .ok_or_else(|| {
            AggregationError::invalid_record(&document.id, format!("date {} is not a string", raw_date))
        })
        .and_then(|text| {
            DateTime::parse_from_rfc3339(text).map_err(|e| {
                AggregationError::invalid_record(&document.id, format!("date '{}': {}", text, e))
            })
        })?;

    Ok(TransactionRecord {
        id: document.id.clone(),
        amount,
        timestamp,
    })
}

/// Parse every document of a snapshot, stopping at the first bad one
pub fn parse_records(documents: &[Document]) -> Result<Vec<TransactionRecord>, AggregationError> {
    documents.iter().map(parse_record).collect()
}
