use anyhow::Result;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use csv::Reader;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use shared::RecordKind;
use std::fs::File;
use std::io::BufReader;
use tracing::{debug, info};

use super::connection::CsvConnection;
use super::{cell_to_value, write_rows_atomically};
use crate::storage::traits::{Document, AMOUNT_FIELD, DATE_FIELD};

/// One line of `income.csv` / `spending.csv`. Cells are kept raw so that
/// malformed values reach the record parser instead of failing the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RecordRow {
    id: String,
    date: String,
    amount: String,
}

impl RecordRow {
    fn into_document(self) -> Document {
        let mut fields = Map::new();
        if let Some(date) = cell_to_value(&self.date) {
            fields.insert(DATE_FIELD.to_string(), date);
        }
        if let Some(amount) = cell_to_value(&self.amount) {
            fields.insert(AMOUNT_FIELD.to_string(), amount);
        }
        Document::new(self.id, fields)
    }
}

/// CSV-backed storage for a user's income and spending records
#[derive(Debug, Clone)]
pub struct RecordRepository {
    connection: CsvConnection,
}

impl RecordRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_rows(&self, user_id: &str, kind: RecordKind) -> Result<Vec<RecordRow>> {
        self.connection.ensure_records_file_exists(user_id, kind)?;
        let path = self.connection.records_file_path(user_id, kind)?;
        let mut reader = Reader::from_reader(BufReader::new(File::open(&path)?));

        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        debug!(user = user_id, %kind, rows = rows.len(), "read record file");
        Ok(rows)
    }

    /// All records of one kind for a user, as store documents
    pub fn read_records(&self, user_id: &str, kind: RecordKind) -> Result<Vec<Document>> {
        Ok(self
            .read_rows(user_id, kind)?
            .into_iter()
            .map(RecordRow::into_document)
            .collect())
    }

    /// Append a record and return its generated ID (`<kind>::<epoch_millis>`)
    pub fn append_record(
        &self,
        user_id: &str,
        kind: RecordKind,
        timestamp: DateTime<FixedOffset>,
        amount: Decimal,
    ) -> Result<String> {
        let mut rows = self.read_rows(user_id, kind)?;

        let base_id = format!("{}::{}", kind, timestamp.timestamp_millis());
        let mut id = base_id.clone();
        let mut suffix = 1;
        while rows.iter().any(|row| row.id == id) {
            id = format!("{}-{}", base_id, suffix);
            suffix += 1;
        }

        rows.push(RecordRow {
            id: id.clone(),
            date: timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
            amount: amount.to_string(),
        });

        let path = self.connection.records_file_path(user_id, kind)?;
        write_rows_atomically(&path, &rows)?;
        info!(user = user_id, %kind, %id, %amount, "appended record");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_record;
    use crate::storage::csv::test_utils::TestEnvironment;
    use serde_json::json;
    use std::fs;
    use std::str::FromStr;

    #[test]
    fn test_empty_file_is_created_on_read() {
        let env = TestEnvironment::new().unwrap();
        let repo = RecordRepository::new(env.connection.clone());

        assert!(repo.read_records("u1", RecordKind::Income).unwrap().is_empty());
        assert!(env.connection.records_file_path("u1", RecordKind::Income).unwrap().exists());
    }

    #[test]
    fn test_append_then_read() {
        let env = TestEnvironment::new().unwrap();
        let repo = RecordRepository::new(env.connection.clone());
        let when = DateTime::parse_from_rfc3339("2024-03-15T09:30:00-05:00").unwrap();

        let id = repo
            .append_record("u1", RecordKind::Spending, when, Decimal::from_str("12.50").unwrap())
            .unwrap();
        assert_eq!(id, format!("spending::{}", when.timestamp_millis()));

        // same instant twice still gets a unique id
        let second = repo
            .append_record("u1", RecordKind::Spending, when, Decimal::from(3))
            .unwrap();
        assert_eq!(second, format!("{}-1", id));

        let docs = repo.read_records("u1", RecordKind::Spending).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, id);
        assert_eq!(docs[0].get("amount"), Some(&json!("12.50")));
        assert_eq!(docs[0].get("date"), Some(&json!("2024-03-15T09:30:00-05:00")));
    }

    #[test]
    fn test_amounts_survive_the_file_exactly() {
        let env = TestEnvironment::new().unwrap();
        let repo = RecordRepository::new(env.connection.clone());
        let when = DateTime::parse_from_rfc3339("2024-03-15T09:30:00Z").unwrap();
        let amounts = ["1234567890123456.78", "0.30000000000000001"];

        for amount in amounts {
            repo.append_record("u1", RecordKind::Income, when, Decimal::from_str(amount).unwrap())
                .unwrap();
        }

        let parsed: Vec<Decimal> = repo
            .read_records("u1", RecordKind::Income)
            .unwrap()
            .iter()
            .map(|doc| parse_record(doc).unwrap().amount)
            .collect();
        let expected: Vec<Decimal> = amounts.iter().map(|a| Decimal::from_str(a).unwrap()).collect();
        assert_eq!(parsed, expected);
        assert_eq!(parsed[0].to_string(), "1234567890123456.78");
    }

    #[test]
    fn test_malformed_cells_are_kept_for_the_parser() {
        let env = TestEnvironment::new().unwrap();
        let repo = RecordRepository::new(env.connection.clone());
        env.connection.ensure_records_file_exists("u1", RecordKind::Income).unwrap();
        let path = env.connection.records_file_path("u1", RecordKind::Income).unwrap();
        fs::write(
            &path,
            "id,date,amount\nr1,2024-03-01T10:00:00Z,ten\nr2,2024-03-02T10:00:00Z,\n",
        )
        .unwrap();

        let docs = repo.read_records("u1", RecordKind::Income).unwrap();
        assert_eq!(docs[0].get("amount"), Some(&json!("ten")));
        assert_eq!(docs[1].get("amount"), None);
    }
}
