//! # CSV Data Directory
//!
//! Plain-file stand-in for the hosted document backend. The binary loads the
//! directory into a [`MemoryDocumentStore`] at startup and, in watch mode,
//! re-syncs it periodically so edits to the files show up as new snapshots.

pub mod connection;
pub mod record_repository;
pub mod user_repository;

#[cfg(test)]
pub mod test_utils;

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use csv::WriterBuilder;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use shared::{RecordKind, UserProfile};
use std::fs::{self, OpenOptions};
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

pub use connection::CsvConnection;
pub use record_repository::RecordRepository;
pub use user_repository::UserRepository;

use super::memory::MemoryDocumentStore;

/// Turn a raw CSV cell into a document field value.
///
/// Empty cells become missing fields. Everything else stays a string, amounts
/// included: a JSON number is an f64 and would round digits the record parser
/// can read exactly from the text.
pub(crate) fn cell_to_value(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Some(Value::String(raw.to_string()))
}

/// Write `rows` (with a header line) to a temp file, then rename it over `path`
pub(crate) fn write_rows_atomically<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(BufWriter::new(file));
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Repositories over one data directory, plus the sync into the store
#[derive(Debug, Clone)]
pub struct CsvDataDirectory {
    connection: CsvConnection,
    users: UserRepository,
    records: RecordRepository,
}

impl CsvDataDirectory {
    pub fn open<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let connection = CsvConnection::new(base_directory)?;
        Ok(Self {
            users: UserRepository::new(connection.clone()),
            records: RecordRepository::new(connection.clone()),
            connection,
        })
    }

    pub fn connection(&self) -> &CsvConnection {
        &self.connection
    }

    /// Make sure the signed-in user has a row and record files
    pub fn ensure_user(&self, profile: &UserProfile) -> Result<()> {
        self.users.ensure_user(profile)?;
        for kind in RecordKind::ALL {
            self.connection.ensure_records_file_exists(&profile.id, kind)?;
        }
        Ok(())
    }

    /// Record an earning or spending and move the user's balance with it
    pub fn add_record(
        &self,
        user_id: &str,
        kind: RecordKind,
        timestamp: DateTime<FixedOffset>,
        amount: Decimal,
    ) -> Result<String> {
        let id = self.records.append_record(user_id, kind, timestamp, amount)?;
        let delta = match kind {
            RecordKind::Income => amount,
            RecordKind::Spending => -amount,
        };
        self.users.adjust_balance(user_id, delta)?;
        Ok(id)
    }

    /// Load the whole directory into the store.
    ///
    /// Only collections whose contents changed are replaced, so unchanged
    /// files do not wake live queries. Returns the number replaced.
    pub fn sync_into(&self, store: &MemoryDocumentStore) -> Result<usize> {
        let mut changed = 0;
        if store.replace_collection("users", self.users.read_users()?)? {
            changed += 1;
        }
        for user_id in self.users.list_user_ids()? {
            for kind in RecordKind::ALL {
                let documents = self.records.read_records(&user_id, kind)?;
                if store.replace_collection(&kind.collection_path(&user_id), documents)? {
                    changed += 1;
                }
            }
        }

        if changed > 0 {
            info!(
                "Synced {} changed collection(s) from {}",
                changed,
                self.connection.base_directory().display()
            );
        } else {
            debug!("data directory unchanged");
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::{DocumentStore, RecordQuery};
    use serde_json::json;
    use std::str::FromStr;
    use super::test_utils::TestEnvironment;

    #[test]
    fn test_cell_to_value() {
        assert_eq!(cell_to_value("  "), None);
        assert_eq!(cell_to_value(" 12.5 "), Some(json!("12.5")));
        assert_eq!(cell_to_value("1234567890123456.78"), Some(json!("1234567890123456.78")));
        assert_eq!(cell_to_value("12,5"), Some(json!("12,5")));
    }

    #[tokio::test]
    async fn test_add_record_moves_balance() {
        let env = TestEnvironment::new().unwrap();
        let data = CsvDataDirectory::open(&env.base_path).unwrap();
        data.ensure_user(&env.profile).unwrap();
        let when = DateTime::parse_from_rfc3339("2024-03-10T12:00:00Z").unwrap();

        data.add_record("u1", RecordKind::Income, when, Decimal::from(50)).unwrap();
        data.add_record("u1", RecordKind::Spending, when, Decimal::from_str("7.25").unwrap())
            .unwrap();

        let store = MemoryDocumentStore::new();
        data.sync_into(&store).unwrap();
        let user = store.get_document("users/u1").await.unwrap().unwrap();
        assert_eq!(user.get("currentBalance"), Some(&json!("42.75")));
    }

    #[tokio::test]
    async fn test_sync_only_replaces_changed_collections() {
        let env = TestEnvironment::new().unwrap();
        let data = CsvDataDirectory::open(&env.base_path).unwrap();
        data.ensure_user(&env.profile).unwrap();
        let when = DateTime::parse_from_rfc3339("2024-03-10T12:00:00Z").unwrap();
        data.add_record("u1", RecordKind::Income, when, Decimal::from(5)).unwrap();

        let store = MemoryDocumentStore::new();
        // users + income; spending is empty and never existed in the store
        assert_eq!(data.sync_into(&store).unwrap(), 2);
        assert_eq!(data.sync_into(&store).unwrap(), 0);

        data.add_record("u1", RecordKind::Spending, when, Decimal::from(1)).unwrap();
        // users (balance) + spending
        assert_eq!(data.sync_into(&store).unwrap(), 2);

        let spending = store
            .query("users/u1/spending", &RecordQuery::default())
            .await
            .unwrap();
        assert_eq!(spending.len(), 1);
    }
}
