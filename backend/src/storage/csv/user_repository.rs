use anyhow::{anyhow, Result};
use csv::Reader;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use shared::UserProfile;
use std::fs::File;
use std::io::BufReader;
use std::str::FromStr;
use tracing::info;

use super::connection::CsvConnection;
use super::{cell_to_value, write_rows_atomically};
use crate::storage::traits::{Document, BALANCE_FIELD};

/// Field on the user document holding the display name
pub const DISPLAY_NAME_FIELD: &str = "displayName";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct UserRow {
    id: String,
    display_name: String,
    current_balance: String,
}

impl UserRow {
    fn into_document(self) -> Document {
        let mut fields = Map::new();
        fields.insert(DISPLAY_NAME_FIELD.to_string(), json!(self.display_name));
        if let Some(balance) = cell_to_value(&self.current_balance) {
            fields.insert(BALANCE_FIELD.to_string(), balance);
        }
        Document::new(self.id, fields)
    }
}

/// CSV-backed storage for user documents (`users.csv`)
#[derive(Debug, Clone)]
pub struct UserRepository {
    connection: CsvConnection,
}

impl UserRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_rows(&self) -> Result<Vec<UserRow>> {
        self.connection.ensure_users_file_exists()?;
        let file = File::open(self.connection.users_file_path())?;
        let mut reader = Reader::from_reader(BufReader::new(file));

        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }

    /// IDs of every user in the data directory
    pub fn list_user_ids(&self) -> Result<Vec<String>> {
        Ok(self.read_rows()?.into_iter().map(|row| row.id).collect())
    }

    /// All user documents
    pub fn read_users(&self) -> Result<Vec<Document>> {
        Ok(self
            .read_rows()?
            .into_iter()
            .map(UserRow::into_document)
            .collect())
    }

    /// Add the user if missing. Existing rows are left untouched.
    pub fn ensure_user(&self, profile: &UserProfile) -> Result<bool> {
        let mut rows = self.read_rows()?;
        if rows.iter().any(|row| row.id == profile.id) {
            return Ok(false);
        }
        rows.push(UserRow {
            id: profile.id.clone(),
            display_name: profile.display_name.clone(),
            current_balance: String::new(),
        });
        write_rows_atomically(&self.connection.users_file_path(), &rows)?;
        info!(user = %profile.id, "added user to data directory");
        Ok(true)
    }

    /// Add `delta` to a user's balance, starting from zero when unset
    pub fn adjust_balance(&self, user_id: &str, delta: Decimal) -> Result<Decimal> {
        let mut rows = self.read_rows()?;
        let row = rows
            .iter_mut()
            .find(|row| row.id == user_id)
            .ok_or_else(|| anyhow!("unknown user '{}'", user_id))?;

        let current = match row.current_balance.trim() {
            "" => Decimal::ZERO,
            raw => Decimal::from_str(raw)
                .map_err(|e| anyhow!("balance '{}' for user '{}' is not a number: {}", raw, user_id, e))?,
        };
        let updated = current
            .checked_add(delta)
            .ok_or_else(|| anyhow!("balance for user '{}' overflows", user_id))?;
        row.current_balance = updated.to_string();

        write_rows_atomically(&self.connection.users_file_path(), &rows)?;
        info!(user = user_id, %current, %updated, "adjusted balance");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::test_utils::TestEnvironment;

    fn profile() -> UserProfile {
        UserProfile {
            id: "u1".to_string(),
            display_name: "Grant".to_string(),
        }
    }

    #[test]
    fn test_ensure_user_is_idempotent() {
        let env = TestEnvironment::new().unwrap();
        let repo = UserRepository::new(env.connection.clone());

        assert!(repo.ensure_user(&profile()).unwrap());
        assert!(!repo.ensure_user(&profile()).unwrap());
        assert_eq!(repo.list_user_ids().unwrap(), vec!["u1".to_string()]);

        let users = repo.read_users().unwrap();
        assert_eq!(users[0].get(DISPLAY_NAME_FIELD), Some(&json!("Grant")));
        assert_eq!(users[0].get(BALANCE_FIELD), None);
    }

    #[test]
    fn test_adjust_balance() {
        let env = TestEnvironment::new().unwrap();
        let repo = UserRepository::new(env.connection.clone());
        repo.ensure_user(&profile()).unwrap();

        let balance = repo.adjust_balance("u1", Decimal::from_str("20.10").unwrap()).unwrap();
        assert_eq!(balance, Decimal::from_str("20.10").unwrap());
        let balance = repo.adjust_balance("u1", Decimal::from_str("-5.05").unwrap()).unwrap();
        assert_eq!(balance, Decimal::from_str("15.05").unwrap());

        let users = repo.read_users().unwrap();
        assert_eq!(users[0].get(BALANCE_FIELD), Some(&json!("15.05")));

        assert!(repo.adjust_balance("nobody", Decimal::ONE).is_err());
    }
}
