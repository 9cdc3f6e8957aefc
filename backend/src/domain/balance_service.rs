//! Current balance read for the signed-in user.
//!
//! A single point read of `users/{uid}.currentBalance`. There is no
//! aggregation here: the value is whatever the store currently holds.

use anyhow::{anyhow, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use tracing::{debug, info};

use super::record_parser::parse_amount;
use crate::storage::traits::{DocumentStore, BALANCE_FIELD};

/// Service responsible for reading the user's balance
#[derive(Clone)]
pub struct BalanceService {
    store: Arc<dyn DocumentStore>,
}

impl BalanceService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Read the user's balance. `None` when the user document or the field
    /// is absent; absence is a normal state, not an error.
    pub async fn read_balance(&self, user_id: &str) -> Result<Option<Decimal>> {
        let path = format!("users/{}", user_id);
        let Some(document) = self.store.get_document(&path).await? else {
            info!("No user document at {}, nothing to show", path);
            return Ok(None);
        };

        match document.get(BALANCE_FIELD) {
            Some(value) => {
                let balance = parse_amount(value)
                    .map_err(|reason| anyhow!("{}.{}: {}", path, BALANCE_FIELD, reason))?;
                debug!(user = user_id, %balance, "read balance");
                Ok(Some(balance))
            }
            None => Ok(None),
        }
    }

    /// Read and format the balance for display
    pub async fn formatted_balance(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.read_balance(user_id).await?.map(format_currency))
    }
}

/// Format an amount as dollars with two decimal places: `1234.5` becomes
/// `$1234.50` and `-5` becomes `-$5.00`
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${:.2}", rounded.abs())
    } else {
        format!("${:.2}", rounded.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryDocumentStore;
    use serde_json::{json, Map};
    use std::str::FromStr;

    async fn service_with_user(fields: Map<String, serde_json::Value>) -> BalanceService {
        let store = Arc::new(MemoryDocumentStore::new());
        store.set_document("users/u1", fields).await.unwrap();
        BalanceService::new(store)
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(Decimal::from(12)), "$12.00");
        assert_eq!(format_currency(Decimal::from_str("3.5").unwrap()), "$3.50");
        assert_eq!(format_currency(Decimal::from_str("2.005").unwrap()), "$2.01");
        assert_eq!(format_currency(Decimal::from_str("-5").unwrap()), "-$5.00");
        assert_eq!(format_currency(Decimal::from_str("-0.001").unwrap()), "$0.00");
    }

    #[tokio::test]
    async fn test_read_balance() {
        let mut fields = Map::new();
        fields.insert("currentBalance".to_string(), json!(42.5));
        let service = service_with_user(fields).await;

        assert_eq!(
            service.read_balance("u1").await.unwrap(),
            Some(Decimal::from_str("42.5").unwrap())
        );
        assert_eq!(
            service.formatted_balance("u1").await.unwrap(),
            Some("$42.50".to_string())
        );
    }

    #[tokio::test]
    async fn test_absent_balance_is_none() {
        let service = service_with_user(Map::new()).await;
        assert_eq!(service.read_balance("u1").await.unwrap(), None);
        assert_eq!(service.read_balance("someone_else").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_balance_is_an_error() {
        let mut fields = Map::new();
        fields.insert("currentBalance".to_string(), json!("lots"));
        let service = service_with_user(fields).await;
        assert!(service.read_balance("u1").await.is_err());
    }
}
