//! # Storage Traits
//!
//! Capabilities the dashboard expects from its backend-as-a-service. The
//! domain layer only talks to these traits, so the in-process store used by
//! the binary and tests can be swapped for a hosted one without touching it.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};
use shared::UserProfile;

use super::error::StoreError;
use super::subscription::Subscription;

/// Field holding a record's timestamp
pub const DATE_FIELD: &str = "date";
/// Field holding a record's amount
pub const AMOUNT_FIELD: &str = "amount";
/// Field on the user document holding the current balance
pub const BALANCE_FIELD: &str = "currentBalance";

/// An opaque key/value document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self { id: id.into(), fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The `date` field parsed as RFC 3339, if present and well formed
    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        self.get(DATE_FIELD)
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
    }
}

/// Sort direction on the `date` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateOrder {
    Ascending,
    #[default]
    Descending,
}

/// Filter and ordering for a record collection query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordQuery {
    /// Only documents strictly after this instant
    pub date_after: Option<DateTime<FixedOffset>>,
    pub order: DateOrder,
}

impl RecordQuery {
    pub fn after(date_after: DateTime<FixedOffset>) -> Self {
        Self {
            date_after: Some(date_after),
            order: DateOrder::Descending,
        }
    }

    /// Whether a document passes the date filter.
    ///
    /// Documents without a readable `date` are kept so that the record parser
    /// can report them instead of them disappearing from the totals.
    pub fn matches(&self, document: &Document) -> bool {
        match (self.date_after, document.date()) {
            (Some(after), Some(date)) => date > after,
            _ => true,
        }
    }

    /// Filter and sort a set of documents. Undated documents sort last.
    pub fn apply<'a, I>(&self, documents: I) -> Vec<Document>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut matched: Vec<Document> = documents
            .into_iter()
            .filter(|doc| self.matches(doc))
            .cloned()
            .collect();

        matched.sort_by(|a, b| match (a.date(), b.date()) {
            (Some(da), Some(db)) => match self.order {
                DateOrder::Ascending => da.cmp(&db),
                DateOrder::Descending => db.cmp(&da),
            },
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });
        matched
    }
}

/// Check that `path` names a collection (`users/u1/income`)
pub fn validate_collection_path(path: &str) -> Result<(), StoreError> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) || segments.len() % 2 == 0 {
        return Err(StoreError::InvalidCollectionPath(path.to_string()));
    }
    Ok(())
}

/// Split a document path (`users/u1`) into its collection and document ID
pub fn split_document_path(path: &str) -> Result<(&str, &str), StoreError> {
    let segments = path.split('/').count();
    if path.split('/').any(str::is_empty) || segments % 2 != 0 {
        return Err(StoreError::InvalidDocumentPath(path.to_string()));
    }
    match path.rsplit_once('/') {
        Some((collection, id)) => Ok((collection, id)),
        None => Err(StoreError::InvalidDocumentPath(path.to_string())),
    }
}

/// Point reads and writes against the document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a single document, `None` when it does not exist
    async fn get_document(&self, path: &str) -> Result<Option<Document>>;

    /// Run a one-shot query over a collection
    async fn query(&self, collection: &str, query: &RecordQuery) -> Result<Vec<Document>>;

    /// Create or overwrite the document at `path`
    async fn set_document(&self, path: &str, fields: Map<String, Value>) -> Result<()>;

    /// Add a document with a store-generated ID, returning the ID
    async fn add_document(&self, collection: &str, fields: Map<String, Value>) -> Result<String>;
}

/// Standing queries that deliver a fresh snapshot on every change
pub trait LiveQuery: Send + Sync {
    /// Start a live query. The returned subscription already holds the
    /// current result and stays registered until it is dropped.
    fn subscribe(&self, collection: &str, query: RecordQuery) -> Result<Subscription>;
}

/// Identity of the person using the dashboard
#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<UserProfile>;

    async fn sign_in(&self) -> Result<UserProfile>;

    async fn sign_out(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, date: Option<&str>) -> Document {
        let mut fields = Map::new();
        fields.insert(AMOUNT_FIELD.to_string(), json!(1));
        if let Some(date) = date {
            fields.insert(DATE_FIELD.to_string(), json!(date));
        }
        Document::new(id, fields)
    }

    #[test]
    fn test_path_validation() {
        assert!(validate_collection_path("users").is_ok());
        assert!(validate_collection_path("users/u1/income").is_ok());
        assert!(validate_collection_path("users/u1").is_err());
        assert!(validate_collection_path("users//income").is_err());

        assert_eq!(split_document_path("users/u1").unwrap(), ("users", "u1"));
        assert_eq!(
            split_document_path("users/u1/income/r1").unwrap(),
            ("users/u1/income", "r1")
        );
        assert!(split_document_path("users").is_err());
        assert!(split_document_path("users/u1/income").is_err());
    }

    #[test]
    fn test_query_filters_strictly_after_and_sorts_descending() {
        let month_start = DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z").unwrap();
        let docs = vec![
            doc("a", Some("2024-03-01T00:00:00Z")),
            doc("b", Some("2024-03-02T09:00:00Z")),
            doc("c", Some("2024-03-10T09:00:00Z")),
            doc("d", Some("2024-02-20T09:00:00Z")),
        ];

        let result = RecordQuery::after(month_start).apply(&docs);
        let ids: Vec<&str> = result.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_query_keeps_undated_documents_last() {
        let month_start = DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z").unwrap();
        let docs = vec![
            doc("broken", Some("yesterday")),
            doc("ok", Some("2024-03-05T09:00:00Z")),
            doc("missing", None),
        ];

        let result = RecordQuery::after(month_start).apply(&docs);
        let ids: Vec<&str> = result.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["ok", "broken", "missing"]);
    }
}
