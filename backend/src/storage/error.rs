use thiserror::Error;

/// Failures raised by the local document store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("'{0}' is not a collection path (expected an odd number of segments)")]
    InvalidCollectionPath(String),

    #[error("'{0}' is not a document path (expected an even number of segments)")]
    InvalidDocumentPath(String),

    #[error("document store lock poisoned")]
    LockPoisoned,

    #[error("subscription to '{0}' closed by the store")]
    SubscriptionClosed(String),
}
