//! # Storage Module
//!
//! Capabilities of the hosted document backend that the dashboard consumes,
//! plus the local implementations used by the binary and the tests.
//!
//! ## Layout
//!
//! - **traits**: `DocumentStore`, `LiveQuery` and `AuthProvider` capabilities
//! - **memory**: in-process document store with live query subscriptions
//! - **subscription**: latest-value handle returned by `LiveQuery::subscribe`
//! - **csv**: CSV data directory that seeds and persists the document store
//! - **auth**: local auth provider backed by configuration
//!
//! Documents are opaque JSON field maps. Record documents carry
//! `{ amount: number, date: RFC 3339 timestamp }`; the user document carries
//! `currentBalance`.

pub mod auth;
pub mod csv;
pub mod error;
pub mod memory;
pub mod subscription;
pub mod traits;

pub use auth::LocalAuthProvider;
pub use error::StoreError;
pub use memory::MemoryDocumentStore;
pub use subscription::{Snapshot, Subscription};
pub use traits::{AuthProvider, DateOrder, Document, DocumentStore, LiveQuery, RecordQuery};
