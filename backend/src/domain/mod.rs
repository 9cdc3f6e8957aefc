//! # Domain Module
//!
//! Business logic of the dashboard, independent of storage and rendering.
//!
//! ## Module Organization
//!
//! - **daily_buckets**: per-day totals over a trailing window
//! - **record_parser**: store documents to `TransactionRecord`s, fail-fast on bad data
//! - **balance_service**: current balance read and currency formatting
//! - **dashboard_service**: live panels recomputing a series per snapshot
//! - **clock**: explicit reference date for every aggregation
//! - **errors**: aggregation error types
//!
//! ## Business Rules
//!
//! - A series always has exactly `window_days` entries, zero-filled
//! - Records on the same calendar day are summed, never overwritten
//! - Records outside the window are ignored, not rejected
//! - Malformed amounts or dates reject the whole snapshot
//! - A missing balance or an empty collection is a valid state

pub mod balance_service;
pub mod clock;
pub mod daily_buckets;
pub mod dashboard_service;
pub mod errors;
pub mod record_parser;

pub use balance_service::*;
pub use clock::*;
pub use daily_buckets::*;
pub use dashboard_service::*;
pub use errors::*;
pub use record_parser::*;
