use std::sync::Arc;

use tokio::sync::watch;

use super::error::StoreError;
use super::traits::Document;

/// One immutable view of a live query's result
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Store write counter at the time the snapshot was taken
    pub generation: u64,
    pub documents: Vec<Document>,
}

/// Handle on a live query.
///
/// Backed by a latest-value channel: if several snapshots are emitted before
/// the consumer looks, only the newest is observed. Dropping the handle (or
/// calling [`Subscription::unsubscribe`]) releases it; the store prunes
/// released subscriptions on its next write.
#[derive(Debug)]
pub struct Subscription {
    collection: String,
    receiver: watch::Receiver<Arc<Snapshot>>,
}

impl Subscription {
    pub(crate) fn new(collection: String, receiver: watch::Receiver<Arc<Snapshot>>) -> Self {
        Self { collection, receiver }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Take the newest snapshot and mark it as seen
    pub fn latest(&mut self) -> Arc<Snapshot> {
        Arc::clone(&self.receiver.borrow_and_update())
    }

    /// Whether a snapshot newer than the last one taken is waiting
    pub fn has_newer(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next snapshot
    pub async fn changed(&mut self) -> Result<(), StoreError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| StoreError::SubscriptionClosed(self.collection.clone()))
    }

    pub fn unsubscribe(self) {
        tracing::debug!(collection = %self.collection, "unsubscribing");
    }
}
