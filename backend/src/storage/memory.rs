//! In-process document store.
//!
//! Holds collections of JSON documents keyed by path and keeps a registry of
//! live queries. Every write bumps a global generation counter and pushes a
//! fresh [`Snapshot`] to each live query on the written collection.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, info};

use super::error::StoreError;
use super::subscription::{Snapshot, Subscription};
use super::traits::{
    split_document_path, validate_collection_path, Document, DocumentStore, LiveQuery,
    RecordQuery,
};

type Collection = BTreeMap<String, Map<String, Value>>;

struct Listener {
    collection: String,
    query: RecordQuery,
    sender: watch::Sender<Arc<Snapshot>>,
}

#[derive(Default)]
struct StoreInner {
    collections: HashMap<String, Collection>,
    listeners: Vec<Listener>,
    generation: u64,
    next_id: u64,
}

impl StoreInner {
    fn snapshot(&self, collection: &str, query: &RecordQuery) -> Snapshot {
        let documents = match self.collections.get(collection) {
            Some(docs) => {
                let docs: Vec<Document> = docs
                    .iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect();
                query.apply(&docs)
            }
            None => Vec::new(),
        };
        Snapshot {
            generation: self.generation,
            documents,
        }
    }

    /// Bump the generation and push new snapshots for `collection`
    fn commit(&mut self, collection: &str) {
        self.generation += 1;
        self.listeners.retain(|l| !l.sender.is_closed());

        let mut notified = 0;
        for listener in self.listeners.iter().filter(|l| l.collection == collection) {
            let snapshot = self.snapshot(&listener.collection, &listener.query);
            listener.sender.send_replace(Arc::new(snapshot));
            notified += 1;
        }
        debug!(collection, generation = self.generation, notified, "committed write");
    }
}

/// Document store living entirely in memory
#[derive(Default)]
pub struct MemoryDocumentStore {
    inner: Mutex<StoreInner>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreInner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Current value of the write counter
    pub fn generation(&self) -> Result<u64> {
        Ok(self.lock()?.generation)
    }

    /// Number of live queries that have not been released
    pub fn active_subscriptions(&self) -> Result<usize> {
        let mut inner = self.lock()?;
        inner.listeners.retain(|l| !l.sender.is_closed());
        Ok(inner.listeners.len())
    }

    /// Replace the full contents of a collection.
    ///
    /// Returns `false` (and notifies nobody) when the contents are unchanged.
    pub fn replace_collection(&self, collection: &str, documents: Vec<Document>) -> Result<bool> {
        validate_collection_path(collection)?;
        let replacement: Collection = documents
            .into_iter()
            .map(|doc| (doc.id, doc.fields))
            .collect();

        let mut inner = self.lock()?;
        let unchanged = match inner.collections.get(collection) {
            Some(existing) => *existing == replacement,
            None => replacement.is_empty(),
        };
        if unchanged {
            return Ok(false);
        }

        info!(collection, documents = replacement.len(), "replacing collection");
        inner.collections.insert(collection.to_string(), replacement);
        inner.commit(collection);
        Ok(true)
    }

    /// Remove a single document, returning whether it existed
    pub fn delete_document(&self, path: &str) -> Result<bool> {
        let (collection, id) = split_document_path(path)?;
        let mut inner = self.lock()?;
        let removed = inner
            .collections
            .get_mut(collection)
            .map(|docs| docs.remove(id).is_some())
            .unwrap_or(false);
        if removed {
            inner.commit(collection);
        }
        Ok(removed)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get_document(&self, path: &str) -> Result<Option<Document>> {
        let (collection, id) = split_document_path(path)?;
        let inner = self.lock()?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn query(&self, collection: &str, query: &RecordQuery) -> Result<Vec<Document>> {
        validate_collection_path(collection)?;
        Ok(self.lock()?.snapshot(collection, query).documents)
    }

    async fn set_document(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        let (collection, id) = split_document_path(path)?;
        let mut inner = self.lock()?;
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        inner.commit(collection);
        Ok(())
    }

    async fn add_document(&self, collection: &str, fields: Map<String, Value>) -> Result<String> {
        validate_collection_path(collection)?;
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let id = format!("doc-{:06}", inner.next_id);
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);
        inner.commit(collection);
        Ok(id)
    }
}

impl LiveQuery for MemoryDocumentStore {
    fn subscribe(&self, collection: &str, query: RecordQuery) -> Result<Subscription> {
        validate_collection_path(collection)?;
        let mut inner = self.lock()?;
        let initial = inner.snapshot(collection, &query);
        let (sender, receiver) = watch::channel(Arc::new(initial));

        inner.listeners.push(Listener {
            collection: collection.to_string(),
            query,
            sender,
        });
        debug!(collection, listeners = inner.listeners.len(), "live query registered");
        Ok(Subscription::new(collection.to_string(), receiver))
    }
}
