use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use crate::io::store::{
    Collection, Filter, RecordStore, StoreError, Subscription, insert_document, merge_document,
    remove_document,
};
use crate::model::document::{Document, Fields};

/// In-process record store.
///
/// Subscribers are pushed a fresh snapshot after every mutation of their
/// collection. `set_offline(true)` makes every write fail with
/// `StoreError::Unavailable`, standing in for an unreachable remote store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    collections: HashMap<Collection, Vec<Document>>,
    subscribers: Vec<Subscriber>,
    offline: bool,
}

#[derive(Debug)]
struct Subscriber {
    collection: Collection,
    filter: Filter,
    tx: mpsc::UnboundedSender<Vec<Document>>,
}

impl MemoryInner {
    fn docs_mut(&mut self, collection: Collection) -> &mut Vec<Document> {
        self.collections.entry(collection).or_default()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline {
            Err(StoreError::Unavailable("store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    /// Push the current snapshot to every live subscriber of `collection`,
    /// dropping subscribers whose receiving end is gone.
    fn notify(&mut self, collection: Collection) {
        let docs = self.collections.get(&collection).cloned().unwrap_or_default();
        self.subscribers.retain(|sub| {
            if sub.collection != collection {
                return !sub.tx.is_closed();
            }
            sub.tx.send(sub.filter.apply(&docs)).is_ok()
        });
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection with existing documents (replacing it).
    pub fn with_documents(self, collection: Collection, docs: Vec<Document>) -> Self {
        {
            let mut inner = self.lock();
            inner.collections.insert(collection, docs);
            inner.notify(collection);
        }
        self
    }

    /// Toggle simulated write failures.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Number of live subscriptions (closed ones are pruned on the next write)
    pub fn subscriber_count(&self) -> usize {
        self.lock()
            .subscribers
            .iter()
            .filter(|s| !s.tx.is_closed())
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .lock()
            .collections
            .get(&collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn create(&self, collection: Collection, fields: Fields) -> Result<String, StoreError> {
        let mut inner = self.lock();
        inner.check_online()?;
        let id = insert_document(inner.docs_mut(collection), fields, Utc::now());
        inner.notify(collection);
        tracing::debug!(%collection, %id, "record created");
        Ok(id)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.check_online()?;
        merge_document(inner.docs_mut(collection), collection, id, fields)?;
        inner.notify(collection);
        tracing::debug!(%collection, %id, "record updated");
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.check_online()?;
        if remove_document(inner.docs_mut(collection), id) {
            inner.notify(collection);
        }
        tracing::debug!(%collection, %id, "record deleted");
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: Collection,
        filter: Filter,
    ) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let docs = inner.collections.get(&collection).cloned().unwrap_or_default();
        let _ = tx.send(filter.apply(&docs));
        inner.subscribers.push(Subscriber {
            collection,
            filter,
            tx,
        });
        tracing::debug!(%collection, "subscription started");
        Ok(Subscription::new(rx, None))
    }
}
