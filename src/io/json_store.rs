use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use crate::io::lock::StoreLock;
use crate::io::recovery::{self, RecoveryEntry};
use crate::io::store::{
    Collection, Filter, RecordStore, StoreError, Subscription, insert_document, merge_document,
    remove_document,
};
use crate::io::watcher::CollectionWatcher;
use crate::model::document::{Document, Fields};

/// Record store backed by one JSON array file per collection.
///
/// Every mutation is a locked read-modify-write of the collection file,
/// written atomically. Live subscriptions are fed by a file watcher, so
/// writes from other processes show up too.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Open the store rooted at `dir` (the `siteplan/` directory).
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        JsonStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn collection_path(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.file_name())
    }

    /// Run a locked read-modify-write of one collection on the blocking pool.
    async fn mutate<T, F>(&self, collection: Collection, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Vec<Document>) -> Result<(T, bool), StoreError> + Send + 'static,
    {
        let dir = self.dir.clone();
        let path = self.collection_path(collection);
        tokio::task::spawn_blocking(move || {
            let _lock = StoreLock::acquire_default(&dir)?;
            let mut docs = read_collection(&path)?;
            let (out, changed) = f(&mut docs)?;
            if changed {
                write_collection(&dir, &path, &docs)?;
            }
            Ok(out)
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }
}

/// Read a collection file. A missing file is an empty collection.
pub fn read_collection(path: &Path) -> Result<Vec<Document>, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(StoreError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write_collection(dir: &Path, path: &Path, docs: &[Document]) -> Result<(), StoreError> {
    let mut content = serde_json::to_string_pretty(docs)?;
    content.push('\n');

    if let Err(e) = recovery::atomic_write(path, content.as_bytes()) {
        recovery::log_recovery(
            dir,
            RecoveryEntry {
                timestamp: Utc::now(),
                target: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                error: e.to_string(),
                body: content,
            },
        );
        return Err(StoreError::WriteError {
            path: path.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

#[async_trait]
impl RecordStore for JsonStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let path = self.collection_path(collection);
        tokio::task::spawn_blocking(move || read_collection(&path))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }

    async fn create(&self, collection: Collection, fields: Fields) -> Result<String, StoreError> {
        let id = self
            .mutate(collection, move |docs| {
                Ok((insert_document(docs, fields, Utc::now()), true))
            })
            .await?;
        tracing::debug!(%collection, %id, "record created");
        Ok(id)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let owned_id = id.to_string();
        self.mutate(collection, move |docs| {
            merge_document(docs, collection, &owned_id, fields)?;
            Ok(((), true))
        })
        .await?;
        tracing::debug!(%collection, %id, "record updated");
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let owned_id = id.to_string();
        let removed = self
            .mutate(collection, move |docs| {
                let removed = remove_document(docs, &owned_id);
                Ok((removed, removed))
            })
            .await?;
        tracing::debug!(%collection, %id, removed, "record deleted");
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: Collection,
        filter: Filter,
    ) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let path = self.collection_path(collection);

        let initial = filter.apply(&self.list(collection).await?);
        let _ = tx.send(initial.clone());

        // Editors and atomic renames fire several events per write; only
        // forward snapshots that differ from the last one sent.
        let last = std::sync::Mutex::new(initial);
        let watch_path = path.clone();
        let watcher = CollectionWatcher::start(&self.dir, &collection.file_name(), move || {
            let docs = match read_collection(&watch_path) {
                Ok(docs) => filter.apply(&docs),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable snapshot");
                    return;
                }
            };
            let mut last = last.lock().unwrap_or_else(|p| p.into_inner());
            if *last != docs {
                *last = docs.clone();
                let _ = tx.send(docs);
            }
        })
        .map_err(|e| StoreError::WatchError { path, source: e })?;

        tracing::debug!(%collection, "subscription started");
        Ok(Subscription::new(rx, Some(Box::new(watcher))))
    }
}
