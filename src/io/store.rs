use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::io::lock::LockError;
use crate::model::document::{Document, Fields};

/// Field the store stamps on create and never lets an update overwrite
pub const CREATED_AT: &str = "createdAt";

/// The record collections the store holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Tasks,
    Projects,
    Clients,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Tasks, Collection::Projects, Collection::Clients];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Tasks => "tasks",
            Collection::Projects => "projects",
            Collection::Clients => "clients",
        }
    }

    /// File name used by the file-backed store
    pub fn file_name(self) -> String {
        format!("{}.json", self.name())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Query filter for live subscriptions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    /// Top-level string field equals the value (e.g. `projectId == p1`)
    FieldEq { field: String, value: String },
}

impl Filter {
    pub fn field_eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::FieldEq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::FieldEq { field, value } => doc.str_field(field) == Some(value.as_str()),
        }
    }

    pub fn apply(&self, docs: &[Document]) -> Vec<Document> {
        docs.iter().filter(|d| self.matches(d)).cloned().collect()
    }
}

/// Error type for record store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{collection} record not found: {id}")]
    NotFound { collection: Collection, id: String },
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("corrupt collection file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not watch {path}: {source}")]
    WatchError {
        path: PathBuf,
        source: notify::Error,
    },
    #[error("could not encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A live query: every message is the complete current result set,
/// replacing whatever the consumer held before. The first message is the
/// snapshot at subscription time.
///
/// Dropping the subscription cancels it.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Vec<Document>>,
    _guard: Option<Box<dyn Send>>,
}

impl Subscription {
    /// `guard` is kept alive for as long as the subscription (e.g. a file
    /// watcher feeding `rx`).
    pub fn new(
        rx: mpsc::UnboundedReceiver<Vec<Document>>,
        guard: Option<Box<dyn Send>>,
    ) -> Self {
        Subscription { rx, _guard: guard }
    }

    /// Wait for the next snapshot. `None` once the store side has gone away.
    pub async fn next(&mut self) -> Option<Vec<Document>> {
        self.rx.recv().await
    }
}

/// The persistence collaborator.
///
/// Implementations own their timeout and retry policy; callers see either
/// success or a `StoreError`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every record in the collection
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError>;

    /// Insert a new record and return its store-assigned id
    async fn create(&self, collection: Collection, fields: Fields) -> Result<String, StoreError>;

    /// Merge `fields` into an existing record (top-level keys replace)
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError>;

    /// Remove a record. Removing a record that does not exist succeeds.
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;

    /// Live query over the collection
    async fn subscribe(
        &self,
        collection: Collection,
        filter: Filter,
    ) -> Result<Subscription, StoreError>;
}

// ---------------------------------------------------------------------------
// Mutation helpers shared by the store implementations
// ---------------------------------------------------------------------------

/// Build a new document with a fresh id and server timestamp, append it,
/// and return the id.
pub(crate) fn insert_document(docs: &mut Vec<Document>, mut fields: Fields, now: DateTime<Utc>) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    fields.remove("id");
    fields.insert(
        CREATED_AT.to_string(),
        Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    docs.push(Document::new(id.clone(), fields));
    id
}

/// Merge `fields` into the document with `id`.
pub(crate) fn merge_document(
    docs: &mut [Document],
    collection: Collection,
    id: &str,
    fields: Fields,
) -> Result<(), StoreError> {
    let doc = docs
        .iter_mut()
        .find(|d| d.id == id)
        .ok_or_else(|| StoreError::NotFound {
            collection,
            id: id.to_string(),
        })?;
    for (key, value) in fields {
        if key == "id" || key == CREATED_AT {
            continue;
        }
        doc.fields.insert(key, value);
    }
    Ok(())
}

/// Remove the document with `id`; returns whether anything was removed.
pub(crate) fn remove_document(docs: &mut Vec<Document>, id: &str) -> bool {
    let before = docs.len();
    docs.retain(|d| d.id != id);
    docs.len() != before
}
