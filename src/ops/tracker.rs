//! Unsaved-changes tracking for a project's task list.

use serde::Serialize;
use tokio::sync::watch;

use crate::io::store::{Collection, RecordStore, StoreError};
use crate::model::task::Task;

/// Save indicator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SaveStatus {
    Saved,
    Saving,
    Unsaved,
}

/// What a call to [`SaveTracker::save`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing to save, or a save was already running
    Skipped,
    /// Number of task rows written
    Saved(usize),
}

/// Compares the working task list against the last saved snapshot and
/// drives bulk saves.
///
/// The status is published on a watch channel so a view can follow it
/// without polling.
#[derive(Debug)]
pub struct SaveTracker {
    scope: Option<String>,
    saved: Vec<Task>,
    working: Vec<Task>,
    status: watch::Sender<SaveStatus>,
}

impl Default for SaveTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveTracker {
    pub fn new() -> Self {
        let (status, _) = watch::channel(SaveStatus::Saved);
        SaveTracker {
            scope: None,
            saved: Vec::new(),
            working: Vec::new(),
            status,
        }
    }

    /// Capture `tasks` as both the saved snapshot and the working list for
    /// a newly selected project.
    pub fn select_scope(&mut self, project_id: impl Into<String>, tasks: Vec<Task>) {
        let project_id = project_id.into();
        tracing::debug!(project = %project_id, count = tasks.len(), "tracker scope selected");
        self.scope = Some(project_id);
        self.saved = tasks.clone();
        self.working = tasks;
        self.set_status(SaveStatus::Saved);
    }

    /// Replace the whole working list, e.g. from a live snapshot.
    pub fn replace_working(&mut self, tasks: Vec<Task>) {
        self.working = tasks;
        self.refresh();
    }

    /// Edit one working task in place. Returns false when no task has `id`.
    pub fn edit_task<F>(&mut self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Task),
    {
        let Some(task) = self.working.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        f(task);
        self.refresh();
        true
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn working(&self) -> &[Task] {
        &self.working
    }

    pub fn saved(&self) -> &[Task] {
        &self.saved
    }

    pub fn is_dirty(&self) -> bool {
        if self.saved.len() != self.working.len() {
            return true;
        }
        self.saved
            .iter()
            .zip(&self.working)
            .any(|(a, b)| a.id != b.id || a != b)
    }

    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    pub fn can_save(&self) -> bool {
        self.status() != SaveStatus::Saving && self.is_dirty()
    }

    /// Write every working task back to the store, in order, as a full-row
    /// update. Stops at the first failure and leaves the tracker `Unsaved`.
    pub async fn save<S>(&mut self, store: &S) -> Result<SaveOutcome, StoreError>
    where
        S: RecordStore + ?Sized,
    {
        if !self.can_save() {
            return Ok(SaveOutcome::Skipped);
        }
        self.set_status(SaveStatus::Saving);

        match self.write_all(store).await {
            Ok(count) => {
                self.saved = self.working.clone();
                self.set_status(SaveStatus::Saved);
                tracing::info!(count, "tasks saved");
                Ok(SaveOutcome::Saved(count))
            }
            Err(e) => {
                self.set_status(SaveStatus::Unsaved);
                tracing::warn!(error = %e, "saving tasks failed");
                Err(e)
            }
        }
    }

    async fn write_all<S>(&self, store: &S) -> Result<usize, StoreError>
    where
        S: RecordStore + ?Sized,
    {
        for task in &self.working {
            store.update(Collection::Tasks, &task.id, task.to_row()?).await?;
        }
        Ok(self.working.len())
    }

    fn refresh(&mut self) {
        if self.status() == SaveStatus::Saving {
            return;
        }
        let next = if self.is_dirty() {
            SaveStatus::Unsaved
        } else {
            SaveStatus::Saved
        };
        self.set_status(next);
    }

    fn set_status(&self, next: SaveStatus) {
        self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            tracing::debug!(from = ?*current, to = ?next, "save status");
            *current = next;
            true
        });
    }
}
