use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::io::store::{Collection, RecordStore};
use crate::model::document::{Document, Fields, encode};
use crate::model::project::{Project, ProjectState, StateChange};
use crate::ops::OpsError;
use crate::ops::task_ops;

/// Decode a snapshot into projects, leaving out malformed documents.
pub fn decode_projects(docs: &[Document]) -> Vec<Project> {
    docs.iter()
        .filter_map(|doc| match Project::from_document(doc) {
            Ok(project) => Some(project),
            Err(e) => {
                tracing::warn!(id = %doc.id, error = %e, "skipping malformed project record");
                None
            }
        })
        .collect()
}

/// Projects that still take work (neither completed nor archived)
pub fn open_projects(projects: &[Project]) -> Vec<&Project> {
    projects.iter().filter(|p| p.is_open()).collect()
}

/// Create a project. New projects start as `Lead` unless a state is
/// given, and take `default_currency` when none is set. Any state history
/// on the input is discarded.
pub async fn create_project<S>(
    store: &S,
    mut project: Project,
    default_currency: &str,
) -> Result<String, OpsError>
where
    S: RecordStore + ?Sized,
{
    if project.currency.trim().is_empty() {
        project.currency = default_currency.to_string();
    }
    project.state.get_or_insert(ProjectState::Lead);
    project.state_history.clear();

    let fields = encode(&project).map_err(|e| malformed(&project.id, e))?;
    let id = store.create(Collection::Projects, fields).await?;
    tracing::info!(%id, state = %project.state_label(), "project created");
    Ok(id)
}

pub async fn list_projects<S>(store: &S) -> Result<Vec<Project>, OpsError>
where
    S: RecordStore + ?Sized,
{
    let docs = store.list(Collection::Projects).await?;
    Ok(decode_projects(&docs))
}

pub async fn get_project<S>(store: &S, id: &str) -> Result<Project, OpsError>
where
    S: RecordStore + ?Sized,
{
    let docs = store.list(Collection::Projects).await?;
    let doc = docs.iter().find(|d| d.id == id).ok_or_else(|| OpsError::NotFound {
        kind: "project",
        id: id.to_string(),
    })?;
    Project::from_document(doc).map_err(|e| malformed(id, e))
}

/// Merge descriptive fields into a project and return the result. State
/// and its history only change through [`transition_state`], so both keys
/// are dropped here.
pub async fn update_project<S>(store: &S, id: &str, mut fields: Fields) -> Result<Project, OpsError>
where
    S: RecordStore + ?Sized,
{
    fields.remove("state");
    fields.remove("stateHistory");
    get_project(store, id).await?;
    if !fields.is_empty() {
        store.update(Collection::Projects, id, fields).await?;
        tracing::info!(%id, "project updated");
    }
    get_project(store, id).await
}

/// Move a project to a known state, recording the state it left.
///
/// Moving to the current state changes nothing.
pub async fn transition_state<S>(
    store: &S,
    id: &str,
    state: &str,
    now: DateTime<Utc>,
) -> Result<Project, OpsError>
where
    S: RecordStore + ?Sized,
{
    let next = ProjectState::parse_known(state)
        .ok_or_else(|| OpsError::UnknownState(state.to_string()))?;
    let mut project = get_project(store, id).await?;
    if project.state.as_ref() == Some(&next) {
        return Ok(project);
    }

    if let Some(previous) = project.state.take() {
        project.state_history.push(StateChange {
            state: previous.to_string(),
            changed_at: now,
        });
    }
    project.state = Some(next);

    let mut fields = Fields::new();
    fields.insert("state".into(), Value::String(project.state_label().to_string()));
    let history = serde_json::to_value(&project.state_history).map_err(|e| malformed(id, e))?;
    fields.insert("stateHistory".into(), history);
    store.update(Collection::Projects, id, fields).await?;

    tracing::info!(%id, state = %project.state_label(), "project state changed");
    Ok(project)
}

/// Delete a project together with its tasks. Returns how many tasks went
/// with it.
pub async fn delete_project<S>(store: &S, id: &str) -> Result<usize, OpsError>
where
    S: RecordStore + ?Sized,
{
    let tasks = task_ops::list_tasks(store, id).await?;
    for task in &tasks {
        store.delete(Collection::Tasks, &task.id).await?;
    }
    store.delete(Collection::Projects, id).await?;
    tracing::info!(%id, tasks = tasks.len(), "project deleted");
    Ok(tasks.len())
}

fn malformed(id: &str, source: serde_json::Error) -> OpsError {
    OpsError::Malformed {
        kind: "project",
        id: id.to_string(),
        source,
    }
}
