use crate::io::store::{Collection, Filter, RecordStore, Subscription};
use crate::model::document::{Document, encode};
use crate::model::task::Task;
use crate::ops::OpsError;
use crate::ops::project_ops;

/// Field linking a task to its project
pub const PROJECT_FIELD: &str = "projectId";

/// Decode a snapshot into tasks, leaving out malformed documents.
pub fn decode_tasks(docs: &[Document]) -> Vec<Task> {
    docs.iter()
        .filter_map(|doc| match Task::from_document(doc) {
            Ok(task) => Some(task),
            Err(e) => {
                tracing::warn!(id = %doc.id, error = %e, "skipping malformed task record");
                None
            }
        })
        .collect()
}

/// Create a task in an open project. Returns the new id.
pub async fn create_task<S>(store: &S, task: &Task) -> Result<String, OpsError>
where
    S: RecordStore + ?Sized,
{
    if task.name.trim().is_empty() {
        return Err(OpsError::EmptyName);
    }
    let Some(project_id) = task.project_id.as_deref().filter(|p| !p.is_empty()) else {
        return Err(OpsError::MissingProject);
    };
    ensure_open_project(store, project_id).await?;

    let mut fields = encode(task).map_err(|e| malformed(&task.id, e))?;
    fields.remove("createdAt");
    let id = store.create(Collection::Tasks, fields).await?;
    tracing::info!(%id, project = %project_id, "task created");
    Ok(id)
}

/// Tasks of one project, in store order
pub async fn list_tasks<S>(store: &S, project_id: &str) -> Result<Vec<Task>, OpsError>
where
    S: RecordStore + ?Sized,
{
    let docs = store.list(Collection::Tasks).await?;
    let filter = Filter::field_eq(PROJECT_FIELD, project_id);
    Ok(decode_tasks(&filter.apply(&docs)))
}

pub async fn get_task<S>(store: &S, id: &str) -> Result<Task, OpsError>
where
    S: RecordStore + ?Sized,
{
    let docs = store.list(Collection::Tasks).await?;
    let doc = docs.iter().find(|d| d.id == id).ok_or_else(|| OpsError::NotFound {
        kind: "task",
        id: id.to_string(),
    })?;
    Task::from_document(doc).map_err(|e| malformed(id, e))
}

pub async fn delete_task<S>(store: &S, id: &str) -> Result<(), OpsError>
where
    S: RecordStore + ?Sized,
{
    store.delete(Collection::Tasks, id).await?;
    tracing::info!(%id, "task deleted");
    Ok(())
}

/// Re-create copied tasks under `project_id`. Ids and creation stamps of
/// the copies are dropped; the store assigns fresh ones. Returns the new
/// ids in order.
pub async fn paste_tasks<S>(
    store: &S,
    copied: &[Task],
    project_id: &str,
) -> Result<Vec<String>, OpsError>
where
    S: RecordStore + ?Sized,
{
    ensure_open_project(store, project_id).await?;

    let mut ids = Vec::with_capacity(copied.len());
    for task in copied {
        let copy = Task {
            id: String::new(),
            project_id: Some(project_id.to_string()),
            created_at: None,
            ..task.clone()
        };
        let fields = encode(&copy).map_err(|e| malformed(&task.id, e))?;
        ids.push(store.create(Collection::Tasks, fields).await?);
    }
    tracing::info!(count = ids.len(), project = %project_id, "tasks pasted");
    Ok(ids)
}

/// Live task list of one project
pub async fn watch_tasks<S>(store: &S, project_id: &str) -> Result<Subscription, OpsError>
where
    S: RecordStore + ?Sized,
{
    Ok(store
        .subscribe(Collection::Tasks, Filter::field_eq(PROJECT_FIELD, project_id))
        .await?)
}

async fn ensure_open_project<S>(store: &S, project_id: &str) -> Result<(), OpsError>
where
    S: RecordStore + ?Sized,
{
    let project = project_ops::get_project(store, project_id).await?;
    if !project.is_open() {
        return Err(OpsError::ClosedProject(project_id.to_string()));
    }
    Ok(())
}

fn malformed(id: &str, source: serde_json::Error) -> OpsError {
    OpsError::Malformed {
        kind: "task",
        id: id.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::memory_store::MemoryStore;
    use crate::model::project::{Project, ProjectState};
    use crate::model::task::TaskStatus;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn store_with_project(state: ProjectState) -> (MemoryStore, String) {
        let store = MemoryStore::new();
        let project = Project {
            address: "12 Lake Road".into(),
            state: Some(state),
            ..Default::default()
        };
        let id = project_ops::create_project(&store, project, "INR").await.unwrap();
        (store, id)
    }

    fn new_task(project: &str, name: &str, due: Option<&str>) -> Task {
        Task {
            project_id: Some(project.into()),
            name: name.into(),
            due_date: due.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_and_list() {
        let (store, p) = store_with_project(ProjectState::Active).await;
        let id = create_task(&store, &new_task(&p, "Demolition", Some("2025-02-01")))
            .await
            .unwrap();

        let tasks = list_tasks(&store, &p).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, id);
        assert_eq!(tasks[0].status, TaskStatus::Pending);
        assert!(tasks[0].created_at.is_some());
        assert!(list_tasks(&store, "other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_validates() {
        let (store, p) = store_with_project(ProjectState::Lead).await;
        assert!(matches!(
            create_task(&store, &new_task(&p, "  ", None)).await,
            Err(OpsError::EmptyName)
        ));
        let draft = Task {
            name: "Loose".into(),
            ..Default::default()
        };
        assert!(matches!(create_task(&store, &draft).await, Err(OpsError::MissingProject)));
        assert!(matches!(
            create_task(&store, &new_task("nope", "Tiles", None)).await,
            Err(OpsError::NotFound { kind: "project", .. })
        ));
    }

    #[tokio::test]
    async fn closed_projects_take_no_tasks() {
        let (store, p) = store_with_project(ProjectState::Archived).await;
        assert!(matches!(
            create_task(&store, &new_task(&p, "Snag list", None)).await,
            Err(OpsError::ClosedProject(_))
        ));
    }

    #[tokio::test]
    async fn paste_copies_into_target_project() {
        let (store, source) = store_with_project(ProjectState::Active).await;
        let target = project_ops::create_project(
            &store,
            Project {
                address: "3 Hill View".into(),
                ..Default::default()
            },
            "INR",
        )
        .await
        .unwrap();

        create_task(&store, &new_task(&source, "Survey", Some("2025-01-10"))).await.unwrap();
        create_task(&store, &new_task(&source, "Design", None)).await.unwrap();
        let copied = list_tasks(&store, &source).await.unwrap();

        let ids = paste_tasks(&store, &copied, &target).await.unwrap();
        assert_eq!(ids.len(), 2);

        let pasted = list_tasks(&store, &target).await.unwrap();
        let names: Vec<&str> = pasted.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Survey", "Design"]);
        assert_eq!(pasted[0].due_date.as_deref(), Some("2025-01-10"));
        assert!(pasted.iter().all(|t| !copied.iter().any(|c| c.id == t.id)));
        assert_eq!(list_tasks(&store, &source).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn watch_follows_project() {
        let (store, p) = store_with_project(ProjectState::Active).await;
        let mut sub = watch_tasks(&store, &p).await.unwrap();
        assert!(sub.next().await.unwrap().is_empty());

        let id = create_task(&store, &new_task(&p, "Plumbing", None)).await.unwrap();
        let snapshot = sub.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);

        delete_task(&store, &id).await.unwrap();
        assert!(sub.next().await.unwrap().is_empty());
    }

    #[test]
    fn decode_skips_malformed() {
        let docs: Vec<Document> = serde_json::from_value(json!([
            {"id": "a", "projectId": "p", "name": "Ok"},
            {"id": "b", "projectId": "p", "status": "Someday"},
        ]))
        .unwrap();
        let tasks = decode_tasks(&docs);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "a");
    }
}
