use crate::io::store::{Collection, RecordStore};
use crate::model::client::Client;
use crate::model::document::encode;
use crate::ops::OpsError;

/// Sort clients alphabetically by name, ignoring case
pub fn sort_by_name(clients: &mut [Client]) {
    clients.sort_by_cached_key(|c| c.name.to_lowercase());
}

/// Clients whose name contains `query`, ignoring case. An empty query
/// matches everyone.
pub fn search<'a>(clients: &'a [Client], query: &str) -> Vec<&'a Client> {
    let needle = query.trim().to_lowercase();
    clients
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&needle))
        .collect()
}

pub async fn create_client<S>(store: &S, client: &Client) -> Result<String, OpsError>
where
    S: RecordStore + ?Sized,
{
    if client.name.trim().is_empty() {
        return Err(OpsError::EmptyName);
    }
    let fields = encode(client).map_err(|e| OpsError::Malformed {
        kind: "client",
        id: client.id.clone(),
        source: e,
    })?;
    let id = store.create(Collection::Clients, fields).await?;
    tracing::info!(%id, "client created");
    Ok(id)
}

/// Every well-formed client, sorted by name
pub async fn list_clients<S>(store: &S) -> Result<Vec<Client>, OpsError>
where
    S: RecordStore + ?Sized,
{
    let docs = store.list(Collection::Clients).await?;
    let mut clients: Vec<Client> = docs
        .iter()
        .filter_map(|doc| match Client::from_document(doc) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(id = %doc.id, error = %e, "skipping malformed client record");
                None
            }
        })
        .collect();
    sort_by_name(&mut clients);
    Ok(clients)
}

pub async fn delete_client<S>(store: &S, id: &str) -> Result<(), OpsError>
where
    S: RecordStore + ?Sized,
{
    store.delete(Collection::Clients, id).await?;
    tracing::info!(%id, "client deleted");
    Ok(())
}
