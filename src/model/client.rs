use serde::{Deserialize, Serialize};

use super::document::{Document, null_as_default};

/// A studio client (contact details only)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(skip)]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mobile: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
}

impl Client {
    pub fn from_document(doc: &Document) -> Result<Self, serde_json::Error> {
        let mut client: Client = doc.decode()?;
        client.id = doc.id.clone();
        Ok(client)
    }

    /// `name (mobile, email)` with empty parts left out
    pub fn contact_line(&self) -> String {
        let details: Vec<&str> = [self.mobile.as_str(), self.email.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        if details.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, details.join(", "))
        }
    }
}
