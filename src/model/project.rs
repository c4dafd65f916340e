use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::document::{Document, null_as_default};
use crate::util::date::parse_date;

/// Label used for projects that carry no state at all
pub const UNSET_STATE: &str = "unset";

/// Pipeline state of a project.
///
/// Unknown labels coming from the store are kept verbatim in `Other`, so
/// aggregates count them under their literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectState {
    Lead,
    Proposal,
    Active,
    Completed,
    Archived,
    Other(String),
}

impl ProjectState {
    pub const KNOWN: [ProjectState; 5] = [
        ProjectState::Lead,
        ProjectState::Proposal,
        ProjectState::Active,
        ProjectState::Completed,
        ProjectState::Archived,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ProjectState::Lead => "Lead",
            ProjectState::Proposal => "Proposal",
            ProjectState::Active => "Active",
            ProjectState::Completed => "Completed",
            ProjectState::Archived => "Archived",
            ProjectState::Other(s) => s,
        }
    }

    /// Parse one of the known state names, case-insensitively
    pub fn parse_known(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::KNOWN
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
    }

    /// Closed projects no longer take new tasks
    pub fn is_closed(&self) -> bool {
        matches!(self, ProjectState::Completed | ProjectState::Archived)
    }
}

impl From<String> for ProjectState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Lead" => ProjectState::Lead,
            "Proposal" => ProjectState::Proposal,
            "Active" => ProjectState::Active,
            "Completed" => ProjectState::Completed,
            "Archived" => ProjectState::Archived,
            _ => ProjectState::Other(s),
        }
    }
}

impl From<ProjectState> for String {
    fn from(state: ProjectState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for ProjectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the append-only state audit trail: a state the project
/// left, and when
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub state: String,
    pub changed_at: DateTime<Utc>,
}

/// A client project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(skip)]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    /// Map link
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub currency: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub budget: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub property_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub property_size: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub project_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ProjectState>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub state_history: Vec<StateChange>,
    /// `YYYY-MM-DD`; may be empty or unparsable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
}

impl Project {
    /// Decode a project from a stored document
    pub fn from_document(doc: &Document) -> Result<Self, serde_json::Error> {
        let mut project: Project = doc.decode()?;
        project.id = doc.id.clone();
        Ok(project)
    }

    /// Histogram label for the current state
    pub fn state_label(&self) -> &str {
        self.state.as_ref().map_or(UNSET_STATE, ProjectState::as_str)
    }

    pub fn target(&self) -> Option<NaiveDate> {
        self.target_date.as_deref().and_then(parse_date)
    }

    /// Open for work: neither completed nor archived
    pub fn is_open(&self) -> bool {
        !self.state.as_ref().is_some_and(ProjectState::is_closed)
    }
}

/// Budgets arrive as free text from forms, but some writers store numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> Project {
        Project::from_document(&serde_json::from_value(value).unwrap()).unwrap()
    }

    #[test]
    fn unknown_states_are_kept_verbatim() {
        let p = decode(json!({"id": "p1", "state": "On Hold"}));
        assert_eq!(p.state, Some(ProjectState::Other("On Hold".into())));
        assert_eq!(p.state_label(), "On Hold");

        let back = serde_json::to_value(&p).unwrap();
        assert_eq!(back["state"], "On Hold");
    }

    #[test]
    fn absent_state_uses_unset_label() {
        let p = decode(json!({"id": "p1"}));
        assert_eq!(p.state, None);
        assert_eq!(p.state_label(), UNSET_STATE);
        assert!(p.is_open());
    }

    #[test]
    fn numeric_budget_is_accepted() {
        let p = decode(json!({"id": "p1", "budget": 250000}));
        assert_eq!(p.budget, "250000");
    }

    #[test]
    fn closed_states() {
        let mut p = decode(json!({"id": "p1", "state": "Archived"}));
        assert!(!p.is_open());
        p.state = Some(ProjectState::Active);
        assert!(p.is_open());
    }

    #[test]
    fn parse_known_is_case_insensitive() {
        assert_eq!(ProjectState::parse_known("proposal"), Some(ProjectState::Proposal));
        assert_eq!(ProjectState::parse_known("paused"), None);
    }

    #[test]
    fn history_round_trips_through_fields() {
        let p = decode(json!({
            "id": "p1",
            "state": "Active",
            "stateHistory": [{"state": "Lead", "changedAt": "2025-01-02T00:00:00Z"}],
            "targetDate": "2025-03-15"
        }));
        assert_eq!(p.state_history.len(), 1);
        assert_eq!(p.state_history[0].state, "Lead");
        assert_eq!(p.target(), NaiveDate::from_ymd_opt(2025, 3, 15));
    }

    #[test]
    fn null_fields_decode() {
        let p = decode(json!({
            "id": "p1",
            "state": "Active",
            "notes": null,
            "clientId": null,
            "stateHistory": null,
            "targetDate": null
        }));
        assert_eq!(p.notes, "");
        assert!(p.state_history.is_empty());
        assert_eq!(p.state_label(), "Active");
    }
}
