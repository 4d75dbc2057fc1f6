//! Project Index Models
//!
//! The shape of the global `projects` store: the list of known projects and
//! the currently active one. The engine only ever reads this store — the
//! application layer owns project creation and deletion.

use serde::{Deserialize, Serialize};

/// Metadata of one project as stored in the project index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    /// Opaque project identifier
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Creation timestamp (ISO 8601), when the app recorded one
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp (ISO 8601)
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// State of the global project index store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIndexState {
    #[serde(default)]
    pub projects: Vec<ProjectMeta>,
    #[serde(default)]
    pub active_project_id: Option<String>,
}

impl ProjectIndexState {
    /// All known project ids, in index order
    pub fn project_ids(&self) -> Vec<String> {
        self.projects.iter().map(|p| p.id.clone()).collect()
    }

    /// Whether the index knows the given project id
    pub fn contains(&self, project_id: &str) -> bool {
        self.projects.iter().any(|p| p.id == project_id)
    }

    /// The active project id, falling back to the first listed project.
    /// Used by the migration heuristic for stores with no project concept.
    pub fn active_or_first(&self) -> Option<String> {
        self.active_project_id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| self.projects.first().map(|p| p.id.clone()))
    }
}
