use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::OwnerRef;

/// A checklist and its items, ordered by `order` then `created_at`.
///
/// `revision` is the optimistic-concurrency token bumped by every item mutation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Checklist {
    pub id: String,
    pub owner: Option<OwnerRef>,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub revision: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ChecklistItem {
    pub id: String,
    pub checklist_id: String,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub is_mandatory: bool,
    pub order: i64,
    pub depends_on_id: Option<String>,
    pub completed_by: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
