use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A generated report, pinned to the template version it was rendered from.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AuditReport {
    pub id: String,
    pub template_id: String,
    pub template_version: u32,
    pub title: String,
    pub generated_by: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AuditReport {
    /// Download name: spaces in the title become underscores.
    #[must_use]
    pub fn file_stem(&self) -> String {
        self.title.replace(' ', "_")
    }
}
