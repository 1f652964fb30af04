use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A free-text comment on a template. Comments are not versioned.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TemplateComment {
    pub id: String,
    pub template_id: String,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
