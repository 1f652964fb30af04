use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::TemplateStatus;

/// The versioned content of a template: everything a snapshot copies.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TemplateFields {
    pub name: String,
    pub description: Option<String>,
    pub content: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub status: TemplateStatus,
}

impl TemplateFields {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            content: content.into(),
            tags: BTreeSet::new(),
            status: TemplateStatus::Draft,
        }
    }
}

/// The live record of an audit template.
///
/// `version` always equals the highest version number stored for `id`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AuditTemplate {
    pub id: String,
    #[serde(flatten)]
    pub fields: TemplateFields,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable snapshot of a template at one version number.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TemplateVersion {
    pub template_id: String,
    pub version: u32,
    #[serde(flatten)]
    pub fields: TemplateFields,
    pub changed_by: String,
    pub created_at: DateTime<Utc>,
}
