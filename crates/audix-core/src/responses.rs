//! Response types returned by service mutations and serialized as JSON by
//! `audixd` handlers.
//!
//! Mutations return the updated entity (and a fresh [`Progress`] for checklist
//! items) so callers never need to re-fetch after a write.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{AuditTemplate, ChecklistItem};
use crate::progress::Progress;

/// Response from restoring a template version.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RestoreResponse {
    pub message: String,
    pub restored_from: u32,
    pub current_version: u32,
    pub template: AuditTemplate,
}

/// Response from adding or updating a checklist item.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ItemMutationResponse {
    pub item: ChecklistItem,
    pub checklist_revision: u32,
    pub progress: Progress,
}

/// Response from deleting a checklist item.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ItemDeletedResponse {
    pub item_id: String,
    pub checklist_revision: u32,
    pub progress: Progress,
}

/// Dependency-respecting order of a checklist's items.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ChecklistOrderResponse {
    pub checklist_id: String,
    pub item_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DashboardStats {
    pub overview: DashboardOverview,
    pub templates_by_status: StatusCounts,
    pub trends: DashboardTrends,
    pub top_templates: TopTemplates,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DashboardOverview {
    pub total_templates: u64,
    pub total_reports: u64,
    pub total_comments: u64,
    pub total_attachments: u64,
    pub recent_templates_30d: u64,
    pub recent_reports_30d: u64,
    pub total_storage_bytes: u64,
    pub total_storage_mb: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StatusCounts {
    pub draft: u64,
    pub active: u64,
    pub archived: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DashboardTrends {
    pub templates_per_month: Vec<MonthlyCount>,
    pub reports_per_month: Vec<MonthlyCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MonthlyCount {
    pub year: i32,
    pub month: u32,
    pub count: u64,
    /// `YYYY-MM`.
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TopTemplates {
    pub most_commented: Vec<TemplateCount>,
    pub most_attachments: Vec<TemplateCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TemplateCount {
    pub id: String,
    pub name: String,
    pub count: u64,
}

/// Bytes to megabytes, rounded to two decimals.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}
