//! Status enums, entity types and owner kinds for audix.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`
//! and expose `as_str()` returning the exact string stored in SQL.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TemplateStatus
// ---------------------------------------------------------------------------

/// Publication status of an audit template.
///
/// Status is part of the versioned content, so any status may follow any other
/// (a restore can bring back an archived snapshot's status, for example).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

impl TemplateStatus {
    pub const ALL: [Self; 3] = [Self::Draft, Self::Active, Self::Archived];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// OwnerKind
// ---------------------------------------------------------------------------

/// Which kind of parent record owns an attachment or a checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Template,
    Report,
}

impl OwnerKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Report => "report",
        }
    }

    #[must_use]
    pub const fn entity_type(self) -> EntityType {
        match self {
            Self::Template => EntityType::Template,
            Self::Report => EntityType::Report,
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// Type of entity in the system, used in errors and the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Template,
    TemplateVersion,
    Comment,
    Attachment,
    Report,
    Checklist,
    ChecklistItem,
}

impl EntityType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::TemplateVersion => "template_version",
            Self::Comment => "comment",
            Self::Attachment => "attachment",
            Self::Report => "report",
            Self::Checklist => "checklist",
            Self::ChecklistItem => "checklist_item",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActivityKind
// ---------------------------------------------------------------------------

/// Discriminant of an [`Activity`](crate::activity::Activity), stored in its own
/// column so the feed can be filtered without decoding payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    TemplateCreated,
    TemplateUpdated,
    TemplateDeleted,
    VersionRestored,
    CommentAdded,
    CommentDeleted,
    AttachmentAdded,
    AttachmentDeleted,
    ReportGenerated,
    ChecklistCreated,
    ChecklistDeleted,
    ItemAdded,
    ItemUpdated,
    ItemCompleted,
    ItemReopened,
    ItemDeleted,
}

impl ActivityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TemplateCreated => "template_created",
            Self::TemplateUpdated => "template_updated",
            Self::TemplateDeleted => "template_deleted",
            Self::VersionRestored => "version_restored",
            Self::CommentAdded => "comment_added",
            Self::CommentDeleted => "comment_deleted",
            Self::AttachmentAdded => "attachment_added",
            Self::AttachmentDeleted => "attachment_deleted",
            Self::ReportGenerated => "report_generated",
            Self::ChecklistCreated => "checklist_created",
            Self::ChecklistDeleted => "checklist_deleted",
            Self::ItemAdded => "item_added",
            Self::ItemUpdated => "item_updated",
            Self::ItemCompleted => "item_completed",
            Self::ItemReopened => "item_reopened",
            Self::ItemDeleted => "item_deleted",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
