//! Typed activity log.
//!
//! Every mutation records exactly one [`Activity`] in the same unit of work.
//! Each variant carries only the fields relevant to its kind, so consumers
//! match exhaustively instead of probing an untyped payload.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::OwnerRef;
use crate::enums::{ActivityKind, TemplateStatus};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Activity {
    TemplateCreated {
        template_id: String,
        name: String,
        status: TemplateStatus,
    },
    TemplateUpdated {
        template_id: String,
        version: u32,
        changed_fields: Vec<String>,
    },
    TemplateDeleted {
        template_id: String,
        name: String,
    },
    VersionRestored {
        template_id: String,
        restored_from: u32,
        new_version: u32,
    },
    CommentAdded {
        template_id: String,
        comment_id: String,
    },
    CommentDeleted {
        template_id: String,
        comment_id: String,
    },
    AttachmentAdded {
        owner: OwnerRef,
        attachment_id: String,
        original_filename: String,
        file_size: u64,
    },
    AttachmentDeleted {
        owner: OwnerRef,
        attachment_id: String,
    },
    ReportGenerated {
        report_id: String,
        template_id: String,
        template_version: u32,
        title: String,
    },
    ChecklistCreated {
        checklist_id: String,
        name: String,
    },
    ChecklistDeleted {
        checklist_id: String,
    },
    ItemAdded {
        checklist_id: String,
        item_id: String,
        title: String,
    },
    ItemUpdated {
        checklist_id: String,
        item_id: String,
        changed_fields: Vec<String>,
    },
    ItemCompleted {
        checklist_id: String,
        item_id: String,
    },
    ItemReopened {
        checklist_id: String,
        item_id: String,
    },
    ItemDeleted {
        checklist_id: String,
        item_id: String,
    },
}

impl Activity {
    #[must_use]
    pub const fn kind(&self) -> ActivityKind {
        match self {
            Self::TemplateCreated { .. } => ActivityKind::TemplateCreated,
            Self::TemplateUpdated { .. } => ActivityKind::TemplateUpdated,
            Self::TemplateDeleted { .. } => ActivityKind::TemplateDeleted,
            Self::VersionRestored { .. } => ActivityKind::VersionRestored,
            Self::CommentAdded { .. } => ActivityKind::CommentAdded,
            Self::CommentDeleted { .. } => ActivityKind::CommentDeleted,
            Self::AttachmentAdded { .. } => ActivityKind::AttachmentAdded,
            Self::AttachmentDeleted { .. } => ActivityKind::AttachmentDeleted,
            Self::ReportGenerated { .. } => ActivityKind::ReportGenerated,
            Self::ChecklistCreated { .. } => ActivityKind::ChecklistCreated,
            Self::ChecklistDeleted { .. } => ActivityKind::ChecklistDeleted,
            Self::ItemAdded { .. } => ActivityKind::ItemAdded,
            Self::ItemUpdated { .. } => ActivityKind::ItemUpdated,
            Self::ItemCompleted { .. } => ActivityKind::ItemCompleted,
            Self::ItemReopened { .. } => ActivityKind::ItemReopened,
            Self::ItemDeleted { .. } => ActivityKind::ItemDeleted,
        }
    }

    /// The id of the record the activity is primarily about.
    #[must_use]
    pub fn subject_id(&self) -> &str {
        match self {
            Self::TemplateCreated { template_id, .. }
            | Self::TemplateUpdated { template_id, .. }
            | Self::TemplateDeleted { template_id, .. }
            | Self::VersionRestored { template_id, .. } => template_id,
            Self::CommentAdded { comment_id, .. } | Self::CommentDeleted { comment_id, .. } => {
                comment_id
            }
            Self::AttachmentAdded { attachment_id, .. }
            | Self::AttachmentDeleted { attachment_id, .. } => attachment_id,
            Self::ReportGenerated { report_id, .. } => report_id,
            Self::ChecklistCreated { checklist_id, .. }
            | Self::ChecklistDeleted { checklist_id } => checklist_id,
            Self::ItemAdded { item_id, .. }
            | Self::ItemUpdated { item_id, .. }
            | Self::ItemCompleted { item_id, .. }
            | Self::ItemReopened { item_id, .. }
            | Self::ItemDeleted { item_id, .. } => item_id,
        }
    }
}

/// A persisted activity with its actor and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ActivityEntry {
    pub id: String,
    pub actor: String,
    pub activity: Activity,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_serialization() {
        let activity = Activity::VersionRestored {
            template_id: "tpl-1".into(),
            restored_from: 1,
            new_version: 4,
        };
        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["type"], "version_restored");
        assert_eq!(json["restored_from"], 1);
        assert_eq!(json["new_version"], 4);

        let back: Activity = serde_json::from_value(json).unwrap();
        assert_eq!(back, activity);
    }

    #[test]
    fn kind_matches_serde_tag() {
        let activity = Activity::ItemCompleted {
            checklist_id: "chk-1".into(),
            item_id: "itm-1".into(),
        };
        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["type"], activity.kind().as_str());
        assert_eq!(activity.subject_id(), "itm-1");
    }

    #[test]
    fn unknown_tag_rejected() {
        let result: Result<Activity, _> =
            serde_json::from_str(r#"{"type":"something_else","template_id":"tpl-1"}"#);
        assert!(result.is_err());
    }
}
