use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::OwnerKind;

/// Reference to the parent record owning an attachment or checklist.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub id: String,
}

impl OwnerRef {
    pub fn template(id: impl Into<String>) -> Self {
        Self {
            kind: OwnerKind::Template,
            id: id.into(),
        }
    }

    pub fn report(id: impl Into<String>) -> Self {
        Self {
            kind: OwnerKind::Report,
            id: id.into(),
        }
    }

    /// Split into the `(template_id, report_id)` column pair.
    #[must_use]
    pub fn columns(&self) -> (Option<&str>, Option<&str>) {
        match self.kind {
            OwnerKind::Template => (Some(self.id.as_str()), None),
            OwnerKind::Report => (None, Some(self.id.as_str())),
        }
    }

    /// Rebuild from the `(template_id, report_id)` column pair.
    ///
    /// Returns `None` when neither or both columns are set.
    #[must_use]
    pub fn from_columns(template_id: Option<String>, report_id: Option<String>) -> Option<Self> {
        match (template_id, report_id) {
            (Some(id), None) => Some(Self::template(id)),
            (None, Some(id)) => Some(Self::report(id)),
            _ => None,
        }
    }
}
