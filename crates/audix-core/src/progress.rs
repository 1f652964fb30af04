//! Checklist progress aggregation.
//!
//! A pure function of the current items. Nothing here is stored, so a progress
//! value can never drift from the item states it was computed from.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::ChecklistItem;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Progress {
    pub checklist_id: String,
    pub total_items: u32,
    pub completed_items: u32,
    pub mandatory_items: u32,
    pub completed_mandatory: u32,
    /// `100 * completed / total`, or 0 for an empty checklist.
    pub completion_percentage: f64,
    /// Same ratio over mandatory items, or 0 when none are mandatory.
    pub mandatory_completion_percentage: f64,
}

impl Progress {
    #[must_use]
    pub fn compute(checklist_id: &str, items: &[ChecklistItem]) -> Self {
        let mut total = 0u32;
        let mut completed = 0u32;
        let mut mandatory = 0u32;
        let mut completed_mandatory = 0u32;
        for item in items {
            total += 1;
            completed += u32::from(item.is_completed);
            mandatory += u32::from(item.is_mandatory);
            completed_mandatory += u32::from(item.is_mandatory && item.is_completed);
        }

        Self {
            checklist_id: checklist_id.to_string(),
            total_items: total,
            completed_items: completed,
            mandatory_items: mandatory,
            completed_mandatory,
            completion_percentage: percentage(completed, total),
            mandatory_completion_percentage: percentage(completed_mandatory, mandatory),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_items == self.total_items
    }
}

fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (f64::from(part) * 100.0 / f64::from(whole)).clamp(0.0, 100.0)
}
