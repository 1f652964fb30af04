//! Checklist item creation input and update builder.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Fields of an item being added. `order` defaults to after the last item.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub description: Option<String>,
    pub is_mandatory: bool,
    pub order: Option<i64>,
    pub depends_on_id: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn mandatory(mut self) -> Self {
        self.is_mandatory = true;
        self
    }

    #[must_use]
    pub fn depends_on(mut self, depends_on_id: impl Into<String>) -> Self {
        self.depends_on_id = Some(depends_on_id.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ItemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mandatory: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

impl ItemUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.is_mandatory.is_none()
            && self.order.is_none()
            && self.depends_on_id.is_none()
            && self.due_date.is_none()
            && self.is_completed.is_none()
    }

    #[must_use]
    pub fn changed_fields(&self) -> Vec<String> {
        [
            ("title", self.title.is_some()),
            ("description", self.description.is_some()),
            ("is_mandatory", self.is_mandatory.is_some()),
            ("order", self.order.is_some()),
            ("depends_on_id", self.depends_on_id.is_some()),
            ("due_date", self.due_date.is_some()),
            ("is_completed", self.is_completed.is_some()),
        ]
        .into_iter()
        .filter(|(_, supplied)| *supplied)
        .map(|(field, _)| field.to_string())
        .collect()
    }
}

pub struct ItemUpdateBuilder(ItemUpdate);

impl ItemUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(ItemUpdate::default())
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.0.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.0.description = Some(description);
        self
    }

    #[must_use]
    pub const fn is_mandatory(mut self, is_mandatory: bool) -> Self {
        self.0.is_mandatory = Some(is_mandatory);
        self
    }

    #[must_use]
    pub const fn order(mut self, order: i64) -> Self {
        self.0.order = Some(order);
        self
    }

    #[must_use]
    pub fn depends_on(mut self, depends_on_id: Option<String>) -> Self {
        self.0.depends_on_id = Some(depends_on_id);
        self
    }

    #[must_use]
    pub const fn due_date(mut self, due_date: Option<DateTime<Utc>>) -> Self {
        self.0.due_date = Some(due_date);
        self
    }

    #[must_use]
    pub const fn completed(mut self, is_completed: bool) -> Self {
        self.0.is_completed = Some(is_completed);
        self
    }

    #[must_use]
    pub fn build(self) -> ItemUpdate {
        self.0
    }
}

impl Default for ItemUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
