//! Template update builder.

use std::collections::BTreeSet;

use audix_core::entities::TemplateFields;
use audix_core::enums::TemplateStatus;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TemplateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TemplateStatus>,
}

impl TemplateUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.status.is_none()
    }

    /// Names of the supplied fields, in declaration order.
    #[must_use]
    pub fn changed_fields(&self) -> Vec<String> {
        [
            ("name", self.name.is_some()),
            ("description", self.description.is_some()),
            ("content", self.content.is_some()),
            ("tags", self.tags.is_some()),
            ("status", self.status.is_some()),
        ]
        .into_iter()
        .filter(|(_, supplied)| *supplied)
        .map(|(field, _)| field.to_string())
        .collect()
    }

    /// Overlay the supplied fields on `current`.
    #[must_use]
    pub fn apply(&self, current: &TemplateFields) -> TemplateFields {
        TemplateFields {
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| current.description.clone()),
            content: self
                .content
                .clone()
                .unwrap_or_else(|| current.content.clone()),
            tags: self.tags.clone().unwrap_or_else(|| current.tags.clone()),
            status: self.status.unwrap_or(current.status),
        }
    }
}

pub struct TemplateUpdateBuilder(TemplateUpdate);

impl TemplateUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(TemplateUpdate::default())
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.0.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.0.description = Some(description);
        self
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.0.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub const fn status(mut self, status: TemplateStatus) -> Self {
        self.0.status = Some(status);
        self
    }

    #[must_use]
    pub fn build(self) -> TemplateUpdate {
        self.0
    }
}

impl Default for TemplateUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
