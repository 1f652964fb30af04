//! Report rendering seam.
//!
//! The service hands a renderer one immutable template snapshot and gets back
//! a byte stream. Layout engines plug in behind [`ReportRenderer`]; the crate
//! ships a plain-text renderer.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::entities::TemplateVersion;
use crate::errors::CoreError;

/// Everything a renderer may put on the page.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub title: &'a str,
    pub snapshot: &'a TemplateVersion,
    pub generated_by: &'a str,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub content_type: String,
    /// File extension without the leading dot.
    pub extension: String,
    pub bytes: Vec<u8>,
}

pub trait ReportRenderer: Send + Sync {
    /// # Errors
    ///
    /// Implementations return [`CoreError`] when the snapshot cannot be rendered.
    fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedReport, CoreError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl ReportRenderer for PlainTextRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedReport, CoreError> {
        let snapshot = request.snapshot;
        let fields = &snapshot.fields;
        let description = fields
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("No description");
        let tags = if fields.tags.is_empty() {
            "-".to_string()
        } else {
            fields.tags.iter().cloned().collect::<Vec<_>>().join(", ")
        };

        let mut out = String::new();
        let underline = "=".repeat(request.title.chars().count().max(1));
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{}\n{underline}\n", request.title);
        let _ = writeln!(out, "Template: {}", fields.name);
        let _ = writeln!(
            out,
            "Version: {} ({})",
            snapshot.version, fields.status
        );
        let _ = writeln!(out, "Tags: {tags}");
        let _ = writeln!(
            out,
            "Generated: {} by {}\n",
            request.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            request.generated_by
        );
        let _ = writeln!(out, "Description:\n{description}\n");
        let _ = writeln!(out, "Content:\n{}", fields.content);

        Ok(RenderedReport {
            content_type: "text/plain; charset=utf-8".to_string(),
            extension: "txt".to_string(),
            bytes: out.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::entities::TemplateFields;

    fn snapshot(description: Option<&str>) -> TemplateVersion {
        let mut fields = TemplateFields::new("ISO 27001 review", "1. Check access logs");
        fields.description = description.map(String::from);
        fields.tags.insert("security".into());
        TemplateVersion {
            template_id: "tpl-000000000001".into(),
            version: 3,
            fields,
            changed_by: "alice".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn plain_text_contains_snapshot_fields() {
        let snap = snapshot(Some("Quarterly"));
        let generated_at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let rendered = PlainTextRenderer
            .render(&RenderRequest {
                title: "Q1 Review",
                snapshot: &snap,
                generated_by: "bob",
                generated_at,
            })
            .unwrap();
        let text = String::from_utf8(rendered.bytes).unwrap();
        assert!(text.starts_with("Q1 Review\n=========\n"));
        assert!(text.contains("Template: ISO 27001 review"));
        assert!(text.contains("Version: 3 (draft)"));
        assert!(text.contains("Tags: security"));
        assert!(text.contains("Generated: 2026-03-01 09:30:00 UTC by bob"));
        assert!(text.contains("Quarterly"));
        assert!(text.contains("1. Check access logs"));
        assert_eq!(rendered.extension, "txt");
    }

    #[test]
    fn missing_description_is_labelled() {
        let snap = snapshot(Some("   "));
        let rendered = PlainTextRenderer
            .render(&RenderRequest {
                title: "T",
                snapshot: &snap,
                generated_by: "bob",
                generated_at: Utc::now(),
            })
            .unwrap();
        let text = String::from_utf8(rendered.bytes).unwrap();
        assert!(text.contains("No description"));
    }
}
