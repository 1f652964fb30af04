//! Row-to-entity parsing helpers.
//!
//! Every repo needs to convert `libsql::Row` (column-indexed) into typed entity
//! structs. These helpers isolate the parsing logic and the datetime format
//! shared by every timestamp column.

use std::collections::BTreeSet;

use audix_core::enums::EntityType;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::DatabaseError;

/// Format a timestamp for storage: RFC 3339, UTC, fixed microsecond width.
///
/// The fixed width keeps lexical order equal to chronological order, which
/// every `ORDER BY created_at` relies on.
#[must_use]
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-02-09T14:30:00.000000Z"`) and `SQLite`'s default
/// format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string cannot be parsed as either format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse an optional TEXT column as `Option<DateTime<Utc>>`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string cannot be parsed.
pub fn parse_optional_datetime(s: Option<&str>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_datetime(s)?)),
        _ => Ok(None),
    }
}

/// Parse a TEXT column into a serde-deserializable enum.
///
/// Works with all audix-core enums that use `#[serde(rename_all = "snake_case")]`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string does not match any enum variant.
pub fn parse_enum<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| DatabaseError::Query(format!("Failed to parse enum from '{s}': {e}")))
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, not `""`.
/// You must use `get::<Option<String>>()` for nullable columns.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Read an INTEGER column holding a version or revision counter.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the value is negative or exceeds `u32`.
pub fn get_u32(row: &libsql::Row, idx: i32) -> Result<u32, DatabaseError> {
    let raw = row.get::<i64>(idx)?;
    u32::try_from(raw)
        .map_err(|_| DatabaseError::Query(format!("column {idx}: {raw} out of range for u32")))
}

/// Read a non-negative INTEGER column as `u64` (sizes and counts).
///
/// # Errors
///
/// Returns `DatabaseError::Query` on a negative value.
pub fn get_u64(row: &libsql::Row, idx: i32) -> Result<u64, DatabaseError> {
    let raw = row.get::<i64>(idx)?;
    u64::try_from(raw)
        .map_err(|_| DatabaseError::Query(format!("column {idx}: negative value {raw}")))
}

/// Read a 0/1 INTEGER column as `bool`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_bool(row: &libsql::Row, idx: i32) -> Result<bool, DatabaseError> {
    Ok(row.get::<i64>(idx)? != 0)
}

/// Serialize a tag set as a JSON array for the `tags` column.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if serialization fails.
pub fn tags_to_json(tags: &BTreeSet<String>) -> Result<String, DatabaseError> {
    Ok(serde_json::to_string(tags)?)
}

/// Parse the `tags` column. An empty string reads as the empty set.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the column holds invalid JSON.
pub fn parse_tags(s: &str) -> Result<BTreeSet<String>, DatabaseError> {
    if s.is_empty() {
        return Ok(BTreeSet::new());
    }
    Ok(serde_json::from_str(s)?)
}

/// Map `EntityType` to the corresponding SQL table name.
///
/// Uses exhaustive match — adding a new `EntityType` variant forces updating this.
#[must_use]
pub const fn entity_type_to_table(entity: EntityType) -> &'static str {
    match entity {
        EntityType::Template => "audit_templates",
        EntityType::TemplateVersion => "template_versions",
        EntityType::Comment => "template_comments",
        EntityType::Attachment => "attachments",
        EntityType::Report => "audit_reports",
        EntityType::Checklist => "checklists",
        EntityType::ChecklistItem => "checklist_items",
    }
}
