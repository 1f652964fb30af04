//! Version store: the append-only ledger of template snapshots.
//!
//! Rows are written once by [`AudixService::append_version`] and never
//! updated or deleted; storage triggers reject both. Numbers are gap-free
//! from 1 per template.

use audix_core::entities::{TemplateFields, TemplateVersion};
use audix_core::enums::EntityType;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::helpers::{
    format_datetime, get_opt_string, get_u32, parse_datetime, parse_enum, parse_tags,
    tags_to_json,
};
use crate::service::AudixService;

const SELECT_COLS: &str =
    "template_id, version, name, description, content, tags, status, changed_by, created_at";

fn row_to_version(row: &libsql::Row) -> Result<TemplateVersion, DatabaseError> {
    Ok(TemplateVersion {
        template_id: row.get(0)?,
        version: get_u32(row, 1)?,
        fields: TemplateFields {
            name: row.get(2)?,
            description: get_opt_string(row, 3)?,
            content: row.get(4)?,
            tags: parse_tags(&row.get::<String>(5)?)?,
            status: parse_enum(&row.get::<String>(6)?)?,
        },
        changed_by: row.get(7)?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

fn version_key(template_id: &str, version: u32) -> String {
    format!("{template_id}@v{version}")
}

impl AudixService {
    /// Append the next snapshot for `template_id`. Must run inside a unit of work.
    pub(crate) async fn append_version(
        &self,
        template_id: &str,
        fields: &TemplateFields,
        changed_by: &str,
        at: DateTime<Utc>,
    ) -> Result<TemplateVersion, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT COALESCE(MAX(version), 0) FROM template_versions WHERE template_id = ?1",
                [template_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let version = get_u32(&row, 0)? + 1;

        self.db()
            .conn()
            .execute(
                &format!("INSERT INTO template_versions ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                libsql::params![
                    template_id,
                    i64::from(version),
                    fields.name.as_str(),
                    fields.description.as_deref(),
                    fields.content.as_str(),
                    tags_to_json(&fields.tags)?,
                    fields.status.as_str(),
                    changed_by,
                    format_datetime(&at)
                ],
            )
            .await?;

        tracing::debug!(template_id, version, "template version appended");
        Ok(TemplateVersion {
            template_id: template_id.to_string(),
            version,
            fields: fields.clone(),
            changed_by: changed_by.to_string(),
            created_at: at,
        })
    }

    pub(crate) async fn fetch_version(
        &self,
        template_id: &str,
        version: u32,
    ) -> Result<TemplateVersion, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM template_versions
                     WHERE template_id = ?1 AND version = ?2"
                ),
                libsql::params![template_id, i64::from(version)],
            )
            .await?;
        match rows.next().await? {
            Some(row) => row_to_version(&row),
            None => Err(DatabaseError::not_found(
                EntityType::TemplateVersion,
                version_key(template_id, version),
            )),
        }
    }

    /// Fetch one snapshot.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the template never had this version.
    pub async fn get_version(
        &self,
        template_id: &str,
        version: u32,
    ) -> Result<TemplateVersion, DatabaseError> {
        let _read = self.read().await?;
        self.fetch_version(template_id, version).await
    }

    /// List snapshots newest-first.
    ///
    /// Pass the smallest version of the previous page as `before` to fetch the
    /// next page. History outlives the live record, so a deleted template's
    /// versions remain listable.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no version was ever recorded for `template_id`.
    pub async fn list_versions(
        &self,
        template_id: &str,
        before: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Vec<TemplateVersion>, DatabaseError> {
        let limit = self.limits().resolve(limit);
        let _read = self.read().await?;

        let mut exists = self
            .db()
            .conn()
            .query(
                "SELECT 1 FROM template_versions WHERE template_id = ?1 LIMIT 1",
                [template_id],
            )
            .await?;
        if exists.next().await?.is_none() {
            return Err(DatabaseError::not_found(EntityType::Template, template_id));
        }

        let before = before.map_or(i64::MAX, i64::from);
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM template_versions
                     WHERE template_id = ?1 AND version < ?2
                     ORDER BY version DESC LIMIT ?3"
                ),
                libsql::params![template_id, before, i64::from(limit)],
            )
            .await?;

        let mut versions = Vec::new();
        while let Some(row) = rows.next().await? {
            versions.push(row_to_version(&row)?);
        }
        Ok(versions)
    }
}
