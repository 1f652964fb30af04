//! Report repository: generation records and rendered output.
//!
//! A report pins the template version it was generated from. There is no
//! foreign key to the template, so reports outlive template deletion.

use audix_core::activity::Activity;
use audix_core::entities::AuditReport;
use audix_core::enums::EntityType;
use audix_core::ids::PREFIX_REPORT;
use audix_core::render::{RenderRequest, RenderedReport};
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::helpers::{
    format_datetime, get_opt_string, get_u32, parse_datetime, parse_optional_datetime,
};
use crate::service::AudixService;

const SELECT_COLS: &str =
    "id, template_id, template_version, title, generated_by, due_date, created_at";

fn row_to_report(row: &libsql::Row) -> Result<AuditReport, DatabaseError> {
    Ok(AuditReport {
        id: row.get(0)?,
        template_id: row.get(1)?,
        template_version: get_u32(row, 2)?,
        title: row.get(3)?,
        generated_by: row.get(4)?,
        due_date: parse_optional_datetime(get_opt_string(row, 5)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

/// A recorded report together with its rendered bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReport {
    pub report: AuditReport,
    pub rendered: RenderedReport,
}

impl GeneratedReport {
    /// Download name: the title with spaces replaced by `_`, plus the
    /// renderer's extension.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}.{}", self.report.file_stem(), self.rendered.extension)
    }
}

impl AudixService {
    pub(crate) async fn ensure_report_exists(&self, id: &str) -> Result<(), DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query("SELECT 1 FROM audit_reports WHERE id = ?1", [id])
            .await?;
        if rows.next().await?.is_none() {
            return Err(DatabaseError::not_found(EntityType::Report, id));
        }
        Ok(())
    }

    /// Record a report of the template's current version and render it.
    ///
    /// A renderer failure rolls the record back.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty title.
    /// - `NotFound` if the template does not exist.
    pub async fn generate_report(
        &self,
        template_id: &str,
        title: &str,
        due_date: Option<DateTime<Utc>>,
        actor: &str,
    ) -> Result<GeneratedReport, DatabaseError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DatabaseError::validation("report title must not be empty"));
        }
        let unit = self.begin().await?;
        let result = self
            .record_report(template_id, title, due_date, actor)
            .await;
        let generated = unit.finish(result).await?;
        tracing::info!(
            report_id = %generated.report.id,
            template_id,
            version = generated.report.template_version,
            bytes = generated.rendered.bytes.len(),
            "report generated"
        );
        Ok(generated)
    }

    async fn record_report(
        &self,
        template_id: &str,
        title: &str,
        due_date: Option<DateTime<Utc>>,
        actor: &str,
    ) -> Result<GeneratedReport, DatabaseError> {
        let template = self.fetch_template(template_id).await?;
        let snapshot = self.fetch_version(template_id, template.version).await?;
        let id = self.db().generate_id(PREFIX_REPORT).await?;
        let now = self.now();

        self.db()
            .conn()
            .execute(
                &format!("INSERT INTO audit_reports ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                libsql::params![
                    id.as_str(),
                    template_id,
                    i64::from(snapshot.version),
                    title,
                    actor,
                    due_date.as_ref().map(format_datetime),
                    format_datetime(&now)
                ],
            )
            .await?;

        self.record_activity(
            actor,
            Activity::ReportGenerated {
                report_id: id.clone(),
                template_id: template_id.to_string(),
                template_version: snapshot.version,
                title: title.to_string(),
            },
            now,
        )
        .await?;

        let rendered = self.renderer().render(&RenderRequest {
            title,
            snapshot: &snapshot,
            generated_by: actor,
            generated_at: now,
        })?;

        Ok(GeneratedReport {
            report: AuditReport {
                id,
                template_id: template_id.to_string(),
                template_version: snapshot.version,
                title: title.to_string(),
                generated_by: actor.to_string(),
                due_date,
                created_at: now,
            },
            rendered,
        })
    }

    /// # Errors
    ///
    /// Returns `NotFound` if the report does not exist.
    pub async fn get_report(&self, id: &str) -> Result<AuditReport, DatabaseError> {
        let _read = self.read().await?;
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM audit_reports WHERE id = ?1"),
                [id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => row_to_report(&row),
            None => Err(DatabaseError::not_found(EntityType::Report, id)),
        }
    }

    /// Reports newest first, optionally for one template.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_reports(
        &self,
        template_id: Option<&str>,
        skip: u32,
        limit: Option<u32>,
    ) -> Result<Vec<AuditReport>, DatabaseError> {
        let limit = i64::from(self.limits().resolve(limit));
        let skip = i64::from(skip);
        let _read = self.read().await?;

        let mut rows = match template_id {
            Some(template_id) => {
                self.db()
                    .conn()
                    .query(
                        &format!(
                            "SELECT {SELECT_COLS} FROM audit_reports WHERE template_id = ?1
                             ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
                        ),
                        libsql::params![template_id, limit, skip],
                    )
                    .await?
            }
            None => {
                self.db()
                    .conn()
                    .query(
                        &format!(
                            "SELECT {SELECT_COLS} FROM audit_reports
                             ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
                        ),
                        libsql::params![limit, skip],
                    )
                    .await?
            }
        };

        let mut reports = Vec::new();
        while let Some(row) = rows.next().await? {
            reports.push(row_to_report(&row)?);
        }
        Ok(reports)
    }
}
