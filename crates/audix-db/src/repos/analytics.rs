//! Dashboard aggregates. Read-only; computed on demand from live tables.

use std::collections::HashMap;

use audix_core::responses::{
    DashboardOverview, DashboardStats, DashboardTrends, MonthlyCount, StatusCounts,
    TemplateCount, TopTemplates, bytes_to_mb,
};
use chrono::{DateTime, Datelike, Duration, Utc};

use crate::error::DatabaseError;
use crate::helpers::{format_datetime, get_u64};
use crate::service::AudixService;

const TREND_MONTHS: u32 = 12;
const TOP_TEMPLATES: i64 = 5;
const RECENT_DAYS: i64 = 30;

/// The last `count` calendar months ending with the month of `now`, oldest first.
fn trailing_months(now: DateTime<Utc>, count: u32) -> Vec<(i32, u32)> {
    let mut year = now.year();
    let mut month = now.month();
    let mut months = Vec::with_capacity(count as usize);
    for _ in 0..count {
        months.push((year, month));
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }
    months.reverse();
    months
}

fn month_label(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

impl AudixService {
    async fn count(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<u64, DatabaseError> {
        let mut rows = self.db().conn().query(sql, params).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        get_u64(&row, 0)
    }

    async fn monthly_counts(
        &self,
        table: &str,
        months: &[(i32, u32)],
    ) -> Result<Vec<MonthlyCount>, DatabaseError> {
        let Some(&(first_year, first_month)) = months.first() else {
            return Ok(Vec::new());
        };
        let since = format!("{}-01", month_label(first_year, first_month));
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT substr(created_at, 1, 7) AS month, COUNT(*) FROM {table}
                     WHERE created_at >= ?1 GROUP BY month"
                ),
                [since],
            )
            .await?;

        let mut by_month: HashMap<String, u64> = HashMap::new();
        while let Some(row) = rows.next().await? {
            by_month.insert(row.get::<String>(0)?, get_u64(&row, 1)?);
        }

        Ok(months
            .iter()
            .map(|&(year, month)| {
                let label = month_label(year, month);
                MonthlyCount {
                    year,
                    month,
                    count: by_month.get(&label).copied().unwrap_or(0),
                    label,
                }
            })
            .collect())
    }

    async fn top_templates_by(&self, table: &str) -> Result<Vec<TemplateCount>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT t.id, t.name, COUNT(x.id) AS n
                     FROM audit_templates t JOIN {table} x ON x.template_id = t.id
                     GROUP BY t.id, t.name
                     ORDER BY n DESC, t.name
                     LIMIT ?1"
                ),
                [TOP_TEMPLATES],
            )
            .await?;

        let mut top = Vec::new();
        while let Some(row) = rows.next().await? {
            top.push(TemplateCount {
                id: row.get(0)?,
                name: row.get(1)?,
                count: get_u64(&row, 2)?,
            });
        }
        Ok(top)
    }

    /// Totals, status breakdown, monthly trends and most-active templates.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if any aggregate query fails.
    pub async fn dashboard(&self) -> Result<DashboardStats, DatabaseError> {
        let now = self.now();
        let recent = format_datetime(&(now - Duration::days(RECENT_DAYS)));
        let months = trailing_months(now, TREND_MONTHS);
        let _read = self.read().await?;

        let total_storage_bytes = self
            .count("SELECT COALESCE(SUM(file_size), 0) FROM attachments", ())
            .await?;
        let overview = DashboardOverview {
            total_templates: self.count("SELECT COUNT(*) FROM audit_templates", ()).await?,
            total_reports: self.count("SELECT COUNT(*) FROM audit_reports", ()).await?,
            total_comments: self.count("SELECT COUNT(*) FROM template_comments", ()).await?,
            total_attachments: self.count("SELECT COUNT(*) FROM attachments", ()).await?,
            recent_templates_30d: self
                .count(
                    "SELECT COUNT(*) FROM audit_templates WHERE created_at >= ?1",
                    [recent.as_str()],
                )
                .await?,
            recent_reports_30d: self
                .count(
                    "SELECT COUNT(*) FROM audit_reports WHERE created_at >= ?1",
                    [recent.as_str()],
                )
                .await?,
            total_storage_bytes,
            total_storage_mb: bytes_to_mb(total_storage_bytes),
        };

        let mut templates_by_status = StatusCounts::default();
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT status, COUNT(*) FROM audit_templates GROUP BY status",
                (),
            )
            .await?;
        while let Some(row) = rows.next().await? {
            let count = get_u64(&row, 1)?;
            match row.get::<String>(0)?.as_str() {
                "draft" => templates_by_status.draft = count,
                "active" => templates_by_status.active = count,
                "archived" => templates_by_status.archived = count,
                other => tracing::warn!(status = other, "unknown template status in dashboard"),
            }
        }

        Ok(DashboardStats {
            overview,
            templates_by_status,
            trends: DashboardTrends {
                templates_per_month: self.monthly_counts("audit_templates", &months).await?,
                reports_per_month: self.monthly_counts("audit_reports", &months).await?,
            },
            top_templates: TopTemplates {
                most_commented: self.top_templates_by("template_comments").await?,
                most_attachments: self.top_templates_by("attachments").await?,
            },
        })
    }
}
