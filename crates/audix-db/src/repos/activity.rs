//! Activity log: append inside a unit of work, read newest-first.

use audix_core::activity::{Activity, ActivityEntry};
use audix_core::ids::PREFIX_ACTIVITY;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::helpers::{format_datetime, parse_datetime};
use crate::service::AudixService;

const SELECT_COLS: &str = "id, actor, payload, created_at";

fn row_to_entry(row: &libsql::Row) -> Result<ActivityEntry, DatabaseError> {
    let payload: String = row.get(2)?;
    Ok(ActivityEntry {
        id: row.get(0)?,
        actor: row.get(1)?,
        activity: serde_json::from_str(&payload)?,
        created_at: parse_datetime(&row.get::<String>(3)?)?,
    })
}

impl AudixService {
    /// Append one activity entry. Must run inside the mutation's unit of work.
    pub(crate) async fn record_activity(
        &self,
        actor: &str,
        activity: Activity,
        at: DateTime<Utc>,
    ) -> Result<ActivityEntry, DatabaseError> {
        let id = self.db().generate_id(PREFIX_ACTIVITY).await?;
        let kind = activity.kind();
        let payload = serde_json::to_string(&activity)?;

        self.db()
            .conn()
            .execute(
                "INSERT INTO activity_log (id, kind, subject_id, actor, payload, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                libsql::params![
                    id.as_str(),
                    kind.as_str(),
                    activity.subject_id(),
                    actor,
                    payload,
                    format_datetime(&at)
                ],
            )
            .await?;

        tracing::debug!(%kind, subject = activity.subject_id(), actor, "activity recorded");
        Ok(ActivityEntry {
            id,
            actor: actor.to_string(),
            activity,
            created_at: at,
        })
    }

    /// Most recent activity entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or a payload cannot be decoded.
    pub async fn recent_activity(&self, limit: u32) -> Result<Vec<ActivityEntry>, DatabaseError> {
        let limit = limit.clamp(1, self.limits().max_limit.max(1));
        let _read = self.read().await?;
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM activity_log
                     ORDER BY created_at DESC, id DESC LIMIT ?1"
                ),
                [i64::from(limit)],
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_entry(&row)?);
        }
        Ok(entries)
    }

    /// Every activity recorded about one subject, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or a payload cannot be decoded.
    pub async fn activity_for(&self, subject_id: &str) -> Result<Vec<ActivityEntry>, DatabaseError> {
        let _read = self.read().await?;
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM activity_log
                     WHERE subject_id = ?1 ORDER BY created_at, id"
                ),
                [subject_id],
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_entry(&row)?);
        }
        Ok(entries)
    }
}
