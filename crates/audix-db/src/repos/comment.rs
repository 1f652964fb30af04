//! Template comment repository. Comments are not versioned.

use audix_core::activity::Activity;
use audix_core::entities::TemplateComment;
use audix_core::enums::EntityType;
use audix_core::ids::PREFIX_COMMENT;

use crate::error::DatabaseError;
use crate::helpers::{format_datetime, parse_datetime};
use crate::service::AudixService;

const SELECT_COLS: &str = "id, template_id, author, content, created_at";

fn row_to_comment(row: &libsql::Row) -> Result<TemplateComment, DatabaseError> {
    Ok(TemplateComment {
        id: row.get(0)?,
        template_id: row.get(1)?,
        author: row.get(2)?,
        content: row.get(3)?,
        created_at: parse_datetime(&row.get::<String>(4)?)?,
    })
}

impl AudixService {
    /// # Errors
    ///
    /// Returns `Validation` for empty content and `NotFound` for an unknown template.
    pub async fn add_comment(
        &self,
        template_id: &str,
        content: &str,
        author: &str,
    ) -> Result<TemplateComment, DatabaseError> {
        if content.trim().is_empty() {
            return Err(DatabaseError::validation("comment content must not be empty"));
        }
        let unit = self.begin().await?;
        let result = self.insert_comment(template_id, content, author).await;
        unit.finish(result).await
    }

    async fn insert_comment(
        &self,
        template_id: &str,
        content: &str,
        author: &str,
    ) -> Result<TemplateComment, DatabaseError> {
        self.ensure_template_exists(template_id).await?;
        let id = self.db().generate_id(PREFIX_COMMENT).await?;
        let now = self.now();

        self.db()
            .conn()
            .execute(
                &format!("INSERT INTO template_comments ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
                libsql::params![id.as_str(), template_id, author, content, format_datetime(&now)],
            )
            .await?;

        self.record_activity(
            author,
            Activity::CommentAdded {
                template_id: template_id.to_string(),
                comment_id: id.clone(),
            },
            now,
        )
        .await?;

        Ok(TemplateComment {
            id,
            template_id: template_id.to_string(),
            author: author.to_string(),
            content: content.to_string(),
            created_at: now,
        })
    }

    /// Comments on a template, newest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown template.
    pub async fn list_comments(
        &self,
        template_id: &str,
    ) -> Result<Vec<TemplateComment>, DatabaseError> {
        let _read = self.read().await?;
        self.ensure_template_exists(template_id).await?;
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM template_comments
                     WHERE template_id = ?1 ORDER BY created_at DESC, id DESC"
                ),
                [template_id],
            )
            .await?;

        let mut comments = Vec::new();
        while let Some(row) = rows.next().await? {
            comments.push(row_to_comment(&row)?);
        }
        Ok(comments)
    }

    /// # Errors
    ///
    /// Returns `NotFound` unless the comment exists on this template.
    pub async fn delete_comment(
        &self,
        template_id: &str,
        comment_id: &str,
        actor: &str,
    ) -> Result<(), DatabaseError> {
        let unit = self.begin().await?;
        let result = self.remove_comment(template_id, comment_id, actor).await;
        unit.finish(result).await
    }

    async fn remove_comment(
        &self,
        template_id: &str,
        comment_id: &str,
        actor: &str,
    ) -> Result<(), DatabaseError> {
        let removed = self
            .db()
            .conn()
            .execute(
                "DELETE FROM template_comments WHERE id = ?1 AND template_id = ?2",
                [comment_id, template_id],
            )
            .await?;
        if removed == 0 {
            return Err(DatabaseError::not_found(EntityType::Comment, comment_id));
        }

        self.record_activity(
            actor,
            Activity::CommentDeleted {
                template_id: template_id.to_string(),
                comment_id: comment_id.to_string(),
            },
            self.now(),
        )
        .await?;
        Ok(())
    }
}
