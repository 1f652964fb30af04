//! Attachment repository: metadata rows plus content-addressed blobs.
//!
//! Blob writes happen inside the uploading unit of work, before the metadata
//! insert, so a rolled-back upload leaves at most an unreferenced blob. Blob
//! deletes happen after the deleting unit commits, and only for keys no
//! remaining attachment references. Both run under the service gate.

use std::collections::BTreeSet;
use std::path::Path;

use audix_core::activity::Activity;
use audix_core::entities::{Attachment, OwnerRef};
use audix_core::enums::{EntityType, OwnerKind};
use audix_core::ids::PREFIX_ATTACHMENT;

use crate::error::DatabaseError;
use crate::helpers::{format_datetime, get_opt_string, get_u64, parse_datetime};
use crate::service::AudixService;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const SELECT_COLS: &str = "id, template_id, report_id, filename, original_filename, blob_key, \
                           file_size, mime_type, uploaded_by, created_at";

fn row_to_attachment(row: &libsql::Row) -> Result<Attachment, DatabaseError> {
    let id: String = row.get(0)?;
    let owner = OwnerRef::from_columns(get_opt_string(row, 1)?, get_opt_string(row, 2)?)
        .ok_or_else(|| DatabaseError::InvalidState(format!("attachment {id} has no single owner")))?;
    Ok(Attachment {
        id,
        owner,
        filename: row.get(3)?,
        original_filename: row.get(4)?,
        blob_key: row.get(5)?,
        file_size: get_u64(row, 6)?,
        mime_type: row.get(7)?,
        uploaded_by: row.get(8)?,
        created_at: parse_datetime(&row.get::<String>(9)?)?,
    })
}

const fn owner_column(kind: OwnerKind) -> &'static str {
    match kind {
        OwnerKind::Template => "template_id",
        OwnerKind::Report => "report_id",
    }
}

/// Last path component of a client-supplied name.
fn sanitize_filename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name).trim()
}

/// Stored name: the attachment id plus the original extension, if any.
fn stored_filename(id: &str, original: &str) -> String {
    match Path::new(original).extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{id}.{ext}"),
        _ => id.to_string(),
    }
}

impl AudixService {
    pub(crate) async fn ensure_owner_exists(&self, owner: &OwnerRef) -> Result<(), DatabaseError> {
        match owner.kind {
            OwnerKind::Template => self.ensure_template_exists(&owner.id).await,
            OwnerKind::Report => self.ensure_report_exists(&owner.id).await,
        }
    }

    /// Store `bytes` and attach them to `owner`.
    ///
    /// # Errors
    ///
    /// - `Validation` if the filename is empty.
    /// - `NotFound` if the owner does not exist.
    /// - A storage error if the blob cannot be written.
    pub async fn upload_attachment(
        &self,
        owner: &OwnerRef,
        original_filename: &str,
        mime_type: Option<&str>,
        bytes: Vec<u8>,
        actor: &str,
    ) -> Result<Attachment, DatabaseError> {
        let original = sanitize_filename(original_filename);
        if original.is_empty() {
            return Err(DatabaseError::validation("attachment filename must not be empty"));
        }
        let mime_type = mime_type
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE);

        let unit = self.begin().await?;
        let result = self
            .insert_attachment(owner, original, mime_type, bytes, actor)
            .await;
        let attachment = unit.finish(result).await?;
        tracing::info!(
            attachment_id = %attachment.id,
            owner = %owner.id,
            size = attachment.file_size,
            "attachment uploaded"
        );
        Ok(attachment)
    }

    async fn insert_attachment(
        &self,
        owner: &OwnerRef,
        original_filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
        actor: &str,
    ) -> Result<Attachment, DatabaseError> {
        self.ensure_owner_exists(owner).await?;
        let file_size = bytes.len() as u64;
        let blob_key = self.blobs().store(bytes).await?;

        let id = self.db().generate_id(PREFIX_ATTACHMENT).await?;
        let filename = stored_filename(&id, original_filename);
        let now = self.now();
        let (template_id, report_id) = owner.columns();
        let size = i64::try_from(file_size)
            .map_err(|_| DatabaseError::validation("attachment is too large"))?;

        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO attachments ({SELECT_COLS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                libsql::params![
                    id.as_str(),
                    template_id,
                    report_id,
                    filename.as_str(),
                    original_filename,
                    blob_key.as_str(),
                    size,
                    mime_type,
                    actor,
                    format_datetime(&now)
                ],
            )
            .await?;

        self.record_activity(
            actor,
            Activity::AttachmentAdded {
                owner: owner.clone(),
                attachment_id: id.clone(),
                original_filename: original_filename.to_string(),
                file_size,
            },
            now,
        )
        .await?;

        Ok(Attachment {
            id,
            owner: owner.clone(),
            filename,
            original_filename: original_filename.to_string(),
            blob_key,
            file_size,
            mime_type: mime_type.to_string(),
            uploaded_by: actor.to_string(),
            created_at: now,
        })
    }

    async fn fetch_attachment(
        &self,
        owner: &OwnerRef,
        attachment_id: &str,
    ) -> Result<Attachment, DatabaseError> {
        let column = owner_column(owner.kind);
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM attachments WHERE id = ?1 AND {column} = ?2"),
                [attachment_id, owner.id.as_str()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => row_to_attachment(&row),
            None => Err(DatabaseError::not_found(EntityType::Attachment, attachment_id)),
        }
    }

    /// Attachments of one owner, newest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the owner does not exist.
    pub async fn list_attachments(
        &self,
        owner: &OwnerRef,
    ) -> Result<Vec<Attachment>, DatabaseError> {
        let _read = self.read().await?;
        self.ensure_owner_exists(owner).await?;
        let column = owner_column(owner.kind);
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM attachments WHERE {column} = ?1
                     ORDER BY created_at DESC, id DESC"
                ),
                [owner.id.as_str()],
            )
            .await?;

        let mut attachments = Vec::new();
        while let Some(row) = rows.next().await? {
            attachments.push(row_to_attachment(&row)?);
        }
        Ok(attachments)
    }

    /// # Errors
    ///
    /// Returns `NotFound` unless the attachment belongs to `owner`.
    pub async fn get_attachment(
        &self,
        owner: &OwnerRef,
        attachment_id: &str,
    ) -> Result<Attachment, DatabaseError> {
        let _read = self.read().await?;
        self.fetch_attachment(owner, attachment_id).await
    }

    /// Metadata and bytes of one attachment.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` unless the attachment belongs to `owner`, or a storage
    /// error if the blob cannot be read.
    pub async fn download_attachment(
        &self,
        owner: &OwnerRef,
        attachment_id: &str,
    ) -> Result<(Attachment, Vec<u8>), DatabaseError> {
        let _read = self.read().await?;
        let attachment = self.fetch_attachment(owner, attachment_id).await?;
        let bytes = self.blobs().fetch(&attachment.blob_key).await?;
        Ok((attachment, bytes))
    }

    /// # Errors
    ///
    /// Returns `NotFound` unless the attachment belongs to `owner`.
    pub async fn delete_attachment(
        &self,
        owner: &OwnerRef,
        attachment_id: &str,
        actor: &str,
    ) -> Result<(), DatabaseError> {
        let unit = self.begin().await?;
        let result = self.remove_attachment(owner, attachment_id, actor).await;
        let blob_key = unit.finish(result).await?;
        tracing::info!(attachment_id, owner = %owner.id, "attachment deleted");
        self.release_blobs(vec![blob_key]).await;
        Ok(())
    }

    async fn remove_attachment(
        &self,
        owner: &OwnerRef,
        attachment_id: &str,
        actor: &str,
    ) -> Result<String, DatabaseError> {
        let attachment = self.fetch_attachment(owner, attachment_id).await?;
        self.db()
            .conn()
            .execute("DELETE FROM attachments WHERE id = ?1", [attachment_id])
            .await?;
        self.record_activity(
            actor,
            Activity::AttachmentDeleted {
                owner: owner.clone(),
                attachment_id: attachment_id.to_string(),
            },
            self.now(),
        )
        .await?;
        Ok(attachment.blob_key)
    }

    /// Delete every attachment row of `owner` and return their blob keys.
    pub(crate) async fn remove_owner_attachments(
        &self,
        owner: &OwnerRef,
    ) -> Result<Vec<String>, DatabaseError> {
        let column = owner_column(owner.kind);
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT blob_key FROM attachments WHERE {column} = ?1"),
                [owner.id.as_str()],
            )
            .await?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next().await? {
            keys.push(row.get::<String>(0)?);
        }

        self.db()
            .conn()
            .execute(
                &format!("DELETE FROM attachments WHERE {column} = ?1"),
                [owner.id.as_str()],
            )
            .await?;
        Ok(keys)
    }

    /// Delete the blobs behind `keys` that no attachment references any more.
    ///
    /// Runs after the owning unit committed. Failures are logged, not returned:
    /// the metadata change already happened and a leftover blob is harmless.
    pub(crate) async fn release_blobs(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }
        let keys: BTreeSet<String> = keys.into_iter().collect();
        let _read = match self.read().await {
            Ok(read) => read,
            Err(e) => {
                tracing::warn!(error = %e, "skipping blob cleanup");
                return;
            }
        };

        for key in keys {
            match self.blob_references(&key).await {
                Ok(0) => {
                    if let Err(e) = self.blobs().delete(&key).await {
                        tracing::warn!(%key, error = %e, "blob delete failed");
                    }
                }
                Ok(refs) => tracing::debug!(%key, refs, "blob still referenced"),
                Err(e) => tracing::warn!(%key, error = %e, "blob reference count failed"),
            }
        }
    }

    async fn blob_references(&self, key: &str) -> Result<u64, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query("SELECT COUNT(*) FROM attachments WHERE blob_key = ?1", [key])
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        get_u64(&row, 0)
    }
}
