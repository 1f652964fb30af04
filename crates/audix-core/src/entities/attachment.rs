use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::OwnerRef;

/// Metadata for an uploaded file. The bytes live in the blob store under `blob_key`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Attachment {
    pub id: String,
    pub owner: OwnerRef,
    /// Stored file name: the attachment id plus the original extension.
    pub filename: String,
    pub original_filename: String,
    pub blob_key: String,
    pub file_size: u64,
    pub mime_type: String,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}
