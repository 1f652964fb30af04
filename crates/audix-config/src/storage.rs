//! Attachment blob storage.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_root() -> PathBuf {
    PathBuf::from(".audix/blobs")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding blob files.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Keep blobs in memory instead (lost on restart).
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            in_memory: false,
        }
    }
}
