//! Service layer orchestrating database mutations with the activity log.
//!
//! `AudixService` wraps `AudixDb` (raw database access), the blob store, the
//! clock and the report renderer. All repo methods are implemented as
//! `impl AudixService` blocks under [`crate::repos`].

use std::sync::Arc;

use audix_config::AudixConfig;
use audix_core::clock::{Clock, SystemClock};
use audix_core::render::{PlainTextRenderer, ReportRenderer};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::AudixDb;
use crate::blob::BlobStore;
use crate::error::DatabaseError;
use crate::guard::{ReadAccess, UnitOfWork};

/// Page-size policy for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for ListLimits {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 500,
        }
    }
}

impl ListLimits {
    /// Apply the default when absent and cap at the maximum. Zero reads as 1.
    #[must_use]
    pub fn resolve(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

/// Orchestrates database mutations with the activity log.
///
/// Every mutation method follows this protocol:
/// 1. Begin a unit of work (gate + `BEGIN IMMEDIATE`)
/// 2. Read and validate current state, compare-and-set the counter
/// 3. Execute SQL
/// 4. Record the activity entry (inside the transaction)
/// 5. Commit, or roll back on any error
///
/// Blob writes happen inside the unit before the metadata insert
/// (content-addressed, so a rolled-back unit leaves at most an unreferenced
/// blob) and blob deletes after commit, still under the gate.
pub struct AudixService {
    db: AudixDb,
    blobs: BlobStore,
    clock: Arc<dyn Clock>,
    renderer: Arc<dyn ReportRenderer>,
    limits: ListLimits,
    gate: Mutex<()>,
}

impl AudixService {
    /// Create a new service wrapping a local database.
    ///
    /// # Arguments
    ///
    /// * `db_path` — Path to the libSQL database file, or `":memory:"` for tests.
    /// * `blobs` — Where attachment bytes are stored.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(db_path: &str, blobs: BlobStore) -> Result<Self, DatabaseError> {
        let db = AudixDb::open_local(db_path).await?;
        Ok(Self::from_db(db, blobs))
    }

    /// Build a service from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database or blob root cannot be opened.
    pub async fn from_config(config: &AudixConfig) -> Result<Self, DatabaseError> {
        if let Some(parent) = config.database.parent_dir() {
            std::fs::create_dir_all(&parent).map_err(|e| {
                DatabaseError::InvalidState(format!(
                    "cannot create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let blobs = if config.storage.in_memory {
            BlobStore::in_memory()
        } else {
            BlobStore::local(&config.storage.root)?
        };
        let limits = ListLimits {
            default_limit: config.general.default_limit,
            max_limit: config.general.max_limit,
        };
        let service = Self::new_local(&config.database.path, blobs)
            .await?
            .with_limits(limits);
        tracing::info!(
            database = %config.database.path,
            blobs = %config.storage.root.display(),
            in_memory = config.storage.in_memory,
            "service ready"
        );
        Ok(service)
    }

    /// Create from an existing `AudixDb` with default clock, renderer and limits.
    #[must_use]
    pub fn from_db(db: AudixDb, blobs: BlobStore) -> Self {
        Self {
            db,
            blobs,
            clock: Arc::new(SystemClock::new()),
            renderer: Arc::new(PlainTextRenderer),
            limits: ListLimits::default(),
            gate: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    #[must_use]
    pub const fn with_limits(mut self, limits: ListLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &AudixDb {
        &self.db
    }

    #[must_use]
    pub const fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    #[must_use]
    pub fn renderer(&self) -> &dyn ReportRenderer {
        self.renderer.as_ref()
    }

    #[must_use]
    pub const fn limits(&self) -> ListLimits {
        self.limits
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Exclusive connection access for a read-only operation.
    pub(crate) async fn read(&self) -> Result<ReadAccess<'_>, DatabaseError> {
        ReadAccess::acquire(self.db.conn(), &self.gate).await
    }

    /// Open a unit of work for a mutation.
    pub(crate) async fn begin(&self) -> Result<UnitOfWork<'_>, DatabaseError> {
        UnitOfWork::begin(self.db.conn(), &self.gate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_resolve() {
        let limits = ListLimits {
            default_limit: 100,
            max_limit: 250,
        };
        assert_eq!(limits.resolve(None), 100);
        assert_eq!(limits.resolve(Some(10)), 10);
        assert_eq!(limits.resolve(Some(1000)), 250);
        assert_eq!(limits.resolve(Some(0)), 1);
    }

    #[tokio::test]
    async fn from_config_opens_on_disk_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AudixConfig::default();
        config.database.path = dir
            .path()
            .join("nested")
            .join("audix.db")
            .to_string_lossy()
            .into_owned();
        config.storage.root = dir.path().join("blobs");

        let svc = AudixService::from_config(&config).await.unwrap();
        assert_eq!(svc.limits().default_limit, config.general.default_limit);
        assert!(dir.path().join("nested").join("audix.db").exists());
        assert!(dir.path().join("blobs").is_dir());
    }
}
