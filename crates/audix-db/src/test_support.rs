//! Shared test utilities for audix-db unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use crate::AudixDb;
    use crate::blob::BlobStore;
    use crate::service::AudixService;

    /// In-memory service with in-memory blobs and default limits.
    pub async fn test_service() -> AudixService {
        let db = AudixDb::open_local(":memory:").await.unwrap();
        AudixService::from_db(db, BlobStore::in_memory())
    }
}
