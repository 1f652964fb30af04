//! Concurrency guard: units of work and optimistic compare-and-set.
//!
//! The service owns one libSQL connection. An async gate serializes access to
//! it; a [`UnitOfWork`] holds the gate for the whole `BEGIN IMMEDIATE` …
//! `COMMIT` span, so reads, validation and writes of one mutation can never
//! interleave with another.
//!
//! A unit whose future is dropped before `commit` leaves its transaction open.
//! The next caller through the gate sees the connection outside autocommit and
//! rolls the abandoned transaction back before doing anything else, so partial
//! writes are never observed and never committed.
//!
//! Lost updates across request boundaries are prevented by compare-and-set on
//! the entity's counter (`audit_templates.version`, `checklists.revision`).

use audix_core::enums::EntityType;
use audix_core::errors::CoreError;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::DatabaseError;
use crate::helpers::{entity_type_to_table, get_u32};

/// Exclusive access to the connection outside a transaction (reads).
pub struct ReadAccess<'a> {
    _permit: MutexGuard<'a, ()>,
}

/// Exclusive access to the connection inside an open transaction.
pub struct UnitOfWork<'a> {
    conn: &'a libsql::Connection,
    _permit: MutexGuard<'a, ()>,
}

/// Acquire the gate and discard any transaction an abandoned unit left open.
async fn enter<'a>(
    conn: &'a libsql::Connection,
    gate: &'a Mutex<()>,
) -> Result<MutexGuard<'a, ()>, DatabaseError> {
    let permit = gate.lock().await;
    if !conn.is_autocommit() {
        tracing::warn!("rolling back transaction left open by an abandoned request");
        conn.execute("ROLLBACK", ()).await?;
    }
    Ok(permit)
}

impl<'a> ReadAccess<'a> {
    pub(crate) async fn acquire(
        conn: &'a libsql::Connection,
        gate: &'a Mutex<()>,
    ) -> Result<Self, DatabaseError> {
        Ok(Self {
            _permit: enter(conn, gate).await?,
        })
    }
}

impl<'a> UnitOfWork<'a> {
    pub(crate) async fn begin(
        conn: &'a libsql::Connection,
        gate: &'a Mutex<()>,
    ) -> Result<Self, DatabaseError> {
        let permit = enter(conn, gate).await?;
        conn.execute("BEGIN IMMEDIATE", ()).await?;
        Ok(Self {
            conn,
            _permit: permit,
        })
    }

    /// Commit on `Ok`, roll back on `Err`, and pass the result through.
    pub(crate) async fn finish<T>(
        self,
        result: Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        match result {
            Ok(value) => {
                self.conn.execute("COMMIT", ()).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.conn.execute("ROLLBACK", ()).await {
                    tracing::error!(%rollback, "rollback failed; next unit will retry it");
                }
                Err(err)
            }
        }
    }
}

/// Fail with `Conflict` unless the caller observed the current counter value.
///
/// # Errors
///
/// Returns [`CoreError::Conflict`] on mismatch.
pub fn check_version(
    entity_type: EntityType,
    id: &str,
    expected: u32,
    actual: u32,
) -> Result<(), CoreError> {
    if expected == actual {
        return Ok(());
    }
    Err(CoreError::Conflict {
        entity_type: entity_type.to_string(),
        id: id.to_string(),
        expected,
        actual,
    })
}

/// Atomically bump `counter` on one row if it still equals `expected`.
///
/// Also stamps `updated_at`. Returns the new counter value. Must run inside a
/// [`UnitOfWork`].
///
/// # Errors
///
/// - `NotFound` when the row does not exist.
/// - `Conflict` when the row exists with a different counter.
pub(crate) async fn compare_and_bump(
    conn: &libsql::Connection,
    entity_type: EntityType,
    counter: &str,
    id: &str,
    expected: u32,
    updated_at: &str,
) -> Result<u32, DatabaseError> {
    let table = entity_type_to_table(entity_type);
    let changed = conn
        .execute(
            &format!(
                "UPDATE {table} SET {counter} = {counter} + 1, updated_at = ?1
                 WHERE id = ?2 AND {counter} = ?3"
            ),
            libsql::params![updated_at, id, i64::from(expected)],
        )
        .await?;

    if changed == 1 {
        return Ok(expected + 1);
    }

    let mut rows = conn
        .query(&format!("SELECT {counter} FROM {table} WHERE id = ?1"), [id])
        .await?;
    match rows.next().await? {
        None => Err(DatabaseError::not_found(entity_type, id)),
        Some(row) => {
            let actual = get_u32(&row, 0)?;
            check_version(entity_type, id, expected, actual)?;
            // Same counter but no row changed: only possible if the table lost
            // its updated_at column or the id matched twice.
            Err(DatabaseError::InvalidState(format!(
                "compare-and-set on {table} {id} changed {changed} rows"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AudixDb;

    async fn seeded() -> AudixDb {
        let db = AudixDb::open_local(":memory:").await.unwrap();
        db.conn()
            .execute(
                "INSERT INTO checklists (id, name, created_by, revision, created_at, updated_at)
                 VALUES ('chk-1', 'c', 'alice', 3, 't0', 't0')",
                (),
            )
            .await
            .unwrap();
        db
    }

    #[test]
    fn check_version_reports_both_sides() {
        let err = check_version(EntityType::Template, "tpl-1", 2, 5).unwrap_err();
        match err {
            CoreError::Conflict {
                expected, actual, ..
            } => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 5);
            }
            other => panic!("expected conflict, got {other}"),
        }
        check_version(EntityType::Template, "tpl-1", 5, 5).unwrap();
    }

    #[tokio::test]
    async fn bump_succeeds_on_match() {
        let db = seeded().await;
        let next = compare_and_bump(db.conn(), EntityType::Checklist, "revision", "chk-1", 3, "t1")
            .await
            .unwrap();
        assert_eq!(next, 4);
    }

    #[tokio::test]
    async fn bump_conflicts_on_stale_counter() {
        let db = seeded().await;
        let err = compare_and_bump(db.conn(), EntityType::Checklist, "revision", "chk-1", 2, "t1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::Core(CoreError::Conflict { actual: 3, .. })
        ));
    }

    #[tokio::test]
    async fn bump_reports_missing_row() {
        let db = seeded().await;
        let err = compare_and_bump(db.conn(), EntityType::Checklist, "revision", "chk-404", 1, "t1")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn failed_unit_rolls_back() {
        let db = seeded().await;
        let gate = Mutex::new(());

        let unit = UnitOfWork::begin(db.conn(), &gate).await.unwrap();
        db.conn()
            .execute("UPDATE checklists SET name = 'changed' WHERE id = 'chk-1'", ())
            .await
            .unwrap();
        let result: Result<(), DatabaseError> = unit
            .finish(Err(DatabaseError::validation("abort")))
            .await;
        assert!(result.is_err());

        let mut rows = db
            .conn()
            .query("SELECT name FROM checklists WHERE id = 'chk-1'", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(0).unwrap(), "c");
    }

    #[tokio::test]
    async fn abandoned_unit_is_rolled_back_by_next_caller() {
        let db = seeded().await;
        let gate = Mutex::new(());

        {
            let unit = UnitOfWork::begin(db.conn(), &gate).await.unwrap();
            db.conn()
                .execute("UPDATE checklists SET name = 'half-done' WHERE id = 'chk-1'", ())
                .await
                .unwrap();
            drop(unit);
        }
        assert!(!db.conn().is_autocommit());

        let _read = ReadAccess::acquire(db.conn(), &gate).await.unwrap();
        assert!(db.conn().is_autocommit());
        let mut rows = db
            .conn()
            .query("SELECT name FROM checklists WHERE id = 'chk-1'", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(0).unwrap(), "c");
    }
}
