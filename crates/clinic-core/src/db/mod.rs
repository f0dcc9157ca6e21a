//! Database layer for the clinic core.

mod schema;
mod billing;
mod dispensing;
mod drugs;
mod patients;
mod prescriptions;
mod sequence;
mod staff;
mod visits;

pub use schema::*;
#[allow(unused_imports)]
pub use billing::*;
#[allow(unused_imports)]
pub use dispensing::*;
#[allow(unused_imports)]
pub use drugs::*;
#[allow(unused_imports)]
pub use patients::*;
#[allow(unused_imports)]
pub use prescriptions::*;
#[allow(unused_imports)]
pub use staff::*;
#[allow(unused_imports)]
pub use visits::*;

use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stored amount is not a valid decimal: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Which persistence-level constraint a storage error maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Duplicate value on a UNIQUE column (generated identifiers, mostly)
    Unique,
    /// Referenced row missing
    ForeignKey,
    /// Required column missing
    NotNull,
    /// CHECK constraint failed
    Check,
    /// Some other constraint
    Other,
}

impl DbError {
    /// Classify a constraint violation surfaced by the storage engine, if
    /// this error is one.
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            DbError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Some(match e.extended_code {
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => ConstraintKind::Unique,
                    rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintKind::ForeignKey,
                    rusqlite::ffi::SQLITE_CONSTRAINT_NOTNULL => ConstraintKind::NotNull,
                    rusqlite::ffi::SQLITE_CONSTRAINT_CHECK => ConstraintKind::Check,
                    _ => ConstraintKind::Other,
                })
            }
            _ => None,
        }
    }
}

/// Errors that may succeed when the enclosing transaction is re-run.
///
/// Busy/locked means another writer held the database. A UNIQUE conflict is
/// the optimistic identifier generator losing a race: re-running the
/// transaction regenerates a fresh number, so it is retryable too.
pub trait TransientError {
    fn is_transient(&self) -> bool;
}

impl TransientError for DbError {
    fn is_transient(&self) -> bool {
        if let DbError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) = self {
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) {
                return true;
            }
        }
        self.constraint_kind() == Some(ConstraintKind::Unique)
    }
}

/// Maximum attempts for one `run_in_transaction` call.
const MAX_TXN_ATTEMPTS: u32 = 3;
/// Base delay between attempts; grows linearly with the attempt number.
const TXN_RETRY_DELAY: Duration = Duration::from_millis(25);

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `op` inside a transaction, retrying the whole closure on
    /// transient failure.
    ///
    /// `BEGIN IMMEDIATE` takes the write lock up front, so read-then-write
    /// sequences inside (the stock check + decrement) are serialized
    /// against all other writers. On any error the transaction rolls back
    /// fully; transient errors (busy/locked, UNIQUE conflicts from
    /// optimistic identifier generation) re-run the closure up to
    /// `MAX_TXN_ATTEMPTS` times with linear backoff. The closure must be
    /// safe to re-run from scratch.
    ///
    /// Not reentrant: do not call it from within `op`.
    pub fn run_in_transaction<T, E, F>(&self, op: F) -> Result<T, E>
    where
        E: From<DbError> + TransientError,
        F: Fn(&Database) -> Result<T, E>,
    {
        let mut attempt = 1u32;
        loop {
            match self.attempt_transaction(&op) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < MAX_TXN_ATTEMPTS => {
                    std::thread::sleep(TXN_RETRY_DELAY * attempt);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn attempt_transaction<T, E, F>(&self, op: &F) -> Result<T, E>
    where
        E: From<DbError>,
        F: Fn(&Database) -> Result<T, E>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| E::from(DbError::from(e)))?;

        match op(self) {
            Ok(value) => match self.conn.execute_batch("COMMIT") {
                Ok(()) => Ok(value),
                Err(e) => {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    Err(E::from(DbError::from(e)))
                }
            },
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"patients".to_string()));
        assert!(tables.contains(&"staff".to_string()));
        assert!(tables.contains(&"visits".to_string()));
        assert!(tables.contains(&"drugs".to_string()));
        assert!(tables.contains(&"prescriptions".to_string()));
        assert!(tables.contains(&"prescription_items".to_string()));
        assert!(tables.contains(&"dispensings".to_string()));
        assert!(tables.contains(&"stock_adjustments".to_string()));
        assert!(tables.contains(&"billings".to_string()));
    }

    #[test]
    fn test_open_file_backed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");
        {
            let db = Database::open(&path).unwrap();
            db.conn()
                .execute(
                    "INSERT INTO drugs (code, name, unit, unit_price) VALUES ('X', 'X', 'unit', '0')",
                    [],
                )
                .unwrap();
        }
        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM drugs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_transaction_commits() {
        let db = Database::open_in_memory().unwrap();
        db.run_in_transaction::<_, DbError, _>(|db| {
            db.conn().execute(
                "INSERT INTO drugs (code, name, unit, unit_price) VALUES ('X', 'X', 'unit', '0')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM drugs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result = db.run_in_transaction::<(), DbError, _>(|db| {
            db.conn().execute(
                "INSERT INTO drugs (code, name, unit, unit_price) VALUES ('X', 'X', 'unit', '0')",
                [],
            )?;
            Err(DbError::NotFound("forced failure".into()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM drugs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_not_found_is_not_transient() {
        assert!(!DbError::NotFound("x".into()).is_transient());
        assert!(!DbError::Constraint("x".into()).is_transient());
    }

    #[test]
    fn test_unique_violation_classified_and_transient() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO staff (staff_id, employee_number, full_name, role) VALUES ('a', 'EMP-0001', 'A', 'doctor')",
                [],
            )
            .unwrap();
        let err: DbError = db
            .conn()
            .execute(
                "INSERT INTO staff (staff_id, employee_number, full_name, role) VALUES ('b', 'EMP-0001', 'B', 'doctor')",
                [],
            )
            .unwrap_err()
            .into();
        assert_eq!(err.constraint_kind(), Some(ConstraintKind::Unique));
        assert!(err.is_transient());
    }
}
