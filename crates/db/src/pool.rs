//! Connection pool management.
//!
//! [`Database`] wraps an r2d2 connection pool for SQLite. The pool allows
//! multiple independent readers while keeping connection lifecycle out of
//! caller code; a connection is returned to the pool when dropped.
//!
//! Atomic multi-statement writes go through [`Database::transaction`], which
//! commits when the closure succeeds and rolls back when it fails. This is
//! the primitive the ledger root uses to apply a whole child delta as one
//! store transaction.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::error::DbError;
use crate::schema;

/// A pooled SQLite connection, returned to the pool on drop.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database handle with connection pooling.
///
/// Cloning is cheap; all clones share the same pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Opens (creating if necessary) a database at the given path and
    /// ensures the schema exists.
    pub fn open(path: &str) -> Result<Self, DbError> {
        let manager = SqliteConnectionManager::file(path);
        Self::from_manager(manager)
    }

    /// Opens an in-memory database, mainly for tests.
    ///
    /// The pool is restricted to a single connection so every handle sees
    /// the same in-memory store.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        let db = Self { pool };
        db.initialize_schema()?;
        Ok(db)
    }

    fn from_manager(manager: SqliteConnectionManager) -> Result<Self, DbError> {
        let pool = Pool::builder().build(manager)?;
        let db = Self { pool };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<(), DbError> {
        self.with_connection(|conn| {
            conn.execute_batch(schema::CREATE_SCHEMA)?;
            let version = schema::SCHEMA_VERSION.to_string();
            conn.execute(
                "INSERT OR IGNORE INTO storestate (statename, state) VALUES (?1, ?2)",
                [schema::state_keys::DATABASE_SCHEMA, version.as_str()],
            )?;
            Ok(())
        })
    }

    /// Obtains a connection from the pool.
    pub fn connection(&self) -> Result<PooledConnection, DbError> {
        self.pool.get().map_err(DbError::from)
    }

    /// Executes a closure with a database connection.
    ///
    /// Use for reads or single-statement writes that need no explicit
    /// transaction handling.
    pub fn with_connection<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, DbError>,
    {
        let conn = self.connection()?;
        f(&conn)
    }

    /// Executes a closure within a database transaction.
    ///
    /// If the closure returns `Ok`, the transaction is committed; on `Err`
    /// it is rolled back and the error propagated.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T, DbError>,
    {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// Reads a value from the `storestate` key/value table.
    pub fn get_state(&self, key: &str) -> Result<Option<String>, DbError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT state FROM storestate WHERE statename = ?1")?;
            let mut rows = stmt.query([key])?;
            match rows.next()? {
                Some(row) => Ok(Some(row.get(0)?)),
                None => Ok(None),
            }
        })
    }

    /// Writes a value into the `storestate` key/value table.
    pub fn set_state(&self, key: &str, value: &str) -> Result<(), DbError> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO storestate (statename, state) VALUES (?1, ?2) \
                 ON CONFLICT(statename) DO UPDATE SET state = excluded.state",
                [key, value],
            )?;
            Ok(())
        })
    }
}
