//! SQLite persistence for strata.
//!
//! This crate provides the storage infrastructure the ledger root sits on:
//! a pooled [`Database`] handle, the table [`schema`], and the shared
//! [`DbError`] type. Row mapping for ledger entries lives next to the
//! ledger root in `strata-ledger`; this crate stays agnostic of the entry
//! model.
//!
//! # Example
//!
//! ```no_run
//! use strata_db::Database;
//!
//! let db = Database::open("strata.db")?;
//! db.transaction(|tx| {
//!     tx.execute("DELETE FROM offers WHERE amount <= 0", [])?;
//!     Ok(())
//! })?;
//! # Ok::<(), strata_db::DbError>(())
//! ```

mod error;
mod pool;
pub mod schema;

pub use error::DbError;
pub use pool::{Database, PooledConnection};

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DbError>;
