//! Nested transactional overlay over the strata ledger store.
//!
//! This crate provides the abstraction block-validation logic uses to stage
//! tentative ledger mutations, compose them hierarchically, and either
//! commit them atomically into the parent layer or discard them.
//!
//! # Architecture Overview
//!
//! - [`LedgerTxn`]: a nested overlay holding a per-key delta over its
//!   parent. Reads resolve against the delta first, then recursively
//!   against the parent; commit folds the delta into the parent.
//! - [`LedgerTxnRoot`]: the concrete parent bound to the SQL store, with
//!   bounded caches for entry lookups and best-offer lists.
//! - [`LedgerTxnEntry`] / [`LedgerTxnHeader`]: activation handles returned
//!   by load and create. A key with a live handle is exclusively borrowed
//!   within its layer.
//! - [`LedgerTxnDelta`]: the observable change of one layer, a map of
//!   `(current, previous)` pairs plus the header pair.
//!
//! # Example
//!
//! ```ignore
//! use strata_ledger::{LedgerTxn, LedgerTxnRoot, RootConfig};
//!
//! let root = LedgerTxnRoot::open(db, RootConfig::default())?;
//! let ltx = LedgerTxn::open(&root)?;
//! {
//!     let child = LedgerTxn::open(&ltx)?;
//!     child.create(entry)?;
//!     child.commit()?;           // folds into ltx
//! }
//! ltx.commit()?;                 // applies to the store atomically
//! ```
//!
//! # Concurrency
//!
//! A transaction tree is single-threaded and cooperative: a parent is
//! frozen while its sole active child exists, and handles are exclusive
//! per key, so no entry can be mutated through two paths at once. The root
//! may serve successive trees but never more than one at a time.

mod cache;
mod delta;
mod entry;
mod error;
mod root;
mod store;
mod txn;

pub use delta::{EntryDelta, HeaderDelta, LedgerTxnDelta};
pub use entry::{ConstLedgerTxnEntry, LedgerTxnEntry, LedgerTxnHeader};
pub use error::LedgerError;
pub use root::{LedgerTxnRoot, RootConfig};
pub use txn::{AbstractLedgerTxnParent, LedgerTxn, MINIMUM_VOTE_BALANCE};

/// Result type for ledger transaction operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
