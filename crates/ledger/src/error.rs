//! Error types for ledger transaction operations.

use strata_common::LedgerKey;
use thiserror::Error;

/// Errors that can occur while operating a ledger transaction tree.
///
/// Variants up to [`LedgerError::HandlesActive`] are misuse: a caller broke
/// the transaction-tree protocol. Misuse aborts the offending call but
/// leaves the parent layer usable; the misused child can still be rolled
/// back. [`LedgerError::Store`] is a recoverable backing-store failure.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Attempted to open a second active child under one parent.
    #[error("parent already has an active child")]
    ChildAlreadyActive,

    /// A mutating, loading, or query call on a layer with an active child.
    #[error("operation not permitted while a child is active")]
    HasActiveChild,

    /// A mutating, loading, or query call on a sealed layer.
    #[error("transaction is sealed")]
    Sealed,

    /// `unseal_header` on a layer that has not been sealed.
    #[error("transaction is not sealed")]
    NotSealed,

    /// `create` for a key that is visible as present.
    #[error("entry already exists: {0:?}")]
    EntryExists(LedgerKey),

    /// `erase` for a key that is not visible as present.
    #[error("entry does not exist: {0:?}")]
    EntryNotFound(LedgerKey),

    /// A load or erase for a key that already has a live handle.
    #[error("entry has a live handle: {0:?}")]
    EntryActive(LedgerKey),

    /// `load_header` while a header handle is live, or reentrant
    /// `unseal_header`.
    #[error("header is already active")]
    HeaderActive,

    /// Sealing while entry or header handles are still live.
    #[error("cannot seal with live handles")]
    HandlesActive,

    /// The backing store rejected an operation.
    #[error("store error: {0}")]
    Store(#[from] strata_db::DbError),

    /// A stored or merged value violated an internal invariant.
    #[error("internal error: {0}")]
    Internal(String),
}
