//! Error types for operation processing.

use thiserror::Error;

/// Errors that can occur while validating or applying operations.
///
/// Data-driven rejections (bad signature, missing account, unsupported
/// version) are not errors; they surface as
/// [`OperationResultCode`](crate::OperationResultCode) values on the frame.
#[derive(Debug, Error)]
pub enum TxError {
    /// Ledger transaction failure.
    #[error("ledger error: {0}")]
    Ledger(#[from] strata_ledger::LedgerError),

    /// An operation failed while applying its changes.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}
