//! Operation-frame contract over the strata ledger overlay.
//!
//! This crate is the seam between the ledger overlay and the block-apply
//! driver. It provides:
//!
//! - [`OperationFrame`]: drives one operation through `check_valid` (which
//!   never modifies the ledger — it works in a nested transaction that is
//!   always rolled back) and `apply`.
//! - [`OperationHandler`]: the operation-specific plug-in point —
//!   threshold level, version support, well-formedness, and mutations.
//! - [`SignatureChecker`]: the external signature-verification seam, plus
//!   signer-key constructors for pre-authorized transactions and hash-x
//!   preimages.
//! - [`OperationResultCode`]: the frame-level result codes observable to
//!   callers.

mod error;
mod frame;
mod result;
pub mod signature_checker;

pub use error::TxError;
pub use frame::{OperationFrame, OperationHandler, FRAME_DRIVEN_SIGNATURES_VERSION};
pub use result::{OperationResultCode, ThresholdLevel};
pub use signature_checker::{hash_x_key, pre_auth_tx_key, SignatureChecker};

/// Result type for operation processing.
pub type Result<T> = std::result::Result<T, TxError>;
