//! Error types for value-type parsing.

use thiserror::Error;

/// Errors that can occur when parsing keys and assets from their
/// string encodings.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The string is not a valid StrKey (bad base32, wrong version byte,
    /// wrong length, or checksum mismatch).
    #[error("invalid StrKey: {0}")]
    InvalidStrKey(String),

    /// The string is not a valid canonical asset encoding.
    #[error("invalid asset: {0}")]
    InvalidAsset(String),
}
