//! Signature checking seam and signer-key construction.
//!
//! Signature verification itself is an external collaborator; the frame
//! only needs the [`SignatureChecker`] trait. Concrete checkers accumulate
//! signer weights against a transaction's signatures until a threshold is
//! met.

use sha2::{Digest, Sha256};
use strata_common::{AccountEntry, AccountId, SignerKey};

/// Verifies that a transaction's signatures carry enough weight for an
/// operation.
pub trait SignatureChecker {
    /// True if the signatures meet `needed_weight` against the account's
    /// master key and signers.
    fn check_signature(&mut self, account: &AccountEntry, needed_weight: u8) -> bool;

    /// True if the signatures authorize an operation for a source account
    /// that does not exist on the ledger (only possible during pre-apply
    /// validation).
    fn check_signature_no_account(&mut self, source: &AccountId) -> bool;
}

/// Builds the signer key matching a pre-authorized transaction hash.
pub fn pre_auth_tx_key(tx_hash: &[u8; 32]) -> SignerKey {
    SignerKey::PreAuthTx(*tx_hash)
}

/// Builds a hash-x signer key from its preimage.
pub fn hash_x_key(preimage: &[u8]) -> SignerKey {
    let digest = Sha256::digest(preimage);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    SignerKey::HashX(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_auth_tx_key_carries_hash() {
        let hash = [9u8; 32];
        assert_eq!(pre_auth_tx_key(&hash), SignerKey::PreAuthTx(hash));
    }

    #[test]
    fn test_hash_x_key_hashes_preimage() {
        let a = hash_x_key(b"preimage");
        let b = hash_x_key(b"preimage");
        let c = hash_x_key(b"other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        // SHA-256 of the empty string, well-known vector.
        let SignerKey::HashX(empty) = hash_x_key(b"") else {
            panic!("wrong variant");
        };
        assert_eq!(
            empty[..4],
            [0xe3, 0xb0, 0xc4, 0x42],
        );
    }
}
