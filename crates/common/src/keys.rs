//! Account identifiers and StrKey encoding.
//!
//! StrKey is the human-readable key encoding used throughout the ledger:
//! RFC 4648 base32 of a version byte, the raw key bytes, and a CRC16-XModem
//! checksum, with no padding. Account IDs encode with a `G` prefix.
//!
//! The string form matters beyond display: inflation-winner tie-breaking is
//! defined over the StrKey form, and the SQL store keys account rows by it.

use serde::{Deserialize, Serialize};

use crate::error::KeyError;

/// Version byte for account IDs (produces a 'G' prefix).
///
/// Computed as (character_index << 3) where character_index is the position
/// in the base32 alphabet that produces the desired prefix letter.
const VERSION_ACCOUNT_ID: u8 = 6 << 3;

/// A ledger account identifier: a raw 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// Encode as a StrKey account ID (`G...`).
    pub fn to_strkey(&self) -> String {
        encode_check(VERSION_ACCOUNT_ID, &self.0)
    }

    /// Decode from a StrKey account ID (`G...`).
    pub fn from_strkey(s: &str) -> Result<Self, KeyError> {
        let data = decode_check(VERSION_ACCOUNT_ID, s)?;
        if data.len() != 32 {
            return Err(KeyError::InvalidStrKey(format!(
                "payload length {} != 32",
                data.len()
            )));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&data);
        Ok(AccountId(key))
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_strkey())
    }
}

impl std::fmt::Debug for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Abbreviated form keeps delta dumps readable.
        let s = self.to_strkey();
        write!(f, "AccountId({}..{})", &s[..4], &s[s.len() - 4..])
    }
}

/// Encodes data with a version byte and CRC16 checksum.
///
/// Format: base32(version || data || crc16(version || data))
fn encode_check(version: u8, data: &[u8]) -> String {
    let mut payload = Vec::with_capacity(data.len() + 3);
    payload.push(version);
    payload.extend_from_slice(data);

    let checksum = crc16_xmodem(&payload);
    payload.extend_from_slice(&checksum.to_le_bytes());

    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &payload)
}

/// Decodes a StrKey, verifying the version byte and checksum.
fn decode_check(expected_version: u8, s: &str) -> Result<Vec<u8>, KeyError> {
    let decoded = base32::decode(base32::Alphabet::Rfc4648 { padding: false }, s)
        .ok_or_else(|| KeyError::InvalidStrKey("invalid base32".to_string()))?;

    // Minimum: 1 version byte + 2 checksum bytes.
    if decoded.len() < 3 {
        return Err(KeyError::InvalidStrKey("too short".to_string()));
    }

    let version = decoded[0];
    if version != expected_version {
        return Err(KeyError::InvalidStrKey(format!(
            "version byte {:02x} != {:02x}",
            version, expected_version
        )));
    }

    let checksum_pos = decoded.len() - 2;
    let checksum = u16::from_le_bytes([decoded[checksum_pos], decoded[checksum_pos + 1]]);
    let computed = crc16_xmodem(&decoded[..checksum_pos]);
    if checksum != computed {
        return Err(KeyError::InvalidStrKey("checksum mismatch".to_string()));
    }

    Ok(decoded[1..checksum_pos].to_vec())
}

/// CRC16-XModem: polynomial 0x1021, initial value 0.
fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strkey_roundtrip() {
        let id = AccountId([42u8; 32]);
        let encoded = id.to_strkey();
        assert!(encoded.starts_with('G'));
        let decoded = AccountId::from_strkey(&encoded).unwrap();
        assert_eq!(id, decoded);
    }

    #[test]
    fn test_strkey_zero_key() {
        let id = AccountId([0u8; 32]);
        let encoded = id.to_strkey();
        assert!(encoded.starts_with('G'));
        assert_eq!(AccountId::from_strkey(&encoded).unwrap(), id);
    }

    #[test]
    fn test_strkey_rejects_corruption() {
        let encoded = AccountId([7u8; 32]).to_strkey();
        let mut chars: Vec<char> = encoded.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'A' { 'B' } else { 'A' };
        let corrupted: String = chars.into_iter().collect();
        assert!(AccountId::from_strkey(&corrupted).is_err());
    }

    #[test]
    fn test_strkey_rejects_wrong_prefix() {
        // A seed-style version byte must not decode as an account ID.
        let payload = {
            let mut p = vec![18u8 << 3];
            p.extend_from_slice(&[1u8; 32]);
            let crc = crc16_xmodem(&p);
            p.extend_from_slice(&crc.to_le_bytes());
            p
        };
        let s = base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &payload);
        assert!(AccountId::from_strkey(&s).is_err());
    }

    #[test]
    fn test_strkey_ordering_matches_byte_ordering_is_not_assumed() {
        // The winner tie-break is defined over the string form; two
        // distinct ids must produce distinct strings.
        let a = AccountId([1u8; 32]);
        let b = AccountId([2u8; 32]);
        assert_ne!(a.to_strkey(), b.to_strkey());
    }
}
