//! Assets and offer prices.

use serde::{Deserialize, Serialize};

use crate::error::KeyError;
use crate::keys::AccountId;

/// An asset held on the ledger.
///
/// Either the native asset or a credit asset identified by a short code and
/// its issuing account. Codes up to four characters use the alphanum-4 form,
/// longer codes (up to twelve) the alphanum-12 form; the two forms are
/// distinct assets even for codes that fit both.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Asset {
    /// The native asset.
    Native,
    /// Credit asset with a code of at most 4 bytes.
    CreditAlphanum4 { code: [u8; 4], issuer: AccountId },
    /// Credit asset with a code of 5 to 12 bytes.
    CreditAlphanum12 { code: [u8; 12], issuer: AccountId },
}

impl Asset {
    /// Build an alphanum-4 credit asset from a short code string.
    ///
    /// # Panics
    ///
    /// Panics if `code` is empty or longer than 4 bytes. Intended for
    /// literals; parse untrusted input with [`Asset::from_canonical`].
    pub fn credit4(code: &str, issuer: AccountId) -> Self {
        assert!(!code.is_empty() && code.len() <= 4, "bad alphanum4 code");
        let mut c = [0u8; 4];
        c[..code.len()].copy_from_slice(code.as_bytes());
        Asset::CreditAlphanum4 { code: c, issuer }
    }

    /// Build an alphanum-12 credit asset from a code string.
    ///
    /// # Panics
    ///
    /// Panics if `code` is shorter than 5 or longer than 12 bytes.
    pub fn credit12(code: &str, issuer: AccountId) -> Self {
        assert!(code.len() > 4 && code.len() <= 12, "bad alphanum12 code");
        let mut c = [0u8; 12];
        c[..code.len()].copy_from_slice(code.as_bytes());
        Asset::CreditAlphanum12 { code: c, issuer }
    }

    /// Canonical string form, used as the asset column in the SQL store:
    /// `native` or `CODE:ISSUER_STRKEY`.
    pub fn to_canonical(&self) -> String {
        match self {
            Asset::Native => "native".to_string(),
            Asset::CreditAlphanum4 { code, issuer } => {
                format!("{}:{}", code_str(code), issuer.to_strkey())
            }
            Asset::CreditAlphanum12 { code, issuer } => {
                format!("{}:{}", code_str(code), issuer.to_strkey())
            }
        }
    }

    /// Parse the canonical string form.
    pub fn from_canonical(s: &str) -> Result<Self, KeyError> {
        if s == "native" {
            return Ok(Asset::Native);
        }
        let (code, issuer) = s
            .split_once(':')
            .ok_or_else(|| KeyError::InvalidAsset(s.to_string()))?;
        let issuer = AccountId::from_strkey(issuer)?;
        match code.len() {
            1..=4 => Ok(Asset::credit4(code, issuer)),
            5..=12 => Ok(Asset::credit12(code, issuer)),
            _ => Err(KeyError::InvalidAsset(s.to_string())),
        }
    }
}

fn code_str(code: &[u8]) -> &str {
    let end = code.iter().position(|b| *b == 0).unwrap_or(code.len());
    std::str::from_utf8(&code[..end]).unwrap_or("")
}

/// An offer price as a rational number `n/d`.
///
/// Prices compare by their real ratio; ordering of offers additionally
/// tie-breaks on offer ID, see [`OfferDescriptor`](crate::OfferDescriptor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    pub n: i32,
    pub d: i32,
}

impl Price {
    pub fn new(n: i32, d: i32) -> Self {
        Self { n, d }
    }

    /// The price as a floating point ratio, for ordering only. Exchange
    /// arithmetic must use the rational form.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.n as f64 / self.d as f64
    }
}

/// A lightweight descriptor carrying the fields that order an offer.
///
/// Offers order by price ratio ascending, ties broken by offer ID ascending,
/// so the best offer is the minimum and equally-priced older offers fill
/// first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferDescriptor {
    pub price: Price,
    pub offer_id: i64,
}

impl OfferDescriptor {
    pub fn new(price: Price, offer_id: i64) -> Self {
        Self { price, offer_id }
    }
}

impl Ord for OfferDescriptor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.price.as_f64().partial_cmp(&other.price.as_f64()) {
            Some(std::cmp::Ordering::Equal) | None => self.offer_id.cmp(&other.offer_id),
            Some(ord) => ord,
        }
    }
}

impl PartialOrd for OfferDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
