//! Ledger entries and their keys.
//!
//! A [`LedgerEntry`] is a tagged union over the four entry kinds, carrying
//! the ledger sequence it was last modified in. [`LedgerKey`] is the parallel
//! identifier union; [`LedgerEntry::ledger_key`] extracts the key for any
//! entry. Entries have value equality, keys are additionally ordered and
//! hashable so they can index delta maps deterministically.

use serde::{Deserialize, Serialize};

use crate::asset::{Asset, Price};
use crate::keys::AccountId;

/// Identifies one ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LedgerKey {
    /// An account, by its ID.
    Account(AccountId),
    /// A trust line, by holding account and asset.
    TrustLine(AccountId, Asset),
    /// An offer, by seller and offer ID.
    Offer(AccountId, i64),
    /// A data entry, by owning account and name.
    Data(AccountId, String),
}

/// Signer key variants an account signer can carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignerKey {
    /// An Ed25519 public key.
    Ed25519([u8; 32]),
    /// The hash of a pre-authorized transaction.
    PreAuthTx([u8; 32]),
    /// A SHA-256 hash whose preimage acts as the signature.
    HashX([u8; 32]),
}

/// An additional signer on an account, with its voting weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub key: SignerKey,
    pub weight: u32,
}

/// The four signature thresholds of an account: master weight, then the
/// low, medium, and high operation thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds(pub [u8; 4]);

impl Thresholds {
    pub fn master_weight(&self) -> u8 {
        self.0[0]
    }

    pub fn low(&self) -> u8 {
        self.0[1]
    }

    pub fn medium(&self) -> u8 {
        self.0[2]
    }

    pub fn high(&self) -> u8 {
        self.0[3]
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds([1, 0, 0, 0])
    }
}

/// An account entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    pub account_id: AccountId,
    /// Balance in the smallest native unit.
    pub balance: i64,
    pub seq_num: i64,
    pub num_sub_entries: u32,
    /// Account accumulating this account's inflation votes, if set.
    pub inflation_dest: Option<AccountId>,
    pub flags: u32,
    pub home_domain: String,
    pub thresholds: Thresholds,
    pub signers: Vec<Signer>,
}

/// A trust line entry: a balance of a non-native asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustLineEntry {
    pub account_id: AccountId,
    pub asset: Asset,
    pub balance: i64,
    pub limit: i64,
    pub flags: u32,
}

/// An offer on the order book: sell `selling`, buy `buying`, at `price`
/// units of buying per unit of selling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferEntry {
    pub seller_id: AccountId,
    pub offer_id: i64,
    pub selling: Asset,
    pub buying: Asset,
    pub amount: i64,
    pub price: Price,
    pub flags: u32,
}

/// A named data entry attached to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEntry {
    pub account_id: AccountId,
    pub data_name: String,
    pub data_value: Vec<u8>,
}

/// The payload union of a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEntryData {
    Account(AccountEntry),
    TrustLine(TrustLineEntry),
    Offer(OfferEntry),
    Data(DataEntry),
}

/// One ledger entry together with the sequence of the ledger that last
/// modified it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub last_modified_ledger_seq: u32,
    pub data: LedgerEntryData,
}

impl LedgerEntry {
    pub fn new(data: LedgerEntryData) -> Self {
        Self {
            last_modified_ledger_seq: 0,
            data,
        }
    }

    /// Extract the key identifying this entry.
    pub fn ledger_key(&self) -> LedgerKey {
        match &self.data {
            LedgerEntryData::Account(account) => LedgerKey::Account(account.account_id),
            LedgerEntryData::TrustLine(tl) => {
                LedgerKey::TrustLine(tl.account_id, tl.asset.clone())
            }
            LedgerEntryData::Offer(offer) => LedgerKey::Offer(offer.seller_id, offer.offer_id),
            LedgerEntryData::Data(data) => {
                LedgerKey::Data(data.account_id, data.data_name.clone())
            }
        }
    }

    /// The contained offer, if this is an offer entry.
    pub fn as_offer(&self) -> Option<&OfferEntry> {
        match &self.data {
            LedgerEntryData::Offer(offer) => Some(offer),
            _ => None,
        }
    }

    /// The contained account, if this is an account entry.
    pub fn as_account(&self) -> Option<&AccountEntry> {
        match &self.data {
            LedgerEntryData::Account(account) => Some(account),
            _ => None,
        }
    }
}

/// One aggregated inflation destination and the votes it gathered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InflationWinner {
    pub account_id: AccountId,
    pub votes: i64,
}
