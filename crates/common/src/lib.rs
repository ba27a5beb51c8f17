//! Shared value types for the strata ledger.
//!
//! This crate defines the plain data model every other strata crate works
//! over: ledger entries and their keys, the ledger header, assets, prices,
//! and account identifiers with their StrKey string encoding. Everything
//! here is a value type with structural equality; the transactional overlay
//! lives in `strata-ledger`, persistence in `strata-db`.

mod asset;
mod entry;
mod error;
mod header;
mod keys;

pub use asset::{Asset, OfferDescriptor, Price};
pub use entry::{
    AccountEntry, DataEntry, InflationWinner, LedgerEntry, LedgerEntryData, LedgerKey, OfferEntry,
    Signer, SignerKey, Thresholds, TrustLineEntry,
};
pub use error::KeyError;
pub use header::LedgerHeader;
pub use keys::AccountId;
