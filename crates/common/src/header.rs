//! The ledger header.

use serde::{Deserialize, Serialize};

/// Global ledger metadata. Exactly one logical header exists per layer of a
/// transaction tree; the root holds the committed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerHeader {
    /// Protocol version governing this ledger's behavior.
    pub ledger_version: u32,
    /// Sequence number, monotonically increasing from genesis.
    pub ledger_seq: u32,
    /// Total native units in circulation.
    pub total_coins: i64,
    /// Fees collected since the last inflation run.
    pub fee_pool: i64,
    /// Last used global ID, for offer ID generation.
    pub id_pool: u64,
    /// Base fee per operation.
    pub base_fee: u32,
    /// Base reserve per ledger entry.
    pub base_reserve: u32,
    /// Maximum transaction set size.
    pub max_tx_set_size: u32,
    /// Close time as a Unix timestamp.
    pub close_time: u64,
}

impl LedgerHeader {
    /// A genesis header at sequence 1.
    pub fn genesis() -> Self {
        Self {
            ledger_version: 0,
            ledger_seq: 1,
            total_coins: 1_000_000_000 * 10_000_000,
            fee_pool: 0,
            id_pool: 0,
            base_fee: 100,
            base_reserve: 100_000_000,
            max_tx_set_size: 100,
            close_time: 0,
        }
    }
}

impl Default for LedgerHeader {
    fn default() -> Self {
        Self::genesis()
    }
}
