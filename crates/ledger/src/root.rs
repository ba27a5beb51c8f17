//! The root of a transaction tree, bound to the persistent store.
//!
//! [`LedgerTxnRoot`] implements the parent interface over the SQL store and
//! keeps two bounded caches: committed entry lookups (present or
//! known-absent) and the price-ordered offer list per asset pair. A sealed
//! child delta is applied to the store as a single atomic transaction; the
//! caches are invalidated for every touched key and asset pair whether or
//! not the store accepts the delta, so a failed commit can never leave
//! stale reads behind.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use strata_common::{
    AccountId, Asset, InflationWinner, LedgerEntry, LedgerHeader, LedgerKey,
};
use strata_db::Database;
use tracing::{debug, warn};

use crate::cache::{BestOffersCache, EntryCache};
use crate::delta::LedgerTxnDelta;
use crate::store;
use crate::txn::AbstractLedgerTxnParent;
use crate::{LedgerError, Result};

/// Cache sizing for a [`LedgerTxnRoot`]. A size of zero disables the
/// respective cache; observable behavior is identical either way.
#[derive(Debug, Clone)]
pub struct RootConfig {
    /// Maximum committed-entry lookups to cache.
    pub entry_cache_size: usize,
    /// Maximum asset pairs whose ordered offer lists are cached.
    pub best_offers_cache_size: usize,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            entry_cache_size: 4096,
            best_offers_cache_size: 64,
        }
    }
}

/// Concrete parent bound to the persistent store.
pub struct LedgerTxnRoot {
    db: Database,
    header: Mutex<LedgerHeader>,
    entry_cache: Mutex<EntryCache>,
    best_offers: Mutex<BestOffersCache>,
    child_active: AtomicBool,
}

impl LedgerTxnRoot {
    /// Opens a root over `db`. Loads the persisted header; a fresh store is
    /// initialized with the genesis header.
    pub fn open(db: Database, config: RootConfig) -> Result<Self> {
        let header = match db.with_connection(store::load_header)? {
            Some(header) => header,
            None => {
                let header = LedgerHeader::genesis();
                db.with_connection(|conn| store::store_header(conn, &header))?;
                header
            }
        };
        Ok(Self {
            db,
            header: Mutex::new(header),
            entry_cache: Mutex::new(EntryCache::new(config.entry_cache_size)),
            best_offers: Mutex::new(BestOffersCache::new(config.best_offers_cache_size)),
            child_active: AtomicBool::new(false),
        })
    }

    fn invalidate_caches(&self, delta: &LedgerTxnDelta) {
        let mut entry_cache = self.entry_cache.lock();
        let mut best_offers = self.best_offers.lock();
        let mut touched_pairs: HashSet<(Asset, Asset)> = HashSet::new();
        for (key, entry_delta) in &delta.entries {
            entry_cache.remove(key);
            for side in [&entry_delta.previous, &entry_delta.current] {
                if let Some(offer) = side.as_ref().and_then(|e| e.as_offer()) {
                    touched_pairs.insert((offer.buying.clone(), offer.selling.clone()));
                }
            }
        }
        for pair in touched_pairs {
            best_offers.remove(&pair);
        }
    }
}

fn first_not_excluded(
    offers: &[LedgerEntry],
    excluded: &HashSet<LedgerKey>,
) -> Option<LedgerEntry> {
    offers
        .iter()
        .find(|entry| {
            entry.as_offer().map_or(false, |o| o.amount > 0)
                && !excluded.contains(&entry.ledger_key())
        })
        .cloned()
}

impl AbstractLedgerTxnParent for LedgerTxnRoot {
    fn get_header(&self) -> LedgerHeader {
        self.header.lock().clone()
    }

    fn get_newest_version(&self, key: &LedgerKey) -> Result<Option<LedgerEntry>> {
        {
            let mut cache = self.entry_cache.lock();
            if let Some(cached) = cache.get(key) {
                return Ok(cached.clone());
            }
        }
        let entry = self.db.with_connection(|conn| store::load_entry(conn, key))?;
        self.entry_cache.lock().put(key.clone(), entry.clone());
        Ok(entry)
    }

    fn get_all_offers(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.db.with_connection(store::load_all_offers)?)
    }

    fn get_best_offer(
        &self,
        buying: &Asset,
        selling: &Asset,
        excluded: &HashSet<LedgerKey>,
    ) -> Result<Option<LedgerEntry>> {
        let pair = (buying.clone(), selling.clone());
        {
            let mut cache = self.best_offers.lock();
            if let Some(offers) = cache.get(&pair) {
                return Ok(first_not_excluded(offers, excluded));
            }
        }
        let offers = self
            .db
            .with_connection(|conn| store::load_offers_by_pair(conn, buying, selling))?;
        let best = first_not_excluded(&offers, excluded);
        self.best_offers.lock().put(pair, offers);
        Ok(best)
    }

    fn get_offers_by_account_and_asset(
        &self,
        account: &AccountId,
        asset: &Asset,
    ) -> Result<Vec<LedgerEntry>> {
        Ok(self.db.with_connection(|conn| {
            store::load_offers_by_account_and_asset(conn, account, asset)
        })?)
    }

    fn get_inflation_winners(
        &self,
        max_winners: usize,
        min_votes: i64,
    ) -> Result<Vec<InflationWinner>> {
        Ok(self.db.with_connection(|conn| {
            store::load_inflation_winners(conn, max_winners, min_votes)
        })?)
    }

    fn commit_child(&self, delta: LedgerTxnDelta) -> Result<()> {
        // Invalidate up front: whether the store accepts the delta or not,
        // nothing stale may be served afterwards.
        self.invalidate_caches(&delta);

        let result = self.db.transaction(|tx| {
            for (key, entry_delta) in &delta.entries {
                match &entry_delta.current {
                    Some(entry) => {
                        if entry_delta.previous.as_ref() != Some(entry) {
                            store::upsert_entry(tx, entry)?;
                        }
                    }
                    None => {
                        if entry_delta.previous.is_some() {
                            store::delete_entry(tx, key)?;
                        }
                    }
                }
            }
            store::store_header(tx, &delta.header.current)?;
            Ok(())
        });

        match result {
            Ok(()) => {
                debug!(
                    entries = delta.entries.len(),
                    ledger_seq = delta.header.current.ledger_seq,
                    "applied child delta to store"
                );
                *self.header.lock() = delta.header.current;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "store rejected child delta");
                Err(e.into())
            }
        }
    }

    fn attach_child(&self) -> Result<()> {
        if self
            .child_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LedgerError::ChildAlreadyActive);
        }
        Ok(())
    }

    fn detach_child(&self) {
        self.child_active.store(false, Ordering::Release);
    }
}
