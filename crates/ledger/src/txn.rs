//! The nested transactional overlay.
//!
//! A [`LedgerTxn`] stages tentative mutations over a parent layer — another
//! `LedgerTxn` or the [`LedgerTxnRoot`](crate::LedgerTxnRoot) — as a per-key
//! delta map. Reads resolve top-down (self first, then recursively the
//! parent); commits fold bottom-up (the child delta merges into the parent
//! delta). Rolling back discards the delta.
//!
//! # Lifecycle
//!
//! A transaction is *open* until its delta is observed via [`get_delta`]
//! or [`get_live_entries`], which seal it. A sealed transaction rejects all
//! loading and mutating calls; only [`unseal_header`], commit, and rollback
//! remain. Commit and rollback consume the transaction. Dropping an
//! uncommitted transaction rolls it back.
//!
//! While a transaction has an active child, it is frozen: all mutating,
//! loading, and query calls on it fail until the child commits or rolls
//! back. A parent can have at most one active child.
//!
//! [`get_delta`]: LedgerTxn::get_delta
//! [`get_live_entries`]: LedgerTxn::get_live_entries
//! [`unseal_header`]: LedgerTxn::unseal_header

use std::cell::{Cell, RefCell};
use std::collections::btree_map::Entry as BTreeEntry;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use strata_common::{
    AccountId, Asset, InflationWinner, LedgerEntry, LedgerHeader, LedgerKey, OfferDescriptor,
};
use tracing::trace;

use crate::delta::{EntryDelta, HeaderDelta, LedgerTxnDelta};
use crate::entry::{ConstLedgerTxnEntry, LedgerTxnEntry, LedgerTxnHeader};
use crate::{LedgerError, Result};

/// Minimum balance an account must hold for its inflation vote to count.
pub const MINIMUM_VOTE_BALANCE: i64 = 1_000_000_000;

/// The read/commit interface every transaction layer exposes to its
/// children. Implemented by [`LedgerTxn`] (composing its own delta with its
/// parent) and by [`LedgerTxnRoot`](crate::LedgerTxnRoot) (backed by cache
/// and store).
pub trait AbstractLedgerTxnParent {
    /// A snapshot of the header this layer exposes.
    fn get_header(&self) -> LedgerHeader;

    /// The newest visible version of `key`, or `None` if not visible.
    fn get_newest_version(&self, key: &LedgerKey) -> Result<Option<LedgerEntry>>;

    /// Every offer visible at this layer.
    fn get_all_offers(&self) -> Result<Vec<LedgerEntry>>;

    /// The best visible offer for `(buying, selling)` whose key is not in
    /// `excluded`: minimum price ratio, ties broken by ascending offer ID.
    fn get_best_offer(
        &self,
        buying: &Asset,
        selling: &Asset,
        excluded: &HashSet<LedgerKey>,
    ) -> Result<Option<LedgerEntry>>;

    /// Visible offers where the seller is `account` and `asset` is either
    /// side of the trade.
    fn get_offers_by_account_and_asset(
        &self,
        account: &AccountId,
        asset: &Asset,
    ) -> Result<Vec<LedgerEntry>>;

    /// Up to `max_winners` inflation destinations with aggregated eligible
    /// votes of at least `min_votes`, by descending votes then descending
    /// StrKey.
    fn get_inflation_winners(
        &self,
        max_winners: usize,
        min_votes: i64,
    ) -> Result<Vec<InflationWinner>>;

    /// Folds a sealed child delta into this layer.
    fn commit_child(&self, delta: LedgerTxnDelta) -> Result<()>;

    /// Registers the caller as this layer's sole active child.
    fn attach_child(&self) -> Result<()>;

    /// Releases the active-child registration.
    fn detach_child(&self);
}

/// One key's slot in a transaction's delta map.
pub(crate) struct EntryRecord {
    /// The value this layer exposes. `None` means erased here. Shared with
    /// the key's live handle while one exists.
    pub(crate) current: Option<Rc<RefCell<LedgerEntry>>>,
    /// What the parent view exposed when this layer first touched the key.
    pub(crate) previous: Option<LedgerEntry>,
}

pub(crate) struct TxnState {
    pub(crate) entries: BTreeMap<LedgerKey, EntryRecord>,
    pub(crate) header: Rc<RefCell<LedgerHeader>>,
    pub(crate) previous_header: LedgerHeader,
    pub(crate) sealed: bool,
    pub(crate) update_last_modified: bool,
}

impl TxnState {
    /// Erases a key that is recorded in this layer with a present value.
    pub(crate) fn erase_recorded(&mut self, key: &LedgerKey) -> Result<()> {
        match self.entries.get_mut(key) {
            Some(rec) if rec.current.is_some() => {
                if rec.previous.is_none() {
                    // Created in this layer; erasing nets to nothing.
                    self.entries.remove(key);
                } else {
                    rec.current = None;
                }
                Ok(())
            }
            _ => Err(LedgerError::EntryNotFound(key.clone())),
        }
    }
}

/// A nested ledger transaction.
pub struct LedgerTxn<'a> {
    parent: &'a dyn AbstractLedgerTxnParent,
    state: RefCell<TxnState>,
    /// Keys with a live handle in this layer.
    active: RefCell<HashSet<LedgerKey>>,
    header_active: Cell<bool>,
    child_active: Cell<bool>,
    committed: Cell<bool>,
}

impl<'a> LedgerTxn<'a> {
    /// Opens a transaction as the sole active child of `parent`.
    ///
    /// Fails if the parent already has an active child or is sealed. On
    /// sealing, every entry this transaction exposes has its
    /// `last_modified_ledger_seq` set to the header's `ledger_seq`.
    pub fn open(parent: &'a dyn AbstractLedgerTxnParent) -> Result<Self> {
        Self::open_with_options(parent, true)
    }

    /// Like [`open`](Self::open), but `update_last_modified` controls
    /// whether sealing rewrites `last_modified_ledger_seq`.
    pub fn open_with_options(
        parent: &'a dyn AbstractLedgerTxnParent,
        update_last_modified: bool,
    ) -> Result<Self> {
        parent.attach_child()?;
        let header = parent.get_header();
        Ok(Self {
            parent,
            state: RefCell::new(TxnState {
                entries: BTreeMap::new(),
                header: Rc::new(RefCell::new(header.clone())),
                previous_header: header,
                sealed: false,
                update_last_modified,
            }),
            active: RefCell::new(HashSet::new()),
            header_active: Cell::new(false),
            child_active: Cell::new(false),
            committed: Cell::new(false),
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.child_active.get() {
            return Err(LedgerError::HasActiveChild);
        }
        if self.state.borrow().sealed {
            return Err(LedgerError::Sealed);
        }
        Ok(())
    }

    fn check_not_active(&self, key: &LedgerKey) -> Result<()> {
        if self.active.borrow().contains(key) {
            return Err(LedgerError::EntryActive(key.clone()));
        }
        Ok(())
    }

    /// Creates `entry`, which must not be visible as present in this layer
    /// or any ancestor. Returns a live handle to the new entry.
    pub fn create(&self, entry: LedgerEntry) -> Result<LedgerTxnEntry<'_>> {
        self.check_open()?;
        let key = entry.ledger_key();
        self.check_not_active(&key)?;

        let cell = Rc::new(RefCell::new(entry));
        let mut state = self.state.borrow_mut();
        match state.entries.entry(key.clone()) {
            BTreeEntry::Occupied(mut o) => {
                if o.get().current.is_some() {
                    return Err(LedgerError::EntryExists(key));
                }
                // Erased earlier in this layer; recreate, keeping the
                // original previous.
                o.get_mut().current = Some(cell.clone());
            }
            BTreeEntry::Vacant(v) => {
                if self.parent.get_newest_version(&key)?.is_some() {
                    return Err(LedgerError::EntryExists(key));
                }
                v.insert(EntryRecord {
                    current: Some(cell.clone()),
                    previous: None,
                });
            }
        }
        drop(state);

        self.active.borrow_mut().insert(key.clone());
        Ok(LedgerTxnEntry::bind(&self.state, &self.active, key, cell))
    }

    /// Erases `key`, which must be visible as present and must not have a
    /// live handle.
    pub fn erase(&self, key: &LedgerKey) -> Result<()> {
        self.check_open()?;
        self.check_not_active(key)?;

        let mut state = self.state.borrow_mut();
        if state.entries.contains_key(key) {
            state.erase_recorded(key)
        } else {
            match self.parent.get_newest_version(key)? {
                Some(previous) => {
                    state.entries.insert(
                        key.clone(),
                        EntryRecord {
                            current: None,
                            previous: Some(previous),
                        },
                    );
                    Ok(())
                }
                None => Err(LedgerError::EntryNotFound(key.clone())),
            }
        }
    }

    /// Loads `key` for mutation. Records a read-through in this layer's
    /// delta if the value came from an ancestor. Returns `None` if the key
    /// is not visible as present.
    pub fn load(&self, key: &LedgerKey) -> Result<Option<LedgerTxnEntry<'_>>> {
        self.check_open()?;
        self.check_not_active(key)?;

        let mut state = self.state.borrow_mut();
        let recorded = state.entries.get(key).map(|rec| rec.current.clone());
        let cell = match recorded {
            Some(Some(cell)) => cell,
            Some(None) => return Ok(None),
            None => match self.parent.get_newest_version(key)? {
                Some(entry) => {
                    let cell = Rc::new(RefCell::new(entry.clone()));
                    state.entries.insert(
                        key.clone(),
                        EntryRecord {
                            current: Some(cell.clone()),
                            previous: Some(entry),
                        },
                    );
                    cell
                }
                None => return Ok(None),
            },
        };
        drop(state);

        self.active.borrow_mut().insert(key.clone());
        Ok(Some(LedgerTxnEntry::bind(
            &self.state,
            &self.active,
            key.clone(),
            cell,
        )))
    }

    /// Loads `key` read-only, without recording a read-through. The key is
    /// still active while the returned handle lives.
    pub fn load_without_record(&self, key: &LedgerKey) -> Result<Option<ConstLedgerTxnEntry<'_>>> {
        self.check_open()?;
        self.check_not_active(key)?;

        let recorded = {
            let state = self.state.borrow();
            state.entries.get(key).map(|rec| rec.current.clone())
        };
        let cell = match recorded {
            Some(Some(cell)) => cell,
            Some(None) => return Ok(None),
            None => match self.parent.get_newest_version(key)? {
                Some(entry) => Rc::new(RefCell::new(entry)),
                None => return Ok(None),
            },
        };

        self.active.borrow_mut().insert(key.clone());
        Ok(Some(ConstLedgerTxnEntry::bind(
            &self.active,
            key.clone(),
            cell,
        )))
    }

    /// Loads the header for mutation. At most one live header handle per
    /// layer.
    pub fn load_header(&self) -> Result<LedgerTxnHeader<'_>> {
        self.check_open()?;
        if self.header_active.get() {
            return Err(LedgerError::HeaderActive);
        }
        let cell = self.state.borrow().header.clone();
        self.header_active.set(true);
        Ok(LedgerTxnHeader::bind(&self.header_active, cell))
    }

    fn seal(&self) -> Result<()> {
        if !self.active.borrow().is_empty() || self.header_active.get() {
            return Err(LedgerError::HandlesActive);
        }
        let mut state = self.state.borrow_mut();
        if !state.sealed {
            state.sealed = true;
            if state.update_last_modified {
                let seq = state.header.borrow().ledger_seq;
                for rec in state.entries.values_mut() {
                    if let Some(cell) = &rec.current {
                        cell.borrow_mut().last_modified_ledger_seq = seq;
                    }
                }
            }
        }
        Ok(())
    }

    /// Seals this transaction and returns its full delta.
    pub fn get_delta(&self) -> Result<LedgerTxnDelta> {
        if self.child_active.get() {
            return Err(LedgerError::HasActiveChild);
        }
        self.seal()?;
        Ok(self.snapshot_delta())
    }

    /// Seals this transaction and returns the entries it currently exposes
    /// as present in its own delta.
    pub fn get_live_entries(&self) -> Result<Vec<LedgerEntry>> {
        if self.child_active.get() {
            return Err(LedgerError::HasActiveChild);
        }
        self.seal()?;
        let state = self.state.borrow();
        Ok(state
            .entries
            .values()
            .filter_map(|rec| rec.current.as_ref().map(|cell| cell.borrow().clone()))
            .collect())
    }

    /// Temporarily reactivates the header of a sealed transaction for the
    /// duration of `f`. Fails if not sealed or if the header is active
    /// (including reentrant calls from within `f`).
    pub fn unseal_header<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut LedgerHeader),
    {
        if !self.state.borrow().sealed {
            return Err(LedgerError::NotSealed);
        }
        if self.header_active.get() {
            return Err(LedgerError::HeaderActive);
        }
        let cell = self.state.borrow().header.clone();
        self.header_active.set(true);
        {
            let mut header = cell.borrow_mut();
            f(&mut header);
        }
        self.header_active.set(false);
        Ok(())
    }

    fn snapshot_delta(&self) -> LedgerTxnDelta {
        let state = self.state.borrow();
        let header_current = state.header.borrow().clone();
        LedgerTxnDelta {
            entries: state
                .entries
                .iter()
                .map(|(key, rec)| {
                    (
                        key.clone(),
                        EntryDelta {
                            current: rec.current.as_ref().map(|cell| cell.borrow().clone()),
                            previous: rec.previous.clone(),
                        },
                    )
                })
                .collect(),
            header: HeaderDelta {
                current: header_current,
                previous: state.previous_header.clone(),
            },
        }
    }

    fn take_delta(&self) -> LedgerTxnDelta {
        let mut state = self.state.borrow_mut();
        let entries = std::mem::take(&mut state.entries)
            .into_iter()
            .map(|(key, rec)| {
                let current = rec.current.map(|cell| match Rc::try_unwrap(cell) {
                    Ok(inner) => inner.into_inner(),
                    Err(cell) => cell.borrow().clone(),
                });
                (
                    key,
                    EntryDelta {
                        current,
                        previous: rec.previous,
                    },
                )
            })
            .collect();
        let header_current = state.header.borrow().clone();
        LedgerTxnDelta {
            entries,
            header: HeaderDelta {
                current: header_current,
                previous: state.previous_header.clone(),
            },
        }
    }

    /// Folds this transaction's delta into the parent and destroys it.
    ///
    /// On a store failure from a root parent the transaction is rolled
    /// back instead and the error surfaces; the parent stays usable.
    pub fn commit(self) -> Result<()> {
        self.seal()?;
        let delta = self.take_delta();
        let entries = delta.entries.len();
        self.parent.commit_child(delta)?;
        self.committed.set(true);
        trace!(entries, "committed ledger transaction into parent");
        Ok(())
    }

    /// Discards this transaction's delta and destroys it.
    pub fn rollback(self) {
        // Work happens in Drop.
    }

    fn delta_votes(&self) -> BTreeMap<AccountId, i64> {
        let state = self.state.borrow();
        let mut votes: BTreeMap<AccountId, i64> = BTreeMap::new();
        for (key, rec) in &state.entries {
            if !matches!(key, LedgerKey::Account(_)) {
                continue;
            }
            if let Some(account) = rec.previous.as_ref().and_then(|e| e.as_account()) {
                if account.balance >= MINIMUM_VOTE_BALANCE {
                    if let Some(dest) = account.inflation_dest {
                        *votes.entry(dest).or_insert(0) -= account.balance;
                    }
                }
            }
            if let Some(cell) = &rec.current {
                let entry = cell.borrow();
                if let Some(account) = entry.as_account() {
                    if account.balance >= MINIMUM_VOTE_BALANCE {
                        if let Some(dest) = account.inflation_dest {
                            *votes.entry(dest).or_insert(0) += account.balance;
                        }
                    }
                }
            }
        }
        votes.retain(|_, delta| *delta != 0);
        votes
    }

    /// Every visible offer, grouped by seller, as live handles.
    pub fn load_all_offers(&self) -> Result<BTreeMap<AccountId, Vec<LedgerTxnEntry<'_>>>> {
        self.check_open()?;
        let offers = AbstractLedgerTxnParent::get_all_offers(self)?;
        let mut grouped: BTreeMap<AccountId, Vec<LedgerTxnEntry<'_>>> = BTreeMap::new();
        for entry in offers {
            let key = entry.ledger_key();
            let LedgerKey::Offer(seller, _) = &key else {
                continue;
            };
            let seller = *seller;
            if let Some(handle) = self.load(&key)? {
                grouped.entry(seller).or_default().push(handle);
            }
        }
        Ok(grouped)
    }

    /// The visible offer for `(buying, selling)` with the minimum price
    /// ratio, ties broken by ascending offer ID. Offers with non-positive
    /// amount are treated as erased.
    pub fn load_best_offer(
        &self,
        buying: &Asset,
        selling: &Asset,
    ) -> Result<Option<LedgerTxnEntry<'_>>> {
        self.check_open()?;
        let excluded = HashSet::new();
        match AbstractLedgerTxnParent::get_best_offer(self, buying, selling, &excluded)? {
            Some(entry) => self.load(&entry.ledger_key()),
            None => Ok(None),
        }
    }

    /// Visible offers where the seller is `account` and `asset` is either
    /// side of the trade, as live handles.
    pub fn load_offers_by_account_and_asset(
        &self,
        account: &AccountId,
        asset: &Asset,
    ) -> Result<Vec<LedgerTxnEntry<'_>>> {
        self.check_open()?;
        let offers = AbstractLedgerTxnParent::get_offers_by_account_and_asset(self, account, asset)?;
        let mut handles = Vec::with_capacity(offers.len());
        for entry in offers {
            if let Some(handle) = self.load(&entry.ledger_key())? {
                handles.push(handle);
            }
        }
        Ok(handles)
    }

    /// Aggregates eligible inflation votes by destination across the
    /// visible accounts and returns the top `max_winners` with at least
    /// `min_votes`, by descending votes then descending StrKey.
    pub fn query_inflation_winners(
        &self,
        max_winners: usize,
        min_votes: i64,
    ) -> Result<Vec<InflationWinner>> {
        self.check_open()?;
        AbstractLedgerTxnParent::get_inflation_winners(self, max_winners, min_votes)
    }
}

impl Drop for LedgerTxn<'_> {
    fn drop(&mut self) {
        if !self.committed.get() {
            trace!("rolling back ledger transaction");
        }
        self.parent.detach_child();
    }
}

fn descriptor(entry: &LedgerEntry) -> Option<OfferDescriptor> {
    entry
        .as_offer()
        .map(|offer| OfferDescriptor::new(offer.price, offer.offer_id))
}

impl AbstractLedgerTxnParent for LedgerTxn<'_> {
    fn get_header(&self) -> LedgerHeader {
        self.state.borrow().header.borrow().clone()
    }

    fn get_newest_version(&self, key: &LedgerKey) -> Result<Option<LedgerEntry>> {
        {
            let state = self.state.borrow();
            if let Some(rec) = state.entries.get(key) {
                return Ok(rec.current.as_ref().map(|cell| cell.borrow().clone()));
            }
        }
        self.parent.get_newest_version(key)
    }

    fn get_all_offers(&self) -> Result<Vec<LedgerEntry>> {
        let mut offers = Vec::new();
        let mut shadowed = HashSet::new();
        {
            let state = self.state.borrow();
            for (key, rec) in &state.entries {
                if !matches!(key, LedgerKey::Offer(..)) {
                    continue;
                }
                shadowed.insert(key.clone());
                if let Some(cell) = &rec.current {
                    offers.push(cell.borrow().clone());
                }
            }
        }
        for entry in self.parent.get_all_offers()? {
            if !shadowed.contains(&entry.ledger_key()) {
                offers.push(entry);
            }
        }
        Ok(offers)
    }

    fn get_best_offer(
        &self,
        buying: &Asset,
        selling: &Asset,
        excluded: &HashSet<LedgerKey>,
    ) -> Result<Option<LedgerEntry>> {
        let mut self_best: Option<LedgerEntry> = None;
        let mut parent_excluded = excluded.clone();
        {
            let state = self.state.borrow();
            for (key, rec) in &state.entries {
                if !matches!(key, LedgerKey::Offer(..)) {
                    continue;
                }
                // Any offer mentioned here shadows the parent's version,
                // whatever its new assets or amount.
                parent_excluded.insert(key.clone());
                if excluded.contains(key) {
                    continue;
                }
                let Some(cell) = &rec.current else {
                    continue;
                };
                let entry = cell.borrow();
                let Some(offer) = entry.as_offer() else {
                    continue;
                };
                if offer.buying != *buying || offer.selling != *selling || offer.amount <= 0 {
                    continue;
                }
                let candidate = OfferDescriptor::new(offer.price, offer.offer_id);
                let better = match self_best.as_ref().and_then(descriptor) {
                    None => true,
                    Some(best) => candidate < best,
                };
                if better {
                    self_best = Some(entry.clone());
                }
            }
        }
        let parent_best = self.parent.get_best_offer(buying, selling, &parent_excluded)?;
        Ok(match (self_best, parent_best) {
            (Some(own), Some(inherited)) => {
                if descriptor(&own) <= descriptor(&inherited) {
                    Some(own)
                } else {
                    Some(inherited)
                }
            }
            (own, inherited) => own.or(inherited),
        })
    }

    fn get_offers_by_account_and_asset(
        &self,
        account: &AccountId,
        asset: &Asset,
    ) -> Result<Vec<LedgerEntry>> {
        let mut result = Vec::new();
        let mut shadowed = HashSet::new();
        {
            let state = self.state.borrow();
            for (key, rec) in &state.entries {
                let LedgerKey::Offer(seller, _) = key else {
                    continue;
                };
                shadowed.insert(key.clone());
                if seller != account {
                    continue;
                }
                let Some(cell) = &rec.current else {
                    continue;
                };
                let entry = cell.borrow();
                let Some(offer) = entry.as_offer() else {
                    continue;
                };
                if (offer.buying == *asset || offer.selling == *asset) && offer.amount > 0 {
                    result.push(entry.clone());
                }
            }
        }
        for entry in self
            .parent
            .get_offers_by_account_and_asset(account, asset)?
        {
            if !shadowed.contains(&entry.ledger_key()) {
                result.push(entry);
            }
        }
        Ok(result)
    }

    fn get_inflation_winners(
        &self,
        max_winners: usize,
        min_votes: i64,
    ) -> Result<Vec<InflationWinner>> {
        let delta_votes = self.delta_votes();
        if delta_votes.is_empty() {
            return self.parent.get_inflation_winners(max_winners, min_votes);
        }

        // The parent is queried with enough slack that every destination
        // which could reach min_votes after this layer's changes is
        // represented: the vote floor drops by the total positive delta,
        // and the winner count grows by the number of changed destinations.
        let max_increase: i64 = delta_votes.values().copied().filter(|d| *d > 0).sum();
        let parent_min = min_votes.saturating_sub(max_increase);
        let parent_winners = self
            .parent
            .get_inflation_winners(max_winners + delta_votes.len(), parent_min)?;

        let mut totals: BTreeMap<AccountId, i64> = parent_winners
            .into_iter()
            .map(|winner| (winner.account_id, winner.votes))
            .collect();
        for (dest, delta) in delta_votes {
            match totals.entry(dest) {
                BTreeEntry::Occupied(mut o) => *o.get_mut() += delta,
                BTreeEntry::Vacant(v) => {
                    // Not a parent winner: its parent total is below
                    // parent_min, so it only matters if the delta alone
                    // clears that floor.
                    if delta >= parent_min {
                        v.insert(delta);
                    }
                }
            }
        }

        let mut winners: Vec<InflationWinner> = totals
            .into_iter()
            .filter(|(_, votes)| *votes >= min_votes)
            .map(|(account_id, votes)| InflationWinner { account_id, votes })
            .collect();
        winners.sort_by(|a, b| {
            b.votes
                .cmp(&a.votes)
                .then_with(|| b.account_id.to_strkey().cmp(&a.account_id.to_strkey()))
        });
        winners.truncate(max_winners);
        Ok(winners)
    }

    fn commit_child(&self, delta: LedgerTxnDelta) -> Result<()> {
        let mut state = self.state.borrow_mut();
        for (key, child_delta) in delta.entries {
            let EntryDelta { current, previous } = child_delta;
            match state.entries.entry(key) {
                BTreeEntry::Vacant(v) => {
                    v.insert(EntryRecord {
                        current: current.map(|entry| Rc::new(RefCell::new(entry))),
                        previous,
                    });
                }
                BTreeEntry::Occupied(mut o) => {
                    debug_assert_eq!(
                        previous,
                        o.get().current.as_ref().map(|cell| cell.borrow().clone()),
                        "child previous diverged from parent current"
                    );
                    let rec = o.get_mut();
                    rec.current = current.map(|entry| Rc::new(RefCell::new(entry)));
                    if rec.current.is_none() && rec.previous.is_none() {
                        o.remove();
                    }
                }
            }
        }
        *state.header.borrow_mut() = delta.header.current;
        Ok(())
    }

    fn attach_child(&self) -> Result<()> {
        if self.child_active.get() {
            return Err(LedgerError::ChildAlreadyActive);
        }
        if self.state.borrow().sealed {
            return Err(LedgerError::Sealed);
        }
        // A live handle could otherwise mutate this layer while the child
        // owns its mutation rights.
        if !self.active.borrow().is_empty() || self.header_active.get() {
            return Err(LedgerError::HandlesActive);
        }
        self.child_active.set(true);
        Ok(())
    }

    fn detach_child(&self) {
        self.child_active.set(false);
    }
}
