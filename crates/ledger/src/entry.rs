//! Activation handles for entries and the header.
//!
//! A handle is a borrow token: it binds (owning transaction, key) to the
//! mutable slot holding that key's current value in the transaction's delta.
//! While a handle is live its key is *active* and cannot be loaded again
//! from the same transaction; dropping the handle (including dropping it by
//! rebinding the variable) deactivates the key. Handles borrow the owning
//! transaction, so they cannot outlive it, and commit or rollback — which
//! consume the transaction — cannot run while any handle is live.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashSet;
use std::rc::Rc;

use strata_common::{LedgerEntry, LedgerHeader, LedgerKey};

use crate::txn::TxnState;
use crate::Result;

/// A live, mutable handle to one entry in a transaction's delta.
pub struct LedgerTxnEntry<'a> {
    state: &'a RefCell<TxnState>,
    active: &'a RefCell<HashSet<LedgerKey>>,
    key: LedgerKey,
    cell: Rc<RefCell<LedgerEntry>>,
}

impl<'a> LedgerTxnEntry<'a> {
    pub(crate) fn bind(
        state: &'a RefCell<TxnState>,
        active: &'a RefCell<HashSet<LedgerKey>>,
        key: LedgerKey,
        cell: Rc<RefCell<LedgerEntry>>,
    ) -> Self {
        Self {
            state,
            active,
            key,
            cell,
        }
    }

    /// The key this handle is bound to.
    pub fn key(&self) -> &LedgerKey {
        &self.key
    }

    /// Read access to the current value.
    pub fn current(&self) -> Ref<'_, LedgerEntry> {
        self.cell.borrow()
    }

    /// Write access to the current value.
    pub fn current_mut(&self) -> RefMut<'_, LedgerEntry> {
        self.cell.borrow_mut()
    }

    /// Erases the bound entry from the owning transaction, consuming the
    /// handle. Equivalent to releasing the handle and calling `erase` on
    /// the owner.
    pub fn erase(self) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            state.erase_recorded(&self.key)?;
        }
        Ok(())
        // self drops here, deactivating the key
    }
}

impl Drop for LedgerTxnEntry<'_> {
    fn drop(&mut self) {
        self.active.borrow_mut().remove(&self.key);
    }
}

/// A live, read-only handle to one entry.
///
/// Returned by `load_without_record`; the key is active while the handle
/// lives, but no delta entry is recorded for it.
pub struct ConstLedgerTxnEntry<'a> {
    active: &'a RefCell<HashSet<LedgerKey>>,
    key: LedgerKey,
    cell: Rc<RefCell<LedgerEntry>>,
}

impl<'a> ConstLedgerTxnEntry<'a> {
    pub(crate) fn bind(
        active: &'a RefCell<HashSet<LedgerKey>>,
        key: LedgerKey,
        cell: Rc<RefCell<LedgerEntry>>,
    ) -> Self {
        Self { active, key, cell }
    }

    /// The key this handle is bound to.
    pub fn key(&self) -> &LedgerKey {
        &self.key
    }

    /// Read access to the value.
    pub fn current(&self) -> Ref<'_, LedgerEntry> {
        self.cell.borrow()
    }
}

impl Drop for ConstLedgerTxnEntry<'_> {
    fn drop(&mut self) {
        self.active.borrow_mut().remove(&self.key);
    }
}

/// A live, mutable handle to the transaction's header slot.
///
/// At most one header handle exists per layer at any time.
pub struct LedgerTxnHeader<'a> {
    active: &'a Cell<bool>,
    cell: Rc<RefCell<LedgerHeader>>,
}

impl<'a> LedgerTxnHeader<'a> {
    pub(crate) fn bind(active: &'a Cell<bool>, cell: Rc<RefCell<LedgerHeader>>) -> Self {
        Self { active, cell }
    }

    /// Read access to the header.
    pub fn current(&self) -> Ref<'_, LedgerHeader> {
        self.cell.borrow()
    }

    /// Write access to the header.
    pub fn current_mut(&self) -> RefMut<'_, LedgerHeader> {
        self.cell.borrow_mut()
    }
}

impl Drop for LedgerTxnHeader<'_> {
    fn drop(&mut self) {
        self.active.set(false);
    }
}
