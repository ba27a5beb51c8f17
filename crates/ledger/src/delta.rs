//! Change tracking for transaction layers.
//!
//! A [`LedgerTxnDelta`] is the observable effect of one layer: a map from
//! [`LedgerKey`] to [`EntryDelta`] plus a [`HeaderDelta`]. Each entry delta
//! is a `(current, previous)` pair where either side may be absent:
//!
//! - creation: `previous` absent
//! - modification: both present, different
//! - deletion: `current` absent
//! - read-through: both present and equal, recorded so that "loaded but
//!   untouched" is distinguishable from "never observed"
//!
//! # Merge semantics
//!
//! Folding a child delta into a parent coalesces changes so the parent ends
//! up with the minimal pair describing the combined effect:
//!
//! - key unknown to the parent: the child pair is adopted verbatim
//! - key known to the parent: the child's `current` replaces the parent's,
//!   the parent's `previous` is kept (it is authoritative for what deeper
//!   layers exposed)
//! - a merged pair with both sides absent describes an entry created and
//!   erased within the subtree; it is dropped entirely

use std::collections::BTreeMap;

use strata_common::{LedgerEntry, LedgerHeader, LedgerKey};

/// The change one layer holds for a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDelta {
    /// The value this layer exposes, or `None` if erased here.
    pub current: Option<LedgerEntry>,
    /// The value the parent view exposed when this layer first touched the
    /// key, or `None` if it was not visible.
    pub previous: Option<LedgerEntry>,
}

impl EntryDelta {
    /// True if this delta creates the entry.
    pub fn is_create(&self) -> bool {
        self.current.is_some() && self.previous.is_none()
    }

    /// True if this delta erases the entry.
    pub fn is_erase(&self) -> bool {
        self.current.is_none() && self.previous.is_some()
    }

    /// True if this delta records a load with no net change.
    pub fn is_read_through(&self) -> bool {
        self.current.is_some() && self.current == self.previous
    }
}

/// The header change of one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDelta {
    pub current: LedgerHeader,
    pub previous: LedgerHeader,
}

/// The full observable change of one transaction layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTxnDelta {
    /// Per-key entry changes. Iteration order is the key order; insertion
    /// order carries no meaning.
    pub entries: BTreeMap<LedgerKey, EntryDelta>,
    /// The header change.
    pub header: HeaderDelta,
}

impl LedgerTxnDelta {
    /// Fold `child` into `self` according to the merge rules above.
    ///
    /// The child's `previous` for a key the parent already tracks must
    /// equal the parent's `current`; that is a construction invariant of
    /// the transaction tree and only sanity-checked here.
    pub fn merge(&mut self, child: LedgerTxnDelta) {
        for (key, child_delta) in child.entries {
            match self.entries.get_mut(&key) {
                None => {
                    self.entries.insert(key, child_delta);
                }
                Some(existing) => {
                    debug_assert_eq!(
                        child_delta.previous, existing.current,
                        "child previous diverged from parent current"
                    );
                    existing.current = child_delta.current;
                    if existing.current.is_none() && existing.previous.is_none() {
                        self.entries.remove(&key);
                    }
                }
            }
        }
        self.header.current = child.header.current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::{AccountEntry, AccountId, LedgerEntryData, Thresholds};

    fn account_entry(seed: u8, balance: i64) -> LedgerEntry {
        LedgerEntry {
            last_modified_ledger_seq: 1,
            data: LedgerEntryData::Account(AccountEntry {
                account_id: AccountId([seed; 32]),
                balance,
                seq_num: 1,
                num_sub_entries: 0,
                inflation_dest: None,
                flags: 0,
                home_domain: String::new(),
                thresholds: Thresholds::default(),
                signers: Vec::new(),
            }),
        }
    }

    fn delta_with(entries: Vec<(LedgerKey, EntryDelta)>) -> LedgerTxnDelta {
        LedgerTxnDelta {
            entries: entries.into_iter().collect(),
            header: HeaderDelta {
                current: LedgerHeader::genesis(),
                previous: LedgerHeader::genesis(),
            },
        }
    }

    #[test]
    fn test_merge_adopts_unknown_key() {
        let e = account_entry(1, 100);
        let key = e.ledger_key();
        let mut parent = delta_with(vec![]);
        let child = delta_with(vec![(
            key.clone(),
            EntryDelta {
                current: Some(e.clone()),
                previous: None,
            },
        )]);
        parent.merge(child);
        assert_eq!(parent.entries[&key].current, Some(e));
        assert_eq!(parent.entries[&key].previous, None);
    }

    #[test]
    fn test_merge_keeps_parent_previous() {
        let e1 = account_entry(1, 100);
        let e2 = account_entry(1, 200);
        let key = e1.ledger_key();
        // Parent created e1; child modified it to e2.
        let mut parent = delta_with(vec![(
            key.clone(),
            EntryDelta {
                current: Some(e1.clone()),
                previous: None,
            },
        )]);
        let child = delta_with(vec![(
            key.clone(),
            EntryDelta {
                current: Some(e2.clone()),
                previous: Some(e1),
            },
        )]);
        parent.merge(child);
        assert_eq!(parent.entries[&key].current, Some(e2));
        assert_eq!(parent.entries[&key].previous, None);
    }

    #[test]
    fn test_merge_create_then_erase_nets_out() {
        let e = account_entry(1, 100);
        let key = e.ledger_key();
        let mut parent = delta_with(vec![(
            key.clone(),
            EntryDelta {
                current: Some(e.clone()),
                previous: None,
            },
        )]);
        let child = delta_with(vec![(
            key.clone(),
            EntryDelta {
                current: None,
                previous: Some(e),
            },
        )]);
        parent.merge(child);
        assert!(parent.entries.is_empty());
    }

    #[test]
    fn test_merge_adopts_child_header() {
        let mut parent = delta_with(vec![]);
        let mut child = delta_with(vec![]);
        child.header.current.ledger_seq = 9;
        parent.merge(child);
        assert_eq!(parent.header.current.ledger_seq, 9);
        assert_eq!(parent.header.previous, LedgerHeader::genesis());
    }

    #[test]
    fn test_entry_delta_classification() {
        let e = account_entry(1, 100);
        let create = EntryDelta {
            current: Some(e.clone()),
            previous: None,
        };
        assert!(create.is_create() && !create.is_erase() && !create.is_read_through());

        let erase = EntryDelta {
            current: None,
            previous: Some(e.clone()),
        };
        assert!(erase.is_erase());

        let read_through = EntryDelta {
            current: Some(e.clone()),
            previous: Some(e),
        };
        assert!(read_through.is_read_through());
    }
}
