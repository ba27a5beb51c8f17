//! The operation frame: validation and apply driving.
//!
//! An [`OperationFrame`] wraps an operation-specific [`OperationHandler`]
//! and drives the frame-level protocol the block-apply driver relies on:
//!
//! - [`check_valid`](OperationFrame::check_valid) validates without
//!   mutating: it opens a nested ledger transaction, performs the signature
//!   or account-existence check for the ledger version, runs the handler's
//!   well-formedness check, and rolls the nested transaction back on every
//!   path. The surrounding transaction is never modified.
//! - [`apply`](OperationFrame::apply) re-runs `check_valid` and, on
//!   success, lets the handler mutate the surrounding transaction.
//!
//! For ledger versions before 10 signature verification happens here; from
//! version 10 on it is driven by the outer transaction frame and
//! `check_valid` only requires the source account to exist.

use strata_common::{AccountId, LedgerKey};
use strata_ledger::{AbstractLedgerTxnParent, LedgerTxn};
use tracing::trace;

use crate::result::{OperationResultCode, ThresholdLevel};
use crate::signature_checker::SignatureChecker;
use crate::{Result, TxError};

/// Ledger version from which signature verification moves to the outer
/// transaction frame.
pub const FRAME_DRIVEN_SIGNATURES_VERSION: u32 = 10;

/// Operation-specific behavior plugged into an [`OperationFrame`].
pub trait OperationHandler {
    /// The threshold the operation requires on its source account.
    fn threshold_level(&self) -> ThresholdLevel {
        ThresholdLevel::Medium
    }

    /// Whether the ledger version supports this operation type.
    fn is_version_supported(&self, _ledger_version: u32) -> bool {
        true
    }

    /// The operation's own source account, if it overrides the
    /// transaction's.
    fn source_account(&self) -> Option<&AccountId> {
        None
    }

    /// Operation-specific well-formedness, checked after the frame-level
    /// checks pass. Returns false for a data-driven rejection.
    fn check_well_formed(&mut self, ledger_version: u32) -> Result<bool>;

    /// Performs the operation's mutations against `ltx`.
    fn apply_changes(&mut self, ltx: &LedgerTxn<'_>) -> Result<bool>;
}

/// Drives one operation through validation and apply.
pub struct OperationFrame<H> {
    handler: H,
    tx_source: AccountId,
    result: Option<OperationResultCode>,
}

impl<H: OperationHandler> OperationFrame<H> {
    pub fn new(handler: H, tx_source: AccountId) -> Self {
        Self {
            handler,
            tx_source,
            result: None,
        }
    }

    /// The operation's effective source account.
    pub fn source_id(&self) -> AccountId {
        self.handler
            .source_account()
            .copied()
            .unwrap_or(self.tx_source)
    }

    /// The result code of the last validation or apply, if any.
    pub fn result_code(&self) -> Option<OperationResultCode> {
        self.result
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Validates the operation without modifying the ledger.
    ///
    /// Opens a nested transaction over `ltx_outer` that is rolled back on
    /// every path, so validation is observationally read-only at every
    /// layer.
    pub fn check_valid(
        &mut self,
        checker: &mut dyn SignatureChecker,
        ltx_outer: &dyn AbstractLedgerTxnParent,
        for_apply: bool,
    ) -> Result<bool> {
        let ltx = LedgerTxn::open(ltx_outer)?;
        let ledger_version = ltx.get_header().ledger_version;

        if !self.handler.is_version_supported(ledger_version) {
            self.result = Some(OperationResultCode::NotSupported);
            return Ok(false);
        }

        if !for_apply || ledger_version < FRAME_DRIVEN_SIGNATURES_VERSION {
            if !self.check_signature(checker, &ltx, for_apply)? {
                return Ok(false);
            }
        } else {
            // The outer transaction frame has already verified signatures;
            // only the source account's existence matters here.
            let key = LedgerKey::Account(self.source_id());
            if ltx.load_without_record(&key)?.is_none() {
                self.result = Some(OperationResultCode::NoAccount);
                return Ok(false);
            }
        }

        self.result = Some(OperationResultCode::Inner);
        self.handler.check_well_formed(ledger_version)
        // ltx drops here, rolling back anything the checks loaded
    }

    /// Re-validates and, on success, applies the operation's mutations to
    /// `ltx`.
    pub fn apply(
        &mut self,
        checker: &mut dyn SignatureChecker,
        ltx: &LedgerTxn<'_>,
    ) -> Result<bool> {
        trace!("applying operation");
        if !self.check_valid(checker, ltx, true)? {
            return Ok(false);
        }
        self.handler.apply_changes(ltx)
    }

    fn check_signature(
        &mut self,
        checker: &mut dyn SignatureChecker,
        ltx: &LedgerTxn<'_>,
        for_apply: bool,
    ) -> Result<bool> {
        let key = LedgerKey::Account(self.source_id());
        match ltx.load(&key)? {
            Some(handle) => {
                let account = handle
                    .current()
                    .as_account()
                    .cloned()
                    .ok_or_else(|| TxError::Internal("source key is not an account".into()))?;
                drop(handle);
                let needed = self
                    .handler
                    .threshold_level()
                    .needed_weight(&account.thresholds);
                if !checker.check_signature(&account, needed) {
                    self.result = Some(OperationResultCode::BadAuth);
                    return Ok(false);
                }
                Ok(true)
            }
            None => {
                if for_apply || self.handler.source_account().is_none() {
                    self.result = Some(OperationResultCode::NoAccount);
                    return Ok(false);
                }
                if !checker.check_signature_no_account(&self.source_id()) {
                    self.result = Some(OperationResultCode::BadAuth);
                    return Ok(false);
                }
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::{
        AccountEntry, DataEntry, LedgerEntry, LedgerEntryData, Thresholds,
    };
    use strata_db::Database;
    use strata_ledger::{LedgerTxnRoot, RootConfig};

    struct AcceptAll;

    impl SignatureChecker for AcceptAll {
        fn check_signature(&mut self, _account: &AccountEntry, _needed_weight: u8) -> bool {
            true
        }
        fn check_signature_no_account(&mut self, _source: &AccountId) -> bool {
            true
        }
    }

    struct RejectAll;

    impl SignatureChecker for RejectAll {
        fn check_signature(&mut self, _account: &AccountEntry, _needed_weight: u8) -> bool {
            false
        }
        fn check_signature_no_account(&mut self, _source: &AccountId) -> bool {
            false
        }
    }

    struct TestOp {
        supported: bool,
        well_formed: bool,
        source: Option<AccountId>,
    }

    impl TestOp {
        fn new() -> Self {
            Self {
                supported: true,
                well_formed: true,
                source: None,
            }
        }
    }

    impl OperationHandler for TestOp {
        fn is_version_supported(&self, _ledger_version: u32) -> bool {
            self.supported
        }
        fn source_account(&self) -> Option<&AccountId> {
            self.source.as_ref()
        }
        fn check_well_formed(&mut self, _ledger_version: u32) -> Result<bool> {
            Ok(self.well_formed)
        }
        fn apply_changes(&mut self, ltx: &LedgerTxn<'_>) -> Result<bool> {
            ltx.create(LedgerEntry::new(LedgerEntryData::Data(DataEntry {
                account_id: source(),
                data_name: "applied".to_string(),
                data_value: vec![1],
            })))?;
            Ok(true)
        }
    }

    fn source() -> AccountId {
        AccountId([1; 32])
    }

    fn source_entry() -> LedgerEntry {
        LedgerEntry::new(LedgerEntryData::Account(AccountEntry {
            account_id: source(),
            balance: 1_000_000,
            seq_num: 1,
            num_sub_entries: 0,
            inflation_dest: None,
            flags: 0,
            home_domain: String::new(),
            thresholds: Thresholds([1, 1, 2, 3]),
            signers: Vec::new(),
        }))
    }

    fn root_with_source(config: RootConfig) -> LedgerTxnRoot {
        let db = Database::open_in_memory().unwrap();
        let root = LedgerTxnRoot::open(db, config).unwrap();
        {
            let ltx = LedgerTxn::open(&root).unwrap();
            ltx.create(source_entry()).unwrap();
            ltx.commit().unwrap();
        }
        root
    }

    fn set_ledger_version(root: &LedgerTxnRoot, version: u32) {
        let ltx = LedgerTxn::open(root).unwrap();
        {
            let header = ltx.load_header().unwrap();
            header.current_mut().ledger_version = version;
        }
        ltx.commit().unwrap();
    }

    #[test]
    fn test_not_supported() {
        let root = root_with_source(RootConfig::default());
        let ltx = LedgerTxn::open(&root).unwrap();
        let mut frame = OperationFrame::new(
            TestOp {
                supported: false,
                ..TestOp::new()
            },
            source(),
        );
        assert!(!frame.check_valid(&mut AcceptAll, &ltx, false).unwrap());
        assert_eq!(frame.result_code(), Some(OperationResultCode::NotSupported));
    }

    #[test]
    fn test_bad_auth_before_version_10() {
        let root = root_with_source(RootConfig::default());
        let ltx = LedgerTxn::open(&root).unwrap();
        let mut frame = OperationFrame::new(TestOp::new(), source());
        assert!(!frame.check_valid(&mut RejectAll, &ltx, true).unwrap());
        assert_eq!(frame.result_code(), Some(OperationResultCode::BadAuth));
    }

    #[test]
    fn test_no_account_for_apply() {
        let db = Database::open_in_memory().unwrap();
        let root = LedgerTxnRoot::open(db, RootConfig::default()).unwrap();
        let ltx = LedgerTxn::open(&root).unwrap();
        let mut frame = OperationFrame::new(TestOp::new(), source());
        assert!(!frame.check_valid(&mut AcceptAll, &ltx, true).unwrap());
        assert_eq!(frame.result_code(), Some(OperationResultCode::NoAccount));
    }

    #[test]
    fn test_missing_account_checks_tx_signatures_when_not_applying() {
        // Source account absent and the op has no explicit source: always
        // rejected. With an explicit source and not applying, the checker
        // decides.
        let db = Database::open_in_memory().unwrap();
        let root = LedgerTxnRoot::open(db, RootConfig::default()).unwrap();
        let ltx = LedgerTxn::open(&root).unwrap();

        let mut frame = OperationFrame::new(TestOp::new(), source());
        assert!(!frame.check_valid(&mut AcceptAll, &ltx, false).unwrap());
        assert_eq!(frame.result_code(), Some(OperationResultCode::NoAccount));

        let mut frame = OperationFrame::new(
            TestOp {
                source: Some(source()),
                ..TestOp::new()
            },
            AccountId([2; 32]),
        );
        assert!(frame.check_valid(&mut AcceptAll, &ltx, false).unwrap());
        assert_eq!(frame.result_code(), Some(OperationResultCode::Inner));
    }

    #[test]
    fn test_version_10_skips_signature_check_for_apply() {
        let root = root_with_source(RootConfig::default());
        set_ledger_version(&root, 10);
        let ltx = LedgerTxn::open(&root).unwrap();
        // The checker rejects everything, but from version 10 apply-side
        // validation only requires the account to exist.
        let mut frame = OperationFrame::new(TestOp::new(), source());
        assert!(frame.check_valid(&mut RejectAll, &ltx, true).unwrap());
        assert_eq!(frame.result_code(), Some(OperationResultCode::Inner));
        // Not applying still verifies signatures.
        let mut frame = OperationFrame::new(TestOp::new(), source());
        assert!(!frame.check_valid(&mut RejectAll, &ltx, false).unwrap());
        assert_eq!(frame.result_code(), Some(OperationResultCode::BadAuth));
    }

    #[test]
    fn test_check_valid_is_observationally_read_only() {
        for config in [
            RootConfig::default(),
            RootConfig {
                entry_cache_size: 0,
                best_offers_cache_size: 0,
            },
        ] {
            let root = root_with_source(config);
            let ltx = LedgerTxn::open(&root).unwrap();
            let mut frame = OperationFrame::new(TestOp::new(), source());
            assert!(frame.check_valid(&mut AcceptAll, &ltx, true).unwrap());
            // The outer transaction's delta is untouched by validation.
            let delta = ltx.get_delta().unwrap();
            assert!(delta.entries.is_empty());
        }
    }

    #[test]
    fn test_apply_runs_handler_after_validation() {
        let root = root_with_source(RootConfig::default());
        let ltx = LedgerTxn::open(&root).unwrap();
        let mut frame = OperationFrame::new(TestOp::new(), source());
        assert!(frame.apply(&mut AcceptAll, &ltx).unwrap());
        let delta = ltx.get_delta().unwrap();
        assert_eq!(delta.entries.len(), 1);
    }

    #[test]
    fn test_apply_stops_on_failed_validation() {
        let root = root_with_source(RootConfig::default());
        let ltx = LedgerTxn::open(&root).unwrap();
        let mut frame = OperationFrame::new(TestOp::new(), source());
        assert!(!frame.apply(&mut RejectAll, &ltx).unwrap());
        assert_eq!(frame.result_code(), Some(OperationResultCode::BadAuth));
        let delta = ltx.get_delta().unwrap();
        assert!(delta.entries.is_empty());
    }

    #[test]
    fn test_ill_formed_operation() {
        let root = root_with_source(RootConfig::default());
        let ltx = LedgerTxn::open(&root).unwrap();
        let mut frame = OperationFrame::new(
            TestOp {
                well_formed: false,
                ..TestOp::new()
            },
            source(),
        );
        assert!(!frame.check_valid(&mut AcceptAll, &ltx, false).unwrap());
        // Frame-level checks passed; the rejection is operation-specific.
        assert_eq!(frame.result_code(), Some(OperationResultCode::Inner));
    }
}
