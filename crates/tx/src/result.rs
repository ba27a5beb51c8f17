//! Operation result codes and threshold levels.

/// Outcome of validating or applying one operation, as observed by the
/// block-apply driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResultCode {
    /// The operation passed frame-level checks; an operation-specific
    /// sub-result follows.
    Inner,
    /// The signatures on the transaction do not meet the operation's
    /// threshold.
    BadAuth,
    /// The operation's source account does not exist.
    NoAccount,
    /// The current ledger version rejects this operation type.
    NotSupported,
}

/// The signature threshold an operation requires on its source account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdLevel {
    Low,
    Medium,
    High,
}

impl ThresholdLevel {
    /// The required weight for this level on `thresholds`.
    pub fn needed_weight(&self, thresholds: &strata_common::Thresholds) -> u8 {
        match self {
            ThresholdLevel::Low => thresholds.low(),
            ThresholdLevel::Medium => thresholds.medium(),
            ThresholdLevel::High => thresholds.high(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::Thresholds;

    #[test]
    fn test_needed_weight_per_level() {
        let thresholds = Thresholds([1, 2, 3, 4]);
        assert_eq!(ThresholdLevel::Low.needed_weight(&thresholds), 2);
        assert_eq!(ThresholdLevel::Medium.needed_weight(&thresholds), 3);
        assert_eq!(ThresholdLevel::High.needed_weight(&thresholds), 4);
    }
}
