//! Mapping from gateway transaction vocabulary to ledger status.

use crate::models::TransactionStatus;

/// Map a gateway `transaction_status` (plus `fraud_status` where the gateway
/// sends one) onto the ledger's status vocabulary.
///
/// `capture` alone is not success: the fraud screen decides whether the funds
/// are actually ours (`accept`), held for manual review (`challenge`), or
/// lost. `settlement` is always success. Statuses this build does not know
/// map to `pending` so that a gateway vocabulary addition can never complete
/// a transaction by accident.
pub fn map_gateway_status(
    transaction_status: &str,
    fraud_status: Option<&str>,
) -> TransactionStatus {
    match transaction_status {
        "capture" => match fraud_status {
            Some("accept") => TransactionStatus::Completed,
            Some("challenge") => TransactionStatus::Review,
            _ => TransactionStatus::Failed,
        },
        "settlement" => TransactionStatus::Completed,
        "deny" | "cancel" | "expire" | "failure" => TransactionStatus::Failed,
        "pending" => TransactionStatus::Pending,
        _ => TransactionStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_accept_completes() {
        assert_eq!(
            map_gateway_status("capture", Some("accept")),
            TransactionStatus::Completed
        );
    }

    #[test]
    fn test_capture_challenge_goes_to_review() {
        assert_eq!(
            map_gateway_status("capture", Some("challenge")),
            TransactionStatus::Review
        );
    }

    #[test]
    fn test_capture_without_fraud_verdict_fails() {
        assert_eq!(
            map_gateway_status("capture", None),
            TransactionStatus::Failed
        );
        assert_eq!(
            map_gateway_status("capture", Some("deny")),
            TransactionStatus::Failed
        );
    }

    #[test]
    fn test_settlement_completes() {
        assert_eq!(
            map_gateway_status("settlement", None),
            TransactionStatus::Completed
        );
        // fraud_status is irrelevant once settled
        assert_eq!(
            map_gateway_status("settlement", Some("challenge")),
            TransactionStatus::Completed
        );
    }

    #[test]
    fn test_terminal_failures() {
        for status in ["deny", "cancel", "expire", "failure"] {
            assert_eq!(
                map_gateway_status(status, None),
                TransactionStatus::Failed,
                "{status} should map to failed"
            );
        }
    }

    #[test]
    fn test_pending_stays_pending() {
        assert_eq!(
            map_gateway_status("pending", None),
            TransactionStatus::Pending
        );
    }

    #[test]
    fn test_unknown_status_never_completes() {
        for status in ["authorize", "refund", "partial_refund", "chargeback", ""] {
            assert_eq!(
                map_gateway_status(status, Some("accept")),
                TransactionStatus::Pending,
                "{status} must map to pending"
            );
        }
    }
}
