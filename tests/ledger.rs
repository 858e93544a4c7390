//! Tests for the transaction ledger: correlation, status transitions, and
//! the delivery audit trail.

use rusqlite::params;

mod common;
use common::*;

use payrail::correlation;
use payrail::gateway::MidtransNotification;

fn notification(order_id: &str, transaction_id: Option<&str>) -> MidtransNotification {
    MidtransNotification {
        order_id: order_id.to_string(),
        status_code: "200".to_string(),
        gross_amount: "464000.00".to_string(),
        transaction_status: "settlement".to_string(),
        transaction_id: transaction_id.map(String::from),
        fraud_status: None,
        signature_key: None,
        payment_type: Some("credit_card".to_string()),
    }
}

// ============ Correlation ============

#[test]
fn test_correlate_prefers_exact_reference() {
    let conn = setup_test_db();
    let package = create_test_package(&conn, "Pro", 2_900);

    let exact = create_pending_transaction(
        &conn,
        "CORE-1712000000000-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "core_api",
    );
    // A second row whose metadata happens to contain the same order id
    let decoy = create_pending_transaction(
        &conn,
        "CORE-1712000000001-usr_b",
        "usr_b",
        &package.id,
        464_000,
        "core_api",
    );
    conn.execute(
        "UPDATE transactions SET metadata = ?1 WHERE id = ?2",
        params![
            r#"{"migrated_from":"CORE-1712000000000-usr_a"}"#,
            &decoy.id
        ],
    )
    .unwrap();

    let (found, strategy) = correlation::correlate(
        &conn,
        &notification("CORE-1712000000000-usr_a", Some("midtrans-txn-1")),
    )
    .unwrap()
    .expect("should correlate");

    assert_eq!(found.id, exact.id);
    assert_eq!(strategy, "exact_reference");
}

#[test]
fn test_correlate_falls_back_to_metadata() {
    let conn = setup_test_db();
    let package = create_test_package(&conn, "Pro", 2_900);

    let transaction = create_pending_transaction(
        &conn,
        "CORE-1712000000000-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "core_api",
    );
    // Older builds stored the gateway-side order id inside the metadata blob
    conn.execute(
        "UPDATE transactions SET metadata = ?1 WHERE id = ?2",
        params![
            r#"{"legacy_order_id":"LEGACY-778899","original_currency":"IDR"}"#,
            &transaction.id
        ],
    )
    .unwrap();

    let (found, strategy) = correlation::correlate(&conn, &notification("LEGACY-778899", None))
        .unwrap()
        .expect("should correlate through metadata");

    assert_eq!(found.id, transaction.id);
    assert_eq!(strategy, "metadata");
}

#[test]
fn test_correlate_metadata_picks_newest_row() {
    let conn = setup_test_db();
    let package = create_test_package(&conn, "Pro", 2_900);

    let older = create_pending_transaction(
        &conn,
        "CORE-1-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "core_api",
    );
    let newer = create_pending_transaction(
        &conn,
        "CORE-2-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "core_api",
    );
    for (id, created_at) in [(&older.id, 1_000_000_i64), (&newer.id, 2_000_000_i64)] {
        conn.execute(
            "UPDATE transactions SET metadata = ?1, created_at = ?2 WHERE id = ?3",
            params![r#"{"legacy_order_id":"LEGACY-SAME"}"#, created_at, id],
        )
        .unwrap();
    }

    let (found, _) = correlation::correlate(&conn, &notification("LEGACY-SAME", None))
        .unwrap()
        .expect("should correlate");

    assert_eq!(found.id, newer.id);
}

#[test]
fn test_correlate_falls_back_to_gateway_transaction_id() {
    let conn = setup_test_db();
    let package = create_test_package(&conn, "Pro", 2_900);

    let transaction = create_pending_transaction(
        &conn,
        "SNAP-1712000000000-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "snap",
    );
    queries::set_gateway_transaction_id(&conn, &transaction.id, "midtrans-abc-123").unwrap();

    // The notification claims an order id we never issued, but carries the
    // gateway transaction id we stored earlier
    let (found, strategy) = correlation::correlate(
        &conn,
        &notification("UNKNOWN-ORDER", Some("midtrans-abc-123")),
    )
    .unwrap()
    .expect("should correlate through the gateway transaction id");

    assert_eq!(found.id, transaction.id);
    assert_eq!(strategy, "gateway_transaction_id");
}

#[test]
fn test_correlate_empty_transaction_id_is_not_a_wildcard() {
    let conn = setup_test_db();
    let package = create_test_package(&conn, "Pro", 2_900);

    let transaction = create_pending_transaction(
        &conn,
        "SNAP-1712000000000-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "snap",
    );
    queries::set_gateway_transaction_id(&conn, &transaction.id, "midtrans-abc-123").unwrap();

    // instr() would match the empty needle against every row
    let result = correlation::correlate(&conn, &notification("UNKNOWN-ORDER", Some(""))).unwrap();
    assert!(result.is_none());
}

#[test]
fn test_correlate_unknown_notification_returns_none() {
    let conn = setup_test_db();
    let package = create_test_package(&conn, "Pro", 2_900);
    create_pending_transaction(
        &conn,
        "CORE-1712000000000-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "core_api",
    );

    let result =
        correlation::correlate(&conn, &notification("CORE-something-else", None)).unwrap();
    assert!(result.is_none());
}

// ============ Status transitions ============

#[test]
fn test_apply_status_pending_to_completed() {
    let conn = setup_test_db();
    let package = create_test_package(&conn, "Pro", 2_900);
    let transaction = create_pending_transaction(
        &conn,
        "CORE-1-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "core_api",
    );

    let applied = queries::try_apply_status(
        &conn,
        &transaction.id,
        TransactionStatus::Completed,
        r#"{"transaction_status":"settlement"}"#,
    )
    .unwrap();
    assert!(applied);

    let row = queries::get_transaction_by_id(&conn, &transaction.id)
        .unwrap()
        .unwrap();
    assert_eq!(row.status, TransactionStatus::Completed);
    assert!(row.processed_at.is_some());
    assert_eq!(
        row.raw_gateway_response.as_deref(),
        Some(r#"{"transaction_status":"settlement"}"#)
    );
}

#[test]
fn test_apply_status_completed_is_absorbing() {
    let conn = setup_test_db();
    let package = create_test_package(&conn, "Pro", 2_900);
    let transaction = create_pending_transaction(
        &conn,
        "CORE-1-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "core_api",
    );

    assert!(
        queries::try_apply_status(&conn, &transaction.id, TransactionStatus::Completed, "{}")
            .unwrap()
    );
    // A later failed verdict loses the race and changes nothing
    assert!(
        !queries::try_apply_status(&conn, &transaction.id, TransactionStatus::Failed, "{}")
            .unwrap()
    );

    let row = queries::get_transaction_by_id(&conn, &transaction.id)
        .unwrap()
        .unwrap();
    assert_eq!(row.status, TransactionStatus::Completed);
}

#[test]
fn test_apply_status_review_only_claims_pending_rows() {
    let conn = setup_test_db();
    let package = create_test_package(&conn, "Pro", 2_900);
    let transaction = create_pending_transaction(
        &conn,
        "CORE-1-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "core_api",
    );

    assert!(
        queries::try_apply_status(&conn, &transaction.id, TransactionStatus::Review, "{}")
            .unwrap()
    );
    // Redelivered challenge: row is already in review
    assert!(
        !queries::try_apply_status(&conn, &transaction.id, TransactionStatus::Review, "{}")
            .unwrap()
    );

    let row = queries::get_transaction_by_id(&conn, &transaction.id)
        .unwrap()
        .unwrap();
    assert_eq!(row.status, TransactionStatus::Review);
    assert!(row.processed_at.is_none(), "review is not terminal");

    // Review resolves to a terminal state
    assert!(
        queries::try_apply_status(&conn, &transaction.id, TransactionStatus::Completed, "{}")
            .unwrap()
    );
    let row = queries::get_transaction_by_id(&conn, &transaction.id)
        .unwrap()
        .unwrap();
    assert_eq!(row.status, TransactionStatus::Completed);
    assert!(row.processed_at.is_some());
}

#[test]
fn test_apply_status_pending_target_never_moves_the_row() {
    let conn = setup_test_db();
    let package = create_test_package(&conn, "Pro", 2_900);
    let transaction = create_pending_transaction(
        &conn,
        "CORE-1-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "core_api",
    );

    assert!(
        !queries::try_apply_status(&conn, &transaction.id, TransactionStatus::Pending, "{}")
            .unwrap()
    );

    let row = queries::get_transaction_by_id(&conn, &transaction.id)
        .unwrap()
        .unwrap();
    assert_eq!(row.status, TransactionStatus::Pending);
    assert!(
        row.raw_gateway_response.is_none(),
        "a no-op transition must leave the row untouched"
    );
}

#[test]
fn test_apply_status_failed_is_terminal() {
    let conn = setup_test_db();
    let package = create_test_package(&conn, "Pro", 2_900);
    let transaction = create_pending_transaction(
        &conn,
        "CORE-1-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "core_api",
    );

    assert!(
        queries::try_apply_status(&conn, &transaction.id, TransactionStatus::Failed, "{}")
            .unwrap()
    );
    assert!(
        !queries::try_apply_status(&conn, &transaction.id, TransactionStatus::Completed, "{}")
            .unwrap(),
        "failed rows do not come back to life"
    );
}

// ============ Verification and backfill stamps ============

#[test]
fn test_mark_transaction_verified_keeps_first_timestamp() {
    let conn = setup_test_db();
    let package = create_test_package(&conn, "Pro", 2_900);
    let transaction = create_pending_transaction(
        &conn,
        "CORE-1-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "core_api",
    );

    conn.execute(
        "UPDATE transactions SET verified_at = 1712000000 WHERE id = ?1",
        params![&transaction.id],
    )
    .unwrap();

    queries::mark_transaction_verified(&conn, &transaction.id).unwrap();

    let row = queries::get_transaction_by_id(&conn, &transaction.id)
        .unwrap()
        .unwrap();
    assert_eq!(row.verified_at, Some(1_712_000_000));
}

#[test]
fn test_set_gateway_transaction_id_first_writer_wins() {
    let conn = setup_test_db();
    let package = create_test_package(&conn, "Pro", 2_900);
    let transaction = create_pending_transaction(
        &conn,
        "SNAP-1-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "snap",
    );

    queries::set_gateway_transaction_id(&conn, &transaction.id, "midtrans-first").unwrap();
    queries::set_gateway_transaction_id(&conn, &transaction.id, "midtrans-second").unwrap();

    let row = queries::get_transaction_by_id(&conn, &transaction.id)
        .unwrap()
        .unwrap();
    assert_eq!(row.gateway_transaction_id.as_deref(), Some("midtrans-first"));
}

#[test]
fn test_attach_gateway_reference_fills_charge_results() {
    let conn = setup_test_db();
    let package = create_test_package(&conn, "Pro", 2_900);
    let transaction = create_pending_transaction(
        &conn,
        "CORE-1-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "core_api",
    );

    queries::attach_gateway_reference(
        &conn,
        "CORE-1-usr_a",
        Some("midtrans-txn-9"),
        r#"{"status_code":"200"}"#,
        None,
    )
    .unwrap();

    let row = queries::get_transaction_by_id(&conn, &transaction.id)
        .unwrap()
        .unwrap();
    assert_eq!(row.gateway_transaction_id.as_deref(), Some("midtrans-txn-9"));
    assert_eq!(
        row.raw_gateway_response.as_deref(),
        Some(r#"{"status_code":"200"}"#)
    );
    assert_eq!(
        row.metadata, transaction.metadata,
        "metadata stays put unless the caller passes a replacement"
    );
}

// ============ Delivery audit trail ============

#[test]
fn test_deliveries_list_in_arrival_order() {
    let conn = setup_test_db();
    let package = create_test_package(&conn, "Pro", 2_900);
    let transaction = create_pending_transaction(
        &conn,
        "CORE-1-usr_a",
        "usr_a",
        &package.id,
        464_000,
        "core_api",
    );

    for outcome in [
        DeliveryOutcome::Rejected,
        DeliveryOutcome::Applied,
        DeliveryOutcome::Duplicate,
    ] {
        queries::record_webhook_delivery(
            &conn,
            Some(&transaction.id),
            Some("CORE-1-usr_a"),
            Some("signature"),
            outcome,
            "{}",
        )
        .unwrap();
    }
    // An orphan for some other order must not show up in this list
    queries::record_webhook_delivery(
        &conn,
        None,
        Some("CORE-other"),
        None,
        DeliveryOutcome::Orphaned,
        "{}",
    )
    .unwrap();

    let deliveries = queries::list_deliveries_for_transaction(&conn, &transaction.id).unwrap();
    assert_eq!(deliveries.len(), 3);
    assert_eq!(deliveries[0].outcome, DeliveryOutcome::Rejected);
    assert_eq!(deliveries[1].outcome, DeliveryOutcome::Applied);
    assert_eq!(deliveries[2].outcome, DeliveryOutcome::Duplicate);
    assert!(deliveries.iter().all(|d| d.order_id.as_deref() == Some("CORE-1-usr_a")));
}
