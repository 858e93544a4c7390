use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use rusqlite::Connection;
use serde_json::{json, Value};

use crate::correlation;
use crate::db::{queries, AppState};
use crate::error::AppError;
use crate::gateway::{self, MidtransNotification, VerificationMode};
use crate::models::{DeliveryOutcome, TransactionStatus};
use crate::status::map_gateway_status;
use crate::subscription;

/// What the processor sees in answer to a notification.
pub type WebhookResult = (StatusCode, Json<Value>);

/// Acknowledgement body the gateway expects, for first applies and
/// idempotent no-ops alike.
fn acknowledge() -> WebhookResult {
    (StatusCode::OK, Json(json!({ "status": "OK" })))
}

fn refuse(status: StatusCode, message: &str) -> WebhookResult {
    (status, Json(json!({ "error": message })))
}

/// Every delivery lands in the audit trail, including the ones we reject.
/// Failing to record one must not change the response the gateway sees.
fn record_delivery(
    conn: &Connection,
    transaction_id: Option<&str>,
    order_id: Option<&str>,
    verification: Option<VerificationMode>,
    outcome: DeliveryOutcome,
    raw_body: &str,
) {
    if let Err(e) = queries::record_webhook_delivery(
        conn,
        transaction_id,
        order_id,
        verification.map(|v| v.as_str()),
        outcome,
        raw_body,
    ) {
        tracing::warn!("Failed to record webhook delivery: {}", e);
    }
}

/// Handler for Midtrans payment notifications.
///
/// The body is untrusted until verified: direct charges are checked by
/// recomputing the payload signature, hosted checkout by re-fetching the
/// authoritative status from the gateway. Status transitions go through a
/// single-row compare-and-set, so redelivered notifications are safe to
/// process again - they settle as no-ops.
pub async fn handle_midtrans_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> WebhookResult {
    let raw_body = String::from_utf8_lossy(&body).into_owned();

    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("DB connection error: {}", e);
            return refuse(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    let notification: MidtransNotification = match serde_json::from_slice(&body) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!("Failed to parse Midtrans notification: {}", e);
            record_delivery(&conn, None, None, None, DeliveryOutcome::Rejected, &raw_body);
            return refuse(StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    let (mut transaction, strategy) = match correlation::correlate(&conn, &notification) {
        Ok(Some(found)) => found,
        Ok(None) => {
            tracing::warn!(
                order_id = %notification.order_id,
                "notification does not match any transaction"
            );
            record_delivery(
                &conn,
                None,
                Some(&notification.order_id),
                None,
                DeliveryOutcome::Orphaned,
                &raw_body,
            );
            return refuse(StatusCode::NOT_FOUND, "Transaction not found");
        }
        Err(e) => {
            tracing::error!("DB error during correlation: {}", e);
            return refuse(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    let metadata = transaction.parsed_metadata();
    let mode = gateway::verification_for(
        &transaction.payment_method,
        metadata.payment_gateway_type.as_deref(),
    );

    tracing::info!(
        order_id = %notification.order_id,
        transaction_id = %transaction.id,
        strategy,
        verification = mode.as_str(),
        gateway_status = %notification.transaction_status,
        "processing payment notification"
    );

    // Verification yields the (status, fraud_status) pair we are willing to
    // act on, plus the blob that becomes the row's raw_gateway_response.
    let (gateway_status, fraud_status, trusted_raw) = match mode {
        VerificationMode::Signature => {
            let Some(signature) = notification.signature_key.as_deref() else {
                record_delivery(
                    &conn,
                    Some(&transaction.id),
                    Some(&notification.order_id),
                    Some(mode),
                    DeliveryOutcome::Rejected,
                    &raw_body,
                );
                return refuse(StatusCode::BAD_REQUEST, "Missing signature_key");
            };

            if !state.gateway.verify_notification_signature(&notification, signature) {
                tracing::warn!(
                    order_id = %notification.order_id,
                    "notification signature mismatch"
                );
                record_delivery(
                    &conn,
                    Some(&transaction.id),
                    Some(&notification.order_id),
                    Some(mode),
                    DeliveryOutcome::Rejected,
                    &raw_body,
                );
                return refuse(StatusCode::BAD_REQUEST, "Invalid signature");
            }

            (
                notification.transaction_status.clone(),
                notification.fraud_status.clone(),
                raw_body.clone(),
            )
        }
        VerificationMode::StatusFetch => {
            match state.gateway.fetch_transaction_status(&notification.order_id).await {
                Ok((fetched, raw)) => (fetched.transaction_status, fetched.fraud_status, raw),
                Err(AppError::GatewayRejected(e)) => {
                    // The gateway does not know this order; whatever sent
                    // the notification, it was not Midtrans.
                    tracing::warn!(
                        order_id = %notification.order_id,
                        "status verification failed: {}",
                        e
                    );
                    record_delivery(
                        &conn,
                        Some(&transaction.id),
                        Some(&notification.order_id),
                        Some(mode),
                        DeliveryOutcome::Rejected,
                        &raw_body,
                    );
                    return refuse(StatusCode::BAD_REQUEST, "Status verification failed");
                }
                Err(e) => {
                    tracing::error!(
                        order_id = %notification.order_id,
                        "status fetch failed: {}",
                        e
                    );
                    record_delivery(
                        &conn,
                        Some(&transaction.id),
                        Some(&notification.order_id),
                        Some(mode),
                        DeliveryOutcome::Error,
                        &raw_body,
                    );
                    // 5xx so the gateway redelivers once we are reachable
                    return refuse(StatusCode::INTERNAL_SERVER_ERROR, "Gateway unavailable");
                }
            }
        }
    };

    // Hosted checkout rows learn their gateway transaction id here; the
    // charge response already filled it in for direct charges.
    if transaction.gateway_transaction_id.is_none() {
        if let Some(gateway_id) = notification.transaction_id.as_deref() {
            match queries::set_gateway_transaction_id(&conn, &transaction.id, gateway_id) {
                Ok(()) => transaction.gateway_transaction_id = Some(gateway_id.to_string()),
                Err(e) => tracing::warn!("Failed to store gateway transaction id: {}", e),
            }
        }
    }

    if let Err(e) = queries::mark_transaction_verified(&conn, &transaction.id) {
        tracing::error!("Failed to mark transaction verified: {}", e);
        return refuse(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
    }

    let mapped = map_gateway_status(&gateway_status, fraud_status.as_deref());

    match queries::try_apply_status(&conn, &transaction.id, mapped, &trusted_raw) {
        Ok(true) => {
            if mapped == TransactionStatus::Completed {
                // The completed transition has been won exactly once, so
                // this cannot double-activate. A failure here is logged and
                // swallowed: redelivery would no-op against the CAS, so a
                // retry could never reach this branch again.
                if let Err(e) = subscription::activate(&conn, &transaction) {
                    tracing::error!(
                        transaction_id = %transaction.id,
                        user_id = %transaction.user_id,
                        "subscription activation failed after completed payment: {}",
                        e
                    );
                }
            }
            record_delivery(
                &conn,
                Some(&transaction.id),
                Some(&notification.order_id),
                Some(mode),
                DeliveryOutcome::Applied,
                &raw_body,
            );
            acknowledge()
        }
        Ok(false) => {
            tracing::info!(
                transaction_id = %transaction.id,
                order_id = %notification.order_id,
                "redelivered notification settled as a no-op"
            );
            record_delivery(
                &conn,
                Some(&transaction.id),
                Some(&notification.order_id),
                Some(mode),
                DeliveryOutcome::Duplicate,
                &raw_body,
            );
            acknowledge()
        }
        Err(e) => {
            tracing::error!("Failed to apply status: {}", e);
            refuse(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}
