use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::{AppError, Result};
use crate::id::EntityType;
use crate::models::*;

use super::from_row::{
    query_all, query_one, PACKAGE_COLS, SUBSCRIPTION_COLS, TRANSACTION_COLS, USER_PACKAGE_COLS,
    WEBHOOK_DELIVERY_COLS,
};

pub fn now() -> i64 {
    Utc::now().timestamp()
}

// ============ Packages ============

pub fn create_package(conn: &Connection, input: &CreatePackage) -> Result<Package> {
    let id = EntityType::Package.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO packages (id, name, active, base_price_cents, pricing_tiers, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &id,
            &input.name,
            input.active as i32,
            input.base_price_cents,
            &input.pricing_tiers,
            now
        ],
    )?;

    Ok(Package {
        id,
        name: input.name.clone(),
        active: input.active,
        base_price_cents: input.base_price_cents,
        pricing_tiers: input.pricing_tiers.clone(),
        created_at: now,
    })
}

pub fn get_package_by_id(conn: &Connection, id: &str) -> Result<Option<Package>> {
    query_one(
        conn,
        &format!("SELECT {} FROM packages WHERE id = ?1", PACKAGE_COLS),
        &[&id],
    )
}

pub fn count_packages(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM packages", [], |row| row.get(0))?;
    Ok(count)
}

// ============ Transactions ============

/// Insert the pending ledger row for a charge attempt. Called before the
/// gateway is contacted so every external charge has a local anchor.
pub fn create_pending_transaction(
    conn: &Connection,
    input: &CreateTransaction,
) -> Result<Transaction> {
    let id = EntityType::Transaction.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO transactions (id, payment_reference, user_id, package_id, gateway_id,
            amount, currency, payment_method, status, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'pending', ?9, ?10)",
        params![
            &id,
            &input.payment_reference,
            &input.user_id,
            &input.package_id,
            &input.gateway_id,
            input.amount,
            &input.currency,
            &input.payment_method,
            &input.metadata,
            now
        ],
    )?;

    Ok(Transaction {
        id,
        payment_reference: input.payment_reference.clone(),
        user_id: input.user_id.clone(),
        package_id: input.package_id.clone(),
        gateway_id: input.gateway_id.clone(),
        amount: input.amount,
        currency: input.currency.clone(),
        payment_method: input.payment_method.clone(),
        status: TransactionStatus::Pending,
        gateway_transaction_id: None,
        raw_gateway_response: None,
        metadata: input.metadata.clone(),
        created_at: now,
        processed_at: None,
        verified_at: None,
    })
}

/// Record what the charge call returned. Never touches `status`.
pub fn attach_gateway_reference(
    conn: &Connection,
    payment_reference: &str,
    gateway_transaction_id: Option<&str>,
    raw_response: &str,
    metadata: Option<&str>,
) -> Result<()> {
    let affected = match metadata {
        Some(meta) => conn.execute(
            "UPDATE transactions SET gateway_transaction_id = ?1, raw_gateway_response = ?2, metadata = ?3
             WHERE payment_reference = ?4",
            params![gateway_transaction_id, raw_response, meta, payment_reference],
        )?,
        None => conn.execute(
            "UPDATE transactions SET gateway_transaction_id = ?1, raw_gateway_response = ?2
             WHERE payment_reference = ?3",
            params![gateway_transaction_id, raw_response, payment_reference],
        )?,
    };

    if affected == 0 {
        return Err(AppError::NotFound(format!(
            "Transaction not found: {}",
            payment_reference
        )));
    }
    Ok(())
}

pub fn get_transaction_by_id(conn: &Connection, id: &str) -> Result<Option<Transaction>> {
    query_one(
        conn,
        &format!("SELECT {} FROM transactions WHERE id = ?1", TRANSACTION_COLS),
        &[&id],
    )
}

pub fn get_transaction_by_reference(
    conn: &Connection,
    payment_reference: &str,
) -> Result<Option<Transaction>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM transactions WHERE payment_reference = ?1",
            TRANSACTION_COLS
        ),
        &[&payment_reference],
    )
}

/// Fallback lookup: newest transaction whose metadata blob contains the
/// needle. instr() instead of LIKE so the needle cannot smuggle wildcards.
pub fn find_transaction_by_metadata(
    conn: &Connection,
    needle: &str,
) -> Result<Option<Transaction>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM transactions
             WHERE metadata IS NOT NULL AND instr(metadata, ?1) > 0
             ORDER BY created_at DESC LIMIT 1",
            TRANSACTION_COLS
        ),
        &[&needle],
    )
}

/// Fallback lookup: newest transaction whose gateway transaction id contains
/// the needle.
pub fn find_transaction_by_gateway_id(
    conn: &Connection,
    needle: &str,
) -> Result<Option<Transaction>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM transactions
             WHERE gateway_transaction_id IS NOT NULL AND instr(gateway_transaction_id, ?1) > 0
             ORDER BY created_at DESC LIMIT 1",
            TRANSACTION_COLS
        ),
        &[&needle],
    )
}

/// Stamp verified_at the first time a webhook for this row passes
/// authentication. Later verified deliveries leave it unchanged.
pub fn mark_transaction_verified(conn: &Connection, id: &str) -> Result<()> {
    conn.execute(
        "UPDATE transactions SET verified_at = ?1 WHERE id = ?2 AND verified_at IS NULL",
        params![now(), id],
    )?;
    Ok(())
}

/// Backfill the gateway's transaction id once a notification reveals it.
/// First writer wins; the id never changes after that.
pub fn set_gateway_transaction_id(conn: &Connection, id: &str, gateway_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE transactions SET gateway_transaction_id = ?1
         WHERE id = ?2 AND gateway_transaction_id IS NULL",
        params![gateway_id, id],
    )?;
    Ok(())
}

/// Atomically apply a status transition, returning whether this call won the
/// transition.
///
/// Single-row compare-and-set: terminal statuses claim the row only while it
/// is still pending or review, so concurrent duplicate deliveries for the
/// same order id resolve to exactly one winner without a lock. `completed`
/// is absorbing - nothing moves a row out of it.
///
/// Returns:
/// - `Ok(true)` if this call performed the transition (processed_at stamped
///   for terminal statuses)
/// - `Ok(false)` if the row was already at or past the target status; the
///   row is untouched and the caller records the delivery for audit only
pub fn try_apply_status(
    conn: &Connection,
    id: &str,
    new_status: TransactionStatus,
    raw_response: &str,
) -> Result<bool> {
    let affected = match new_status {
        TransactionStatus::Completed | TransactionStatus::Failed => conn.execute(
            "UPDATE transactions SET status = ?1, raw_gateway_response = ?2, processed_at = ?3
             WHERE id = ?4 AND status IN ('pending', 'review')",
            params![new_status.as_str(), raw_response, now(), id],
        )?,
        TransactionStatus::Review => conn.execute(
            "UPDATE transactions SET status = 'review', raw_gateway_response = ?1
             WHERE id = ?2 AND status = 'pending'",
            params![raw_response, id],
        )?,
        // Pending never moves the row anywhere.
        TransactionStatus::Pending => 0,
    };
    Ok(affected > 0)
}

// ============ Subscriptions ============

pub fn create_subscription(conn: &Connection, input: &CreateSubscription) -> Result<Subscription> {
    let id = EntityType::Subscription.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO subscriptions (id, user_id, package_id, billing_period, amount, currency,
            status, started_at, next_billing_date, expires_at, gateway_subscription_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'active', ?7, ?8, ?9, ?10, ?11)",
        params![
            &id,
            &input.user_id,
            &input.package_id,
            input.billing_period.as_str(),
            input.amount,
            &input.currency,
            input.started_at,
            input.next_billing_date,
            input.expires_at,
            &input.gateway_subscription_id,
            now
        ],
    )?;

    Ok(Subscription {
        id,
        user_id: input.user_id.clone(),
        package_id: input.package_id.clone(),
        billing_period: input.billing_period,
        amount: input.amount,
        currency: input.currency.clone(),
        status: SubscriptionStatus::Active,
        started_at: input.started_at,
        next_billing_date: input.next_billing_date,
        expires_at: input.expires_at,
        gateway_subscription_id: input.gateway_subscription_id.clone(),
        created_at: now,
    })
}

pub fn list_subscriptions_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Subscription>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM subscriptions WHERE user_id = ?1 ORDER BY started_at DESC",
            SUBSCRIPTION_COLS
        ),
        &[&user_id],
    )
}

/// Point the user at their package. One row per user, newest activation wins.
pub fn upsert_user_package(
    conn: &Connection,
    user_id: &str,
    package_id: &str,
    expires_at: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO user_packages (user_id, package_id, expires_at, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id) DO UPDATE SET
            package_id = excluded.package_id,
            expires_at = excluded.expires_at,
            updated_at = excluded.updated_at",
        params![user_id, package_id, expires_at, now()],
    )?;
    Ok(())
}

pub fn get_user_package(conn: &Connection, user_id: &str) -> Result<Option<UserPackage>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM user_packages WHERE user_id = ?1",
            USER_PACKAGE_COLS
        ),
        &[&user_id],
    )
}

// ============ Webhook Deliveries ============

/// Append one delivery to the audit trail. Always inserts - duplicates and
/// rejected deliveries are part of the history.
pub fn record_webhook_delivery(
    conn: &Connection,
    transaction_id: Option<&str>,
    order_id: Option<&str>,
    verification: Option<&str>,
    outcome: DeliveryOutcome,
    raw_body: &str,
) -> Result<String> {
    let id = EntityType::WebhookDelivery.gen_id();
    conn.execute(
        "INSERT INTO webhook_deliveries (id, transaction_id, order_id, verification, outcome, raw_body, received_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &id,
            transaction_id,
            order_id,
            verification,
            outcome.as_str(),
            raw_body,
            now()
        ],
    )?;
    Ok(id)
}

pub fn list_deliveries_for_transaction(
    conn: &Connection,
    transaction_id: &str,
) -> Result<Vec<WebhookDelivery>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM webhook_deliveries WHERE transaction_id = ?1 ORDER BY rowid ASC",
            WEBHOOK_DELIVERY_COLS
        ),
        &[&transaction_id],
    )
}
