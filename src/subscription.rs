//! Subscription activation for completed purchases.

use chrono::{DateTime, Months, TimeDelta};
use rusqlite::Connection;

use crate::db::queries;
use crate::error::Result;
use crate::models::{BillingPeriod, CreateSubscription, Subscription, Transaction};

/// End of the billing period that starts at `started_at` (unix seconds).
///
/// Month-based periods use calendar arithmetic, so Jan 31 + 1 month lands on
/// the last day of February rather than overflowing into March.
pub fn period_end(started_at: i64, period: BillingPeriod) -> i64 {
    let Some(start) = DateTime::from_timestamp(started_at, 0) else {
        return started_at;
    };
    let end = match period {
        BillingPeriod::Weekly => start.checked_add_signed(TimeDelta::days(7)),
        BillingPeriod::Monthly => start.checked_add_months(Months::new(1)),
        BillingPeriod::Quarterly => start.checked_add_months(Months::new(3)),
        BillingPeriod::Annually => start.checked_add_months(Months::new(12)),
    };
    end.unwrap_or(start).timestamp()
}

/// Create the subscription for a completed transaction and point the user's
/// package entitlement at it.
///
/// Callers must only invoke this after winning the `completed` transition;
/// the status CAS is what makes activation run at most once per transaction.
pub fn activate(conn: &Connection, transaction: &Transaction) -> Result<Subscription> {
    let metadata = transaction.parsed_metadata();
    let billing_period = metadata.billing_period.unwrap_or_default();

    let started_at = queries::now();
    let expires_at = period_end(started_at, billing_period);

    let subscription = queries::create_subscription(
        conn,
        &CreateSubscription {
            user_id: transaction.user_id.clone(),
            package_id: transaction.package_id.clone(),
            billing_period,
            amount: transaction.amount,
            currency: transaction.currency.clone(),
            started_at,
            next_billing_date: expires_at,
            expires_at,
            gateway_subscription_id: transaction.gateway_transaction_id.clone(),
        },
    )?;

    queries::upsert_user_package(conn, &transaction.user_id, &transaction.package_id, expires_at)?;

    tracing::info!(
        subscription_id = %subscription.id,
        user_id = %transaction.user_id,
        package_id = %transaction.package_id,
        billing_period = billing_period.as_str(),
        expires_at,
        "subscription activated"
    );

    Ok(subscription)
}
