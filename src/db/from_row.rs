//! Row mapping trait and helpers for reducing boilerplate in queries.
//!
//! This module provides a `FromRow` trait that models can implement to
//! define how they are constructed from database rows, plus helper functions
//! for common query patterns.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to rusqlite errors.
///
/// This provides graceful error handling instead of panicking when the database
/// contains invalid enum values (from corruption, migration errors, etc.).
fn parse_enum<T>(
    row: &Row,
    col: usize,
    col_name: &str,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(col)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
///
/// Implementing this trait allows using the `query_one` and `query_all`
/// helper functions, reducing repetitive row mapping closures.
pub trait FromRow: Sized {
    /// Construct an instance from a database row.
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const PACKAGE_COLS: &str = "id, name, active, base_price_cents, pricing_tiers, created_at";

pub const TRANSACTION_COLS: &str = "id, payment_reference, user_id, package_id, gateway_id, amount, currency, payment_method, status, gateway_transaction_id, raw_gateway_response, metadata, created_at, processed_at, verified_at";

pub const SUBSCRIPTION_COLS: &str = "id, user_id, package_id, billing_period, amount, currency, status, started_at, next_billing_date, expires_at, gateway_subscription_id, created_at";

pub const USER_PACKAGE_COLS: &str = "user_id, package_id, expires_at, updated_at";

pub const WEBHOOK_DELIVERY_COLS: &str =
    "id, transaction_id, order_id, verification, outcome, raw_body, received_at";

// ============ FromRow Implementations ============

impl FromRow for Package {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Package {
            id: row.get(0)?,
            name: row.get(1)?,
            active: row.get::<_, i32>(2)? != 0,
            base_price_cents: row.get(3)?,
            pricing_tiers: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for Transaction {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Transaction {
            id: row.get(0)?,
            payment_reference: row.get(1)?,
            user_id: row.get(2)?,
            package_id: row.get(3)?,
            gateway_id: row.get(4)?,
            amount: row.get(5)?,
            currency: row.get(6)?,
            payment_method: row.get(7)?,
            status: parse_enum(row, 8, "status", TransactionStatus::from_str)?,
            gateway_transaction_id: row.get(9)?,
            raw_gateway_response: row.get(10)?,
            metadata: row.get(11)?,
            created_at: row.get(12)?,
            processed_at: row.get(13)?,
            verified_at: row.get(14)?,
        })
    }
}

impl FromRow for Subscription {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Subscription {
            id: row.get(0)?,
            user_id: row.get(1)?,
            package_id: row.get(2)?,
            billing_period: parse_enum(row, 3, "billing_period", BillingPeriod::from_str)?,
            amount: row.get(4)?,
            currency: row.get(5)?,
            status: parse_enum(row, 6, "status", SubscriptionStatus::from_str)?,
            started_at: row.get(7)?,
            next_billing_date: row.get(8)?,
            expires_at: row.get(9)?,
            gateway_subscription_id: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

impl FromRow for UserPackage {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(UserPackage {
            user_id: row.get(0)?,
            package_id: row.get(1)?,
            expires_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }
}

impl FromRow for WebhookDelivery {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(WebhookDelivery {
            id: row.get(0)?,
            transaction_id: row.get(1)?,
            order_id: row.get(2)?,
            verification: row.get(3)?,
            outcome: parse_enum(row, 4, "outcome", DeliveryOutcome::from_str)?,
            raw_body: row.get(5)?,
            received_at: row.get(6)?,
        })
    }
}
