//! Test utilities and fixtures for Payrail integration tests

#![allow(dead_code)]

use axum::Router;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

// Re-export the main library crate
pub use payrail::config::MidtransConfig;
pub use payrail::db::{init_db, queries, AppState};
pub use payrail::gateway::{compute_signature, MidtransClient};
pub use payrail::models::*;

/// Server key the test gateway client is configured with. Signature tests
/// compute digests against this key.
pub const TEST_SERVER_KEY: &str = "SB-Mid-server-testkey";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Create a test package with a flat USD base price and no pricing tiers
pub fn create_test_package(conn: &Connection, name: &str, base_price_cents: i64) -> Package {
    let input = CreatePackage {
        name: name.to_string(),
        base_price_cents,
        pricing_tiers: None,
        active: true,
    };
    queries::create_package(conn, &input).expect("Failed to create test package")
}

/// Create a test package with a JSON pricing table
pub fn create_test_package_with_tiers(
    conn: &Connection,
    name: &str,
    base_price_cents: i64,
    pricing_tiers: &str,
) -> Package {
    let input = CreatePackage {
        name: name.to_string(),
        base_price_cents,
        pricing_tiers: Some(pricing_tiers.to_string()),
        active: true,
    };
    queries::create_package(conn, &input).expect("Failed to create test package")
}

/// Create a test package that is not available for purchase
pub fn create_inactive_package(conn: &Connection, name: &str, base_price_cents: i64) -> Package {
    let input = CreatePackage {
        name: name.to_string(),
        base_price_cents,
        pricing_tiers: None,
        active: false,
    };
    queries::create_package(conn, &input).expect("Failed to create test package")
}

/// Create a pending IDR transaction for `order_id` - the state checkout
/// leaves a row in before the gateway has answered
pub fn create_pending_transaction(
    conn: &Connection,
    order_id: &str,
    user_id: &str,
    package_id: &str,
    amount: i64,
    payment_method: &str,
) -> Transaction {
    let metadata = TransactionMetadata {
        original_amount: Some(amount),
        original_currency: Some("IDR".to_string()),
        billing_period: Some(BillingPeriod::Monthly),
        payment_gateway_type: Some(payment_method.to_string()),
        saved_token_id: None,
    };
    let input = CreateTransaction {
        payment_reference: order_id.to_string(),
        user_id: user_id.to_string(),
        package_id: package_id.to_string(),
        gateway_id: "G-TEST".to_string(),
        amount,
        currency: "IDR".to_string(),
        payment_method: payment_method.to_string(),
        metadata: Some(metadata.to_json().expect("Failed to serialize metadata")),
    };
    queries::create_pending_transaction(conn, &input).expect("Failed to create test transaction")
}

/// Get the current timestamp
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Get a future timestamp (days from now)
pub fn future_timestamp(days: i64) -> i64 {
    now() + (days * 86400)
}

/// Midtrans notification signature computed with the test server key
pub fn test_signature(order_id: &str, status_code: &str, gross_amount: &str) -> String {
    compute_signature(order_id, status_code, gross_amount, TEST_SERVER_KEY)
}

/// Create an AppState for testing with an in-memory database.
///
/// The gateway client points at a port nothing listens on, so any code path
/// that reaches for the network fails fast instead of hanging the test.
pub fn create_test_app_state() -> AppState {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(4).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    let midtrans = MidtransConfig {
        server_key: TEST_SERVER_KEY.to_string(),
        client_key: "SB-Mid-client-testkey".to_string(),
        merchant_id: "G-TEST".to_string(),
        production: false,
        api_base_url: "http://127.0.0.1:1".to_string(),
        app_base_url: "http://127.0.0.1:1".to_string(),
    };

    AppState {
        db: pool,
        gateway: MidtransClient::new(&midtrans),
        base_url: "http://localhost:3000".to_string(),
        finish_redirect_url: "http://localhost:3000/success".to_string(),
        merchant_id: "G-TEST".to_string(),
        usd_idr_rate: 16_000,
    }
}

/// Create a Router with all endpoints wired to `state`
pub fn app(state: AppState) -> Router {
    payrail::handlers::router().with_state(state)
}
