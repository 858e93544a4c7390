use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Packages (subscription catalog - read-only to this service)
        -- pricing_tiers: JSON, billing_period -> currency -> {regular_price, promo_price}
        -- Rows predating tiered pricing carry NULL and fall back to base_price_cents.
        CREATE TABLE IF NOT EXISTS packages (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            active INTEGER NOT NULL DEFAULT 1,
            base_price_cents INTEGER NOT NULL DEFAULT 0,
            pricing_tiers TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_packages_active ON packages(id) WHERE active = 1;

        -- Transactions (financial ledger)
        -- payment_reference: order id generated at checkout, the webhook correlation key
        -- status transitions are single-row conditional updates, see queries::try_apply_status
        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            payment_reference TEXT NOT NULL UNIQUE,
            user_id TEXT NOT NULL,
            package_id TEXT NOT NULL REFERENCES packages(id),
            gateway_id TEXT NOT NULL,
            amount INTEGER NOT NULL,
            currency TEXT NOT NULL,
            payment_method TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'review', 'completed', 'failed')),
            gateway_transaction_id TEXT,
            raw_gateway_response TEXT,
            metadata TEXT,
            created_at INTEGER NOT NULL,
            processed_at INTEGER,
            verified_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions(user_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_transactions_gateway_txn ON transactions(gateway_transaction_id);
        CREATE INDEX IF NOT EXISTS idx_transactions_status ON transactions(status);

        -- Subscriptions (written once per completed transaction)
        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            package_id TEXT NOT NULL REFERENCES packages(id),
            billing_period TEXT NOT NULL CHECK (billing_period IN ('weekly', 'monthly', 'quarterly', 'annually')),
            amount INTEGER NOT NULL,
            currency TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'inactive')),
            started_at INTEGER NOT NULL,
            next_billing_date INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            gateway_subscription_id TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_subscriptions_user_time ON subscriptions(user_id, started_at DESC);

        -- User package assignments (entitlement pointer, one row per user)
        CREATE TABLE IF NOT EXISTS user_packages (
            user_id TEXT PRIMARY KEY,
            package_id TEXT NOT NULL REFERENCES packages(id),
            expires_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- Webhook deliveries (append-only audit of every inbound notification,
        -- duplicates and rejects included - no unique constraint on purpose)
        CREATE TABLE IF NOT EXISTS webhook_deliveries (
            id TEXT PRIMARY KEY,
            transaction_id TEXT REFERENCES transactions(id) ON DELETE SET NULL,
            order_id TEXT,
            verification TEXT CHECK (verification IS NULL OR verification IN ('signature', 'status_fetch')),
            outcome TEXT NOT NULL CHECK (outcome IN ('applied', 'duplicate', 'rejected', 'orphaned', 'error')),
            raw_body TEXT NOT NULL,
            received_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_webhook_deliveries_txn ON webhook_deliveries(transaction_id);
        CREATE INDEX IF NOT EXISTS idx_webhook_deliveries_order ON webhook_deliveries(order_id);
        "#,
    )?;
    Ok(())
}
