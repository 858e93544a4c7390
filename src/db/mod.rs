mod schema;
pub mod from_row;
pub mod queries;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::gateway::MidtransClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding the database pool and resolved configuration
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Gateway client carrying the credentials resolved at startup
    pub gateway: MidtransClient,
    /// Base URL for gateway callbacks (e.g., https://billing.example.com)
    pub base_url: String,
    /// Where the finish redirect sends the customer after payment
    pub finish_redirect_url: String,
    /// Merchant account identifier, stored on every transaction row
    pub merchant_id: String,
    /// Rupiah per dollar, used when converting USD prices for settlement
    pub usd_idr_rate: i64,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
