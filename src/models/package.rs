use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Catalog entry a user can subscribe to. Read-only to this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub name: String,
    pub active: bool,
    /// Final pricing fallback when no tier matches (USD cents).
    pub base_price_cents: i64,
    /// JSON pricing table: billing_period -> currency -> tier.
    /// Older catalog rows predate this column and carry NULL.
    pub pricing_tiers: Option<String>,
    pub created_at: i64,
}

/// Data required to create a package (seeding and tests).
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePackage {
    pub name: String,
    pub base_price_cents: i64,
    #[serde(default)]
    pub pricing_tiers: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// One cell of the pricing table. Amounts are integer minor units of the
/// currency the cell is keyed under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PricingTier {
    pub regular_price: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_price: Option<i64>,
}

impl PricingTier {
    /// Effective price: promo wins over regular when present.
    pub fn effective(&self) -> i64 {
        self.promo_price.unwrap_or(self.regular_price)
    }
}

/// Parsed shape of `Package::pricing_tiers`.
pub type PricingTable = HashMap<String, HashMap<String, PricingTier>>;
