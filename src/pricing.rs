//! Price resolution for checkout.
//!
//! Resolution order: the package's tiered pricing table, then the legacy
//! flat-rate table (catalog rows that predate tiers), then the package's
//! base price. Zero is never a valid price - a chain that resolves to zero
//! is a catalog bug surfaced as `NoPricing` rather than a free charge.

use crate::error::{AppError, Result};
use crate::models::{BillingPeriod, Package, PricingTable};

/// The gateway settles in rupiah; everything else converts before charging.
pub const SETTLEMENT_CURRENCY: &str = "IDR";

/// Flat USD prices for packages created before the pricing_tiers column
/// existed. Keyed by package name. New packages never land here.
const LEGACY_FLAT_PRICES: &[(&str, BillingPeriod, i64)] = &[
    ("starter", BillingPeriod::Monthly, 900),
    ("starter", BillingPeriod::Annually, 9_000),
    ("professional", BillingPeriod::Monthly, 2_900),
    ("professional", BillingPeriod::Annually, 29_000),
    ("business", BillingPeriod::Monthly, 9_900),
    ("business", BillingPeriod::Annually, 99_000),
];

/// Resolve the amount to charge, in the minor unit of `currency`.
pub fn resolve(package: &Package, billing_period: BillingPeriod, currency: &str) -> Result<i64> {
    let amount = tier_price(package, billing_period, currency)
        .or_else(|| legacy_flat_price(&package.name, billing_period, currency))
        .unwrap_or_else(|| base_price(package, currency));

    if amount <= 0 {
        return Err(AppError::NoPricing(format!(
            "package {} has no {} price for {}",
            package.id,
            billing_period.as_str(),
            currency
        )));
    }
    Ok(amount)
}

/// Convert a USD amount (cents) to whole rupiah at the configured rate.
pub fn usd_to_idr(usd_cents: i64, rate_idr_per_usd: i64) -> i64 {
    usd_cents * rate_idr_per_usd / 100
}

/// Convert a resolved amount into what the gateway settles. Returns the
/// settled amount and currency; IDR passes through unchanged.
pub fn to_settlement(amount: i64, currency: &str, rate_idr_per_usd: i64) -> (i64, String) {
    if currency == SETTLEMENT_CURRENCY {
        (amount, SETTLEMENT_CURRENCY.to_string())
    } else {
        (
            usd_to_idr(amount, rate_idr_per_usd),
            SETTLEMENT_CURRENCY.to_string(),
        )
    }
}

fn tier_price(package: &Package, billing_period: BillingPeriod, currency: &str) -> Option<i64> {
    let table: PricingTable = package
        .pricing_tiers
        .as_deref()
        .and_then(|raw| serde_json::from_str(raw).ok())?;
    table
        .get(billing_period.as_str())?
        .get(currency)
        .map(|tier| tier.effective())
}

/// The legacy table is USD only.
fn legacy_flat_price(package_name: &str, billing_period: BillingPeriod, currency: &str) -> Option<i64> {
    if currency != "USD" {
        return None;
    }
    LEGACY_FLAT_PRICES
        .iter()
        .find(|(name, period, _)| *name == package_name && *period == billing_period)
        .map(|(_, _, cents)| *cents)
}

/// Base price is USD only; for other currencies it resolves to zero and the
/// chain fails.
fn base_price(package: &Package, currency: &str) -> i64 {
    if currency == "USD" {
        package.base_price_cents
    } else {
        0
    }
}
