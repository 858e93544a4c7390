use serde::{Deserialize, Serialize};

use super::transaction::BillingPeriod;

/// Created only as a side effect of a transaction reaching `completed`.
/// One transaction produces at most one subscription; renewals accumulate
/// history but only the most recent row affects entitlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub package_id: String,
    pub billing_period: BillingPeriod,
    /// Amount paid, in the currency's minor unit.
    pub amount: i64,
    pub currency: String,
    pub status: SubscriptionStatus,
    pub started_at: i64,
    pub next_billing_date: i64,
    pub expires_at: i64,
    pub gateway_subscription_id: Option<String>,
    pub created_at: i64,
}

/// Data required to create a subscription
#[derive(Debug, Clone)]
pub struct CreateSubscription {
    pub user_id: String,
    pub package_id: String,
    pub billing_period: BillingPeriod,
    pub amount: i64,
    pub currency: String,
    pub started_at: i64,
    pub next_billing_date: i64,
    pub expires_at: i64,
    pub gateway_subscription_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The user's current package assignment, upserted on activation.
/// One row per user; `expires_at` gates entitlement downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPackage {
    pub user_id: String,
    pub package_id: String,
    pub expires_at: i64,
    pub updated_at: i64,
}
