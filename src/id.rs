//! Prefixed ID generation for payrail entities, plus the order-id scheme.
//!
//! Entity IDs use a `pr_` brand prefix to guarantee collision avoidance with
//! gateway-side IDs. Format: `pr_{entity}_{uuid_simple}` (32 hex chars, no
//! hyphens).
//!
//! Order ids are the externally visible payment references:
//! `{MODE_PREFIX}-{unix_millis}-{short_user_id}`. The mode prefix records
//! which integration created the charge for diagnostics; webhook correlation
//! never depends on it.

use chrono::Utc;
use uuid::Uuid;

use crate::gateway::PaymentMode;

/// Entity types that have prefixed IDs.
#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    Package,
    Transaction,
    Subscription,
    WebhookDelivery,
}

impl EntityType {
    /// Returns the prefix for this entity type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Package => "pr_pkg",
            Self::Transaction => "pr_txn",
            Self::Subscription => "pr_sub",
            Self::WebhookDelivery => "pr_whd",
        }
    }

    /// Generates a new prefixed ID for this entity type.
    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}

/// Generate an order id for a new charge attempt.
///
/// Unique per attempt in practice (millisecond clock + user); the UNIQUE
/// constraint on transactions.payment_reference is the backstop.
pub fn generate_order_id(mode: PaymentMode, user_id: &str) -> String {
    format!(
        "{}-{}-{}",
        mode.order_prefix(),
        Utc::now().timestamp_millis(),
        short_user_id(user_id)
    )
}

/// First 8 alphanumeric characters of the user id. User ids come from the
/// dashboard and may carry separators the gateway's order-id charset rejects.
fn short_user_id(user_id: &str) -> String {
    let cleaned: String = user_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect();
    if cleaned.is_empty() {
        "anon".to_string()
    } else {
        cleaned
    }
}
