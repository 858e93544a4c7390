use serde::{Deserialize, Serialize};

/// Append-only audit row, one per inbound notification delivery. Duplicates
/// and rejected deliveries are recorded too; this table is the full history
/// behind `Transaction::raw_gateway_response`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub id: String,
    /// Correlated transaction, when one was found.
    pub transaction_id: Option<String>,
    /// Order id claimed by the notification body, before any verification.
    pub order_id: Option<String>,
    /// Verification strategy that ran ("signature" or "status_fetch").
    pub verification: Option<String>,
    pub outcome: DeliveryOutcome,
    pub raw_body: String,
    pub received_at: i64,
}

/// What became of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Verified and applied (first transition).
    Applied,
    /// Verified but the row was already in the target terminal state.
    Duplicate,
    /// Failed signature or status-fetch verification.
    Rejected,
    /// No transaction correlated with the claimed order id.
    Orphaned,
    /// Body unparseable or verification fetch failed.
    Error,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Duplicate => "duplicate",
            Self::Rejected => "rejected",
            Self::Orphaned => "orphaned",
            Self::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(Self::Applied),
            "duplicate" => Some(Self::Duplicate),
            "rejected" => Some(Self::Rejected),
            "orphaned" => Some(Self::Orphaned),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
