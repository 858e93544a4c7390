use serde::{Deserialize, Serialize};

/// The unit of financial truth. One row per charge attempt, created in
/// `Pending` state before the gateway is contacted so every external charge
/// has a local record to correlate against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Externally visible order id, generated by this service, globally
    /// unique. Primary webhook correlation key.
    pub payment_reference: String,
    pub user_id: String,
    pub package_id: String,
    /// Merchant account the charge went through.
    pub gateway_id: String,

    /// Settled amount in the currency's minor unit (cents for USD, whole
    /// rupiah for IDR).
    pub amount: i64,
    /// Settled currency actually charged at the gateway.
    pub currency: String,
    /// Which gateway integration created this row ("snap" or "core_api").
    pub payment_method: String,

    pub status: TransactionStatus,
    /// Gateway-side transaction id, assigned after the charge call returns.
    pub gateway_transaction_id: Option<String>,
    /// Latest raw gateway payload. Full delivery history lives in
    /// webhook_deliveries.
    pub raw_gateway_response: Option<String>,
    /// Flexible JSON blob, see [`TransactionMetadata`].
    pub metadata: Option<String>,

    pub created_at: i64,
    /// Set once, on the first terminal status transition.
    pub processed_at: Option<i64>,
    /// Set when a webhook for this row first passed authentication.
    pub verified_at: Option<i64>,
}

impl Transaction {
    pub fn parsed_metadata(&self) -> TransactionMetadata {
        self.metadata
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

/// Data required to create a pending transaction
#[derive(Debug, Clone)]
pub struct CreateTransaction {
    pub payment_reference: String,
    pub user_id: String,
    pub package_id: String,
    pub gateway_id: String,
    pub amount: i64,
    pub currency: String,
    pub payment_method: String,
    pub metadata: Option<String>,
}

/// Typed view of `Transaction::metadata`. Unknown keys from older rows are
/// preserved nowhere and ignored on read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionMetadata {
    /// Amount before currency conversion, in the original currency's minor unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_period: Option<BillingPeriod>,
    /// Legacy gateway-mode marker from rows written before `payment_method`
    /// was authoritative. Read as a disambiguation fallback only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_gateway_type: Option<String>,
    /// Reusable card token returned by a direct charge, when the customer
    /// opted to save the card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_token_id: Option<String>,
}

impl TransactionMetadata {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Canonical ledger states for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Review,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Review => "review",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "review" => Some(Self::Review),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal states accept no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subscription cadence carried through checkout into activation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    Weekly,
    #[default]
    Monthly,
    Quarterly,
    Annually,
}

impl BillingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annually => "annually",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "annually" => Some(Self::Annually),
            _ => None,
        }
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
