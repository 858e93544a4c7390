use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::MidtransConfig;
use crate::error::{AppError, Result};
use crate::gateway::verify_signature;

/// Hard cap per gateway call. A checkout request holds an HTTP worker while
/// the charge is in flight, so this must stay bounded.
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct TransactionDetails {
    order_id: String,
    gross_amount: i64,
}

#[derive(Debug, Serialize)]
struct ItemDetail {
    id: String,
    price: i64,
    quantity: u32,
    name: String,
}

// ============ Snap (hosted checkout) ============

#[derive(Debug, Serialize)]
struct SnapRequest {
    transaction_details: TransactionDetails,
    item_details: Vec<ItemDetail>,
    callbacks: SnapCallbacks,
}

#[derive(Debug, Serialize)]
struct SnapCallbacks {
    finish: String,
}

#[derive(Debug, Deserialize)]
struct SnapResponse {
    token: String,
    redirect_url: String,
}

// ============ Core API (direct charge) ============

#[derive(Debug, Serialize)]
struct ChargeRequest {
    payment_type: String,
    transaction_details: TransactionDetails,
    credit_card: ChargeCard,
}

#[derive(Debug, Serialize)]
struct ChargeCard {
    token_id: String,
    authentication: bool,
    save_token_id: bool,
}

/// Synchronous charge result. Core API settles the fraud screen inline, so
/// this already carries a mappable status.
#[derive(Debug, Deserialize)]
pub struct ChargeResponse {
    pub transaction_id: String,
    pub order_id: String,
    pub status_code: String,
    pub transaction_status: String,
    pub fraud_status: Option<String>,
    pub status_message: Option<String>,
    pub saved_token_id: Option<String>,
    pub masked_card: Option<String>,
}

// ============ GET /v2/{order_id}/status ============

/// Authoritative transaction state, straight from the gateway.
#[derive(Debug, Deserialize)]
pub struct TransactionStatusResponse {
    pub transaction_id: Option<String>,
    pub order_id: String,
    pub status_code: String,
    pub transaction_status: String,
    pub fraud_status: Option<String>,
    pub gross_amount: Option<String>,
    pub payment_type: Option<String>,
}

// ============ Incoming notification ============

/// Body of a POST from Midtrans to our webhook endpoint. Everything in here
/// is untrusted until verified.
#[derive(Debug, Deserialize)]
pub struct MidtransNotification {
    pub order_id: String,
    pub status_code: String,
    pub gross_amount: String,
    pub transaction_status: String,
    pub transaction_id: Option<String>,
    pub fraud_status: Option<String>,
    pub signature_key: Option<String>,
    pub payment_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MidtransClient {
    client: Client,
    server_key: String,
    api_base_url: String,
    app_base_url: String,
}

impl MidtransClient {
    pub fn new(config: &MidtransConfig) -> Self {
        Self {
            client: Client::new(),
            server_key: config.server_key.clone(),
            api_base_url: config.api_base_url.clone(),
            app_base_url: config.app_base_url.clone(),
        }
    }

    /// Create a Snap transaction and return `(token, redirect_url)`.
    ///
    /// The token drives the embedded Snap popup; the redirect URL is the
    /// standalone hosted page. Callers hand both to the frontend and let it
    /// choose.
    pub async fn create_snap_transaction(
        &self,
        order_id: &str,
        gross_amount: i64,
        package_id: &str,
        package_name: &str,
        finish_url: &str,
    ) -> Result<(String, String)> {
        let request = SnapRequest {
            transaction_details: TransactionDetails {
                order_id: order_id.to_string(),
                gross_amount,
            },
            item_details: vec![ItemDetail {
                id: package_id.to_string(),
                price: gross_amount,
                quantity: 1,
                name: package_name.to_string(),
            }],
            callbacks: SnapCallbacks {
                finish: finish_url.to_string(),
            },
        };

        let response = self
            .client
            .post(format!("{}/snap/v1/transactions", self.app_base_url))
            .basic_auth(&self.server_key, None::<&str>)
            .timeout(GATEWAY_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        let snap: SnapResponse = Self::read_json(response).await?;
        Ok((snap.token, snap.redirect_url))
    }

    /// Charge a tokenized card through the Core API. Returns the parsed
    /// result and the raw response body for the ledger.
    pub async fn create_core_charge(
        &self,
        order_id: &str,
        gross_amount: i64,
        token_id: &str,
        save_token: bool,
    ) -> Result<(ChargeResponse, String)> {
        let request = ChargeRequest {
            payment_type: "credit_card".to_string(),
            transaction_details: TransactionDetails {
                order_id: order_id.to_string(),
                gross_amount,
            },
            credit_card: ChargeCard {
                token_id: token_id.to_string(),
                authentication: true,
                save_token_id: save_token,
            },
        };

        let response = self
            .client
            .post(format!("{}/v2/charge", self.api_base_url))
            .basic_auth(&self.server_key, None::<&str>)
            .timeout(GATEWAY_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        Self::read_json_raw(response).await
    }

    /// Ask the gateway for the current state of an order. This is the
    /// trusted source when a notification cannot be verified locally.
    /// Returns the parsed status and the raw response body.
    pub async fn fetch_transaction_status(
        &self,
        order_id: &str,
    ) -> Result<(TransactionStatusResponse, String)> {
        let response = self
            .client
            .get(format!("{}/v2/{}/status", self.api_base_url, order_id))
            .basic_auth(&self.server_key, None::<&str>)
            .timeout(GATEWAY_TIMEOUT)
            .send()
            .await?;

        Self::read_json_raw(response).await
    }

    /// Recompute the notification signature with our server key and compare.
    pub fn verify_notification_signature(
        &self,
        notification: &MidtransNotification,
        provided: &str,
    ) -> bool {
        verify_signature(
            &notification.order_id,
            &notification.status_code,
            &notification.gross_amount,
            &self.server_key,
            provided,
        )
    }

    pub fn is_configured(&self) -> bool {
        !self.server_key.is_empty()
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let (parsed, _raw) = Self::read_json_raw(response).await?;
        Ok(parsed)
    }

    async fn read_json_raw<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<(T, String)> {
        let status = response.status();
        if status.is_client_error() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::GatewayRejected(format!(
                "Midtrans API error ({}): {}",
                status, error_text
            )));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::GatewayUnavailable(format!(
                "Midtrans API error ({}): {}",
                status, error_text
            )));
        }
        let raw = response.text().await.map_err(|e| {
            AppError::GatewayUnavailable(format!("failed to read Midtrans response: {}", e))
        })?;
        let parsed = serde_json::from_str(&raw).map_err(|e| {
            AppError::GatewayUnavailable(format!("failed to parse Midtrans response: {}", e))
        })?;
        Ok((parsed, raw))
    }
}
