use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Redirect;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Query};
use crate::gateway::PaymentMode;
use crate::models::{BillingPeriod, CreateTransaction, TransactionMetadata, TransactionStatus};
use crate::{id, pricing, status, subscription};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub package_id: String,
    /// "weekly" | "monthly" | "quarterly" | "annually" (default monthly)
    #[serde(default)]
    pub billing_period: Option<String>,
    /// "USD" (default) or "IDR"
    #[serde(default)]
    pub currency: Option<String>,
    /// "snap" or "core_api"
    pub payment_method: String,
    /// Core API only: card token minted by the client-side SDK
    #[serde(default)]
    pub token_id: Option<String>,
    /// Core API only: ask the gateway to return a reusable card token
    #[serde(default)]
    pub save_token: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub transaction_id: String,
    pub order_id: String,
    pub status: String,
    /// Amount in the gateway's settlement currency
    pub amount: i64,
    pub currency: String,
    /// Snap only: token for the embedded payment popup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Snap only: standalone hosted payment page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

/// The dashboard session layer injects the authenticated user here.
fn require_user(headers: &HeaderMap) -> Result<String> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or(AppError::Unauthorized)
}

pub async fn initiate_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let user_id = require_user(&headers)?;

    if !state.gateway.is_configured() {
        return Err(AppError::GatewayNotConfigured(
            "MIDTRANS_SERVER_KEY is not set".into(),
        ));
    }

    let mode = PaymentMode::from_str(&request.payment_method)
        .ok_or_else(|| AppError::BadRequest("Invalid payment_method".into()))?;

    let billing_period = match request.billing_period.as_deref() {
        Some(raw) => BillingPeriod::from_str(raw)
            .ok_or_else(|| AppError::BadRequest("Invalid billing_period".into()))?,
        None => BillingPeriod::default(),
    };

    let currency = request
        .currency
        .as_deref()
        .unwrap_or("USD")
        .to_uppercase();
    if currency != "USD" && currency != pricing::SETTLEMENT_CURRENCY {
        return Err(AppError::BadRequest(format!(
            "Unsupported currency: {}",
            currency
        )));
    }

    let conn = state.db.get()?;

    let package = queries::get_package_by_id(&conn, &request.package_id)?
        .ok_or_else(|| AppError::NotFound("Package not found".into()))?;
    if !package.active {
        return Err(AppError::BadRequest("Package is not available".into()));
    }

    let resolved = pricing::resolve(&package, billing_period, &currency)?;
    let (gross_amount, settle_currency) =
        pricing::to_settlement(resolved, &currency, state.usd_idr_rate);

    let order_id = id::generate_order_id(mode, &user_id);

    let metadata = TransactionMetadata {
        original_amount: Some(resolved),
        original_currency: Some(currency.clone()),
        billing_period: Some(billing_period),
        payment_gateway_type: Some(mode.as_str().to_string()),
        saved_token_id: None,
    };

    // The pending row goes in before the gateway is contacted. If the
    // charge call dies mid-flight, the gateway's later notification still
    // has a row to land on.
    let transaction = queries::create_pending_transaction(
        &conn,
        &CreateTransaction {
            payment_reference: order_id.clone(),
            user_id: user_id.clone(),
            package_id: package.id.clone(),
            gateway_id: state.merchant_id.clone(),
            amount: gross_amount,
            currency: settle_currency.clone(),
            payment_method: mode.as_str().to_string(),
            metadata: Some(metadata.to_json()?),
        },
    )?;

    match mode {
        PaymentMode::HostedCheckout => {
            let finish_url = format!("{}/checkout/finish", state.base_url);
            let (token, redirect_url) = state
                .gateway
                .create_snap_transaction(
                    &order_id,
                    gross_amount,
                    &package.id,
                    &package.name,
                    &finish_url,
                )
                .await?;

            let raw = serde_json::json!({
                "token": token,
                "redirect_url": redirect_url,
            })
            .to_string();
            queries::attach_gateway_reference(&conn, &order_id, None, &raw, None)?;

            Ok(Json(CheckoutResponse {
                transaction_id: transaction.id,
                order_id,
                status: TransactionStatus::Pending.as_str().to_string(),
                amount: gross_amount,
                currency: settle_currency,
                token: Some(token),
                redirect_url: Some(redirect_url),
            }))
        }
        PaymentMode::DirectCharge => {
            let token_id = request.token_id.as_deref().ok_or_else(|| {
                AppError::BadRequest("token_id is required for core_api".into())
            })?;

            let (charge, raw) = state
                .gateway
                .create_core_charge(&order_id, gross_amount, token_id, request.save_token)
                .await?;

            // Persist the saved card token alongside the rest of the metadata
            let updated_metadata = charge.saved_token_id.as_ref().map(|saved| {
                TransactionMetadata {
                    saved_token_id: Some(saved.clone()),
                    ..metadata
                }
            });
            let updated_metadata_json = match &updated_metadata {
                Some(m) => Some(m.to_json()?),
                None => None,
            };
            queries::attach_gateway_reference(
                &conn,
                &order_id,
                Some(&charge.transaction_id),
                &raw,
                updated_metadata_json.as_deref(),
            )?;

            // Core API answers synchronously; fold a final verdict straight
            // into the ledger through the same transition the webhook uses.
            let mapped =
                status::map_gateway_status(&charge.transaction_status, charge.fraud_status.as_deref());
            if mapped != TransactionStatus::Pending
                && queries::try_apply_status(&conn, &transaction.id, mapped, &raw)?
                && mapped == TransactionStatus::Completed
            {
                if let Err(e) = subscription::activate(&conn, &transaction) {
                    tracing::error!(
                        transaction_id = %transaction.id,
                        "failed to activate subscription after charge: {}",
                        e
                    );
                }
            }

            let current = queries::get_transaction_by_id(&conn, &transaction.id)?
                .map(|t| t.status)
                .unwrap_or(TransactionStatus::Pending);

            Ok(Json(CheckoutResponse {
                transaction_id: transaction.id,
                order_id,
                status: current.as_str().to_string(),
                amount: gross_amount,
                currency: settle_currency,
                token: None,
                redirect_url: None,
            }))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub order_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<i64>,
}

/// Poll endpoint for the dashboard while the hosted payment page is open.
pub async fn checkout_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>> {
    let user_id = require_user(&headers)?;
    let conn = state.db.get()?;

    let transaction = queries::get_transaction_by_reference(&conn, &query.order_id)?
        .filter(|t| t.user_id == user_id)
        .ok_or_else(|| AppError::NotFound("Transaction not found".into()))?;

    Ok(Json(StatusResponse {
        order_id: transaction.payment_reference,
        status: transaction.status.as_str().to_string(),
        processed_at: transaction.processed_at,
    }))
}

#[derive(Debug, Deserialize)]
pub struct FinishQuery {
    pub order_id: String,
}

/// Landing point for the browser after the hosted payment page. Looks up
/// what the ledger says (never the query string) and forwards the user to
/// the configured success page.
pub async fn checkout_finish(
    State(state): State<AppState>,
    Query(query): Query<FinishQuery>,
) -> Result<Redirect> {
    let conn = state.db.get()?;

    let transaction = queries::get_transaction_by_reference(&conn, &query.order_id)?
        .ok_or_else(|| AppError::NotFound("Transaction not found".into()))?;

    let redirect_url = append_query_params(
        &state.finish_redirect_url,
        &[
            ("order_id", &transaction.payment_reference),
            ("status", transaction.status.as_str()),
        ],
    );

    Ok(Redirect::temporary(&redirect_url))
}

/// Append query parameters to a URL
fn append_query_params(base_url: &str, params: &[(&str, &str)]) -> String {
    let query_string: String = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    if base_url.contains('?') {
        format!("{}&{}", base_url, query_string)
    } else {
        format!("{}?{}", base_url, query_string)
    }
}
