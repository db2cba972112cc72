//! Stripe Checkout: hosted session creation and webhook decoding.

use bigdecimal::BigDecimal;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::application::checkout_service::PreparedCheckout;
use crate::config::StripeConfig;
use crate::domain::checkout::CheckoutMetadata;
use crate::domain::order::{PaymentProvider, Settlement};

const API_BASE: &str = "https://api.stripe.com";
/// Signed webhooks older than this are rejected as replays.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed Stripe-Signature header: {0}")]
    MalformedSignature(String),

    #[error("Malformed event payload: {0}")]
    MalformedEvent(#[from] serde_json::Error),
}

/// A hosted checkout page the customer is redirected to.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: SecretString,
    webhook_secret: SecretString,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    pub async fn create_checkout_session(
        &self,
        checkout: &PreparedCheckout,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let params = checkout_form(checkout, success_url, cancel_url);

        let response = self
            .http
            .post(format!("{API_BASE}/v1/checkout/sessions"))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StripeError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Check a `Stripe-Signature` header against the raw request body.
    ///
    /// A header that cannot be parsed is an error; a wrong or stale signature
    /// is `Ok(false)`.
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<bool, StripeError> {
        verify_signature(
            self.webhook_secret.expose_secret(),
            payload,
            signature_header,
            chrono::Utc::now().timestamp(),
        )
    }
}

/// Form-encoded body of `POST /v1/checkout/sessions`.
pub fn checkout_form(
    checkout: &PreparedCheckout,
    success_url: &str,
    cancel_url: &str,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), success_url.to_string()),
        ("cancel_url".to_string(), cancel_url.to_string()),
    ];
    if let Some(email) = checkout.email() {
        params.push(("customer_email".to_string(), email.to_string()));
    }
    for (n, item) in checkout.line_items.iter().enumerate() {
        let prefix = format!("line_items[{n}]");
        params.push((format!("{prefix}[price_data][currency]"), "brl".to_string()));
        params.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        params.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount_cents.to_string(),
        ));
        params.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }
    for (key, value) in checkout.metadata.encode() {
        params.push((format!("metadata[{key}]"), value));
    }
    params
}

pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    signature_header: &str,
    now: i64,
) -> Result<bool, StripeError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| StripeError::MalformedSignature("missing timestamp".to_string()))?;
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| StripeError::MalformedSignature(format!("bad timestamp '{timestamp}'")))?;
    if signatures.is_empty() {
        return Err(StripeError::MalformedSignature(
            "missing v1 signature".to_string(),
        ));
    }

    if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Ok(false);
    }

    Ok(signatures.into_iter().any(|sig| {
        let Ok(expected) = hex::decode(sig) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    }))
}

// ── Webhook events ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
    #[serde(default)]
    customer_email: Option<String>,
    #[serde(default)]
    customer_details: Option<CustomerDetails>,
    #[serde(default)]
    amount_total: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CustomerDetails {
    #[serde(default)]
    email: Option<String>,
}

/// Decode a verified webhook body into a settlement.
///
/// `Ok(None)` means the event does not represent a completed payment and must
/// be acknowledged without touching the store.
pub fn settlement_from_event(payload: &[u8]) -> Result<Option<Settlement>, StripeError> {
    let event: Event = serde_json::from_slice(payload)?;

    match event.event_type.as_str() {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {}
        _ => return Ok(None),
    }
    let session: SessionObject = serde_json::from_value(event.data.object)?;
    if event.event_type == "checkout.session.completed"
        && session.payment_status.as_deref() != Some("paid")
    {
        // Boleto and other delayed methods complete later via
        // async_payment_succeeded.
        return Ok(None);
    }

    let metadata = session
        .metadata
        .as_ref()
        .map(CheckoutMetadata::decode_json)
        .unwrap_or_default();
    let payer_email = session
        .customer_details
        .and_then(|d| d.email)
        .or(session.customer_email);
    let reported_total = session
        .amount_total
        .map(|cents| BigDecimal::new(cents.into(), 2));

    Ok(Some(Settlement::from_metadata(
        session.id,
        PaymentProvider::Stripe,
        metadata,
        payer_email,
        reported_total,
    )))
}
