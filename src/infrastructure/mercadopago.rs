//! Mercado Pago Checkout Pro: preferences, payment lookup and notification
//! decoding.

use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

use crate::application::checkout_service::PreparedCheckout;
use crate::config::MercadoPagoConfig;
use crate::domain::checkout::CheckoutMetadata;
use crate::domain::order::{PaymentProvider, Settlement};

const API_BASE: &str = "https://api.mercadopago.com";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum MercadoPagoError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mercado Pago API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed x-signature header: {0}")]
    MalformedSignature(String),
}

/// Redirect targets after the hosted checkout.
#[derive(Debug, Clone, Serialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

#[derive(Debug, Serialize)]
struct PreferenceItem<'a> {
    title: &'a str,
    quantity: i32,
    unit_price: f64,
    currency_id: &'static str,
}

#[derive(Debug, Serialize)]
struct Payer<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct PreferenceRequest<'a> {
    items: Vec<PreferenceItem<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payer: Option<Payer<'a>>,
    metadata: std::collections::BTreeMap<String, String>,
    external_reference: &'a str,
    back_urls: &'a BackUrls,
    auto_return: &'static str,
    notification_url: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Preference {
    pub id: String,
    pub init_point: String,
}

/// The subset of `GET /v1/payments/{id}` used for settlement.
#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    pub id: Value,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub metadata: Value,
    /// The checkout reference set on the preference.
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub transaction_amount: Option<serde_json::Number>,
    #[serde(default)]
    pub payer: Option<PaymentPayer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentPayer {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct MercadoPagoClient {
    http: reqwest::Client,
    access_token: SecretString,
    webhook_secret: Option<SecretString>,
}

impl MercadoPagoClient {
    pub fn new(config: &MercadoPagoConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token: config.access_token.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    pub async fn create_preference(
        &self,
        checkout: &PreparedCheckout,
        back_urls: &BackUrls,
        notification_url: &str,
    ) -> Result<Preference, MercadoPagoError> {
        let request = preference_request(checkout, back_urls, notification_url);

        let response = self
            .http
            .post(format!("{API_BASE}/checkout/preferences"))
            .bearer_auth(self.access_token.expose_secret())
            .json(&request)
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn fetch_payment(&self, payment_id: &str) -> Result<Payment, MercadoPagoError> {
        let response = self
            .http
            .get(format!("{API_BASE}/v1/payments/{payment_id}"))
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Verify `x-signature` when a webhook secret is configured; without one
    /// every notification is accepted.
    pub fn verify_notification(
        &self,
        signature_header: Option<&str>,
        request_id: Option<&str>,
        data_id: &str,
    ) -> Result<bool, MercadoPagoError> {
        let Some(secret) = &self.webhook_secret else {
            return Ok(true);
        };
        let header = signature_header
            .ok_or_else(|| MercadoPagoError::MalformedSignature("missing header".to_string()))?;
        verify_signature(
            secret.expose_secret(),
            header,
            request_id.unwrap_or_default(),
            data_id,
        )
    }

    async fn parse<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, MercadoPagoError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MercadoPagoError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

fn preference_request<'a>(
    checkout: &'a PreparedCheckout,
    back_urls: &'a BackUrls,
    notification_url: &'a str,
) -> PreferenceRequest<'a> {
    PreferenceRequest {
        items: checkout
            .line_items
            .iter()
            .map(|item| PreferenceItem {
                title: &item.name,
                quantity: item.quantity,
                unit_price: item.unit_amount_cents as f64 / 100.0,
                currency_id: "BRL",
            })
            .collect(),
        payer: checkout.email().map(|email| Payer { email }),
        metadata: checkout.metadata.encode(),
        external_reference: &checkout.reference,
        back_urls,
        auto_return: "approved",
        notification_url,
    }
}

/// `ts=<unix>,v1=<hex>` checked against the manifest
/// `id:<data.id>;request-id:<x-request-id>;ts:<ts>;`.
pub fn verify_signature(
    secret: &str,
    signature_header: &str,
    request_id: &str,
    data_id: &str,
) -> Result<bool, MercadoPagoError> {
    let mut ts = None;
    let mut v1 = None;
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("ts", value)) => ts = Some(value.trim()),
            Some(("v1", value)) => v1 = Some(value.trim()),
            _ => {}
        }
    }
    let (Some(ts), Some(v1)) = (ts, v1) else {
        return Err(MercadoPagoError::MalformedSignature(
            signature_header.to_string(),
        ));
    };

    let Ok(expected) = hex::decode(v1) else {
        return Ok(false);
    };
    let manifest = format!(
        "id:{};request-id:{};ts:{};",
        data_id.to_lowercase(),
        request_id,
        ts
    );
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return Ok(false);
    };
    mac.update(manifest.as_bytes());
    Ok(mac.verify_slice(&expected).is_ok())
}

/// Payment id of a payment notification, from the query string
/// (`type=payment&data.id=…` or the legacy `topic=payment&id=…`) or the JSON
/// body. Anything else is not a payment notification.
pub fn payment_id_from_notification(
    query: &HashMap<String, String>,
    body: &[u8],
) -> Option<String> {
    let kind = query.get("type").or_else(|| query.get("topic"));
    if kind.map(String::as_str) == Some("payment") {
        if let Some(id) = query.get("data.id").or_else(|| query.get("id")) {
            return Some(id.clone());
        }
    }

    let json: Value = serde_json::from_slice(body).ok()?;
    let kind = json
        .get("type")
        .or_else(|| json.get("topic"))
        .and_then(Value::as_str)?;
    if kind != "payment" {
        return None;
    }
    match json.pointer("/data/id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Only approved payments settle. The order is keyed by the checkout
/// reference handed out at checkout, or by the payment id when the
/// preference carried none.
pub fn settlement_from_payment(payment: Payment) -> Option<Settlement> {
    if payment.status != "approved" {
        return None;
    }
    let session_id = match payment.external_reference.as_deref().map(str::trim) {
        Some(reference) if !reference.is_empty() => reference.to_string(),
        _ => match &payment.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    };
    let reported_total = payment
        .transaction_amount
        .and_then(|n| BigDecimal::from_str(&n.to_string()).ok());

    Some(Settlement::from_metadata(
        session_id,
        PaymentProvider::MercadoPago,
        CheckoutMetadata::decode_json(&payment.metadata),
        payment.payer.and_then(|p| p.email),
        reported_total,
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const SECRET: &str = "mp-webhook-secret";

    fn sign(data_id: &str, request_id: &str, ts: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("id:{data_id};request-id:{request_id};ts:{ts};").as_bytes());
        format!("ts={ts},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn signature_matches_manifest() {
        let header = sign("123456", "req-1", "1700000000");

        assert!(verify_signature(SECRET, &header, "req-1", "123456").unwrap());
        assert!(!verify_signature(SECRET, &header, "req-2", "123456").unwrap());
        assert!(!verify_signature(SECRET, &header, "req-1", "999").unwrap());
    }

    #[test]
    fn malformed_signature_header_is_an_error() {
        assert!(verify_signature(SECRET, "v1=abc", "req", "1").is_err());
        assert!(verify_signature(SECRET, "", "req", "1").is_err());
    }

    #[test]
    fn unsigned_notifications_pass_without_a_secret() {
        let client = MercadoPagoClient::new(&MercadoPagoConfig {
            access_token: SecretString::from("token"),
            webhook_secret: None,
        });
        assert!(client.verify_notification(None, None, "1").unwrap());

        let signed = MercadoPagoClient::new(&MercadoPagoConfig {
            access_token: SecretString::from("token"),
            webhook_secret: Some(SecretString::from(SECRET)),
        });
        assert!(signed.verify_notification(None, None, "1").is_err());
    }

    #[test]
    fn payment_id_is_read_from_query_or_body() {
        let query: HashMap<String, String> = [
            ("type".to_string(), "payment".to_string()),
            ("data.id".to_string(), "42".to_string()),
        ]
        .into();
        assert_eq!(payment_id_from_notification(&query, b"").as_deref(), Some("42"));

        let body = json!({"type": "payment", "data": {"id": 77}}).to_string();
        assert_eq!(
            payment_id_from_notification(&HashMap::new(), body.as_bytes()).as_deref(),
            Some("77")
        );

        let merchant = json!({"type": "merchant_order", "data": {"id": "1"}}).to_string();
        assert_eq!(
            payment_id_from_notification(&HashMap::new(), merchant.as_bytes()),
            None
        );
    }

    fn payment(status: &str) -> Payment {
        let mut metadata = CheckoutMetadata::default();
        metadata.email = Some("mae@example.com".to_string());
        serde_json::from_value(json!({
            "id": 123456789,
            "status": status,
            "transaction_amount": 161.35,
            "metadata": metadata.encode(),
            "payer": {"email": "payer@example.com"}
        }))
        .unwrap()
    }

    #[test]
    fn approved_payment_settles() {
        let settlement = settlement_from_payment(payment("approved")).unwrap();

        assert_eq!(settlement.payment_session_id, "123456789");
        assert_eq!(settlement.provider, PaymentProvider::MercadoPago);
        assert_eq!(settlement.customer_email.as_deref(), Some("mae@example.com"));
        assert_eq!(
            settlement.reported_total,
            Some(BigDecimal::from_str("161.35").unwrap())
        );
    }

    #[test]
    fn approved_payment_settles_under_checkout_reference() {
        let mut payment = payment("approved");
        payment.external_reference = Some("9f1c2d7e-checkout".to_string());

        let settlement = settlement_from_payment(payment).unwrap();

        assert_eq!(settlement.payment_session_id, "9f1c2d7e-checkout");
    }

    #[test]
    fn preference_carries_checkout_reference() {
        use crate::application::checkout_service::prepare_checkout;
        use crate::domain::cart::{Cart, CartProduct};
        use crate::domain::checkout::ShippingAddress;

        let mut cart = Cart::new();
        cart.add(
            &CartProduct {
                id: "p1".to_string(),
                name: "Body".to_string(),
                price: BigDecimal::from_str("39.90").unwrap(),
                image: None,
            },
            None,
            None,
        );
        let checkout = prepare_checkout(&cart, ShippingAddress::default(), None, None).unwrap();
        let back_urls = BackUrls {
            success: "s".to_string(),
            failure: "f".to_string(),
            pending: "p".to_string(),
        };

        let body =
            serde_json::to_value(preference_request(&checkout, &back_urls, "https://api/hook"))
                .unwrap();

        assert_eq!(body["external_reference"], checkout.reference.as_str());
        assert_eq!(body["items"][0]["unit_price"], 39.9);
    }

    #[test]
    fn pending_or_rejected_payments_do_not_settle() {
        assert!(settlement_from_payment(payment("pending")).is_none());
        assert!(settlement_from_payment(payment("rejected")).is_none());
    }
}
