//! Melhor Envio rate calculation for the PAC and SEDEX tiers.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::ShippingConfig;
use crate::domain::shipping::{
    normalize_postal_code, PackageItem, ShippingQuote, ShippingQuotes, SERVICE_PAC, SERVICE_SEDEX,
};

const USER_AGENT: &str = concat!("lojinha/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ShippingError {
    #[error("invalid postal code '{0}'")]
    InvalidPostalCode(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("carrier responded {status}")]
    Carrier { status: u16, body: Value },
}

#[derive(Debug, Serialize)]
struct PostalCode<'a> {
    postal_code: &'a str,
}

#[derive(Debug, Serialize)]
struct Product<'a> {
    id: &'a str,
    width: f64,
    height: f64,
    length: f64,
    weight: f64,
    insurance_value: f64,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct CalculateRequest<'a> {
    from: PostalCode<'a>,
    to: PostalCode<'a>,
    products: Vec<Product<'a>>,
    services: String,
}

/// One entry of the calculate response. Unavailable services carry `error`
/// instead of a price.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceQuote {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub delivery_time: Option<i32>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct MelhorEnvioClient {
    http: reqwest::Client,
    token: SecretString,
    origin_postal_code: String,
    base_url: String,
}

impl MelhorEnvioClient {
    pub fn new(config: &ShippingConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: config.token.clone(),
            origin_postal_code: config.origin_postal_code.clone(),
            base_url: config.base_url.clone(),
        }
    }

    pub async fn quote(
        &self,
        destination: &str,
        items: Vec<PackageItem>,
    ) -> Result<ShippingQuotes, ShippingError> {
        let to = normalize_postal_code(destination)
            .ok_or_else(|| ShippingError::InvalidPostalCode(destination.to_string()))?;
        let from = normalize_postal_code(&self.origin_postal_code)
            .ok_or_else(|| ShippingError::InvalidPostalCode(self.origin_postal_code.clone()))?;
        let items: Vec<PackageItem> = items.into_iter().map(PackageItem::clamped).collect();

        let request = CalculateRequest {
            from: PostalCode { postal_code: &from },
            to: PostalCode { postal_code: &to },
            products: items
                .iter()
                .map(|i| Product {
                    id: &i.id,
                    width: i.width_cm,
                    height: i.height_cm,
                    length: i.length_cm,
                    weight: i.weight_kg,
                    insurance_value: i.insurance_value,
                    quantity: i.quantity,
                })
                .collect(),
            services: format!("{SERVICE_PAC},{SERVICE_SEDEX}"),
        };

        let response = self
            .http
            .post(format!("{}/api/v2/me/shipment/calculate", self.base_url))
            .bearer_auth(self.token.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            log::warn!("Melhor Envio answered {}: {}", status, body);
            return Err(ShippingError::Carrier {
                status: status.as_u16(),
                body,
            });
        }

        let services: Vec<ServiceQuote> = response.json().await?;
        Ok(normalize_quotes(&services))
    }
}

/// Pick the PAC and SEDEX entries; a tier the carrier could not price is
/// left empty.
pub fn normalize_quotes(services: &[ServiceQuote]) -> ShippingQuotes {
    let pick = |service_id: i64| {
        services
            .iter()
            .find(|s| s.id == service_id && s.error.is_none())
            .and_then(|s| {
                let price = match s.price.as_ref()? {
                    Value::String(p) => BigDecimal::from_str(p).ok()?,
                    Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok()?,
                    _ => return None,
                };
                Some(ShippingQuote {
                    price,
                    deadline_days: s.delivery_time.unwrap_or_default(),
                })
            })
    };
    ShippingQuotes {
        pac: pick(SERVICE_PAC),
        sedex: pick(SERVICE_SEDEX),
    }
}
