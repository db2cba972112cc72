use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::shipping::{PackageItem, ShippingQuote};
use crate::errors::AppError;
use crate::infrastructure::melhor_envio::MelhorEnvioClient;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PackageItemRequest {
    pub id: String,
    /// Centimetres; values below the carrier minimum are raised.
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub length: f64,
    /// Kilograms
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub insurance_value: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShippingQuoteRequest {
    /// Destination CEP, with or without the hyphen
    pub postal_code: String,
    pub items: Vec<PackageItemRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuoteResponse {
    pub price: String,
    pub deadline_days: i32,
}

impl From<ShippingQuote> for QuoteResponse {
    fn from(q: ShippingQuote) -> Self {
        Self {
            price: q.price.with_scale(2).to_string(),
            deadline_days: q.deadline_days,
        }
    }
}

/// A tier is omitted when the carrier cannot serve the destination with it.
#[derive(Debug, Serialize, ToSchema)]
pub struct ShippingQuoteResponse {
    pub pac: Option<QuoteResponse>,
    pub sedex: Option<QuoteResponse>,
}

/// POST /api/shipping/quote
#[utoipa::path(
    post,
    path = "/api/shipping/quote",
    request_body = ShippingQuoteRequest,
    responses(
        (status = 200, description = "PAC and SEDEX quotes", body = ShippingQuoteResponse),
        (status = 400, description = "Invalid CEP or no items"),
        (status = 500, description = "shipping_not_configured"),
    ),
    tag = "shipping"
)]
pub async fn quote_shipping(
    client: Option<web::Data<MelhorEnvioClient>>,
    body: web::Json<ShippingQuoteRequest>,
) -> Result<HttpResponse, AppError> {
    let client = client.ok_or(AppError::NotConfigured("shipping_not_configured"))?;
    let body = body.into_inner();
    if body.items.is_empty() {
        return Err(AppError::BadRequest("items must not be empty".to_string()));
    }

    let items = body
        .items
        .into_iter()
        .map(|i| PackageItem {
            id: i.id,
            width_cm: i.width,
            height_cm: i.height,
            length_cm: i.length,
            weight_kg: i.weight,
            insurance_value: i.insurance_value,
            quantity: i.quantity,
        })
        .collect();

    let quotes = client.quote(&body.postal_code, items).await?;

    Ok(HttpResponse::Ok().json(ShippingQuoteResponse {
        pac: quotes.pac.map(QuoteResponse::from),
        sedex: quotes.sedex.map(QuoteResponse::from),
    }))
}
