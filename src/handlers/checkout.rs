use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::checkout_service::{prepare_checkout, price_from_catalog, PreparedCheckout};
use crate::auth::CurrentUser;
use crate::config::Config;
use crate::domain::cart::{is_freight_line, Cart, CartItem};
use crate::domain::checkout::ShippingAddress;
use crate::domain::order::PaymentProvider;
use crate::errors::AppError;
use crate::handlers::catalog::Catalog;
use crate::infrastructure::mercadopago::{BackUrls, MercadoPagoClient};
use crate::infrastructure::stripe::StripeClient;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutItemRequest {
    /// Product id, or a reserved freight id such as `frete-pac`
    pub id: String,
    pub name: String,
    /// Unit price as a decimal string, e.g. "89.90"
    pub price: String,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub is_freight: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddressRequest {
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub complement: String,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
}

impl From<AddressRequest> for ShippingAddress {
    fn from(a: AddressRequest) -> Self {
        Self {
            recipient: a.recipient.trim().to_string(),
            street: a.street.trim().to_string(),
            number: a.number.trim().to_string(),
            complement: a.complement.trim().to_string(),
            neighborhood: a.neighborhood.trim().to_string(),
            city: a.city.trim().to_string(),
            state: a.state.trim().to_string(),
            postal_code: a.postal_code.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// `stripe` or `mercadopago`
    pub provider: String,
    pub items: Vec<CheckoutItemRequest>,
    pub address: Option<AddressRequest>,
    /// Receipt address; defaults to the account e-mail.
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    /// Hosted payment page to redirect the shopper to
    pub url: String,
    /// Id to poll `/api/orders/check/{session_id}` with
    pub session_id: String,
}

/// Rebuild the shopper's cart. Product lines keep their quantities; the last
/// freight line wins.
fn cart_from_request(items: Vec<CheckoutItemRequest>) -> Result<Cart, AppError> {
    let mut lines = Vec::new();
    let mut freight = None;
    for item in items {
        let price = BigDecimal::from_str(item.price.trim())
            .map_err(|_| AppError::BadRequest(format!("invalid price '{}'", item.price)))?;
        let is_freight = is_freight_line(&item.id, &item.name, item.is_freight);
        let line = CartItem {
            id: item.id,
            name: item.name,
            price,
            quantity: item.quantity,
            size: item.size.filter(|s| !s.trim().is_empty()),
            color: item.color.filter(|c| !c.trim().is_empty()),
            image: item.image,
            is_freight,
        };
        if is_freight {
            freight = Some(line);
        } else {
            lines.push(line);
        }
    }

    let mut cart = Cart::from(lines);
    if let Some(freight) = freight {
        cart.add_freight(freight);
    }
    Ok(cart)
}

// ── Handler ──────────────────────────────────────────────────────────────────

/// POST /api/checkout
///
/// Opens a hosted checkout with the chosen provider. Product prices come from
/// the catalog, not the request. The cart snapshot rides along as session
/// metadata and comes back in the payment webhook.
#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Checkout session opened", body = CheckoutResponse),
        (status = 400, description = "Empty cart, unknown product or variant, bad price or unknown provider"),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Provider not configured"),
        (status = 502, description = "Provider refused the session"),
    ),
    tag = "checkout"
)]
pub async fn create_checkout(
    user: CurrentUser,
    config: web::Data<Config>,
    catalog: Catalog,
    stripe: Option<web::Data<StripeClient>>,
    mercadopago: Option<web::Data<MercadoPagoClient>>,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let provider = PaymentProvider::from_str(&body.provider)?;
    let requested = cart_from_request(body.items)?;
    let cart = web::block(move || price_from_catalog(&requested, |id| catalog.get_product(id)))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    let address = body.address.map(ShippingAddress::from).unwrap_or_default();
    let email = body.email.or_else(|| Some(user.0.email.clone()));

    let checkout = prepare_checkout(&cart, address, Some(user.0.id), email)?;

    let response = match provider {
        PaymentProvider::Stripe => {
            let stripe = stripe.ok_or(AppError::NotConfigured("stripe_not_configured"))?;
            open_stripe(&stripe, &config, &checkout).await?
        }
        PaymentProvider::MercadoPago => {
            let mercadopago =
                mercadopago.ok_or(AppError::NotConfigured("mercadopago_not_configured"))?;
            open_mercadopago(&mercadopago, &config, &checkout).await?
        }
    };

    log::info!(
        "Checkout {} opened with {} for user {} totalling {}",
        response.session_id,
        provider.as_str(),
        user.0.id,
        checkout.total
    );
    Ok(HttpResponse::Ok().json(response))
}

async fn open_stripe(
    stripe: &StripeClient,
    config: &Config,
    checkout: &PreparedCheckout,
) -> Result<CheckoutResponse, AppError> {
    let success_url = format!(
        "{}/checkout/sucesso?session_id={{CHECKOUT_SESSION_ID}}",
        config.site_url
    );
    let cancel_url = format!("{}/carrinho", config.site_url);

    let session = stripe
        .create_checkout_session(checkout, &success_url, &cancel_url)
        .await?;
    Ok(CheckoutResponse {
        url: session.url,
        session_id: session.id,
    })
}

async fn open_mercadopago(
    mercadopago: &MercadoPagoClient,
    config: &Config,
    checkout: &PreparedCheckout,
) -> Result<CheckoutResponse, AppError> {
    let back_urls = BackUrls {
        success: format!("{}/checkout/sucesso", config.site_url),
        failure: format!("{}/carrinho", config.site_url),
        pending: format!("{}/checkout/pendente", config.site_url),
    };
    let notification_url = format!("{}/api/webhooks/mercadopago", config.api_url);

    let preference = mercadopago
        .create_preference(checkout, &back_urls, &notification_url)
        .await?;
    log::debug!(
        "Mercado Pago preference {} opened for checkout {}",
        preference.id,
        checkout.reference
    );
    Ok(CheckoutResponse {
        url: preference.init_point,
        session_id: checkout.reference.clone(),
    })
}
