//! Payment provider webhooks.
//!
//! Both providers end in [`settle_and_notify`]: verified and decoded events
//! become a [`Settlement`], which is recorded at most once per payment.
//! Anything that is not a completed payment is acknowledged with 200 so the
//! provider stops retrying it.

use std::collections::HashMap;

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::settlement::SettlementService;
use crate::domain::order::{Settlement, SettlementOutcome};
use crate::errors::AppError;
use crate::handlers::orders::Orders;
use crate::infrastructure::mailer::Mailer;
use crate::infrastructure::mercadopago::{
    payment_id_from_notification, settlement_from_payment, MercadoPagoClient,
};
use crate::infrastructure::order_repo::DieselOrderRepository;
use crate::infrastructure::stripe::{settlement_from_event, StripeClient};

pub type Settlements = web::Data<SettlementService<DieselOrderRepository>>;

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    pub received: bool,
    /// Order recorded for this payment, when the event settled one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
}

impl WebhookResponse {
    fn ack() -> HttpResponse {
        HttpResponse::Ok().json(Self {
            received: true,
            order_id: None,
        })
    }

    fn settled(order_id: Uuid) -> HttpResponse {
        HttpResponse::Ok().json(Self {
            received: true,
            order_id: Some(order_id),
        })
    }
}

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

// ── Stripe ───────────────────────────────────────────────────────────────────

/// POST /api/webhooks/stripe
#[utoipa::path(
    post,
    path = "/api/webhooks/stripe",
    request_body(content = String, description = "Raw Stripe event JSON", content_type = "application/json"),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookResponse),
        (status = 400, description = "Missing or invalid Stripe-Signature, or unreadable event"),
        (status = 500, description = "Settlement failed; Stripe will retry"),
    ),
    tag = "webhooks"
)]
pub async fn stripe_webhook(
    req: HttpRequest,
    body: web::Bytes,
    stripe: Option<web::Data<StripeClient>>,
    settlements: Settlements,
    orders: Orders,
    mailer: web::Data<Mailer>,
) -> Result<HttpResponse, AppError> {
    let stripe = stripe.ok_or(AppError::NotConfigured("stripe_not_configured"))?;
    let signature = header(&req, "stripe-signature").ok_or(AppError::InvalidSignature)?;

    if !stripe.verify_webhook_signature(&body, signature)? {
        log::warn!("Rejected Stripe webhook with a bad signature");
        return Err(AppError::InvalidSignature);
    }

    let Some(settlement) = settlement_from_event(&body)? else {
        log::debug!("Ignoring Stripe event without a completed payment");
        return Ok(WebhookResponse::ack());
    };

    let order_id = settle_and_notify(settlements, orders, mailer, settlement).await?;
    Ok(WebhookResponse::settled(order_id))
}

// ── Mercado Pago ─────────────────────────────────────────────────────────────

/// POST /api/webhooks/mercadopago
///
/// The notification only names the payment; its status and the cart snapshot
/// come from a follow-up lookup.
#[utoipa::path(
    post,
    path = "/api/webhooks/mercadopago",
    request_body(content = String, description = "Mercado Pago notification JSON", content_type = "application/json"),
    responses(
        (status = 200, description = "Notification acknowledged", body = WebhookResponse),
        (status = 400, description = "Invalid x-signature"),
        (status = 500, description = "Settlement failed; Mercado Pago will retry"),
    ),
    tag = "webhooks"
)]
pub async fn mercadopago_webhook(
    req: HttpRequest,
    query: web::Query<HashMap<String, String>>,
    body: web::Bytes,
    mercadopago: Option<web::Data<MercadoPagoClient>>,
    settlements: Settlements,
    orders: Orders,
    mailer: web::Data<Mailer>,
) -> Result<HttpResponse, AppError> {
    let mercadopago = mercadopago.ok_or(AppError::NotConfigured("mercadopago_not_configured"))?;

    let Some(payment_id) = payment_id_from_notification(&query, &body) else {
        log::debug!("Ignoring Mercado Pago notification that is not about a payment");
        return Ok(WebhookResponse::ack());
    };

    let verified = mercadopago.verify_notification(
        header(&req, "x-signature"),
        header(&req, "x-request-id"),
        &payment_id,
    )?;
    if !verified {
        log::warn!("Rejected Mercado Pago notification for payment {payment_id}: bad signature");
        return Err(AppError::InvalidSignature);
    }

    let payment = match mercadopago.fetch_payment(&payment_id).await {
        Ok(payment) => payment,
        Err(e) => {
            log::error!("Could not fetch Mercado Pago payment {}: {}", payment_id, e);
            return Ok(WebhookResponse::ack());
        }
    };

    let Some(settlement) = settlement_from_payment(payment) else {
        log::info!("Mercado Pago payment {payment_id} is not approved yet");
        return Ok(WebhookResponse::ack());
    };

    let order_id = settle_and_notify(settlements, orders, mailer, settlement).await?;
    Ok(WebhookResponse::settled(order_id))
}

// ── Shared ───────────────────────────────────────────────────────────────────

/// Record the payment and, for a newly created order, e-mail a confirmation.
async fn settle_and_notify(
    settlements: Settlements,
    orders: Orders,
    mailer: web::Data<Mailer>,
    settlement: Settlement,
) -> Result<Uuid, AppError> {
    let outcome = web::block(move || settlements.settle(&settlement))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let SettlementOutcome::Created { order_id } = outcome else {
        return Ok(outcome.order_id());
    };

    let order = match web::block(move || orders.get_order(order_id)).await {
        Ok(Ok(Some(order))) => order,
        Ok(Ok(None)) => {
            log::error!("Order {order_id} missing right after settlement");
            return Ok(order_id);
        }
        Ok(Err(e)) => {
            log::error!("Could not load order {} for confirmation: {}", order_id, e);
            return Ok(order_id);
        }
        Err(e) => {
            log::error!("Could not load order {} for confirmation: {}", order_id, e);
            return Ok(order_id);
        }
    };

    match order.contact_email.as_deref() {
        Some(to) => {
            if let Err(e) = mailer.send_order_confirmation(to, &order).await {
                log::warn!("Confirmation e-mail for order {} not sent: {}", order_id, e);
            }
        }
        None => log::info!("Order {order_id} has no contact e-mail; skipping confirmation"),
    }

    Ok(order_id)
}
