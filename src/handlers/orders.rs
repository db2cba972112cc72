use std::str::FromStr;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::order_service::OrderService;
use crate::auth::{AdminUser, CurrentUser};
use crate::domain::order::{OrderStatus, OrderView, StatusUpdate};
use crate::errors::AppError;
use crate::infrastructure::mailer::Mailer;
use crate::infrastructure::order_repo::DieselOrderRepository;

pub type Orders = web::Data<OrderService<DieselOrderRepository>>;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    /// Absent for freight lines.
    pub product_id: Option<Uuid>,
    pub name: String,
    pub unit_price: String,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub is_freight: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub payment_session_id: String,
    pub provider: String,
    pub user_id: Option<Uuid>,
    pub contact_email: Option<String>,
    /// Decimal string, e.g. "125.90"
    pub total: String,
    pub status: String,
    pub tracking_code: Option<String>,
    pub shipping_address: String,
    pub created_at: String,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(o: OrderView) -> Self {
        Self {
            id: o.id,
            payment_session_id: o.payment_session_id,
            provider: o.provider,
            user_id: o.user_id,
            contact_email: o.contact_email,
            total: o.total.with_scale(2).to_string(),
            status: o.status.as_str().to_string(),
            tracking_code: o.tracking_code,
            shipping_address: o.shipping_address,
            created_at: o.created_at.to_rfc3339(),
            items: o
                .items
                .into_iter()
                .map(|i| OrderItemResponse {
                    id: i.id,
                    product_id: i.product_id,
                    name: i.name,
                    unit_price: i.unit_price.with_scale(2).to_string(),
                    quantity: i.quantity,
                    size: i.size,
                    color: i.color,
                    is_freight: i.is_freight,
                })
                .collect(),
        }
    }
}

/// What an anonymous caller may learn about a settled payment.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderCheckResponse {
    pub id: Uuid,
    pub status: String,
    /// Decimal string, e.g. "125.90"
    pub total: String,
    pub created_at: String,
}

impl From<OrderView> for OrderCheckResponse {
    fn from(o: OrderView) -> Self {
        Self {
            id: o.id,
            status: o.status.as_str().to_string(),
            total: o.total.with_scale(2).to_string(),
            created_at: o.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    /// One of PENDING, PAID, SHIPPED, DELIVERED
    pub status: Option<String>,
    /// Carrier tracking code; an empty string clears it.
    pub tracking_code: Option<String>,
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Admin ────────────────────────────────────────────────────────────────────

/// GET /api/admin/orders
///
/// Paginated orders, newest first, with their items.
#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Not an admin"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    _admin: AdminUser,
    orders: Orders,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result = web::block(move || orders.list_orders(page, limit))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// GET /api/admin/orders/{id}
#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    _admin: AdminUser,
    orders: Orders,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || orders.get_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??
        .ok_or_else(|| AppError::NotFound(format!("Order {order_id}")))?;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PATCH /api/admin/orders/{id}
///
/// Change status and/or tracking code, then notify the customer. The update
/// stands even if the e-mail cannot be sent.
#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Unknown status or empty update"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn update_order(
    _admin: AdminUser,
    orders: Orders,
    mailer: web::Data<Mailer>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();
    let update = StatusUpdate {
        status: body
            .status
            .as_deref()
            .map(OrderStatus::from_str)
            .transpose()?,
        tracking_code: body.tracking_code,
    };

    let order = web::block(move || orders.update_status(order_id, update))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    match order.contact_email.as_deref() {
        Some(to) => {
            if let Err(e) = mailer.send_status_update(to, &order).await {
                log::warn!("Status e-mail for order {} not sent: {}", order.id, e);
            }
        }
        None => log::info!("Order {} has no contact e-mail; skipping notification", order.id),
    }

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

// ── Customer ─────────────────────────────────────────────────────────────────

/// GET /api/orders/mine
#[utoipa::path(
    get,
    path = "/api/orders/mine",
    responses(
        (status = 200, description = "The signed-in user's orders", body = [OrderResponse]),
        (status = 401, description = "Not signed in"),
    ),
    tag = "orders"
)]
pub async fn my_orders(user: CurrentUser, orders: Orders) -> Result<HttpResponse, AppError> {
    let user_id = user.0.id;

    let list = web::block(move || orders.list_for_user(user_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(
        list.into_iter()
            .map(OrderResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// GET /api/orders/check/{session_id}
///
/// Lets the post-payment page poll until the webhook has created the order.
/// Only settlement status is exposed; contact and address stay behind login.
#[utoipa::path(
    get,
    path = "/api/orders/check/{session_id}",
    params(("session_id" = String, Path, description = "Payment session id")),
    responses(
        (status = 200, description = "Order created for this payment", body = OrderCheckResponse),
        (status = 404, description = "Not settled yet"),
    ),
    tag = "orders"
)]
pub async fn check_order(orders: Orders, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let session_id = path.into_inner();

    let order = web::block(move || orders.get_by_session(&session_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

    Ok(HttpResponse::Ok().json(OrderCheckResponse::from(order)))
}
