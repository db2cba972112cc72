use actix_web::{http::StatusCode, HttpResponse};
use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::infrastructure::melhor_envio::ShippingError;
use crate::infrastructure::mercadopago::MercadoPagoError;
use crate::infrastructure::stripe::StripeError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A third-party API refused the request. `status` is passed through to
    /// the client when it is a client or server error status.
    #[error("Upstream error ({status}): {message}")]
    Upstream {
        status: u16,
        message: String,
        details: Value,
    },

    /// A required integration has no configuration, e.g. `shipping_not_configured`.
    #[error("Not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound(what) => AppError::NotFound(what),
            DomainError::InvalidInput(msg) => AppError::BadRequest(msg),
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<StripeError> for AppError {
    fn from(e: StripeError) -> Self {
        match e {
            StripeError::MalformedSignature(_) => AppError::InvalidSignature,
            StripeError::MalformedEvent(err) => AppError::BadRequest(err.to_string()),
            StripeError::Api { status, body } => AppError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: format!("Stripe responded {status}"),
                details: serde_json::from_str(&body).unwrap_or(Value::String(body)),
            },
            StripeError::Http(err) => AppError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: err.to_string(),
                details: Value::Null,
            },
        }
    }
}

impl From<MercadoPagoError> for AppError {
    fn from(e: MercadoPagoError) -> Self {
        match e {
            MercadoPagoError::MalformedSignature(_) => AppError::InvalidSignature,
            MercadoPagoError::Api { status, body } => AppError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: format!("Mercado Pago responded {status}"),
                details: serde_json::from_str(&body).unwrap_or(Value::String(body)),
            },
            MercadoPagoError::Http(err) => AppError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: err.to_string(),
                details: Value::Null,
            },
        }
    }
}

impl From<ShippingError> for AppError {
    fn from(e: ShippingError) -> Self {
        match e {
            ShippingError::InvalidPostalCode(cep) => {
                AppError::BadRequest(format!("invalid postal code '{cep}'"))
            }
            ShippingError::Carrier { status, body } => AppError::Upstream {
                status,
                message: "carrier_error".to_string(),
                details: body,
            },
            ShippingError::Http(err) => AppError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: err.to_string(),
                details: Value::Null,
            },
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::InvalidSignature => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            AppError::NotConfigured(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Internal(msg) => {
                log::error!("Internal error: {}", msg);
                json!({ "error": "Internal server error" })
            }
            AppError::NotConfigured(what) => json!({ "error": what }),
            AppError::Upstream {
                message, details, ..
            } => json!({ "error": message, "details": details }),
            other => json!({ "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
