use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::checkout::CheckoutMetadata;
use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
        }
    }

    /// Customer-facing wording used in notification e-mails.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Aguardando pagamento",
            Self::Paid => "Pagamento confirmado",
            Self::Shipped => "Pedido enviado",
            Self::Delivered => "Pedido entregue",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "SHIPPED" => Ok(Self::Shipped),
            "DELIVERED" => Ok(Self::Delivered),
            other => Err(DomainError::InvalidInput(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProvider {
    Stripe,
    MercadoPago,
}

impl PaymentProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::MercadoPago => "mercadopago",
        }
    }
}

impl FromStr for PaymentProvider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "mercadopago" | "mercado_pago" => Ok(Self::MercadoPago),
            other => Err(DomainError::InvalidInput(format!(
                "unknown payment provider '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettlementItem {
    /// `None` for freight and for ids that are not product UUIDs.
    pub product_id: Option<Uuid>,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub is_freight: bool,
}

impl SettlementItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }

    /// Whether settling this line should touch product stock.
    pub fn affects_stock(&self) -> bool {
        !self.is_freight && self.product_id.is_some()
    }
}

/// A confirmed payment ready to be turned into an order.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub payment_session_id: String,
    pub provider: PaymentProvider,
    pub user_id: Option<Uuid>,
    pub customer_email: Option<String>,
    pub shipping_address: String,
    pub items: Vec<SettlementItem>,
    /// Amount the provider says it charged, when it reports one.
    pub reported_total: Option<BigDecimal>,
}

impl Settlement {
    pub fn from_metadata(
        payment_session_id: impl Into<String>,
        provider: PaymentProvider,
        metadata: CheckoutMetadata,
        payer_email: Option<String>,
        reported_total: Option<BigDecimal>,
    ) -> Self {
        let items = metadata
            .items
            .into_iter()
            .map(|i| SettlementItem {
                product_id: if i.is_freight {
                    None
                } else {
                    Uuid::parse_str(&i.id).ok()
                },
                name: i.name,
                unit_price: i.price,
                quantity: i.quantity,
                size: i.size,
                color: i.color,
                is_freight: i.is_freight,
            })
            .collect();

        Self {
            payment_session_id: payment_session_id.into(),
            provider,
            user_id: metadata.user_id,
            customer_email: metadata.email.or(payer_email),
            shipping_address: metadata.address.to_string(),
            items,
            reported_total,
        }
    }

    /// Sum of every line, freight included; this is what the order records.
    pub fn total(&self) -> BigDecimal {
        self.items.iter().map(SettlementItem::line_total).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Created { order_id: Uuid },
    AlreadySettled { order_id: Uuid },
}

impl SettlementOutcome {
    pub fn order_id(&self) -> Uuid {
        match self {
            Self::Created { order_id } | Self::AlreadySettled { order_id } => *order_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub is_freight: bool,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: Uuid,
    pub payment_session_id: String,
    pub provider: String,
    pub user_id: Option<Uuid>,
    /// Owner's account e-mail, falling back to the e-mail given at checkout.
    pub contact_email: Option<String>,
    pub total: BigDecimal,
    pub status: OrderStatus,
    pub tracking_code: Option<String>,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<OrderView>,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    pub status: Option<OrderStatus>,
    pub tracking_code: Option<String>,
}

impl StatusUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.tracking_code.is_none()
    }
}
