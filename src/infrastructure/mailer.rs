//! Transactional e-mail over SMTP.
//!
//! Sending is best effort: callers log failures and carry on.

use lettre::{
    message::header::ContentType,
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::domain::order::OrderView;

const TRACKING_URL: &str = "https://rastreamento.correios.com.br/app/index.php?objetos=";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

#[derive(Clone)]
struct Smtp {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

/// SMTP mailer; without configuration every send is skipped.
#[derive(Clone)]
pub struct Mailer {
    smtp: Option<Smtp>,
}

impl Mailer {
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            smtp: Some(Smtp {
                transport,
                from_address: config.from_address.clone(),
            }),
        })
    }

    pub fn disabled() -> Self {
        Self { smtp: None }
    }

    pub async fn send_order_confirmation(&self, to: &str, order: &OrderView) -> Result<(), EmailError> {
        let (subject, body) = confirmation_message(order);
        self.send(to, &subject, body).await
    }

    pub async fn send_status_update(&self, to: &str, order: &OrderView) -> Result<(), EmailError> {
        let (subject, body) = status_message(order);
        self.send(to, &subject, body).await
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> Result<(), EmailError> {
        let Some(smtp) = &self.smtp else {
            log::debug!("SMTP not configured; skipping '{}' to {}", subject, to);
            return Ok(());
        };

        let email = Message::builder()
            .from(
                smtp.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(smtp.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        smtp.transport.send(email).await?;

        log::info!("Email '{}' sent to {}", subject, to);
        Ok(())
    }
}

fn short_id(order: &OrderView) -> String {
    order.id.simple().to_string()[..8].to_uppercase()
}

pub fn confirmation_message(order: &OrderView) -> (String, String) {
    let subject = format!("Pedido #{} confirmado", short_id(order));
    let mut body = String::from("Olá!\n\nRecebemos o pagamento do seu pedido.\n\n");
    for item in &order.items {
        let variant: Vec<&str> = [item.size.as_deref(), item.color.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        let label = if variant.is_empty() {
            item.name.clone()
        } else {
            format!("{} ({})", item.name, variant.join(" / "))
        };
        body.push_str(&format!(
            "- {} x{}  R$ {}\n",
            label,
            item.quantity,
            item.unit_price.with_scale(2)
        ));
    }
    body.push_str(&format!("\nTotal: R$ {}\n", order.total.with_scale(2)));
    if !order.shipping_address.is_empty() {
        body.push_str(&format!("Entrega: {}\n", order.shipping_address));
    }
    body.push_str("\nObrigado por comprar com a gente!\n");
    (subject, body)
}

pub fn status_message(order: &OrderView) -> (String, String) {
    let subject = format!(
        "Pedido #{}: {}",
        short_id(order),
        order.status.label()
    );
    let mut body = format!(
        "Olá!\n\nO status do seu pedido agora é: {}.\n",
        order.status.label()
    );
    if let Some(code) = &order.tracking_code {
        body.push_str(&format!(
            "\nCódigo de rastreio: {code}\nAcompanhe: {TRACKING_URL}{code}\n"
        ));
    }
    (subject, body)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::domain::order::{OrderItemView, OrderStatus};

    fn order() -> OrderView {
        OrderView {
            id: Uuid::parse_str("7f9c24e8-3b12-4fad-8c1e-000000000001").unwrap(),
            payment_session_id: "cs_1".to_string(),
            provider: "stripe".to_string(),
            user_id: None,
            contact_email: Some("mae@example.com".to_string()),
            total: BigDecimal::from_str("125.9").unwrap(),
            status: OrderStatus::Paid,
            tracking_code: None,
            shipping_address: "Rua A, 1 - Curitiba/PR".to_string(),
            created_at: Utc::now(),
            items: vec![OrderItemView {
                id: Uuid::new_v4(),
                product_id: None,
                name: "Vestido".to_string(),
                unit_price: BigDecimal::from_str("100").unwrap(),
                quantity: 1,
                size: Some("M".to_string()),
                color: Some("Azul".to_string()),
                is_freight: false,
            }],
        }
    }

    #[test]
    fn confirmation_lists_items_and_total() {
        let (subject, body) = confirmation_message(&order());

        assert_eq!(subject, "Pedido #7F9C24E8 confirmado");
        assert!(body.contains("- Vestido (M / Azul) x1  R$ 100.00"));
        assert!(body.contains("Total: R$ 125.90"));
        assert!(body.contains("Entrega: Rua A, 1 - Curitiba/PR"));
    }

    #[test]
    fn status_update_includes_tracking_link() {
        let mut shipped = order();
        shipped.status = OrderStatus::Shipped;
        shipped.tracking_code = Some("BR123456789BR".to_string());

        let (_, body) = status_message(&shipped);

        assert!(body.contains(OrderStatus::Shipped.label()));
        assert!(body.contains(&format!("{TRACKING_URL}BR123456789BR")));
    }

    #[tokio::test]
    async fn disabled_mailer_skips_sending() {
        let mailer = Mailer::disabled();
        assert!(mailer.send_order_confirmation("x@example.com", &order()).await.is_ok());
    }
}
