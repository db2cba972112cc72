//! Shared settlement routine for every payment provider.
//!
//! Webhook handlers verify and decode their provider's event, build a
//! [`Settlement`], and hand it here. The repository does the atomic work; this
//! layer adds the fast-path duplicate check and the bookkeeping logs.

use crate::domain::errors::DomainError;
use crate::domain::order::{Settlement, SettlementOutcome};
use crate::domain::ports::OrderRepository;

pub struct SettlementService<R> {
    repo: R,
}

impl<R: OrderRepository> SettlementService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn settle(&self, settlement: &Settlement) -> Result<SettlementOutcome, DomainError> {
        if let Some(existing) = self.repo.find_by_session_id(&settlement.payment_session_id)? {
            log::info!(
                "Payment session {} already settled as order {}",
                settlement.payment_session_id,
                existing.id
            );
            return Ok(SettlementOutcome::AlreadySettled {
                order_id: existing.id,
            });
        }

        let total = settlement.total();
        if let Some(reported) = &settlement.reported_total {
            if *reported != total {
                log::warn!(
                    "Payment session {}: provider charged {} but cart snapshot sums to {}",
                    settlement.payment_session_id,
                    reported,
                    total
                );
            }
        }
        if settlement.items.is_empty() {
            log::warn!(
                "Payment session {} carried no cart items; recording an empty order",
                settlement.payment_session_id
            );
        }

        let outcome = self.repo.settle(settlement)?;
        match outcome {
            SettlementOutcome::Created { order_id } => log::info!(
                "Settled payment session {} ({}) as order {} totalling {}",
                settlement.payment_session_id,
                settlement.provider.as_str(),
                order_id,
                total
            ),
            // Lost the race against a concurrent delivery of the same event.
            SettlementOutcome::AlreadySettled { order_id } => log::info!(
                "Payment session {} was settled concurrently as order {}",
                settlement.payment_session_id,
                order_id
            ),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use super::*;
    use crate::application::test_utils::InMemoryOrderRepository;
    use crate::domain::order::{PaymentProvider, SettlementItem};

    fn settlement(session: &str) -> Settlement {
        Settlement {
            payment_session_id: session.to_string(),
            provider: PaymentProvider::Stripe,
            user_id: None,
            customer_email: Some("cliente@example.com".to_string()),
            shipping_address: "Rua A, 1".to_string(),
            items: vec![SettlementItem {
                product_id: Some(Uuid::new_v4()),
                name: "Vestido".to_string(),
                unit_price: BigDecimal::from_str("100.00").unwrap(),
                quantity: 1,
                size: Some("M".to_string()),
                color: Some("Azul".to_string()),
                is_freight: false,
            }],
            reported_total: Some(BigDecimal::from_str("100.00").unwrap()),
        }
    }

    #[test]
    fn first_delivery_creates_order() {
        let repo = InMemoryOrderRepository::default();
        let service = SettlementService::new(repo.clone());

        let outcome = service.settle(&settlement("cs_1")).expect("settle failed");

        assert!(matches!(outcome, SettlementOutcome::Created { .. }));
        assert_eq!(repo.order_count(), 1);
    }

    #[test]
    fn repeated_delivery_is_a_no_op() {
        let repo = InMemoryOrderRepository::default();
        let service = SettlementService::new(repo.clone());

        let first = service.settle(&settlement("cs_1")).unwrap();
        let second = service.settle(&settlement("cs_1")).unwrap();

        assert_eq!(
            second,
            SettlementOutcome::AlreadySettled {
                order_id: first.order_id()
            }
        );
        assert_eq!(repo.order_count(), 1);
        assert_eq!(repo.settle_calls(), 1);
    }

    #[test]
    fn repository_failure_is_propagated() {
        let repo = InMemoryOrderRepository::failing();
        let service = SettlementService::new(repo.clone());

        let err = service.settle(&settlement("cs_1")).unwrap_err();

        assert!(matches!(err, DomainError::Internal(_)));
        assert_eq!(repo.order_count(), 0);
    }
}
