//! In-memory order repository for exercising the application services
//! without a database.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{
    ListResult, OrderItemView, OrderStatus, OrderView, Settlement, SettlementOutcome,
    StatusUpdate,
};
use crate::domain::ports::OrderRepository;

#[derive(Default)]
struct State {
    orders: Vec<OrderView>,
    settle_calls: usize,
    fail_writes: bool,
}

#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryOrderRepository {
    /// A repository whose writes always fail, as a broken database would.
    pub fn failing() -> Self {
        let repo = Self::default();
        repo.lock().fail_writes = true;
        repo
    }

    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    pub fn settle_calls(&self) -> usize {
        self.lock().settle_calls
    }

    pub fn insert(&self, order: OrderView) {
        self.lock().orders.push(order);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("poisoned test repository")
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn settle(&self, settlement: &Settlement) -> Result<SettlementOutcome, DomainError> {
        let mut state = self.lock();
        state.settle_calls += 1;
        if state.fail_writes {
            return Err(DomainError::Internal("simulated write failure".to_string()));
        }
        if let Some(existing) = state
            .orders
            .iter()
            .find(|o| o.payment_session_id == settlement.payment_session_id)
        {
            return Ok(SettlementOutcome::AlreadySettled {
                order_id: existing.id,
            });
        }

        let order_id = Uuid::new_v4();
        state.orders.push(OrderView {
            id: order_id,
            payment_session_id: settlement.payment_session_id.clone(),
            provider: settlement.provider.as_str().to_string(),
            user_id: settlement.user_id,
            contact_email: settlement.customer_email.clone(),
            total: settlement.total(),
            status: OrderStatus::Paid,
            tracking_code: None,
            shipping_address: settlement.shipping_address.clone(),
            created_at: Utc::now(),
            items: settlement
                .items
                .iter()
                .map(|i| OrderItemView {
                    id: Uuid::new_v4(),
                    product_id: i.product_id,
                    name: i.name.clone(),
                    unit_price: i.unit_price.clone(),
                    quantity: i.quantity,
                    size: i.size.clone(),
                    color: i.color.clone(),
                    is_freight: i.is_freight,
                })
                .collect(),
        });
        Ok(SettlementOutcome::Created { order_id })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        Ok(self.lock().orders.iter().find(|o| o.id == id).cloned())
    }

    fn find_by_session_id(&self, session_id: &str) -> Result<Option<OrderView>, DomainError> {
        Ok(self
            .lock()
            .orders
            .iter()
            .find(|o| o.payment_session_id == session_id)
            .cloned())
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let state = self.lock();
        let offset = usize::try_from((page - 1).saturating_mul(limit)).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(0);
        Ok(ListResult {
            items: state.orders.iter().skip(offset).take(take).cloned().collect(),
            total: i64::try_from(state.orders.len()).unwrap_or(i64::MAX),
        })
    }

    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError> {
        Ok(self
            .lock()
            .orders
            .iter()
            .filter(|o| o.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    fn update_status(
        &self,
        id: Uuid,
        update: &StatusUpdate,
    ) -> Result<Option<OrderView>, DomainError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(DomainError::Internal("simulated write failure".to_string()));
        }
        let Some(order) = state.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        if let Some(status) = update.status {
            order.status = status;
        }
        if let Some(code) = &update.tracking_code {
            order.tracking_code = (!code.is_empty()).then(|| code.clone());
        }
        Ok(Some(order.clone()))
    }
}
