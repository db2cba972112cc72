use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, OrderView, StatusUpdate};
use crate::domain::ports::OrderRepository;

pub struct OrderService<R> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn get_order(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        self.repo.find_by_id(id)
    }

    pub fn get_by_session(&self, session_id: &str) -> Result<Option<OrderView>, DomainError> {
        self.repo.find_by_session_id(session_id.trim())
    }

    pub fn list_orders(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        self.repo.list(page.max(1), limit.clamp(1, 100))
    }

    pub fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError> {
        self.repo.list_for_user(user_id)
    }

    /// Apply an admin status/tracking change.
    ///
    /// A blank tracking code clears it. The caller sends any notification
    /// after this returns, so a mail failure never undoes the update.
    pub fn update_status(
        &self,
        id: Uuid,
        mut update: StatusUpdate,
    ) -> Result<OrderView, DomainError> {
        update.tracking_code = update.tracking_code.map(|c| c.trim().to_string());
        if update.is_empty() {
            return Err(DomainError::InvalidInput(
                "status or tracking_code is required".to_string(),
            ));
        }

        let order = self
            .repo
            .update_status(id, &update)?
            .ok_or_else(|| DomainError::NotFound(format!("Order {id}")))?;

        log::info!(
            "Order {} updated: status={} tracking={}",
            order.id,
            order.status,
            order.tracking_code.as_deref().unwrap_or("-")
        );
        Ok(order)
    }
}
