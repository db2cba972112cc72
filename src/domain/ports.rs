use uuid::Uuid;

use super::errors::DomainError;
use super::order::{ListResult, OrderView, Settlement, SettlementOutcome, StatusUpdate};

pub trait OrderRepository: Send + Sync + 'static {
    /// Persist the order, its items and the stock decrements as one unit.
    ///
    /// A second settlement for the same payment session must leave the store
    /// untouched and report [`SettlementOutcome::AlreadySettled`].
    fn settle(&self, settlement: &Settlement) -> Result<SettlementOutcome, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn find_by_session_id(&self, session_id: &str) -> Result<Option<OrderView>, DomainError>;
    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError>;
    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError>;
    fn update_status(
        &self,
        id: Uuid,
        update: &StatusUpdate,
    ) -> Result<Option<OrderView>, DomainError>;
}
