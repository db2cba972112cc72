use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::contact::{ContactInput, SubscriberView, SupportMessageView};
use crate::domain::errors::DomainError;
use crate::schema::{newsletter_subscribers, support_messages};

use super::models::{NewSubscriberRow, NewSupportMessageRow, SubscriberRow, SupportMessageRow};

pub struct DieselContactRepository {
    pool: DbPool,
}

impl DieselContactRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Add an address to the newsletter list. Already subscribed is a conflict.
    pub fn subscribe(&self, email: &str) -> Result<SubscriberView, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(newsletter_subscribers::table)
            .values(&NewSubscriberRow {
                id: Uuid::new_v4(),
                email,
            })
            .returning(SubscriberRow::as_returning())
            .get_result(&mut conn)
            .map_err(|e| match DomainError::from(e) {
                DomainError::Conflict(_) => {
                    DomainError::Conflict(format!("{email} is already subscribed"))
                }
                other => other,
            })?;
        Ok(SubscriberView {
            id: row.id,
            email: row.email,
            created_at: row.created_at,
        })
    }

    pub fn list_subscribers(&self) -> Result<Vec<SubscriberView>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(newsletter_subscribers::table
            .select(SubscriberRow::as_select())
            .order(newsletter_subscribers::created_at.asc())
            .load(&mut conn)?
            .into_iter()
            .map(|row| SubscriberView {
                id: row.id,
                email: row.email,
                created_at: row.created_at,
            })
            .collect())
    }

    pub fn create_message(&self, input: &ContactInput) -> Result<SupportMessageView, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(support_messages::table)
            .values(&NewSupportMessageRow {
                id: Uuid::new_v4(),
                name: &input.name,
                email: &input.email,
                message: &input.message,
            })
            .returning(SupportMessageRow::as_returning())
            .get_result(&mut conn)?;
        Ok(message_view(row))
    }

    /// Newest first.
    pub fn list_messages(&self) -> Result<Vec<SupportMessageView>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(support_messages::table
            .select(SupportMessageRow::as_select())
            .order(support_messages::created_at.desc())
            .load(&mut conn)?
            .into_iter()
            .map(message_view)
            .collect())
    }
}

fn message_view(row: SupportMessageRow) -> SupportMessageView {
    SupportMessageView {
        id: row.id,
        name: row.name,
        email: row.email,
        message: row.message,
        created_at: row.created_at,
    }
}
