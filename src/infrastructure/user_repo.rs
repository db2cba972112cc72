use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::user::{Role, UserView};
use crate::schema::{sessions, users};

use super::models::{NewSessionRow, NewUserRow, UserRow};

pub struct DieselUserRepository {
    pool: DbPool,
}

fn user_view(row: UserRow) -> Result<UserView, DomainError> {
    Ok(UserView {
        role: Role::from_str(&row.role)?,
        id: row.id,
        name: row.name,
        email: row.email,
    })
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a user; an e-mail already registered is a conflict.
    pub fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<UserView, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(users::table)
            .values(&NewUserRow {
                id: Uuid::new_v4(),
                name,
                email,
                password_hash,
                role: role.as_str(),
            })
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .map_err(|e| match DomainError::from(e) {
                DomainError::Conflict(_) => {
                    DomainError::Conflict(format!("e-mail {email} is already registered"))
                }
                other => other,
            })?;
        user_view(row)
    }

    /// The user and their stored password hash.
    pub fn find_credentials(&self, email: &str) -> Result<Option<(UserView, String)>, DomainError> {
        let mut conn = self.pool.get()?;

        users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(|row| {
                let hash = row.password_hash.clone();
                user_view(row).map(|user| (user, hash))
            })
            .transpose()
    }

    /// Store a new session, sweeping out every session that has expired.
    pub fn create_session(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let pruned = diesel::delete(sessions::table.filter(sessions::expires_at.le(Utc::now())))
                .execute(conn)?;
            if pruned > 0 {
                log::debug!("Pruned {} expired sessions", pruned);
            }
            diesel::insert_into(sessions::table)
                .values(&NewSessionRow {
                    token,
                    user_id,
                    expires_at,
                })
                .execute(conn)?;
            Ok(())
        })
    }

    /// Owner of a session that has not expired at `now`.
    pub fn find_session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserView>, DomainError> {
        let mut conn = self.pool.get()?;

        sessions::table
            .inner_join(users::table)
            .filter(sessions::token.eq(token))
            .filter(sessions::expires_at.gt(now))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(user_view)
            .transpose()
    }

    pub fn delete_session(&self, token: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::delete(sessions::table.filter(sessions::token.eq(token))).execute(&mut conn)?;
        Ok(())
    }
}
