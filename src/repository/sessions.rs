//! Session repository for bearer tokens.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::SessionRecord;
use super::pool::{DbError, DbPool};
use super::util::format_datetime;
use crate::schema::sessions;

#[derive(Clone)]
pub struct SessionRepository {
    pool: DbPool,
}

impl SessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(sessions::table)
            .values(SessionRecord {
                token_hash: token_hash.to_string(),
                user_id: user_id.to_string(),
                created_at: format_datetime(&Utc::now()),
                expires_at: format_datetime(&expires_at),
            })
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Resolve a token hash to its user id, ignoring expired sessions.
    pub async fn get_user_id(&self, token_hash: &str) -> Result<Option<String>, DbError> {
        let mut conn = self.pool.get().await?;
        let now = format_datetime(&Utc::now());

        sessions::table
            .filter(sessions::token_hash.eq(token_hash))
            .filter(sessions::expires_at.gt(now))
            .select(sessions::user_id)
            .first::<String>(&mut conn)
            .await
            .optional()
    }

    pub async fn delete(&self, token_hash: &str) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::delete(sessions::table.find(token_hash))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }

    pub async fn delete_for_user(&self, user_id: &str) -> Result<usize, DbError> {
        let mut conn = self.pool.get().await?;

        diesel::delete(sessions::table.filter(sessions::user_id.eq(user_id)))
            .execute(&mut conn)
            .await
    }

    /// Remove every expired session. Returns the number deleted.
    pub async fn purge_expired(&self) -> Result<usize, DbError> {
        let mut conn = self.pool.get().await?;
        let now = format_datetime(&Utc::now());

        diesel::delete(sessions::table.filter(sessions::expires_at.le(now)))
            .execute(&mut conn)
            .await
    }
}
