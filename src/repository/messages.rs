//! Chat message repository.

use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::MessageRecord;
use super::pool::{DbError, DbPool};
use super::util::format_datetime;
use crate::models::Message;
use crate::schema::messages;

impl From<&Message> for MessageRecord {
    fn from(msg: &Message) -> Self {
        MessageRecord {
            id: msg.id.clone(),
            request_id: msg.request_id.clone(),
            sender_id: msg.sender_id.clone(),
            body: msg.body.clone(),
            created_at: format_datetime(&msg.created_at),
        }
    }
}

#[derive(Clone)]
pub struct MessageRepository {
    pool: DbPool,
}

impl MessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, msg: &Message) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(messages::table)
            .values(MessageRecord::from(msg))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Messages of a request in chronological order.
    ///
    /// With `after`, only messages strictly newer than that instant are
    /// returned, which lets clients page forward from the last one they saw.
    pub async fn list_for_request(
        &self,
        request_id: &str,
        after: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Message>, DbError> {
        let mut conn = self.pool.get().await?;

        let mut q = messages::table
            .filter(messages::request_id.eq(request_id))
            .select(MessageRecord::as_select())
            .into_boxed();
        if let Some(after) = after {
            q = q.filter(messages::created_at.gt(format_datetime(&after)));
        }

        q.order((messages::created_at.asc(), messages::id.asc()))
            .limit(limit)
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(Message::from).collect())
    }

    pub async fn count(&self) -> Result<i64, DbError> {
        let mut conn = self.pool.get().await?;
        messages::table.select(count_star()).first(&mut conn).await
    }
}
