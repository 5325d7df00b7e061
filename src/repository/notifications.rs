//! Notification repository.

use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::NotificationRecord;
use super::pool::{DbError, DbPool};
use super::util::format_datetime;
use crate::models::Notification;
use crate::schema::notifications;

impl From<&Notification> for NotificationRecord {
    fn from(n: &Notification) -> Self {
        NotificationRecord {
            id: n.id.clone(),
            user_id: n.user_id.clone(),
            kind: n.kind.as_str().to_string(),
            payload: n.payload.to_string(),
            read: n.read,
            created_at: format_datetime(&n.created_at),
        }
    }
}

#[derive(Clone)]
pub struct NotificationRepository {
    pool: DbPool,
}

impl NotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, notification: &Notification) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(notifications::table)
            .values(NotificationRecord::from(notification))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Newest first.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, DbError> {
        let mut conn = self.pool.get().await?;

        let mut q = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .select(NotificationRecord::as_select())
            .into_boxed();
        if unread_only {
            q = q.filter(notifications::read.eq(false));
        }

        q.order((notifications::created_at.desc(), notifications::id.asc()))
            .limit(limit)
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(Notification::from).collect())
    }

    /// Mark one notification read. Scoped to its owner so users cannot touch
    /// each other's notifications.
    pub async fn mark_read(&self, id: &str, user_id: &str) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::update(
            notifications::table
                .filter(notifications::id.eq(id))
                .filter(notifications::user_id.eq(user_id)),
        )
        .set(notifications::read.eq(true))
        .execute(&mut conn)
        .await?;

        Ok(rows > 0)
    }

    pub async fn mark_all_read(&self, user_id: &str) -> Result<usize, DbError> {
        let mut conn = self.pool.get().await?;

        diesel::update(
            notifications::table
                .filter(notifications::user_id.eq(user_id))
                .filter(notifications::read.eq(false)),
        )
        .set(notifications::read.eq(true))
        .execute(&mut conn)
        .await
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<i64, DbError> {
        let mut conn = self.pool.get().await?;

        notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::read.eq(false))
            .select(count_star())
            .first(&mut conn)
            .await
    }
}
