//! Database context for managing connections and repository access.
//!
//! The DbContext is the primary entry point for all database operations.
//! It holds the connection pool and hands out repositories.

use std::path::Path;

use diesel::sql_types::Integer;
use diesel::QueryableByName;
use diesel_async::{RunQueryDsl, SimpleAsyncConnection};

use super::applications::ApplicationRepository;
use super::messages::MessageRepository;
use super::notifications::NotificationRepository;
use super::pool::{DbError, DbPool};
use super::reports::ReportRepository;
use super::requests::RequestRepository;
use super::reviews::ReviewRepository;
use super::sessions::SessionRepository;
use super::stats::StatsRepository;
use super::users::UserRepository;

/// Database context that manages the connection pool and provides repository access.
///
/// # Example
/// ```ignore
/// let ctx = DbContext::from_url("sqlite:data/ligabairro.db");
/// ctx.init_schema().await?;
/// let user = ctx.users().get_by_email("ana@example.com").await?;
/// ```
#[derive(Clone, Debug)]
pub struct DbContext {
    pool: DbPool,
}

impl DbContext {
    pub fn from_url(url: &str) -> Self {
        Self {
            pool: DbPool::new(url),
        }
    }

    pub fn from_sqlite_path(path: &Path) -> Self {
        Self {
            pool: DbPool::from_path(path),
        }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn sessions(&self) -> SessionRepository {
        SessionRepository::new(self.pool.clone())
    }

    pub fn requests(&self) -> RequestRepository {
        RequestRepository::new(self.pool.clone())
    }

    pub fn applications(&self) -> ApplicationRepository {
        ApplicationRepository::new(self.pool.clone())
    }

    pub fn messages(&self) -> MessageRepository {
        MessageRepository::new(self.pool.clone())
    }

    pub fn reviews(&self) -> ReviewRepository {
        ReviewRepository::new(self.pool.clone())
    }

    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    pub fn notifications(&self) -> NotificationRepository {
        NotificationRepository::new(self.pool.clone())
    }

    pub fn stats(&self) -> StatsRepository {
        StatsRepository::new(self.pool.clone())
    }

    /// Create all tables and indexes. Safe to run on every start.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute("PRAGMA journal_mode = WAL;").await?;
        conn.batch_execute(include_str!("schema_sqlite.sql")).await
    }

    /// Round-trip a trivial query to confirm the database is reachable.
    pub async fn test_connection(&self) -> Result<(), DbError> {
        #[derive(QueryableByName)]
        struct One {
            #[diesel(sql_type = Integer)]
            one: i32,
        }

        let mut conn = self.pool.get().await?;
        let row: One = diesel::sql_query("SELECT 1 AS one")
            .get_result(&mut conn)
            .await?;
        debug_assert_eq!(row.one, 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::test_context;

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let (ctx, _dir) = test_context().await;
        ctx.init_schema().await.unwrap();
        ctx.test_connection().await.unwrap();
        assert_eq!(ctx.users().count(None).await.unwrap(), 0);
    }
}
