//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM over SQLite through diesel-async.
//! Each table has a repository struct holding a clone of the pool; get one
//! from [`DbContext`].

pub mod context;
pub mod models;
pub mod pool;

// Repositories
pub mod applications;
pub mod messages;
pub mod notifications;
pub mod reports;
pub mod requests;
pub mod reviews;
pub mod sessions;
pub mod stats;
pub mod users;

// Utilities
pub mod util;

pub use applications::ApplicationRepository;
pub use context::DbContext;
pub use messages::MessageRepository;
pub use notifications::NotificationRepository;
pub use pool::{DbError, DbPool};
pub use reports::ReportRepository;
pub use requests::{RequestFilter, RequestRepository};
pub use reviews::ReviewRepository;
pub use sessions::SessionRepository;
pub use stats::{PlatformStats, StatsRepository};
pub use users::UserRepository;

#[cfg(test)]
pub mod test_support {
    use tempfile::TempDir;

    use super::DbContext;

    /// Fresh SQLite database in a temp directory. Keep the `TempDir` alive
    /// for the duration of the test.
    pub async fn test_context() -> (DbContext, TempDir) {
        let dir = TempDir::new().unwrap();
        let ctx = DbContext::from_sqlite_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        (ctx, dir)
    }
}
