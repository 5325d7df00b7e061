//! Aggregate queries behind the admin dashboard.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use diesel::dsl::{count_star, sum};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;

use super::pool::{DbError, DbPool};
use super::reviews::average;
use super::util::format_datetime;
use crate::models::{Category, ReportStatus, RequestStatus, Role};
use crate::schema::{applications, help_requests, messages, reports, reviews, users};

/// Platform-wide counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlatformStats {
    pub users: UserStats,
    pub requests: RequestStats,
    pub applications: i64,
    pub messages: i64,
    pub reviews: ReviewStats,
    pub open_reports: i64,
    pub generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserStats {
    pub total: i64,
    pub banned: i64,
    pub admins: i64,
    pub new_since: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestStats {
    pub total: i64,
    /// Every status appears, zero-filled.
    pub by_status: BTreeMap<String, i64>,
    /// Every category appears, zero-filled.
    pub by_category: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewStats {
    pub total: i64,
    pub average_rating: Option<f64>,
}

#[derive(Clone)]
pub struct StatsRepository {
    pool: DbPool,
}

impl StatsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Collect all counters. `new_since` bounds the "new users" figure.
    pub async fn collect(&self, new_since: DateTime<Utc>) -> Result<PlatformStats, DbError> {
        let mut conn = self.pool.get().await?;

        let total_users: i64 = users::table.select(count_star()).first(&mut conn).await?;
        let banned: i64 = users::table
            .filter(users::banned.eq(true))
            .select(count_star())
            .first(&mut conn)
            .await?;
        let admins: i64 = users::table
            .filter(users::role.eq(Role::Admin.as_str()))
            .select(count_star())
            .first(&mut conn)
            .await?;
        let new_users: i64 = users::table
            .filter(users::created_at.ge(format_datetime(&new_since)))
            .select(count_star())
            .first(&mut conn)
            .await?;

        let status_rows: Vec<(String, i64)> = help_requests::table
            .group_by(help_requests::status)
            .select((help_requests::status, count_star()))
            .load(&mut conn)
            .await?;
        let category_rows: Vec<(String, i64)> = help_requests::table
            .group_by(help_requests::category)
            .select((help_requests::category, count_star()))
            .load(&mut conn)
            .await?;

        let mut by_status: BTreeMap<String, i64> = RequestStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        let mut by_category: BTreeMap<String, i64> = Category::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), 0))
            .collect();
        let mut total_requests = 0;
        for (status, count) in status_rows {
            total_requests += count;
            *by_status.entry(status).or_insert(0) += count;
        }
        for (category, count) in category_rows {
            *by_category.entry(category).or_insert(0) += count;
        }

        let applications: i64 = applications::table
            .select(count_star())
            .first(&mut conn)
            .await?;
        let messages: i64 = messages::table.select(count_star()).first(&mut conn).await?;

        let (review_count, rating_total): (i64, Option<i64>) = reviews::table
            .select((count_star(), sum(reviews::rating)))
            .first(&mut conn)
            .await?;

        let open_reports: i64 = reports::table
            .filter(reports::status.eq(ReportStatus::Open.as_str()))
            .select(count_star())
            .first(&mut conn)
            .await?;

        Ok(PlatformStats {
            users: UserStats {
                total: total_users,
                banned,
                admins,
                new_since: new_users,
            },
            requests: RequestStats {
                total: total_requests,
                by_status,
                by_category,
            },
            applications,
            messages,
            reviews: ReviewStats {
                total: review_count,
                average_rating: average(review_count, rating_total),
            },
            open_reports,
            generated_at: Some(Utc::now()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::models::{HelpRequest, Review, Urgency, User};
    use crate::repository::test_support::test_context;
    use chrono::Duration;

    #[tokio::test]
    async fn test_empty_stats_are_zero_filled() {
        let (ctx, _dir) = test_context().await;
        let stats = ctx.stats().collect(Utc::now()).await.unwrap();

        assert_eq!(stats.users.total, 0);
        assert_eq!(stats.requests.by_status.len(), RequestStatus::ALL.len());
        assert_eq!(stats.requests.by_category["tech_help"], 0);
        assert_eq!(stats.reviews.average_rating, None);
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let (ctx, _dir) = test_context().await;

        let mut admin = User::new("Admin".into(), "admin@x.com", "h".into());
        admin.role = Role::Admin;
        let mut old = User::new("Old".into(), "old@x.com", "h".into());
        old.created_at = Utc::now() - Duration::days(30);
        old.banned = true;
        ctx.users().create(&admin).await.unwrap();
        ctx.users().create(&old).await.unwrap();

        for category in [Category::Pets, Category::Pets, Category::Pharmacy] {
            let req = HelpRequest::new(
                admin.id.clone(),
                "Title here".into(),
                "Description here".into(),
                category,
                Urgency::Low,
                GeoPoint::new(-29.6, -53.2).unwrap(),
            );
            ctx.requests().create(&req).await.unwrap();
        }
        ctx.reviews()
            .create(&Review::new("r".into(), old.id.clone(), admin.id.clone(), 4, None))
            .await
            .unwrap();

        let stats = ctx
            .stats()
            .collect(Utc::now() - Duration::days(7))
            .await
            .unwrap();
        assert_eq!(stats.users.total, 2);
        assert_eq!(stats.users.banned, 1);
        assert_eq!(stats.users.admins, 1);
        assert_eq!(stats.users.new_since, 1);
        assert_eq!(stats.requests.total, 3);
        assert_eq!(stats.requests.by_status["open"], 3);
        assert_eq!(stats.requests.by_category["pets"], 2);
        assert_eq!(stats.reviews.total, 1);
        assert_eq!(stats.reviews.average_rating, Some(4.0));
    }
}
