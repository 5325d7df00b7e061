//! Review repository.

use diesel::dsl::{count_star, sum};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::ReviewRecord;
use super::pool::{DbError, DbPool};
use super::util::format_datetime;
use crate::models::Review;
use crate::schema::reviews;

impl From<&Review> for ReviewRecord {
    fn from(review: &Review) -> Self {
        ReviewRecord {
            id: review.id.clone(),
            request_id: review.request_id.clone(),
            reviewer_id: review.reviewer_id.clone(),
            reviewee_id: review.reviewee_id.clone(),
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: format_datetime(&review.created_at),
        }
    }
}

#[derive(Clone)]
pub struct ReviewRepository {
    pool: DbPool,
}

impl ReviewRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a review. One review per reviewer per request; a second one
    /// surfaces as a unique violation.
    pub async fn create(&self, review: &Review) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(reviews::table)
            .values(ReviewRecord::from(review))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Reviews received by a user, newest first.
    pub async fn list_for_user(
        &self,
        reviewee_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Review>, DbError> {
        let mut conn = self.pool.get().await?;

        reviews::table
            .filter(reviews::reviewee_id.eq(reviewee_id))
            .order(reviews::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(ReviewRecord::as_select())
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(Review::from).collect())
    }

    pub async fn exists(&self, request_id: &str, reviewer_id: &str) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let count: i64 = reviews::table
            .filter(reviews::request_id.eq(request_id))
            .filter(reviews::reviewer_id.eq(reviewer_id))
            .select(count_star())
            .first(&mut conn)
            .await?;

        Ok(count > 0)
    }

    /// Average rating received by a user, `None` without reviews.
    pub async fn average_for_user(&self, reviewee_id: &str) -> Result<Option<f64>, DbError> {
        let mut conn = self.pool.get().await?;

        let (count, total): (i64, Option<i64>) = reviews::table
            .filter(reviews::reviewee_id.eq(reviewee_id))
            .select((count_star(), sum(reviews::rating)))
            .first(&mut conn)
            .await?;

        Ok(average(count, total))
    }

    /// Platform-wide `(count, average)`.
    pub async fn totals(&self) -> Result<(i64, Option<f64>), DbError> {
        let mut conn = self.pool.get().await?;

        let (count, total): (i64, Option<i64>) = reviews::table
            .select((count_star(), sum(reviews::rating)))
            .first(&mut conn)
            .await?;

        Ok((count, average(count, total)))
    }
}

/// Mean rounded to two decimals.
pub(crate) fn average(count: i64, total: Option<i64>) -> Option<f64> {
    (count > 0).then(|| {
        let raw = total.unwrap_or(0) as f64 / count as f64;
        (raw * 100.0).round() / 100.0
    })
}
