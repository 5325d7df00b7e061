//! User repository.

use chrono::Utc;
use diesel::dsl::{count_star, sum};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::UserRecord;
use super::pool::{DbError, DbPool};
use super::reviews::average;
use super::util::{encode_string_list, format_datetime, like_pattern};
use crate::models::{Role, User};
use crate::schema::{reviews, users};

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        UserRecord {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role.as_str().to_string(),
            bio: user.bio.clone(),
            skills: encode_string_list(&user.skills),
            city: user.city.clone(),
            lat: user.location.map(|p| p.lat),
            lng: user.location.map(|p| p.lng),
            avatar_url: user.avatar_url.clone(),
            rating_avg: user.rating_avg,
            rating_count: user.rating_count,
            banned: user.banned,
            created_at: format_datetime(&user.created_at),
            updated_at: format_datetime(&user.updated_at),
        }
    }
}

/// Diesel-based user repository.
#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new user. A duplicate email surfaces as a unique violation.
    pub async fn create(&self, user: &User) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(users::table)
            .values(UserRecord::from(user))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>, DbError> {
        let mut conn = self.pool.get().await?;

        users::table
            .find(id)
            .select(UserRecord::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(User::from))
    }

    /// Look up by (already normalized) email.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let mut conn = self.pool.get().await?;

        users::table
            .filter(users::email.eq(email))
            .select(UserRecord::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(User::from))
    }

    /// Load several users at once, in no particular order.
    pub async fn get_many(&self, ids: &[String]) -> Result<Vec<User>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await?;

        users::table
            .filter(users::id.eq_any(ids))
            .select(UserRecord::as_select())
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(User::from).collect())
    }

    /// Persist editable profile fields.
    pub async fn update_profile(&self, user: &User) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::update(users::table.find(user.id.as_str()))
            .set((
                users::name.eq(&user.name),
                users::bio.eq(&user.bio),
                users::skills.eq(encode_string_list(&user.skills)),
                users::city.eq(&user.city),
                users::lat.eq(user.location.map(|p| p.lat)),
                users::lng.eq(user.location.map(|p| p.lng)),
                users::avatar_url.eq(&user.avatar_url),
                users::updated_at.eq(format_datetime(&Utc::now())),
            ))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }

    pub async fn set_role(&self, id: &str, role: Role) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::update(users::table.find(id))
            .set((
                users::role.eq(role.as_str()),
                users::updated_at.eq(format_datetime(&Utc::now())),
            ))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }

    pub async fn set_banned(&self, id: &str, banned: bool) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::update(users::table.find(id))
            .set((
                users::banned.eq(banned),
                users::updated_at.eq(format_datetime(&Utc::now())),
            ))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }

    /// Recompute the cached rating average and count from the reviews table.
    ///
    /// Returns the new `(average, count)`.
    pub async fn update_rating(&self, id: &str) -> Result<(f64, i32), DbError> {
        let mut conn = self.pool.get().await?;

        let (count, total): (i64, Option<i64>) = reviews::table
            .filter(reviews::reviewee_id.eq(id))
            .select((count_star(), sum(reviews::rating)))
            .first(&mut conn)
            .await?;

        let avg = average(count, total).unwrap_or(0.0);
        let count = count as i32;

        diesel::update(users::table.find(id))
            .set((users::rating_avg.eq(avg), users::rating_count.eq(count)))
            .execute(&mut conn)
            .await?;

        Ok((avg, count))
    }

    /// List users, newest first, optionally filtered by name or email.
    pub async fn list(
        &self,
        query: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, DbError> {
        let mut conn = self.pool.get().await?;

        let mut q = users::table.select(UserRecord::as_select()).into_boxed();
        if let Some(term) = query.map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = like_pattern(&term.to_lowercase());
            q = q.filter(
                users::name
                    .like(pattern.clone())
                    .escape('\\')
                    .or(users::email.like(pattern).escape('\\')),
            );
        }

        q.order(users::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(User::from).collect())
    }

    /// Count users, with the same optional filter as [`list`](Self::list).
    pub async fn count(&self, query: Option<&str>) -> Result<i64, DbError> {
        let mut conn = self.pool.get().await?;

        let mut q = users::table.select(count_star()).into_boxed();
        if let Some(term) = query.map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = like_pattern(&term.to_lowercase());
            q = q.filter(
                users::name
                    .like(pattern.clone())
                    .escape('\\')
                    .or(users::email.like(pattern).escape('\\')),
            );
        }
        q.first(&mut conn).await
    }
}
