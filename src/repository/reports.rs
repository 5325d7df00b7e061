//! Moderation report repository.

use chrono::Utc;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::ReportRecord;
use super::pool::{DbError, DbPool};
use super::util::format_datetime;
use crate::models::{Report, ReportStatus};
use crate::schema::reports;

impl From<&Report> for ReportRecord {
    fn from(report: &Report) -> Self {
        ReportRecord {
            id: report.id.clone(),
            reporter_id: report.reporter_id.clone(),
            target_kind: report.target.as_str().to_string(),
            target_id: report.target_id.clone(),
            reason: report.reason.clone(),
            status: report.status.as_str().to_string(),
            resolution: report.resolution.clone(),
            created_at: format_datetime(&report.created_at),
            resolved_at: report.resolved_at.as_ref().map(format_datetime),
            resolved_by: report.resolved_by.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ReportRepository {
    pool: DbPool,
}

impl ReportRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, report: &Report) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(reports::table)
            .values(ReportRecord::from(report))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Report>, DbError> {
        let mut conn = self.pool.get().await?;

        reports::table
            .find(id)
            .select(ReportRecord::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Report::from))
    }

    /// Reports, oldest first so the moderation queue reads top-down.
    pub async fn list(
        &self,
        status: Option<ReportStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Report>, DbError> {
        let mut conn = self.pool.get().await?;

        let mut q = reports::table.select(ReportRecord::as_select()).into_boxed();
        if let Some(status) = status {
            q = q.filter(reports::status.eq(status.as_str()));
        }

        q.order(reports::created_at.asc())
            .limit(limit)
            .offset(offset)
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(Report::from).collect())
    }

    /// Close an open report. Returns false if it was already closed or missing.
    pub async fn resolve(
        &self,
        id: &str,
        status: ReportStatus,
        resolution: Option<&str>,
        resolved_by: &str,
    ) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::update(
            reports::table
                .filter(reports::id.eq(id))
                .filter(reports::status.eq(ReportStatus::Open.as_str())),
        )
        .set((
            reports::status.eq(status.as_str()),
            reports::resolution.eq(resolution),
            reports::resolved_at.eq(format_datetime(&Utc::now())),
            reports::resolved_by.eq(resolved_by),
        ))
        .execute(&mut conn)
        .await?;

        Ok(rows > 0)
    }

    pub async fn count_open(&self) -> Result<i64, DbError> {
        let mut conn = self.pool.get().await?;

        reports::table
            .filter(reports::status.eq(ReportStatus::Open.as_str()))
            .select(count_star())
            .first(&mut conn)
            .await
    }
}
