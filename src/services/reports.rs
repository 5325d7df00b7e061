//! User reports of abusive users or requests, and their moderation.

use serde::Deserialize;

use super::{validate, ServiceContext, ServiceError, ServiceResult};
use crate::models::{Report, ReportStatus, ReportTarget, User};
use crate::repository::util::page_bounds;

const MAX_PAGE: i64 = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct NewReport {
    pub target: ReportTarget,
    pub target_id: String,
    pub reason: String,
}

pub struct ReportService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReportService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, user: &User, input: NewReport) -> ServiceResult<Report> {
        let reason = validate::text("reason", &input.reason, validate::REASON_LEN)?;

        // The owner of the target, to refuse self-reports.
        let owner = match input.target {
            ReportTarget::User => self
                .ctx
                .db
                .users()
                .get(&input.target_id)
                .await?
                .map(|u| u.id)
                .ok_or(ServiceError::NotFound("user"))?,
            ReportTarget::Request => self
                .ctx
                .db
                .requests()
                .get(&input.target_id)
                .await?
                .map(|r| r.requester_id)
                .ok_or(ServiceError::NotFound("request"))?,
        };
        if owner == user.id {
            return Err(ServiceError::validation("you cannot report yourself"));
        }

        let report = Report::new(user.id.clone(), input.target, input.target_id, reason);
        self.ctx.db.reports().create(&report).await?;
        self.ctx.stats_cache.invalidate();

        tracing::info!(
            "User {} reported {} {}",
            user.id,
            report.target.as_str(),
            report.target_id
        );
        Ok(report)
    }

    pub async fn list(
        &self,
        status: Option<ReportStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<Vec<Report>> {
        let (limit, offset) = page_bounds(limit, offset, MAX_PAGE);
        Ok(self.ctx.db.reports().list(status, limit, offset).await?)
    }

    /// Close an open report as resolved or dismissed.
    pub async fn resolve(
        &self,
        admin: &User,
        id: &str,
        status: ReportStatus,
        resolution: Option<String>,
    ) -> ServiceResult<Report> {
        if status == ReportStatus::Open {
            return Err(ServiceError::validation(
                "status must be resolved or dismissed",
            ));
        }
        let resolution =
            validate::optional_text("resolution", resolution.as_deref(), validate::REASON_LEN.1)?;

        let repo = self.ctx.db.reports();
        let closed = repo
            .resolve(id, status, resolution.as_deref(), &admin.id)
            .await?;
        let report = repo.get(id).await?.ok_or(ServiceError::NotFound("report"))?;
        if !closed {
            return Err(ServiceError::conflict("report is already closed"));
        }

        self.ctx.stats_cache.invalidate();
        tracing::info!("Admin {} marked report {} {}", admin.id, id, status.as_str());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{admin, open_request, test_services, user};

    #[tokio::test]
    async fn test_create_checks_target() {
        let (ctx, _dir) = test_services().await;
        let ana = user(&ctx, "Ana").await;
        let bia = user(&ctx, "Bia").await;
        let req = open_request(&ctx, &ana).await;
        let service = ctx.reports();

        let report = service
            .create(
                &bia,
                NewReport {
                    target: ReportTarget::Request,
                    target_id: req.id.clone(),
                    reason: "Looks like spam".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(report.status, ReportStatus::Open);

        let own = NewReport {
            target: ReportTarget::Request,
            target_id: req.id.clone(),
            reason: "Looks like spam".into(),
        };
        assert!(matches!(
            service.create(&ana, own).await,
            Err(ServiceError::Validation(_))
        ));

        let missing = NewReport {
            target: ReportTarget::User,
            target_id: "nobody".into(),
            reason: "Rude messages".into(),
        };
        assert!(matches!(
            service.create(&ana, missing).await,
            Err(ServiceError::NotFound("user"))
        ));

        let short = NewReport {
            target: ReportTarget::User,
            target_id: bia.id.clone(),
            reason: "bad".into(),
        };
        assert!(matches!(
            service.create(&ana, short).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_once() {
        let (ctx, _dir) = test_services().await;
        let ana = user(&ctx, "Ana").await;
        let bia = user(&ctx, "Bia").await;
        let root = admin(&ctx, "Root").await;
        let service = ctx.reports();

        let report = service
            .create(
                &ana,
                NewReport {
                    target: ReportTarget::User,
                    target_id: bia.id.clone(),
                    reason: "Rude messages".into(),
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            service.resolve(&root, &report.id, ReportStatus::Open, None).await,
            Err(ServiceError::Validation(_))
        ));

        let closed = service
            .resolve(&root, &report.id, ReportStatus::Dismissed, Some("Not abusive".into()))
            .await
            .unwrap();
        assert_eq!(closed.status, ReportStatus::Dismissed);
        assert_eq!(closed.resolved_by.as_deref(), Some(root.id.as_str()));
        assert_eq!(closed.resolution.as_deref(), Some("Not abusive"));

        assert!(matches!(
            service.resolve(&root, &report.id, ReportStatus::Resolved, None).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            service.resolve(&root, "missing", ReportStatus::Resolved, None).await,
            Err(ServiceError::NotFound("report"))
        ));

        assert!(service
            .list(Some(ReportStatus::Open), None, None)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(service.list(None, None, None).await.unwrap().len(), 1);
    }
}
