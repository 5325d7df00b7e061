//! Application repository.

use chrono::Utc;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::models::ApplicationRecord;
use super::pool::{DbError, DbPool};
use super::util::format_datetime;
use crate::models::{Application, ApplicationStatus, RequestStatus};
use crate::schema::{applications, help_requests};

impl From<&Application> for ApplicationRecord {
    fn from(app: &Application) -> Self {
        ApplicationRecord {
            id: app.id.clone(),
            request_id: app.request_id.clone(),
            helper_id: app.helper_id.clone(),
            message: app.message.clone(),
            status: app.status.as_str().to_string(),
            created_at: format_datetime(&app.created_at),
            updated_at: format_datetime(&app.updated_at),
        }
    }
}

#[derive(Clone)]
pub struct ApplicationRepository {
    pool: DbPool,
}

impl ApplicationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert an application. A second application by the same helper for
    /// the same request surfaces as a unique violation.
    pub async fn create(&self, app: &Application) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(applications::table)
            .values(ApplicationRecord::from(app))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Application>, DbError> {
        let mut conn = self.pool.get().await?;

        applications::table
            .find(id)
            .select(ApplicationRecord::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Application::from))
    }

    pub async fn get_for_request_helper(
        &self,
        request_id: &str,
        helper_id: &str,
    ) -> Result<Option<Application>, DbError> {
        let mut conn = self.pool.get().await?;

        applications::table
            .filter(applications::request_id.eq(request_id))
            .filter(applications::helper_id.eq(helper_id))
            .select(ApplicationRecord::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Application::from))
    }

    /// Applications for a request, oldest first.
    pub async fn list_for_request(&self, request_id: &str) -> Result<Vec<Application>, DbError> {
        let mut conn = self.pool.get().await?;

        applications::table
            .filter(applications::request_id.eq(request_id))
            .order(applications::created_at.asc())
            .select(ApplicationRecord::as_select())
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(Application::from).collect())
    }

    /// Applications made by a helper, newest first.
    pub async fn list_for_helper(&self, helper_id: &str) -> Result<Vec<Application>, DbError> {
        let mut conn = self.pool.get().await?;

        applications::table
            .filter(applications::helper_id.eq(helper_id))
            .order(applications::created_at.desc())
            .select(ApplicationRecord::as_select())
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(Application::from).collect())
    }

    /// Move an application out of `from`. Returns false if it was not in `from`.
    pub async fn set_status(
        &self,
        id: &str,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::update(
            applications::table
                .filter(applications::id.eq(id))
                .filter(applications::status.eq(from.as_str())),
        )
        .set((
            applications::status.eq(to.as_str()),
            applications::updated_at.eq(format_datetime(&Utc::now())),
        ))
        .execute(&mut conn)
        .await?;

        Ok(rows > 0)
    }

    /// Accept a pending application in one transaction.
    ///
    /// The request moves open → assigned with the applicant as helper, the
    /// application becomes accepted and every other pending application on
    /// the request is declined. Returns the declined applications, or `None`
    /// when the request was no longer open or the application no longer
    /// pending (nothing is written in that case).
    pub async fn accept(&self, app: &Application) -> Result<Option<Vec<Application>>, DbError> {
        let mut conn = self.pool.get().await?;
        let now = format_datetime(&Utc::now());

        let result = conn
            .transaction(|conn| {
                Box::pin(async move {
                    let assigned = diesel::update(
                        help_requests::table
                            .filter(help_requests::id.eq(&app.request_id))
                            .filter(help_requests::status.eq(RequestStatus::Open.as_str())),
                    )
                    .set((
                        help_requests::status.eq(RequestStatus::Assigned.as_str()),
                        help_requests::helper_id.eq(app.helper_id.as_str()),
                        help_requests::updated_at.eq(&now),
                    ))
                    .execute(conn)
                    .await?;
                    if assigned == 0 {
                        return Err(DbError::RollbackTransaction);
                    }

                    let accepted = diesel::update(
                        applications::table
                            .filter(applications::id.eq(&app.id))
                            .filter(applications::status.eq(ApplicationStatus::Pending.as_str())),
                    )
                    .set((
                        applications::status.eq(ApplicationStatus::Accepted.as_str()),
                        applications::updated_at.eq(&now),
                    ))
                    .execute(conn)
                    .await?;
                    if accepted == 0 {
                        return Err(DbError::RollbackTransaction);
                    }

                    let others = applications::table
                        .filter(applications::request_id.eq(&app.request_id))
                        .filter(applications::status.eq(ApplicationStatus::Pending.as_str()))
                        .select(ApplicationRecord::as_select())
                        .load(conn)
                        .await?;

                    diesel::update(
                        applications::table
                            .filter(applications::request_id.eq(&app.request_id))
                            .filter(applications::status.eq(ApplicationStatus::Pending.as_str())),
                    )
                    .set((
                        applications::status.eq(ApplicationStatus::Declined.as_str()),
                        applications::updated_at.eq(&now),
                    ))
                    .execute(conn)
                    .await?;

                    Ok(others
                        .into_iter()
                        .map(|record| {
                            let mut declined = Application::from(record);
                            declined.status = ApplicationStatus::Declined;
                            declined
                        })
                        .collect::<Vec<_>>())
                })
            })
            .await;

        match result {
            Ok(declined) => Ok(Some(declined)),
            Err(DbError::RollbackTransaction) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Decline every pending application on a request. Returns those declined.
    pub async fn decline_pending(&self, request_id: &str) -> Result<Vec<Application>, DbError> {
        self.close_matching(request_id, ApplicationStatus::Pending, ApplicationStatus::Declined)
            .await
    }

    /// Reopen an assigned request and withdraw `helper_id`'s accepted
    /// application, in one transaction.
    ///
    /// Returns `None` without writing anything when the request is no longer
    /// assigned to `helper_id`.
    pub async fn release(
        &self,
        request_id: &str,
        helper_id: &str,
    ) -> Result<Option<Vec<Application>>, DbError> {
        let mut conn = self.pool.get().await?;
        let now = format_datetime(&Utc::now());

        let result = conn
            .transaction(|conn| {
                Box::pin(async move {
                    let reopened = diesel::update(
                        help_requests::table
                            .filter(help_requests::id.eq(request_id))
                            .filter(help_requests::status.eq(RequestStatus::Assigned.as_str()))
                            .filter(help_requests::helper_id.eq(helper_id)),
                    )
                    .set((
                        help_requests::status.eq(RequestStatus::Open.as_str()),
                        help_requests::helper_id.eq(None::<String>),
                        help_requests::updated_at.eq(&now),
                    ))
                    .execute(conn)
                    .await?;
                    if reopened == 0 {
                        return Err(DbError::RollbackTransaction);
                    }

                    let accepted = applications::table
                        .filter(applications::request_id.eq(request_id))
                        .filter(applications::helper_id.eq(helper_id))
                        .filter(applications::status.eq(ApplicationStatus::Accepted.as_str()))
                        .select(ApplicationRecord::as_select())
                        .load(conn)
                        .await?;

                    diesel::update(
                        applications::table
                            .filter(applications::request_id.eq(request_id))
                            .filter(applications::helper_id.eq(helper_id))
                            .filter(applications::status.eq(ApplicationStatus::Accepted.as_str())),
                    )
                    .set((
                        applications::status.eq(ApplicationStatus::Withdrawn.as_str()),
                        applications::updated_at.eq(&now),
                    ))
                    .execute(conn)
                    .await?;

                    Ok(accepted
                        .into_iter()
                        .map(|record| {
                            let mut app = Application::from(record);
                            app.status = ApplicationStatus::Withdrawn;
                            app
                        })
                        .collect::<Vec<_>>())
                })
            })
            .await;

        match result {
            Ok(withdrawn) => Ok(Some(withdrawn)),
            Err(DbError::RollbackTransaction) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn close_matching(
        &self,
        request_id: &str,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<Vec<Application>, DbError> {
        let mut conn = self.pool.get().await?;
        let now = format_datetime(&Utc::now());

        conn.transaction(|conn| {
            Box::pin(async move {
                let matching = applications::table
                    .filter(applications::request_id.eq(request_id))
                    .filter(applications::status.eq(from.as_str()))
                    .select(ApplicationRecord::as_select())
                    .load(conn)
                    .await?;

                diesel::update(
                    applications::table
                        .filter(applications::request_id.eq(request_id))
                        .filter(applications::status.eq(from.as_str())),
                )
                .set((
                    applications::status.eq(to.as_str()),
                    applications::updated_at.eq(&now),
                ))
                .execute(conn)
                .await?;

                Ok(matching
                    .into_iter()
                    .map(|record| {
                        let mut app = Application::from(record);
                        app.status = to;
                        app
                    })
                    .collect())
            })
        })
        .await
    }

    pub async fn count(&self) -> Result<i64, DbError> {
        let mut conn = self.pool.get().await?;
        applications::table
            .select(count_star())
            .first(&mut conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::models::{Category, HelpRequest, Urgency, User};
    use crate::repository::test_support::test_context;
    use crate::repository::DbContext;

    async fn seed(ctx: &DbContext) -> (User, Vec<User>, HelpRequest) {
        let requester = User::new("Req".into(), "req@example.com", "h".into());
        ctx.users().create(&requester).await.unwrap();

        let mut helpers = Vec::new();
        for i in 0..3 {
            let helper = User::new(format!("Helper {i}"), &format!("h{i}@example.com"), "h".into());
            ctx.users().create(&helper).await.unwrap();
            helpers.push(helper);
        }

        let req = HelpRequest::new(
            requester.id.clone(),
            "Ride to clinic".into(),
            "Need a ride to the clinic on Monday".into(),
            Category::Transport,
            Urgency::High,
            GeoPoint::new(-29.64, -53.25).unwrap(),
        );
        ctx.requests().create(&req).await.unwrap();
        (requester, helpers, req)
    }

    #[tokio::test]
    async fn test_unique_application_per_helper() {
        let (ctx, _dir) = test_context().await;
        let (_, helpers, req) = seed(&ctx).await;
        let repo = ctx.applications();

        repo.create(&Application::new(req.id.clone(), helpers[0].id.clone(), None))
            .await
            .unwrap();
        let err = repo
            .create(&Application::new(req.id.clone(), helpers[0].id.clone(), None))
            .await
            .unwrap_err();
        assert!(crate::repository::util::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_accept_declines_others_and_assigns() {
        let (ctx, _dir) = test_context().await;
        let (_, helpers, req) = seed(&ctx).await;
        let repo = ctx.applications();

        let apps: Vec<Application> = helpers
            .iter()
            .map(|h| Application::new(req.id.clone(), h.id.clone(), Some("I can help".into())))
            .collect();
        for app in &apps {
            repo.create(app).await.unwrap();
        }

        let declined = repo.accept(&apps[1]).await.unwrap().unwrap();
        assert_eq!(declined.len(), 2);
        assert!(declined.iter().all(|a| a.status == ApplicationStatus::Declined));

        let stored = ctx.requests().get(&req.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Assigned);
        assert_eq!(stored.helper_id.as_deref(), Some(helpers[1].id.as_str()));

        let statuses: Vec<_> = repo
            .list_for_request(&req.id)
            .await
            .unwrap()
            .into_iter()
            .map(|a| (a.id, a.status))
            .collect();
        assert!(statuses.contains(&(apps[1].id.clone(), ApplicationStatus::Accepted)));
        assert!(statuses.contains(&(apps[0].id.clone(), ApplicationStatus::Declined)));

        // A second accept finds the request no longer open and writes nothing.
        assert!(repo.accept(&apps[0]).await.unwrap().is_none());
        let still = repo.get(&apps[1].id).await.unwrap().unwrap();
        assert_eq!(still.status, ApplicationStatus::Accepted);
    }

    #[tokio::test]
    async fn test_release() {
        let (ctx, _dir) = test_context().await;
        let (_, helpers, req) = seed(&ctx).await;
        let repo = ctx.applications();

        let app = Application::new(req.id.clone(), helpers[0].id.clone(), None);
        repo.create(&app).await.unwrap();
        repo.accept(&app).await.unwrap().unwrap();

        // Only the assigned helper can be released.
        assert!(repo.release(&req.id, &helpers[1].id).await.unwrap().is_none());
        let still = repo.get(&app.id).await.unwrap().unwrap();
        assert_eq!(still.status, ApplicationStatus::Accepted);

        let withdrawn = repo.release(&req.id, &helpers[0].id).await.unwrap().unwrap();
        assert_eq!(withdrawn.len(), 1);
        assert_eq!(withdrawn[0].status, ApplicationStatus::Withdrawn);
        let reopened = ctx.requests().get(&req.id).await.unwrap().unwrap();
        assert_eq!(reopened.status, RequestStatus::Open);
        assert!(reopened.helper_id.is_none());
        assert_eq!(repo.list_for_helper(&helpers[0].id).await.unwrap().len(), 1);

        // A second release finds the request open and writes nothing.
        assert!(repo.release(&req.id, &helpers[0].id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_release_keeps_a_newer_acceptance() {
        let (ctx, _dir) = test_context().await;
        let (_, helpers, req) = seed(&ctx).await;
        let repo = ctx.applications();

        let first = Application::new(req.id.clone(), helpers[0].id.clone(), None);
        let second = Application::new(req.id.clone(), helpers[1].id.clone(), None);
        repo.create(&first).await.unwrap();
        repo.accept(&first).await.unwrap().unwrap();
        repo.release(&req.id, &helpers[0].id).await.unwrap().unwrap();

        repo.create(&second).await.unwrap();
        repo.accept(&second).await.unwrap().unwrap();

        // A stale release of the first helper must not touch the new one.
        assert!(repo.release(&req.id, &helpers[0].id).await.unwrap().is_none());
        let kept = repo.get(&second.id).await.unwrap().unwrap();
        assert_eq!(kept.status, ApplicationStatus::Accepted);
        let assigned = ctx.requests().get(&req.id).await.unwrap().unwrap();
        assert_eq!(assigned.status, RequestStatus::Assigned);
        assert_eq!(assigned.helper_id.as_deref(), Some(helpers[1].id.as_str()));
    }
}
