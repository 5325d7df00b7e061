//! Offers to help with a request, and the requester's choice among them.

use serde::Serialize;
use serde_json::json;

use super::requests::{publish_status, request_payload};
use super::{validate, ServiceContext, ServiceError, ServiceResult};
use crate::models::{
    Application, ApplicationStatus, HelpRequest, NotificationKind, PublicUser, RequestStatus,
    User,
};
use crate::realtime::{user_room, ServerEvent};
use crate::repository::util::is_unique_violation;

/// An application with the applicant's public profile.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: Application,
    pub helper: Option<PublicUser>,
}

pub struct ApplicationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ApplicationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    async fn load(&self, id: &str) -> ServiceResult<Application> {
        self.ctx
            .db
            .applications()
            .get(id)
            .await?
            .ok_or(ServiceError::NotFound("application"))
    }

    /// Load an application together with its request, checking that `user`
    /// owns the request.
    async fn load_as_requester(
        &self,
        user: &User,
        id: &str,
    ) -> ServiceResult<(Application, HelpRequest)> {
        let app = self.load(id).await?;
        let req = self.ctx.requests().load(&app.request_id).await?;
        if req.requester_id != user.id {
            return Err(ServiceError::forbidden(
                "only the requester can decide on applications",
            ));
        }
        Ok((app, req))
    }

    fn push_update(&self, app: &Application) {
        self.ctx.hub.publish(
            &user_room(&app.helper_id),
            ServerEvent::ApplicationUpdated(app.clone()),
        );
    }

    pub async fn apply(
        &self,
        user: &User,
        request_id: &str,
        message: Option<String>,
    ) -> ServiceResult<Application> {
        let req = self.ctx.requests().load(request_id).await?;
        if req.requester_id == user.id {
            return Err(ServiceError::forbidden("you cannot apply to your own request"));
        }
        if req.status != RequestStatus::Open {
            return Err(ServiceError::conflict("request is not accepting applications"));
        }
        let message = validate::optional_text(
            "message",
            message.as_deref(),
            validate::APPLICATION_NOTE_MAX,
        )?;

        let repo = self.ctx.db.applications();
        if repo.get_for_request_helper(&req.id, &user.id).await?.is_some() {
            return Err(ServiceError::conflict("you already applied to this request"));
        }

        let app = Application::new(req.id.clone(), user.id.clone(), message);
        match repo.create(&app).await {
            Ok(()) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(ServiceError::conflict("you already applied to this request"))
            }
            Err(e) => return Err(e.into()),
        }

        self.ctx.hub.publish(
            &user_room(&req.requester_id),
            ServerEvent::ApplicationNew(app.clone()),
        );
        let mut payload = request_payload(&req);
        payload["application_id"] = json!(app.id);
        payload["helper_id"] = json!(user.id);
        payload["helper_name"] = json!(user.name);
        self.ctx
            .notifications()
            .deliver(&req.requester_id, NotificationKind::ApplicationReceived, payload)
            .await;

        Ok(app)
    }

    /// Accept one application. The request becomes assigned and every other
    /// pending application on it is declined.
    pub async fn accept(&self, user: &User, id: &str) -> ServiceResult<Application> {
        let (mut app, mut req) = self.load_as_requester(user, id).await?;
        if req.status != RequestStatus::Open {
            return Err(ServiceError::InvalidTransition {
                from: req.status,
                to: RequestStatus::Assigned,
            });
        }
        if !app.is_pending() {
            return Err(ServiceError::conflict("application is no longer pending"));
        }

        let declined = self
            .ctx
            .db
            .applications()
            .accept(&app)
            .await?
            .ok_or_else(|| ServiceError::conflict("request changed, please reload"))?;

        app.status = ApplicationStatus::Accepted;
        req.status = RequestStatus::Assigned;
        req.helper_id = Some(app.helper_id.clone());
        tracing::info!(
            "Request {} assigned to {} ({} other applications declined)",
            req.id,
            app.helper_id,
            declined.len()
        );

        let notifications = self.ctx.notifications();
        let payload = request_payload(&req);
        self.push_update(&app);
        notifications
            .deliver(&app.helper_id, NotificationKind::ApplicationAccepted, payload.clone())
            .await;
        for other in &declined {
            self.push_update(other);
            notifications
                .deliver(&other.helper_id, NotificationKind::ApplicationDeclined, payload.clone())
                .await;
        }
        publish_status(&self.ctx.hub, &req);

        Ok(app)
    }

    pub async fn decline(&self, user: &User, id: &str) -> ServiceResult<Application> {
        let (mut app, req) = self.load_as_requester(user, id).await?;
        let declined = self
            .ctx
            .db
            .applications()
            .set_status(&app.id, ApplicationStatus::Pending, ApplicationStatus::Declined)
            .await?;
        if !declined {
            return Err(ServiceError::conflict("application is no longer pending"));
        }

        app.status = ApplicationStatus::Declined;
        self.push_update(&app);
        self.ctx
            .notifications()
            .deliver(&app.helper_id, NotificationKind::ApplicationDeclined, request_payload(&req))
            .await;
        Ok(app)
    }

    pub async fn withdraw(&self, user: &User, id: &str) -> ServiceResult<Application> {
        let mut app = self.load(id).await?;
        if app.helper_id != user.id {
            return Err(ServiceError::forbidden("only the applicant can withdraw"));
        }
        let withdrawn = self
            .ctx
            .db
            .applications()
            .set_status(&app.id, ApplicationStatus::Pending, ApplicationStatus::Withdrawn)
            .await?;
        if !withdrawn {
            return Err(ServiceError::conflict("application is no longer pending"));
        }

        app.status = ApplicationStatus::Withdrawn;
        if let Some(req) = self.ctx.db.requests().get(&app.request_id).await? {
            self.ctx.hub.publish(
                &user_room(&req.requester_id),
                ServerEvent::ApplicationUpdated(app.clone()),
            );
        }
        Ok(app)
    }

    pub async fn list_mine(&self, user: &User) -> ServiceResult<Vec<Application>> {
        Ok(self.ctx.db.applications().list_for_helper(&user.id).await?)
    }

    pub async fn views_for_request(&self, request_id: &str) -> ServiceResult<Vec<ApplicationView>> {
        let apps = self.ctx.db.applications().list_for_request(request_id).await?;
        let helper_ids: Vec<String> = apps.iter().map(|a| a.helper_id.clone()).collect();
        let helpers = self.ctx.db.users().get_many(&helper_ids).await?;

        Ok(apps
            .into_iter()
            .map(|application| {
                let helper = helpers
                    .iter()
                    .find(|u| u.id == application.helper_id)
                    .map(PublicUser::from);
                ApplicationView {
                    application,
                    helper,
                }
            })
            .collect())
    }
}
