//! Help-request lifecycle and proximity search.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::applications::ApplicationView;
use super::{validate, ServiceContext, ServiceError, ServiceResult};
use crate::geo::{rank_by_distance, round_km, GeoPoint};
use crate::images::store_image_async;
use crate::models::{
    Category, HelpRequest, NotificationKind, PublicUser, RequestStatus, Urgency, User,
    MAX_REQUEST_IMAGES,
};
use crate::realtime::{request_room, user_room, Hub, RequestStatusEvent, ServerEvent};
use crate::repository::util::page_bounds;
use crate::repository::RequestFilter;

const MAX_PAGE: i64 = 100;
const MINE_LIMIT: i64 = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct NewRequest {
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub address_hint: Option<String>,
}

/// Partial edit; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub urgency: Option<Urgency>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address_hint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
    /// Defaults to `open`.
    pub status: Option<RequestStatus>,
    pub category: Option<Category>,
    pub urgency: Option<Urgency>,
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A search hit. `distance_km` is set when the search had an origin.
#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
    #[serde(flatten)]
    pub request: HelpRequest,
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: HelpRequest,
    pub requester: PublicUser,
    pub helper: Option<PublicUser>,
    /// Only shown to the requester, the assigned helper and admins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applications: Option<Vec<ApplicationView>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MyRequests {
    pub requested: Vec<HelpRequest>,
    pub helping: Vec<HelpRequest>,
}

/// Payload stored with request-related notifications.
pub(crate) fn request_payload(req: &HelpRequest) -> Value {
    json!({ "request_id": req.id, "title": req.title })
}

/// Push the current status of `req` to its room.
pub(crate) fn publish_status(hub: &Hub, req: &HelpRequest) {
    hub.publish(
        &request_room(&req.id),
        ServerEvent::RequestStatus(RequestStatusEvent {
            request_id: req.id.clone(),
            status: req.status,
            helper_id: req.helper_id.clone(),
        }),
    );
}

pub struct RequestService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RequestService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub(crate) async fn load(&self, id: &str) -> ServiceResult<HelpRequest> {
        self.ctx
            .db
            .requests()
            .get(id)
            .await?
            .ok_or(ServiceError::NotFound("request"))
    }

    pub async fn create(&self, user: &User, input: NewRequest) -> ServiceResult<HelpRequest> {
        let title = validate::text("title", &input.title, validate::TITLE_LEN)?;
        let description =
            validate::text("description", &input.description, validate::DESCRIPTION_LEN)?;
        let address_hint = validate::optional_text(
            "address_hint",
            input.address_hint.as_deref(),
            validate::ADDRESS_HINT_MAX,
        )?;
        let location = GeoPoint::new(input.lat, input.lng)?;
        self.ctx.geofence().check(location)?;

        let mut req = HelpRequest::new(
            user.id.clone(),
            title,
            description,
            input.category,
            input.urgency.unwrap_or_default(),
            location,
        );
        req.address_hint = address_hint;
        self.ctx.db.requests().create(&req).await?;

        tracing::info!("User {} created request {}", user.id, req.id);
        Ok(req)
    }

    pub async fn update(
        &self,
        user: &User,
        id: &str,
        input: UpdateRequest,
    ) -> ServiceResult<HelpRequest> {
        let mut req = self.load(id).await?;
        if req.requester_id != user.id {
            return Err(ServiceError::forbidden("only the requester can edit a request"));
        }
        if req.status != RequestStatus::Open {
            return Err(ServiceError::conflict("only open requests can be edited"));
        }

        if let Some(title) = input.title {
            req.title = validate::text("title", &title, validate::TITLE_LEN)?;
        }
        if let Some(description) = input.description {
            req.description =
                validate::text("description", &description, validate::DESCRIPTION_LEN)?;
        }
        if let Some(category) = input.category {
            req.category = category;
        }
        if let Some(urgency) = input.urgency {
            req.urgency = urgency;
        }
        if let Some(hint) = input.address_hint {
            req.address_hint =
                validate::optional_text("address_hint", Some(&hint), validate::ADDRESS_HINT_MAX)?;
        }
        if let Some(location) = validate::location(input.lat, input.lng)? {
            self.ctx.geofence().check(location)?;
            req.location = location;
        }

        self.ctx.db.requests().update_details(&req).await?;
        req.updated_at = Utc::now();
        Ok(req)
    }

    /// Move `req` to `to`, guarded against concurrent writers.
    async fn transition(
        &self,
        mut req: HelpRequest,
        to: RequestStatus,
        edit: impl FnOnce(&mut HelpRequest),
    ) -> ServiceResult<HelpRequest> {
        let from = req.status;
        if !from.can_transition_to(to) {
            return Err(ServiceError::InvalidTransition { from, to });
        }

        edit(&mut req);
        req.status = to;
        if !self.ctx.db.requests().save_status(&req, from).await? {
            return Err(ServiceError::conflict("request was changed by someone else"));
        }
        req.updated_at = Utc::now();

        tracing::info!("Request {} moved {} -> {}", req.id, from.as_str(), to.as_str());
        publish_status(&self.ctx.hub, &req);
        Ok(req)
    }

    pub async fn cancel(&self, user: &User, id: &str) -> ServiceResult<HelpRequest> {
        let req = self.load(id).await?;
        if req.requester_id != user.id && !user.is_admin() {
            return Err(ServiceError::forbidden("only the requester can cancel a request"));
        }

        let req = self.transition(req, RequestStatus::Cancelled, |_| {}).await?;
        let declined = self.ctx.db.applications().decline_pending(&req.id).await?;

        let notifications = self.ctx.notifications();
        let payload = request_payload(&req);
        for app in declined {
            self.ctx.hub.publish(
                &user_room(&app.helper_id),
                ServerEvent::ApplicationUpdated(app.clone()),
            );
            notifications
                .deliver(&app.helper_id, NotificationKind::RequestCancelled, payload.clone())
                .await;
        }
        if let Some(helper_id) = req.helper_id.as_deref() {
            notifications
                .deliver(helper_id, NotificationKind::RequestCancelled, payload.clone())
                .await;
        }
        if req.requester_id != user.id {
            notifications
                .deliver(&req.requester_id, NotificationKind::RequestCancelled, payload)
                .await;
        }

        Ok(req)
    }

    pub async fn complete(&self, user: &User, id: &str) -> ServiceResult<HelpRequest> {
        let req = self.load(id).await?;
        if !req.is_participant(&user.id) {
            return Err(ServiceError::forbidden(
                "only the requester or the helper can complete a request",
            ));
        }

        let req = self
            .transition(req, RequestStatus::Completed, |r| {
                r.completed_at = Some(Utc::now())
            })
            .await?;

        if let Some(other) = req.counterpart_of(&user.id) {
            self.ctx
                .notifications()
                .deliver(other, NotificationKind::RequestCompleted, request_payload(&req))
                .await;
        }
        Ok(req)
    }

    /// Drop the assigned helper and reopen the request.
    pub async fn release(&self, user: &User, id: &str) -> ServiceResult<HelpRequest> {
        let mut req = self.load(id).await?;
        if !req.is_participant(&user.id) {
            return Err(ServiceError::forbidden(
                "only the requester or the helper can release a request",
            ));
        }

        let from = req.status;
        let to = RequestStatus::Open;
        let helper_id = match req.helper_id.take() {
            Some(helper_id) if from.can_transition_to(to) => helper_id,
            _ => return Err(ServiceError::InvalidTransition { from, to }),
        };

        let withdrawn = self
            .ctx
            .db
            .applications()
            .release(&req.id, &helper_id)
            .await?
            .ok_or_else(|| ServiceError::conflict("request was changed by someone else"))?;

        req.status = to;
        req.updated_at = Utc::now();
        tracing::info!("Request {} released by {}", req.id, user.id);
        publish_status(&self.ctx.hub, &req);

        for app in withdrawn {
            self.ctx.hub.publish(
                &user_room(&app.helper_id),
                ServerEvent::ApplicationUpdated(app),
            );
        }
        Ok(req)
    }

    /// Attach uploaded images. Each is normalised by [`store_image_async`].
    pub async fn add_images(
        &self,
        user: &User,
        id: &str,
        files: Vec<Vec<u8>>,
    ) -> ServiceResult<HelpRequest> {
        let mut req = self.load(id).await?;
        if req.requester_id != user.id {
            return Err(ServiceError::forbidden("only the requester can add images"));
        }
        if req.status.is_terminal() {
            return Err(ServiceError::conflict("request is closed"));
        }
        if files.is_empty() {
            return Err(ServiceError::validation("no images uploaded"));
        }
        if req.image_urls.len() + files.len() > MAX_REQUEST_IMAGES {
            return Err(ServiceError::validation(format!(
                "a request can have at most {} images",
                MAX_REQUEST_IMAGES
            )));
        }

        let settings = &self.ctx.settings;
        for bytes in files {
            let stored = store_image_async(
                bytes,
                settings.uploads_dir.clone(),
                settings.image_max_dimension,
                settings.max_upload_bytes,
            )
            .await?;
            req.image_urls.push(stored.url);
        }

        self.ctx.db.requests().set_images(&req.id, &req.image_urls).await?;
        Ok(req)
    }

    /// Filtered listing; nearest first when an origin is given, newest first
    /// otherwise.
    pub async fn search(&self, query: &SearchQuery) -> ServiceResult<Vec<RequestSummary>> {
        let origin = validate::location(query.lat, query.lng)?;
        let (limit, offset) = page_bounds(query.limit, query.offset, MAX_PAGE);

        let mut filter = RequestFilter {
            status: Some(query.status.unwrap_or(RequestStatus::Open)),
            category: query.category,
            urgency: query.urgency,
            query: query.q.as_deref(),
            limit,
            offset,
            ..Default::default()
        };

        let Some(origin) = origin else {
            let found = self.ctx.db.requests().list(&filter).await?;
            return Ok(found
                .into_iter()
                .map(|request| RequestSummary {
                    request,
                    distance_km: None,
                })
                .collect());
        };

        let radius_km = self.ctx.settings.search_radius(query.radius_km);
        filter.bbox = Some(origin.bounding_box(radius_km));

        // Paging happens after the exact ranking, over every box candidate.
        let candidates = self.ctx.db.requests().list_all(&filter).await?;
        tracing::debug!("Ranking {} proximity candidates", candidates.len());

        Ok(
            rank_by_distance(origin, candidates, radius_km, |r| Some(r.location))
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .map(|(request, distance)| RequestSummary {
                    request,
                    distance_km: Some(round_km(distance)),
                })
                .collect(),
        )
    }

    pub async fn get(&self, id: &str, viewer: Option<&User>) -> ServiceResult<RequestDetail> {
        let request = self.load(id).await?;
        let users = self.ctx.db.users();

        let requester = users
            .get(&request.requester_id)
            .await?
            .ok_or(ServiceError::NotFound("user"))?
            .to_public();
        let helper = match request.helper_id.as_deref() {
            Some(helper_id) => users.get(helper_id).await?.map(|u| u.to_public()),
            None => None,
        };

        let can_see_applications =
            viewer.is_some_and(|v| v.is_admin() || request.is_participant(&v.id));
        let applications = if can_see_applications {
            Some(self.ctx.applications().views_for_request(&request.id).await?)
        } else {
            None
        };

        Ok(RequestDetail {
            request,
            requester,
            helper,
            applications,
        })
    }

    pub async fn list_mine(&self, user: &User) -> ServiceResult<MyRequests> {
        let repo = self.ctx.db.requests();
        let requested = repo
            .list(&RequestFilter {
                requester_id: Some(&user.id),
                limit: MINE_LIMIT,
                ..Default::default()
            })
            .await?;
        let helping = repo
            .list(&RequestFilter {
                helper_id: Some(&user.id),
                limit: MINE_LIMIT,
                ..Default::default()
            })
            .await?;
        Ok(MyRequests { requested, helping })
    }
}
