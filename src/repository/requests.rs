//! Help request repository.

use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::models::HelpRequestRecord;
use super::pool::{DbError, DbPool};
use super::util::{encode_string_list, format_datetime, like_pattern};
use crate::geo::BoundingBox;
use crate::models::{Category, HelpRequest, RequestStatus, Urgency};
use crate::schema::{applications, help_requests, messages, reviews};

impl From<&HelpRequest> for HelpRequestRecord {
    fn from(req: &HelpRequest) -> Self {
        HelpRequestRecord {
            id: req.id.clone(),
            requester_id: req.requester_id.clone(),
            helper_id: req.helper_id.clone(),
            title: req.title.clone(),
            description: req.description.clone(),
            category: req.category.as_str().to_string(),
            urgency: req.urgency.as_str().to_string(),
            status: req.status.as_str().to_string(),
            lat: req.location.lat,
            lng: req.location.lng,
            address_hint: req.address_hint.clone(),
            image_urls: encode_string_list(&req.image_urls),
            created_at: format_datetime(&req.created_at),
            updated_at: format_datetime(&req.updated_at),
            completed_at: req.completed_at.as_ref().map(format_datetime),
        }
    }
}

/// Filters for listing requests.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter<'a> {
    pub status: Option<RequestStatus>,
    pub category: Option<Category>,
    pub urgency: Option<Urgency>,
    pub requester_id: Option<&'a str>,
    pub helper_id: Option<&'a str>,
    pub query: Option<&'a str>,
    pub bbox: Option<BoundingBox>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Clone)]
pub struct RequestRepository {
    pool: DbPool,
}

impl RequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, req: &HelpRequest) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(help_requests::table)
            .values(HelpRequestRecord::from(req))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<HelpRequest>, DbError> {
        let mut conn = self.pool.get().await?;

        help_requests::table
            .find(id)
            .select(HelpRequestRecord::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(HelpRequest::from))
    }

    /// Persist the editable fields of a request.
    pub async fn update_details(&self, req: &HelpRequest) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::update(help_requests::table.find(req.id.as_str()))
            .set((
                help_requests::title.eq(&req.title),
                help_requests::description.eq(&req.description),
                help_requests::category.eq(req.category.as_str()),
                help_requests::urgency.eq(req.urgency.as_str()),
                help_requests::lat.eq(req.location.lat),
                help_requests::lng.eq(req.location.lng),
                help_requests::address_hint.eq(&req.address_hint),
                help_requests::updated_at.eq(format_datetime(&Utc::now())),
            ))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }

    /// Persist status, helper and completion time, but only if the stored
    /// status still equals `previous`. Returns false when another writer won.
    pub async fn save_status(
        &self,
        req: &HelpRequest,
        previous: RequestStatus,
    ) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::update(
            help_requests::table
                .filter(help_requests::id.eq(&req.id))
                .filter(help_requests::status.eq(previous.as_str())),
        )
        .set((
            help_requests::status.eq(req.status.as_str()),
            help_requests::helper_id.eq(&req.helper_id),
            help_requests::completed_at.eq(req.completed_at.as_ref().map(format_datetime)),
            help_requests::updated_at.eq(format_datetime(&Utc::now())),
        ))
        .execute(&mut conn)
        .await?;

        Ok(rows > 0)
    }

    pub async fn set_images(&self, id: &str, image_urls: &[String]) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::update(help_requests::table.find(id))
            .set((
                help_requests::image_urls.eq(encode_string_list(image_urls)),
                help_requests::updated_at.eq(format_datetime(&Utc::now())),
            ))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }

    /// List requests matching `filter`, newest first.
    /// Filtered page, newest first.
    pub async fn list(&self, filter: &RequestFilter<'_>) -> Result<Vec<HelpRequest>, DbError> {
        let mut conn = self.pool.get().await?;

        filtered(filter)
            .select(HelpRequestRecord::as_select())
            .order((help_requests::created_at.desc(), help_requests::id.asc()))
            .limit(filter.limit)
            .offset(filter.offset)
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(HelpRequest::from).collect())
    }

    /// Every request matching `filter`, newest first. `limit` and `offset`
    /// are ignored, so callers should narrow the set with a bounding box.
    pub async fn list_all(&self, filter: &RequestFilter<'_>) -> Result<Vec<HelpRequest>, DbError> {
        let mut conn = self.pool.get().await?;

        filtered(filter)
            .select(HelpRequestRecord::as_select())
            .order((help_requests::created_at.desc(), help_requests::id.asc()))
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(HelpRequest::from).collect())
    }

    /// Delete a request together with its applications, messages and reviews.
    ///
    /// Returns the distinct reviewees whose reviews were removed, or `None`
    /// when the request does not exist. Their cached ratings are stale until
    /// recomputed.
    pub async fn delete(&self, id: &str) -> Result<Option<Vec<String>>, DbError> {
        let mut conn = self.pool.get().await?;

        conn.transaction(|conn| {
            Box::pin(async move {
                let reviewees: Vec<String> = reviews::table
                    .filter(reviews::request_id.eq(id))
                    .select(reviews::reviewee_id)
                    .distinct()
                    .load(conn)
                    .await?;

                diesel::delete(messages::table.filter(messages::request_id.eq(id)))
                    .execute(conn)
                    .await?;

                diesel::delete(applications::table.filter(applications::request_id.eq(id)))
                    .execute(conn)
                    .await?;

                diesel::delete(reviews::table.filter(reviews::request_id.eq(id)))
                    .execute(conn)
                    .await?;

                let rows = diesel::delete(help_requests::table.find(id))
                    .execute(conn)
                    .await?;

                Ok((rows > 0).then_some(reviewees))
            })
        })
        .await
    }
}

/// Apply every `filter` criterion except paging and ordering.
fn filtered<'a>(filter: &RequestFilter<'_>) -> help_requests::BoxedQuery<'a, Sqlite> {
    let mut q = help_requests::table.into_boxed();

    if let Some(status) = filter.status {
        q = q.filter(help_requests::status.eq(status.as_str()));
    }
    if let Some(category) = filter.category {
        q = q.filter(help_requests::category.eq(category.as_str()));
    }
    if let Some(urgency) = filter.urgency {
        q = q.filter(help_requests::urgency.eq(urgency.as_str()));
    }
    if let Some(requester) = filter.requester_id {
        q = q.filter(help_requests::requester_id.eq(requester.to_string()));
    }
    if let Some(helper) = filter.helper_id {
        q = q.filter(help_requests::helper_id.eq(helper.to_string()));
    }
    if let Some(term) = filter.query.map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(term);
        q = q.filter(
            help_requests::title
                .like(pattern.clone())
                .escape('\\')
                .or(help_requests::description.like(pattern).escape('\\')),
        );
    }
    if let Some(bbox) = filter.bbox {
        q = q
            .filter(help_requests::lat.between(bbox.min_lat, bbox.max_lat))
            .filter(help_requests::lng.between(bbox.min_lng, bbox.max_lng));
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::models::User;
    use crate::repository::test_support::test_context;

    fn sample(requester: &str, title: &str, lat: f64, lng: f64) -> HelpRequest {
        HelpRequest::new(
            requester.to_string(),
            title.to_string(),
            "Some description long enough".to_string(),
            Category::Groceries,
            Urgency::Medium,
            GeoPoint::new(lat, lng).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_request_crud_and_status() {
        let (ctx, _dir) = test_context().await;
        let user = User::new("Ana".into(), "ana@example.com", "h".into());
        ctx.users().create(&user).await.unwrap();
        let repo = ctx.requests();

        let mut req = sample(&user.id, "Buy bread", -29.64, -53.25);
        repo.create(&req).await.unwrap();

        req.title = "Buy bread and milk".into();
        assert!(repo.update_details(&req).await.unwrap());
        assert_eq!(repo.get(&req.id).await.unwrap().unwrap().title, "Buy bread and milk");

        req.status = RequestStatus::Cancelled;
        assert!(repo.save_status(&req, RequestStatus::Open).await.unwrap());
        // Stale previous status no longer matches.
        assert!(!repo.save_status(&req, RequestStatus::Open).await.unwrap());

        let stored = repo.get(&req.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Cancelled);

        assert!(repo
            .set_images(&req.id, &["/uploads/ab/abc.jpg".to_string()])
            .await
            .unwrap());
        assert_eq!(repo.get(&req.id).await.unwrap().unwrap().image_urls.len(), 1);

        assert_eq!(repo.delete(&req.id).await.unwrap(), Some(vec![]));
        assert!(repo.get(&req.id).await.unwrap().is_none());
        assert_eq!(repo.delete(&req.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_request_filters() {
        let (ctx, _dir) = test_context().await;
        let user = User::new("Ana".into(), "ana@example.com", "h".into());
        ctx.users().create(&user).await.unwrap();
        let repo = ctx.requests();

        let near = sample(&user.id, "Walk the dog", -29.64, -53.25);
        let mut far = sample(&user.id, "Fix 100% of roof", -30.03, -51.22);
        far.category = Category::Repairs;
        repo.create(&near).await.unwrap();
        repo.create(&far).await.unwrap();

        let base = RequestFilter {
            limit: 50,
            ..Default::default()
        };
        assert_eq!(repo.list(&base).await.unwrap().len(), 2);

        let by_category = RequestFilter {
            category: Some(Category::Repairs),
            ..base.clone()
        };
        assert_eq!(repo.list(&by_category).await.unwrap()[0].id, far.id);

        let by_text = RequestFilter {
            query: Some("100%"),
            ..base.clone()
        };
        assert_eq!(repo.list(&by_text).await.unwrap().len(), 1);

        let bbox = GeoPoint::new(-29.64, -53.25).unwrap().bounding_box(10.0);
        let by_box = RequestFilter {
            bbox: Some(bbox),
            ..base.clone()
        };
        let found = repo.list(&by_box).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, near.id);
    }
}
