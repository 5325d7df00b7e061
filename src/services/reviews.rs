//! Ratings left after a completed request.

use serde::Deserialize;
use serde_json::json;

use super::{validate, ServiceContext, ServiceError, ServiceResult};
use crate::models::{NotificationKind, RequestStatus, Review, User};
use crate::repository::util::{is_unique_violation, page_bounds};

const MAX_PAGE: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

pub struct ReviewService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReviewService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Review the other participant of a completed request. Each participant
    /// reviews once; the reviewee's cached rating is recomputed.
    pub async fn create(
        &self,
        user: &User,
        request_id: &str,
        input: NewReview,
    ) -> ServiceResult<Review> {
        let req = self.ctx.requests().load(request_id).await?;
        let reviewee_id = req
            .counterpart_of(&user.id)
            .ok_or_else(|| {
                ServiceError::forbidden("only the requester and the helper can review")
            })?
            .to_string();
        if req.status != RequestStatus::Completed {
            return Err(ServiceError::conflict(
                "reviews open once the request is completed",
            ));
        }
        let rating = validate::rating(input.rating)?;
        let comment =
            validate::optional_text("comment", input.comment.as_deref(), validate::COMMENT_MAX)?;

        let reviews = self.ctx.db.reviews();
        if reviews.exists(&req.id, &user.id).await? {
            return Err(ServiceError::conflict("you already reviewed this request"));
        }

        let review = Review::new(req.id.clone(), user.id.clone(), reviewee_id, rating, comment);
        match reviews.create(&review).await {
            Ok(()) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(ServiceError::conflict("you already reviewed this request"))
            }
            Err(e) => return Err(e.into()),
        }

        let (avg, count) = self.ctx.db.users().update_rating(&review.reviewee_id).await?;
        tracing::debug!(
            "User {} rating now {:.2} over {} reviews",
            review.reviewee_id,
            avg,
            count
        );

        let payload = json!({
            "request_id": req.id,
            "review_id": review.id,
            "rating": review.rating,
            "reviewer_name": user.name,
        });
        self.ctx
            .notifications()
            .deliver(&review.reviewee_id, NotificationKind::ReviewReceived, payload)
            .await;

        Ok(review)
    }

    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<Vec<Review>> {
        let (limit, offset) = page_bounds(limit, offset, MAX_PAGE);
        Ok(self
            .ctx
            .db
            .reviews()
            .list_for_user(user_id, limit, offset)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{assigned_request, test_services, user};

    fn review(rating: i32) -> NewReview {
        NewReview {
            rating,
            comment: Some("Very kind".into()),
        }
    }

    #[tokio::test]
    async fn test_reviews_after_completion() {
        let (ctx, _dir) = test_services().await;
        let ana = user(&ctx, "Ana").await;
        let bia = user(&ctx, "Bia").await;
        let caio = user(&ctx, "Caio").await;
        let req = assigned_request(&ctx, &ana, &bia).await;

        assert!(matches!(
            ctx.reviews().create(&ana, &req.id, review(5)).await,
            Err(ServiceError::Conflict(_))
        ));
        ctx.requests().complete(&ana, &req.id).await.unwrap();

        assert!(matches!(
            ctx.reviews().create(&caio, &req.id, review(5)).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            ctx.reviews().create(&ana, &req.id, review(0)).await,
            Err(ServiceError::Validation(_))
        ));

        let created = ctx.reviews().create(&ana, &req.id, review(4)).await.unwrap();
        assert_eq!(created.reviewee_id, bia.id);
        assert!(matches!(
            ctx.reviews().create(&ana, &req.id, review(5)).await,
            Err(ServiceError::Conflict(_))
        ));
        ctx.reviews().create(&bia, &req.id, review(5)).await.unwrap();

        let bia = ctx.db.users().get(&bia.id).await.unwrap().unwrap();
        assert_eq!((bia.rating_avg, bia.rating_count), (4.0, 1));
        let ana_after = ctx.db.users().get(&ana.id).await.unwrap().unwrap();
        assert_eq!((ana_after.rating_avg, ana_after.rating_count), (5.0, 1));

        let listed = ctx.reviews().list_for_user(&bia.id, None, None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].comment.as_deref(), Some("Very kind"));

        let notes = ctx.notifications().list(&bia, false, None).await.unwrap();
        assert_eq!(notes[0].kind, NotificationKind::ReviewReceived);
    }
}
