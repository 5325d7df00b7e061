//! Ratings left between requester and helper after a completed request.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: String,
    pub request_id: String,
    pub reviewer_id: String,
    pub reviewee_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        request_id: String,
        reviewer_id: String,
        reviewee_id: String,
        rating: i32,
        comment: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request_id,
            reviewer_id,
            reviewee_id,
            rating,
            comment,
            created_at: Utc::now(),
        }
    }
}
