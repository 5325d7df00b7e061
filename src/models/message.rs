//! Chat messages exchanged on a request.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: String,
    pub request_id: String,
    pub sender_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(request_id: String, sender_id: String, body: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request_id,
            sender_id,
            body,
            created_at: Utc::now(),
        }
    }
}
