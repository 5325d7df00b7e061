//! Persisted user notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApplicationReceived,
    ApplicationAccepted,
    ApplicationDeclined,
    MessageReceived,
    RequestCompleted,
    RequestCancelled,
    ReviewReceived,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicationReceived => "application_received",
            Self::ApplicationAccepted => "application_accepted",
            Self::ApplicationDeclined => "application_declined",
            Self::MessageReceived => "message_received",
            Self::RequestCompleted => "request_completed",
            Self::RequestCancelled => "request_cancelled",
            Self::ReviewReceived => "review_received",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "application_received" => Some(Self::ApplicationReceived),
            "application_accepted" => Some(Self::ApplicationAccepted),
            "application_declined" => Some(Self::ApplicationDeclined),
            "message_received" => Some(Self::MessageReceived),
            "request_completed" => Some(Self::RequestCompleted),
            "request_cancelled" => Some(Self::RequestCancelled),
            "review_received" => Some(Self::ReviewReceived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: String, kind: NotificationKind, payload: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            kind,
            payload,
            read: false,
            created_at: Utc::now(),
        }
    }
}
