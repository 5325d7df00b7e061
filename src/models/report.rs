//! Moderation reports filed by users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a report points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportTarget {
    User,
    Request,
}

impl ReportTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Request => "request",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "request" => Some(Self::Request),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Open,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "resolved" => Some(Self::Resolved),
            "dismissed" => Some(Self::Dismissed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: String,
    pub reporter_id: String,
    pub target: ReportTarget,
    pub target_id: String,
    pub reason: String,
    pub status: ReportStatus,
    pub resolution: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

impl Report {
    pub fn new(
        reporter_id: String,
        target: ReportTarget,
        target_id: String,
        reason: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            reporter_id,
            target,
            target_id,
            reason,
            status: ReportStatus::Open,
            resolution: None,
            created_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
        }
    }
}
