//! Help requests and their lifecycle.
//!
//! A request starts `open`, becomes `assigned` once the requester accepts an
//! application, and ends either `completed` or `cancelled`. An assigned
//! request can go back to `open` when the helper is released.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Maximum number of images attached to a single request.
pub const MAX_REQUEST_IMAGES: usize = 5;

/// Kind of help being asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Groceries,
    Pharmacy,
    Transport,
    Companionship,
    Repairs,
    Pets,
    TechHelp,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Self::Groceries,
        Self::Pharmacy,
        Self::Transport,
        Self::Companionship,
        Self::Repairs,
        Self::Pets,
        Self::TechHelp,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groceries => "groceries",
            Self::Pharmacy => "pharmacy",
            Self::Transport => "transport",
            Self::Companionship => "companionship",
            Self::Repairs => "repairs",
            Self::Pets => "pets",
            Self::TechHelp => "tech_help",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

/// How soon help is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Lifecycle state of a help request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Open,
    Assigned,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 4] = [
        Self::Open,
        Self::Assigned,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Assigned => "assigned",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Open, Assigned)
                | (Open, Cancelled)
                | (Assigned, Completed)
                | (Assigned, Cancelled)
                | (Assigned, Open)
        )
    }
}

/// A help-request posting.
#[derive(Debug, Clone, Serialize)]
pub struct HelpRequest {
    pub id: String,
    pub requester_id: String,
    pub helper_id: Option<String>,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub urgency: Urgency,
    pub status: RequestStatus,
    pub location: GeoPoint,
    pub address_hint: Option<String>,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl HelpRequest {
    pub fn new(
        requester_id: String,
        title: String,
        description: String,
        category: Category,
        urgency: Urgency,
        location: GeoPoint,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            requester_id,
            helper_id: None,
            title,
            description,
            category,
            urgency,
            status: RequestStatus::Open,
            location,
            address_hint: None,
            image_urls: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Requester or the assigned helper.
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.requester_id == user_id || self.helper_id.as_deref() == Some(user_id)
    }

    /// The participant on the other side of `user_id`, if any.
    pub fn counterpart_of(&self, user_id: &str) -> Option<&str> {
        if self.requester_id == user_id {
            self.helper_id.as_deref()
        } else if self.helper_id.as_deref() == Some(user_id) {
            Some(self.requester_id.as_str())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use RequestStatus::*;
        assert!(Open.can_transition_to(Assigned));
        assert!(Open.can_transition_to(Cancelled));
        assert!(Assigned.can_transition_to(Completed));
        assert!(Assigned.can_transition_to(Open));
        assert!(!Open.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Open));
        assert!(!Cancelled.can_transition_to(Open));
        assert!(!Open.can_transition_to(Open));
        assert!(Completed.is_terminal() && Cancelled.is_terminal());
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(Category::from_str("tech_help"), Some(Category::TechHelp));
        assert_eq!(Category::from_str("unknown"), None);
        for c in Category::ALL {
            assert_eq!(Category::from_str(c.as_str()), Some(c));
        }
    }

    #[test]
    fn test_counterpart() {
        let mut req = HelpRequest::new(
            "alice".into(),
            "Need groceries".into(),
            "Could someone bring milk and bread?".into(),
            Category::Groceries,
            Urgency::High,
            GeoPoint::new(-29.64, -53.25).unwrap(),
        );
        assert_eq!(req.counterpart_of("alice"), None);
        req.helper_id = Some("bob".into());
        assert_eq!(req.counterpart_of("alice"), Some("bob"));
        assert_eq!(req.counterpart_of("bob"), Some("alice"));
        assert_eq!(req.counterpart_of("carol"), None);
        assert!(req.is_participant("bob"));
        assert!(!req.is_participant("carol"));
    }
}
