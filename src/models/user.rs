//! User accounts and their public projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// A registered user.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Always stored lower-cased.
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub city: Option<String>,
    pub location: Option<GeoPoint>,
    pub avatar_url: Option<String>,
    pub rating_avg: f64,
    pub rating_count: i32,
    pub banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a fresh id.
    pub fn new(name: String, email: &str, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email: normalize_email(email),
            password_hash,
            role: Role::User,
            bio: None,
            skills: Vec::new(),
            city: None,
            location: None,
            avatar_url: None,
            rating_avg: 0.0,
            rating_count: 0,
            banned: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser::from(self)
    }
}

/// Trim and lower-case an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User fields that are safe to show to other users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub city: Option<String>,
    pub avatar_url: Option<String>,
    pub rating_avg: f64,
    pub rating_count: i32,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
            bio: user.bio.clone(),
            skills: user.skills.clone(),
            city: user.city.clone(),
            avatar_url: user.avatar_url.clone(),
            rating_avg: user.rating_avg,
            rating_count: user.rating_count,
            created_at: user.created_at,
        }
    }
}

/// The signed-in user's own view, including private fields.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    #[serde(flatten)]
    pub public: PublicUser,
    pub email: String,
    pub location: Option<GeoPoint>,
    pub banned: bool,
}

impl From<&User> for AccountView {
    fn from(user: &User) -> Self {
        Self {
            public: PublicUser::from(user),
            email: user.email.clone(),
            location: user.location,
            banned: user.banned,
        }
    }
}
