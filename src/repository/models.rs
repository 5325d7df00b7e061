//! Diesel ORM records for database tables.
//!
//! Records mirror the table columns one to one. Conversion into domain
//! models happens in the `From` impls at the bottom of this file.

use diesel::prelude::*;

use super::util::{parse_datetime, parse_datetime_opt, parse_string_list};
use crate::geo::GeoPoint;
use crate::models::{
    Application, ApplicationStatus, Category, HelpRequest, Message, Notification,
    NotificationKind, Report, ReportStatus, ReportTarget, RequestStatus, Review, Role, Urgency,
    User,
};
use crate::schema;

/// User record from the database.
#[derive(Queryable, Selectable, Insertable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub bio: Option<String>,
    pub skills: String,
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub avatar_url: Option<String>,
    pub rating_avg: f64,
    pub rating_count: i32,
    pub banned: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Session record. Only the token hash is stored.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SessionRecord {
    pub token_hash: String,
    pub user_id: String,
    pub created_at: String,
    pub expires_at: String,
}

/// Help request record.
#[derive(Queryable, Selectable, Insertable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::help_requests)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HelpRequestRecord {
    pub id: String,
    pub requester_id: String,
    pub helper_id: Option<String>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub urgency: String,
    pub status: String,
    pub lat: f64,
    pub lng: f64,
    pub address_hint: Option<String>,
    pub image_urls: String,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

/// Application record.
#[derive(Queryable, Selectable, Insertable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::applications)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ApplicationRecord {
    pub id: String,
    pub request_id: String,
    pub helper_id: String,
    pub message: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Chat message record.
#[derive(Queryable, Selectable, Insertable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::messages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MessageRecord {
    pub id: String,
    pub request_id: String,
    pub sender_id: String,
    pub body: String,
    pub created_at: String,
}

/// Review record.
#[derive(Queryable, Selectable, Insertable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::reviews)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReviewRecord {
    pub id: String,
    pub request_id: String,
    pub reviewer_id: String,
    pub reviewee_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: String,
}

/// Report record.
#[derive(Queryable, Selectable, Insertable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::reports)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReportRecord {
    pub id: String,
    pub reporter_id: String,
    pub target_kind: String,
    pub target_id: String,
    pub reason: String,
    pub status: String,
    pub resolution: Option<String>,
    pub created_at: String,
    pub resolved_at: Option<String>,
    pub resolved_by: Option<String>,
}

/// Notification record.
#[derive(Queryable, Selectable, Insertable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::notifications)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NotificationRecord {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub payload: String,
    pub read: bool,
    pub created_at: String,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            location: GeoPoint::from_parts(record.lat, record.lng),
            id: record.id,
            name: record.name,
            email: record.email,
            password_hash: record.password_hash,
            role: Role::from_str(&record.role).unwrap_or_default(),
            bio: record.bio,
            skills: parse_string_list(&record.skills),
            city: record.city,
            avatar_url: record.avatar_url,
            rating_avg: record.rating_avg,
            rating_count: record.rating_count,
            banned: record.banned,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

impl From<HelpRequestRecord> for HelpRequest {
    fn from(record: HelpRequestRecord) -> Self {
        HelpRequest {
            location: GeoPoint {
                lat: record.lat,
                lng: record.lng,
            },
            id: record.id,
            requester_id: record.requester_id,
            helper_id: record.helper_id,
            title: record.title,
            description: record.description,
            category: Category::from_str(&record.category).unwrap_or(Category::Other),
            urgency: Urgency::from_str(&record.urgency).unwrap_or_default(),
            status: RequestStatus::from_str(&record.status).unwrap_or_default(),
            address_hint: record.address_hint,
            image_urls: parse_string_list(&record.image_urls),
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
            completed_at: parse_datetime_opt(record.completed_at),
        }
    }
}

impl From<ApplicationRecord> for Application {
    fn from(record: ApplicationRecord) -> Self {
        Application {
            id: record.id,
            request_id: record.request_id,
            helper_id: record.helper_id,
            message: record.message,
            status: ApplicationStatus::from_str(&record.status).unwrap_or_default(),
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Message {
            id: record.id,
            request_id: record.request_id,
            sender_id: record.sender_id,
            body: record.body,
            created_at: parse_datetime(&record.created_at),
        }
    }
}

impl From<ReviewRecord> for Review {
    fn from(record: ReviewRecord) -> Self {
        Review {
            id: record.id,
            request_id: record.request_id,
            reviewer_id: record.reviewer_id,
            reviewee_id: record.reviewee_id,
            rating: record.rating,
            comment: record.comment,
            created_at: parse_datetime(&record.created_at),
        }
    }
}

impl From<ReportRecord> for Report {
    fn from(record: ReportRecord) -> Self {
        Report {
            id: record.id,
            reporter_id: record.reporter_id,
            target: ReportTarget::from_str(&record.target_kind).unwrap_or(ReportTarget::User),
            target_id: record.target_id,
            reason: record.reason,
            status: ReportStatus::from_str(&record.status).unwrap_or_default(),
            resolution: record.resolution,
            created_at: parse_datetime(&record.created_at),
            resolved_at: parse_datetime_opt(record.resolved_at),
            resolved_by: record.resolved_by,
        }
    }
}

impl From<NotificationRecord> for Notification {
    fn from(record: NotificationRecord) -> Self {
        Notification {
            id: record.id,
            user_id: record.user_id,
            // Unknown kinds only appear if the enum shrinks; surface them as messages.
            kind: NotificationKind::from_str(&record.kind)
                .unwrap_or(NotificationKind::MessageReceived),
            payload: serde_json::from_str(&record.payload).unwrap_or_default(),
            read: record.read,
            created_at: parse_datetime(&record.created_at),
        }
    }
}
