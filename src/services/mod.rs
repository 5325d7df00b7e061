//! Service layer for LigaBairro business rules.
//!
//! Services sit between the HTTP handlers (or CLI) and the repositories.
//! They own validation, permission checks, state transitions, and the
//! real-time events and notifications that follow a successful write.
//! Each service borrows a [`ServiceContext`] for the length of a call.

pub mod admin;
pub mod applications;
pub mod cache;
pub mod chat;
pub mod error;
pub mod notifications;
pub mod profiles;
pub mod reports;
pub mod requests;
pub mod reviews;
pub mod validate;

use std::sync::Arc;

pub use admin::{AdminService, UserPage};
pub use applications::{ApplicationService, ApplicationView};
pub use cache::StatsCache;
pub use chat::ChatService;
pub use error::{ServiceError, ServiceResult};
pub use notifications::NotificationService;
pub use profiles::{ProfileService, PublicProfile, UpdateProfile};
pub use reports::{NewReport, ReportService};
pub use requests::{
    MyRequests, NewRequest, RequestDetail, RequestService, RequestSummary, SearchQuery,
    UpdateRequest,
};
pub use reviews::{NewReview, ReviewService};

use crate::auth::AuthService;
use crate::config::Settings;
use crate::geo::Geofence;
use crate::realtime::Hub;
use crate::repository::DbContext;

/// Everything a service needs, cheap to clone into handlers.
#[derive(Clone)]
pub struct ServiceContext {
    pub db: DbContext,
    pub hub: Hub,
    pub settings: Arc<Settings>,
    pub stats_cache: Arc<StatsCache>,
}

impl ServiceContext {
    pub fn new(settings: Settings) -> Self {
        let db = settings.create_db_context();
        Self::with_db(settings, db)
    }

    pub fn with_db(settings: Settings, db: DbContext) -> Self {
        Self {
            db,
            hub: Hub::new(settings.ws_channel_capacity),
            stats_cache: Arc::new(StatsCache::with_ttl(settings.stats_cache_ttl())),
            settings: Arc::new(settings),
        }
    }

    pub fn geofence(&self) -> Geofence {
        self.settings.geofence()
    }

    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self)
    }

    pub fn requests(&self) -> RequestService<'_> {
        RequestService::new(self)
    }

    pub fn applications(&self) -> ApplicationService<'_> {
        ApplicationService::new(self)
    }

    pub fn chat(&self) -> ChatService<'_> {
        ChatService::new(self)
    }

    pub fn reviews(&self) -> ReviewService<'_> {
        ReviewService::new(self)
    }

    pub fn reports(&self) -> ReportService<'_> {
        ReportService::new(self)
    }

    pub fn notifications(&self) -> NotificationService<'_> {
        NotificationService::new(self)
    }

    pub fn profiles(&self) -> ProfileService<'_> {
        ProfileService::new(self)
    }

    pub fn admin(&self) -> AdminService<'_> {
        AdminService::new(self)
    }
}
