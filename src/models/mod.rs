//! Data models for LigaBairro.

mod application;
mod message;
mod notification;
mod report;
mod request;
mod review;
mod user;

pub use application::{Application, ApplicationStatus};
pub use message::Message;
pub use notification::{Notification, NotificationKind};
pub use report::{Report, ReportStatus, ReportTarget};
pub use request::{Category, HelpRequest, RequestStatus, Urgency, MAX_REQUEST_IMAGES};
pub use review::{Review, MAX_RATING, MIN_RATING};
pub use user::{normalize_email, AccountView, PublicUser, Role, User};
