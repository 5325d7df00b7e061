//! Real-time fan-out to connected WebSocket clients.
//!
//! Clients are grouped in rooms. Every signed-in socket sits in its own
//! `user:<id>` room; participants of a help request can also join the
//! `request:<id>` room to receive chat and status events for it.

mod events;
mod hub;
mod session;

pub use events::{ClientAction, RequestStatusEvent, ServerEvent};
pub use hub::Hub;
pub use session::run_session;

/// Room every socket of a user listens on.
pub fn user_room(user_id: &str) -> String {
    format!("user:{}", user_id)
}

/// Room for the participants of a help request.
pub fn request_room(request_id: &str) -> String {
    format!("request:{}", request_id)
}
