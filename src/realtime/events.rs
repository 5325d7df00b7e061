//! Wire format of WebSocket frames.

use serde::{Deserialize, Serialize};

use crate::models::{Application, Message, Notification, RequestStatus};

/// Server → client frame, serialised as `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "message:new")]
    MessageNew(Message),
    #[serde(rename = "application:new")]
    ApplicationNew(Application),
    #[serde(rename = "application:updated")]
    ApplicationUpdated(Application),
    #[serde(rename = "request:status")]
    RequestStatus(RequestStatusEvent),
    #[serde(rename = "notification:new")]
    NotificationNew(Notification),
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageNew(_) => "message:new",
            Self::ApplicationNew(_) => "application:new",
            Self::ApplicationUpdated(_) => "application:updated",
            Self::RequestStatus(_) => "request:status",
            Self::NotificationNew(_) => "notification:new",
            Self::Pong => "pong",
            Self::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestStatusEvent {
    pub request_id: String,
    pub status: RequestStatus,
    pub helper_id: Option<String>,
}

/// Client → server frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    Join { request_id: String },
    Leave { request_id: String },
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_event_shape() {
        let event = ServerEvent::RequestStatus(RequestStatusEvent {
            request_id: "r1".into(),
            status: RequestStatus::Assigned,
            helper_id: Some("u2".into()),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "request:status",
                "data": { "request_id": "r1", "status": "assigned", "helper_id": "u2" }
            })
        );
        assert_eq!(event.name(), "request:status");
    }

    #[test]
    fn test_pong_has_no_data() {
        let value = serde_json::to_value(ServerEvent::Pong).unwrap();
        assert_eq!(value, json!({ "event": "pong" }));
    }

    #[test]
    fn test_message_event_carries_message() {
        let msg = Message::new("r1".into(), "u1".into(), "oi".into());
        let value = serde_json::to_value(ServerEvent::MessageNew(msg.clone())).unwrap();
        assert_eq!(value["event"], "message:new");
        assert_eq!(value["data"]["id"], msg.id);
        assert_eq!(value["data"]["body"], "oi");
    }

    #[test]
    fn test_client_actions_parse() {
        let join: ClientAction =
            serde_json::from_str(r#"{"action":"join","request_id":"r1"}"#).unwrap();
        assert_eq!(join, ClientAction::Join { request_id: "r1".into() });
        let ping: ClientAction = serde_json::from_str(r#"{"action":"ping"}"#).unwrap();
        assert_eq!(ping, ClientAction::Ping);
        assert!(serde_json::from_str::<ClientAction>(r#"{"action":"dance"}"#).is_err());
        assert!(serde_json::from_str::<ClientAction>(r#"{"action":"join"}"#).is_err());
    }
}
