//! Per-request chat between the requester and the assigned helper.

use chrono::{DateTime, Utc};
use serde_json::json;

use super::{validate, ServiceContext, ServiceError, ServiceResult};
use crate::models::{HelpRequest, Message, NotificationKind, RequestStatus, User};
use crate::realtime::{request_room, ServerEvent};

const DEFAULT_HISTORY: i64 = 50;
const MAX_HISTORY: i64 = 200;
/// Characters of the message body kept in the notification payload.
const PREVIEW_CHARS: usize = 80;

pub struct ChatService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ChatService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn send(&self, user: &User, request_id: &str, body: &str) -> ServiceResult<Message> {
        let req = self.ctx.requests().load(request_id).await?;
        if !req.is_participant(&user.id) {
            return Err(ServiceError::forbidden(
                "only the requester and the helper can chat",
            ));
        }
        if !matches!(req.status, RequestStatus::Assigned | RequestStatus::Completed) {
            return Err(ServiceError::conflict(
                "chat opens once a helper is assigned",
            ));
        }
        let body = validate::text("body", body, validate::MESSAGE_LEN)?;

        let message = Message::new(req.id.clone(), user.id.clone(), body);
        self.ctx.db.messages().create(&message).await?;
        self.ctx.hub.publish(
            &request_room(&req.id),
            ServerEvent::MessageNew(message.clone()),
        );

        if let Some(other) = req.counterpart_of(&user.id) {
            let preview: String = message.body.chars().take(PREVIEW_CHARS).collect();
            let payload = json!({
                "request_id": req.id,
                "message_id": message.id,
                "sender_id": user.id,
                "sender_name": user.name,
                "preview": preview,
            });
            self.ctx
                .notifications()
                .deliver(other, NotificationKind::MessageReceived, payload)
                .await;
        }

        Ok(message)
    }

    pub async fn history(
        &self,
        user: &User,
        request_id: &str,
        after: Option<DateTime<Utc>>,
        limit: Option<i64>,
    ) -> ServiceResult<Vec<Message>> {
        let req = self.ctx.requests().load(request_id).await?;
        self.ensure_can_read(user, &req)?;

        let limit = limit.unwrap_or(DEFAULT_HISTORY).clamp(1, MAX_HISTORY);
        Ok(self
            .ctx
            .db
            .messages()
            .list_for_request(&req.id, after, limit)
            .await?)
    }

    /// Participants and admins may read a request's chat and join its room.
    pub fn ensure_can_read(&self, user: &User, req: &HelpRequest) -> ServiceResult<()> {
        if req.is_participant(&user.id) || user.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::forbidden("not a participant of this request"))
        }
    }
}
