//! Persistent notifications, pushed live to the owner's user room.

use serde_json::Value;

use super::{ServiceContext, ServiceError, ServiceResult};
use crate::models::{Notification, NotificationKind, User};
use crate::realtime::{user_room, ServerEvent};

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 100;

pub struct NotificationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> NotificationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Store a notification and push `notification:new` to `user:<id>`.
    pub async fn send(
        &self,
        user_id: &str,
        kind: NotificationKind,
        payload: Value,
    ) -> ServiceResult<Notification> {
        let notification = Notification::new(user_id.to_string(), kind, payload);
        self.ctx.db.notifications().create(&notification).await?;
        self.ctx.hub.publish(
            &user_room(user_id),
            ServerEvent::NotificationNew(notification.clone()),
        );
        Ok(notification)
    }

    /// Like [`send`](Self::send), for side effects of a write that already
    /// committed: a failure is logged instead of failing the caller.
    pub async fn deliver(&self, user_id: &str, kind: NotificationKind, payload: Value) {
        if let Err(e) = self.send(user_id, kind, payload).await {
            tracing::warn!(
                "Failed to deliver {} notification to {}: {}",
                kind.as_str(),
                user_id,
                e
            );
        }
    }

    pub async fn list(
        &self,
        user: &User,
        unread_only: bool,
        limit: Option<i64>,
    ) -> ServiceResult<Vec<Notification>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        Ok(self
            .ctx
            .db
            .notifications()
            .list_for_user(&user.id, unread_only, limit)
            .await?)
    }

    pub async fn mark_read(&self, user: &User, id: &str) -> ServiceResult<()> {
        if self.ctx.db.notifications().mark_read(id, &user.id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound("notification"))
        }
    }

    pub async fn mark_all_read(&self, user: &User) -> ServiceResult<usize> {
        Ok(self.ctx.db.notifications().mark_all_read(&user.id).await?)
    }

    pub async fn unread_count(&self, user: &User) -> ServiceResult<i64> {
        Ok(self.ctx.db.notifications().unread_count(&user.id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{test_services, user};
    use serde_json::json;

    #[tokio::test]
    async fn test_send_persists_and_publishes() {
        let (ctx, _dir) = test_services().await;
        let ana = user(&ctx, "Ana").await;
        let mut rx = ctx.hub.subscribe(&user_room(&ana.id));

        let sent = ctx
            .notifications()
            .send(&ana.id, NotificationKind::ReviewReceived, json!({ "rating": 5 }))
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            ServerEvent::NotificationNew(n) => assert_eq!(n.id, sent.id),
            other => panic!("unexpected event {}", other.name()),
        }
        assert_eq!(ctx.notifications().unread_count(&ana).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_is_owner_scoped() {
        let (ctx, _dir) = test_services().await;
        let ana = user(&ctx, "Ana").await;
        let bia = user(&ctx, "Bia").await;
        let service = ctx.notifications();

        let n = service
            .send(&ana.id, NotificationKind::MessageReceived, json!({}))
            .await
            .unwrap();
        service
            .send(&ana.id, NotificationKind::MessageReceived, json!({}))
            .await
            .unwrap();

        assert!(matches!(
            service.mark_read(&bia, &n.id).await,
            Err(ServiceError::NotFound(_))
        ));
        service.mark_read(&ana, &n.id).await.unwrap();
        assert_eq!(service.unread_count(&ana).await.unwrap(), 1);
        assert_eq!(service.list(&ana, true, None).await.unwrap().len(), 1);
        assert_eq!(service.list(&ana, false, None).await.unwrap().len(), 2);

        assert_eq!(service.mark_all_read(&ana).await.unwrap(), 1);
        assert_eq!(service.unread_count(&ana).await.unwrap(), 0);
    }
}
