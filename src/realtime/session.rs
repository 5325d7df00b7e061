//! One WebSocket connection.
//!
//! A writer task owns the socket sink and drains an mpsc queue. Each room the
//! socket is in gets a forwarder task that copies events from the room's
//! broadcast channel into that queue, so a slow socket only ever lags its own
//! receivers.

use std::collections::HashMap;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::{request_room, user_room, ClientAction, Hub, ServerEvent};
use crate::models::User;
use crate::services::ServiceContext;

/// Events queued for the writer before forwarders start waiting.
const OUTBOUND_BUFFER: usize = 64;

/// Rooms a socket is in, each with its forwarder task.
struct Subscriptions {
    tasks: HashMap<String, JoinHandle<()>>,
    tx: mpsc::Sender<ServerEvent>,
}

impl Subscriptions {
    fn new(tx: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            tasks: HashMap::new(),
            tx,
        }
    }

    fn join(&mut self, hub: &Hub, room: String) {
        if self.tasks.contains_key(&room) {
            return;
        }
        let rx = hub.subscribe(&room);
        let task = tokio::spawn(forward(rx, room.clone(), self.tx.clone()));
        self.tasks.insert(room, task);
    }

    fn leave(&mut self, room: &str) -> bool {
        match self.tasks.remove(room) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    async fn reply(&self, event: ServerEvent) {
        let _ = self.tx.send(event).await;
    }

    /// Stop every forwarder and wait for them so their receivers are gone.
    async fn close(self) {
        for (_, task) in self.tasks {
            task.abort();
            let _ = task.await;
        }
    }
}

async fn forward(
    mut rx: broadcast::Receiver<ServerEvent>,
    room: String,
    tx: mpsc::Sender<ServerEvent>,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Socket fell behind in {}, skipped {} events", room, skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Apply one client text frame.
async fn handle_frame(text: &str, user: &User, ctx: &ServiceContext, subs: &mut Subscriptions) {
    let action: ClientAction = match serde_json::from_str(text) {
        Ok(action) => action,
        Err(e) => {
            subs.reply(ServerEvent::Error {
                message: format!("invalid frame: {}", e),
            })
            .await;
            return;
        }
    };

    match action {
        ClientAction::Ping => subs.reply(ServerEvent::Pong).await,
        ClientAction::Join { request_id } => {
            let allowed = match ctx.requests().load(&request_id).await {
                Ok(req) => ctx.chat().ensure_can_read(user, &req),
                Err(e) => Err(e),
            };
            match allowed {
                Ok(()) => {
                    subs.join(&ctx.hub, request_room(&request_id));
                    tracing::debug!("User {} joined request room {}", user.id, request_id);
                }
                Err(e) => {
                    subs.reply(ServerEvent::Error {
                        message: e.to_string(),
                    })
                    .await
                }
            }
        }
        ClientAction::Leave { request_id } => {
            subs.leave(&request_room(&request_id));
        }
    }
}

/// Drive a signed-in socket until the client goes away.
pub async fn run_session(socket: WebSocket, user: User, ctx: ServiceContext) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(OUTBOUND_BUFFER);

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Failed to encode {} event: {}", event.name(), e);
                    continue;
                }
            };
            if sink.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut subs = Subscriptions::new(tx);
    subs.join(&ctx.hub, user_room(&user.id));
    tracing::debug!("Socket opened for user {}", user.id);

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => handle_frame(&text, &user, &ctx, &mut subs).await,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Socket error for user {}: {}", user.id, e);
                break;
            }
        }
    }

    subs.close().await;
    writer.abort();
    let pruned = ctx.hub.prune();
    tracing::debug!("Socket closed for user {} ({} rooms pruned)", user.id, pruned);
}
