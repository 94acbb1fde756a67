//! Real-time conversation rooms over WebSocket
//!
//! Each socket joins any number of conversation rooms. Every event is
//! published on one broadcast channel; sockets forward only the events for
//! rooms they have joined.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::extract::ApiQuery;

const CHANNEL_CAPACITY: usize = 1024;

/// Event delivered to every socket in a conversation room
#[derive(Debug, Clone, Serialize)]
pub struct RoomEvent {
    pub conversation_id: String,
    pub event: String,
    pub data: Value,
}

impl RoomEvent {
    pub fn message_received<T: Serialize>(conversation_id: &str, message: &T) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            event: "message_received".to_string(),
            data: serde_json::to_value(message).unwrap_or(Value::Null),
        }
    }
}

/// Frames a client may send
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    JoinConversation { conversation_id: String },
    LeaveConversation { conversation_id: String },
    NewMessage { conversation_id: String, message: Value },
}

/// Frame sent to a client
#[derive(Debug, Serialize, PartialEq)]
pub struct ServerFrame {
    #[serde(rename = "type")]
    pub event: String,
    pub data: Value,
}

/// Shared WebSocket state
#[derive(Clone)]
pub struct WsState {
    tx: broadcast::Sender<RoomEvent>,
    connections: Arc<AtomicUsize>,
}

impl Default for WsState {
    fn default() -> Self {
        Self::new()
    }
}

impl WsState {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish an event to its room. Having no listeners is not an error.
    pub async fn broadcast_event(&self, event: RoomEvent) {
        let receivers = self.tx.send(event).unwrap_or(0);
        tracing::debug!(receivers, "room event broadcast");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.tx.subscribe()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }
}

/// Apply a client frame to the socket's room set.
///
/// Returns the direct reply for the client and an event to publish, if any.
/// Messages for rooms the socket has not joined are dropped.
pub fn handle_client_frame(
    rooms: &mut HashSet<String>,
    frame: ClientFrame,
) -> (Option<ServerFrame>, Option<RoomEvent>) {
    match frame {
        ClientFrame::JoinConversation { conversation_id } => {
            rooms.insert(conversation_id.clone());
            (
                Some(ServerFrame {
                    event: "joined_conversation".to_string(),
                    data: json!({ "conversation_id": conversation_id }),
                }),
                None,
            )
        }
        ClientFrame::LeaveConversation { conversation_id } => {
            rooms.remove(&conversation_id);
            (
                Some(ServerFrame {
                    event: "left_conversation".to_string(),
                    data: json!({ "conversation_id": conversation_id }),
                }),
                None,
            )
        }
        ClientFrame::NewMessage {
            conversation_id,
            message,
        } => {
            if !rooms.contains(&conversation_id) {
                return (
                    Some(ServerFrame {
                        event: "error".to_string(),
                        data: json!({ "message": "join the conversation first" }),
                    }),
                    None,
                );
            }
            (
                None,
                Some(RoomEvent {
                    conversation_id,
                    event: "message_received".to_string(),
                    data: message,
                }),
            )
        }
    }
}

/// Whether a socket in `rooms` should see `event`
pub fn should_deliver(rooms: &HashSet<String>, event: &RoomEvent) -> bool {
    rooms.contains(&event.conversation_id)
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade; requires `?token=<access token>`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<WsQuery>,
) -> Result<Response, ApiError> {
    let token = query
        .token
        .ok_or_else(|| ApiError::unauthorized("Missing authorization token"))?;
    let claims = state
        .auth_service
        .validate_access_token(&token)
        .await
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    let ws_state = state.ws_state.clone();
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, ws_state, claims.sub)))
}

async fn handle_socket(socket: WebSocket, state: WsState, user_id: Uuid) {
    state.connections.fetch_add(1, Ordering::Relaxed);
    tracing::info!(%user_id, connections = state.connection_count(), "websocket connected");

    let (mut sender, mut receiver) = socket.split();
    let mut events = state.subscribe();
    let mut rooms: HashSet<String> = HashSet::new();

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(WsMessage::Text(text))) => text,
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!(%user_id, "websocket receive error: {}", e);
                        break;
                    }
                };

                let frame = match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        let reply = ServerFrame {
                            event: "error".to_string(),
                            data: json!({ "message": format!("invalid frame: {}", e) }),
                        };
                        if send_frame(&mut sender, &reply).await.is_err() {
                            break;
                        }
                        continue;
                    }
                };

                let (reply, publish) = handle_client_frame(&mut rooms, frame);
                if let Some(reply) = reply {
                    if send_frame(&mut sender, &reply).await.is_err() {
                        break;
                    }
                }
                if let Some(event) = publish {
                    state.broadcast_event(event).await;
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) if should_deliver(&rooms, &event) => {
                        let frame = ServerFrame { event: event.event, data: event.data };
                        if send_frame(&mut sender, &frame).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%user_id, skipped, "websocket client lagging");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    state.connections.fetch_sub(1, Ordering::Relaxed);
    tracing::info!(%user_id, connections = state.connection_count(), "websocket disconnected");
}

async fn send_frame<S>(sender: &mut S, frame: &ServerFrame) -> Result<(), axum::Error>
where
    S: futures_util::Sink<WsMessage, Error = axum::Error> + Unpin,
{
    let text = serde_json::to_string(frame).unwrap_or_else(|_| "{}".to_string());
    sender.send(WsMessage::Text(text)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_then_leave() {
        let mut rooms = HashSet::new();
        let (reply, publish) = handle_client_frame(
            &mut rooms,
            ClientFrame::JoinConversation {
                conversation_id: "c1".into(),
            },
        );
        assert!(rooms.contains("c1"));
        assert_eq!(reply.unwrap().event, "joined_conversation");
        assert!(publish.is_none());

        let (reply, _) = handle_client_frame(
            &mut rooms,
            ClientFrame::LeaveConversation {
                conversation_id: "c1".into(),
            },
        );
        assert!(rooms.is_empty());
        assert_eq!(reply.unwrap().event, "left_conversation");
    }

    #[test]
    fn messages_require_membership() {
        let mut rooms = HashSet::new();
        let frame = ClientFrame::NewMessage {
            conversation_id: "c1".into(),
            message: json!({"content": "hi"}),
        };
        let (reply, publish) = handle_client_frame(&mut rooms, frame);
        assert_eq!(reply.unwrap().event, "error");
        assert!(publish.is_none());

        rooms.insert("c1".into());
        let frame = ClientFrame::NewMessage {
            conversation_id: "c1".into(),
            message: json!({"content": "hi"}),
        };
        let (_, publish) = handle_client_frame(&mut rooms, frame);
        let event = publish.unwrap();
        assert_eq!(event.event, "message_received");
        assert_eq!(event.data["content"], "hi");
    }

    #[test]
    fn delivery_is_filtered_by_room() {
        let rooms: HashSet<String> = ["c1".to_string()].into_iter().collect();
        assert!(should_deliver(&rooms, &RoomEvent::message_received("c1", &json!({}))));
        assert!(!should_deliver(&rooms, &RoomEvent::message_received("c2", &json!({}))));
    }

    #[test]
    fn parses_tagged_frames() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type": "join_conversation", "conversation_id": "abc"}"#)
                .unwrap();
        assert_eq!(
            frame,
            ClientFrame::JoinConversation {
                conversation_id: "abc".into()
            }
        );
    }

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let state = WsState::new();
        let mut rx = state.subscribe();
        state
            .broadcast_event(RoomEvent::message_received("c1", &json!({"id": 1})))
            .await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.conversation_id, "c1");
    }
}
