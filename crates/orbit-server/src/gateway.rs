//! Real-time chat protocol.
//!
//! Each WebSocket connection is driven by a [`Connection`] that moves through
//! `Connecting -> Open -> Closed`. While open, every inbound frame is parsed
//! into an [`InboundFrame`]; chat frames are normalized, persisted through the
//! [`MessageStore`] and only then fanned out through the [`BroadcastHub`].
//! Nothing is ever sent back to the sender on failure: malformed frames,
//! empty bodies and store errors are logged and dropped, and the connection
//! stays open.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use orbit_shared::{ChannelId, ChatMessage, InboundFrame, OutboundEnvelope, ProtocolError};
use orbit_store::MessageStore;
use tracing::{debug, error, info, warn};

use crate::hub::{channel_queue, BroadcastHub, ChannelReceiver};

/// What happened to a single inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Stored and fanned out to `deliveries` channels.
    Broadcast {
        message: ChatMessage,
        deliveries: usize,
    },
    /// Chat frame without a usable body.
    Dropped,
    /// Recognized envelope with a `type` the gateway does not handle.
    Ignored,
    /// Not JSON, not an object, missing `type`, or a field of the wrong type.
    Malformed,
    /// Store or encoding failure.
    Failed,
    /// Frame arrived while the connection was not open.
    NotOpen,
}

/// Shared entry point for all real-time connections.
#[derive(Clone)]
pub struct ChatGateway {
    store: Arc<dyn MessageStore>,
    hub: BroadcastHub,
}

impl ChatGateway {
    pub fn new(store: Arc<dyn MessageStore>, hub: BroadcastHub) -> Self {
        Self { store, hub }
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Apply one parsed frame.
    pub async fn handle_frame(&self, frame: InboundFrame) -> FrameOutcome {
        let chat = match frame {
            InboundFrame::Chat(chat) => chat,
            InboundFrame::Unknown => return FrameOutcome::Ignored,
        };

        let Some(new_message) = chat.into_new_message() else {
            return FrameOutcome::Dropped;
        };

        let message = match self.store.create_message(new_message) {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "Failed to store chat message");
                return FrameOutcome::Failed;
            }
        };

        match self
            .hub
            .broadcast_envelope(&OutboundEnvelope::Chat(message.clone()))
            .await
        {
            Ok(deliveries) => FrameOutcome::Broadcast {
                message,
                deliveries,
            },
            Err(e) => {
                error!(id = %message.id, error = %e, "Failed to encode chat envelope");
                FrameOutcome::Failed
            }
        }
    }

    /// Drive one upgraded socket until the peer goes away.
    pub async fn serve_socket(self, socket: WebSocket, peer: SocketAddr) {
        let mut connection = Connection::new(self);
        let Some(mut outbound) = connection.open().await else {
            return;
        };
        let channel = connection.id();
        info!(channel = %channel, peer = %peer, "WebSocket connection opened");

        let (mut sink, mut stream) = socket.split();

        let writer = tokio::spawn(async move {
            while let Some(frame) = outbound.recv().await {
                if sink.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
        });

        while let Some(result) = stream.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    connection.on_text(&text).await;
                }
                Ok(Message::Binary(data)) => {
                    connection.on_binary(&data).await;
                }
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Err(e) => {
                    debug!(channel = %channel, error = %e, "WebSocket transport error");
                    break;
                }
            }
        }

        connection.close().await;
        writer.abort();
        info!(
            channel = %channel,
            peer = %peer,
            state = ?connection.state(),
            "WebSocket connection closed"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// One client's real-time channel.
pub struct Connection {
    id: ChannelId,
    state: ConnectionState,
    gateway: ChatGateway,
}

impl Connection {
    pub fn new(gateway: ChatGateway) -> Self {
        Self {
            id: ChannelId::new(),
            state: ConnectionState::Connecting,
            gateway,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Register with the hub and return the outbound queue. Only valid from
    /// `Connecting`; a second call returns `None`.
    pub async fn open(&mut self) -> Option<ChannelReceiver> {
        if self.state != ConnectionState::Connecting {
            return None;
        }
        let (tx, rx) = channel_queue();
        self.gateway.hub.register(self.id, tx).await;
        self.state = ConnectionState::Open;
        Some(rx)
    }

    pub async fn on_text(&self, text: &str) -> FrameOutcome {
        self.dispatch(InboundFrame::parse(text)).await
    }

    pub async fn on_binary(&self, data: &[u8]) -> FrameOutcome {
        self.dispatch(InboundFrame::parse_bytes(data)).await
    }

    async fn dispatch(&self, parsed: Result<InboundFrame, ProtocolError>) -> FrameOutcome {
        if self.state != ConnectionState::Open {
            return FrameOutcome::NotOpen;
        }

        let frame = match parsed {
            Ok(frame) => frame,
            Err(e) => {
                warn!(channel = %self.id, error = %e, "Dropping malformed frame");
                return FrameOutcome::Malformed;
            }
        };

        let outcome = self.gateway.handle_frame(frame).await;
        match &outcome {
            FrameOutcome::Broadcast {
                message,
                deliveries,
            } => debug!(
                channel = %self.id,
                id = %message.id,
                deliveries,
                "Chat message broadcast"
            ),
            FrameOutcome::Dropped => debug!(channel = %self.id, "Dropping chat frame without body"),
            FrameOutcome::Ignored => debug!(channel = %self.id, "Ignoring unrecognized frame type"),
            _ => {}
        }
        outcome
    }

    /// Unregister from the hub. Terminal and idempotent.
    pub async fn close(&mut self) {
        if self.state == ConnectionState::Open {
            self.gateway.hub.unregister(&self.id).await;
        }
        self.state = ConnectionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use orbit_shared::NewChatMessage;
    use orbit_store::{MemoryMessageStore, MemorySearchStore, StoreError};
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
    use tower::ServiceExt;

    use super::*;
    use crate::api::{build_router, AppState};
    use crate::config::ServerConfig;

    fn gateway_with_store() -> (ChatGateway, Arc<MemoryMessageStore>) {
        let store = Arc::new(MemoryMessageStore::new());
        let gateway = ChatGateway::new(store.clone(), BroadcastHub::new());
        (gateway, store)
    }

    async fn open_connection(gateway: &ChatGateway) -> (Connection, ChannelReceiver) {
        let mut connection = Connection::new(gateway.clone());
        let rx = connection.open().await.unwrap();
        (connection, rx)
    }

    struct FailingStore;

    impl MessageStore for FailingStore {
        fn create_message(&self, _new: NewChatMessage) -> orbit_store::Result<ChatMessage> {
            Err(StoreError::LockPoisoned("messages"))
        }

        fn list_messages(&self, _limit: usize) -> orbit_store::Result<Vec<ChatMessage>> {
            Err(StoreError::LockPoisoned("messages"))
        }
    }

    #[tokio::test]
    async fn test_connection_lifecycle() {
        let (gateway, _store) = gateway_with_store();
        let mut connection = Connection::new(gateway.clone());
        assert_eq!(connection.state(), ConnectionState::Connecting);

        let _rx = connection.open().await.unwrap();
        assert_eq!(connection.state(), ConnectionState::Open);
        assert_eq!(gateway.hub().channel_count().await, 1);
        assert!(connection.open().await.is_none());

        connection.close().await;
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert_eq!(gateway.hub().channel_count().await, 0);

        connection.close().await;
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert!(connection.open().await.is_none());
    }

    #[tokio::test]
    async fn test_frames_rejected_unless_open() {
        let (gateway, store) = gateway_with_store();
        let mut connection = Connection::new(gateway);

        let frame = r#"{"type":"chat","message":"early"}"#;
        assert_eq!(connection.on_text(frame).await, FrameOutcome::NotOpen);

        let _rx = connection.open().await.unwrap();
        connection.close().await;
        assert_eq!(connection.on_text(frame).await, FrameOutcome::NotOpen);
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_chat_frame_is_stored_and_broadcast_to_all() {
        let (gateway, store) = gateway_with_store();
        let (sender, mut sender_rx) = open_connection(&gateway).await;
        let (_other, mut other_rx) = open_connection(&gateway).await;

        let outcome = sender
            .on_text(r#"{"type":"chat","userId":"u-1","username":"Taro","message":"hello"}"#)
            .await;

        let FrameOutcome::Broadcast {
            message,
            deliveries,
        } = outcome
        else {
            panic!("expected broadcast, got {outcome:?}");
        };
        assert_eq!(deliveries, 2);
        assert_eq!(store.list_messages(50).unwrap(), vec![message.clone()]);

        let expected = OutboundEnvelope::Chat(message).to_json().unwrap();
        assert_eq!(sender_rx.try_recv().unwrap(), expected);
        assert_eq!(other_rx.try_recv().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_message_is_stored_before_broadcast() {
        let (gateway, store) = gateway_with_store();
        let (sender, mut rx) = open_connection(&gateway).await;

        let observer_store = store.clone();
        let observer = tokio::spawn(async move {
            let payload = rx.recv().await.unwrap();
            let envelope: OutboundEnvelope = serde_json::from_str(&payload).unwrap();
            let OutboundEnvelope::Chat(delivered) = envelope;
            let stored = observer_store.list_messages(50).unwrap();
            stored.iter().any(|m| m.id == delivered.id)
        });

        sender
            .on_text(r#"{"type":"chat","message":"ordered"}"#)
            .await;
        assert!(observer.await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_body_is_silently_dropped() {
        let (gateway, store) = gateway_with_store();
        let (connection, mut rx) = open_connection(&gateway).await;

        let outcome = connection
            .on_text(r#"{"type":"chat","username":"Taro"}"#)
            .await;
        assert_eq!(outcome, FrameOutcome::Dropped);
        assert_eq!(
            connection.on_text(r#"{"type":"chat","message":""}"#).await,
            FrameOutcome::Dropped
        );

        assert!(store.is_empty().unwrap());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_whitespace_body_is_stored_and_broadcast() {
        let (gateway, store) = gateway_with_store();
        let (connection, mut rx) = open_connection(&gateway).await;

        let outcome = connection
            .on_text(r#"{"type":"chat","message":"   "}"#)
            .await;
        let FrameOutcome::Broadcast { message, .. } = outcome else {
            panic!("expected broadcast, got {outcome:?}");
        };
        assert_eq!(message.message, "   ");
        assert_eq!(store.list_messages(50).unwrap(), vec![message.clone()]);
        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundEnvelope::Chat(message).to_json().unwrap()
        );
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_connection_open() {
        let (gateway, store) = gateway_with_store();
        let (connection, mut rx) = open_connection(&gateway).await;

        assert_eq!(connection.on_text("{not json").await, FrameOutcome::Malformed);
        assert_eq!(
            connection
                .on_text(r#"{"type":"chat","message":["x"]}"#)
                .await,
            FrameOutcome::Malformed
        );
        assert_eq!(
            connection.on_binary(&[0xc3, 0x28]).await,
            FrameOutcome::Malformed
        );
        assert_eq!(connection.state(), ConnectionState::Open);
        assert!(rx.try_recv().is_err());

        let outcome = connection
            .on_text(r#"{"type":"chat","message":"still here"}"#)
            .await;
        assert!(matches!(outcome, FrameOutcome::Broadcast { .. }));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_type_is_ignored() {
        let (gateway, store) = gateway_with_store();
        let (connection, mut rx) = open_connection(&gateway).await;

        let outcome = connection
            .on_text(r#"{"type":"presence","message":"hi"}"#)
            .await;
        assert_eq!(outcome, FrameOutcome::Ignored);
        assert!(store.is_empty().unwrap());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_anonymous_defaults_applied() {
        let (gateway, _store) = gateway_with_store();
        let (connection, _rx) = open_connection(&gateway).await;

        let outcome = connection
            .on_text(r#"{"type":"chat","message":"who am i"}"#)
            .await;
        let FrameOutcome::Broadcast { message, .. } = outcome else {
            panic!("expected broadcast");
        };
        assert_eq!(message.user_id, "anonymous");
        assert_eq!(message.username, "Anonymous");
    }

    #[tokio::test]
    async fn test_binary_frame_accepted() {
        let (gateway, store) = gateway_with_store();
        let (connection, _rx) = open_connection(&gateway).await;

        let outcome = connection
            .on_binary(br#"{"type":"chat","message":"bytes"}"#)
            .await;
        assert!(matches!(outcome, FrameOutcome::Broadcast { .. }));
        assert_eq!(store.list_messages(1).unwrap()[0].message, "bytes");
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed_without_broadcast() {
        let gateway = ChatGateway::new(Arc::new(FailingStore), BroadcastHub::new());
        let (connection, mut rx) = open_connection(&gateway).await;

        let outcome = connection
            .on_text(r#"{"type":"chat","message":"lost"}"#)
            .await;
        assert_eq!(outcome, FrameOutcome::Failed);
        assert_eq!(connection.state(), ConnectionState::Open);
        assert!(rx.try_recv().is_err());
    }

    // ---------------------------------------------------------------------
    // End-to-end over real sockets
    // ---------------------------------------------------------------------

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    const WAIT: Duration = Duration::from_secs(2);

    async fn spawn_server() -> (SocketAddr, AppState) {
        let state = AppState::new(
            ServerConfig::default(),
            Arc::new(MemoryMessageStore::new()),
            Arc::new(MemorySearchStore::new()),
        );
        let app = build_router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });
        (addr, state)
    }

    async fn wait_for_channels(state: &AppState, expected: usize) {
        tokio::time::timeout(WAIT, async {
            while state.hub.channel_count().await != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("hub never reached expected channel count");
    }

    async fn connect(addr: SocketAddr, state: &AppState) -> Client {
        let before = state.hub.channel_count().await;
        let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        wait_for_channels(state, before + 1).await;
        client
    }

    async fn next_json(client: &mut Client) -> serde_json::Value {
        let frame = tokio::time::timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for frame")
            .unwrap()
            .unwrap();
        serde_json::from_str(&frame.into_text().unwrap()).unwrap()
    }

    async fn get_messages(state: &AppState) -> serde_json::Value {
        let response = build_router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/chat/messages")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_two_clients_scenario() {
        let (addr, state) = spawn_server().await;
        let mut a = connect(addr, &state).await;
        let mut b = connect(addr, &state).await;

        a.send(WsMessage::Text(
            r#"{"type":"chat","username":"Taro","message":"hello"}"#.to_string(),
        ))
        .await
        .unwrap();

        let at_a = next_json(&mut a).await;
        let at_b = next_json(&mut b).await;
        assert_eq!(at_a, at_b);
        assert_eq!(at_a["type"], "chat");
        assert_eq!(at_a["data"]["username"], "Taro");
        assert_eq!(at_a["data"]["message"], "hello");
        assert!(at_a["data"]["id"].is_string());
        assert!(at_a["data"]["timestamp"].is_string());

        let history = get_messages(&state).await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], at_a["data"]);
    }

    #[tokio::test]
    async fn test_fan_out_to_three_channels_including_sender() {
        let (addr, state) = spawn_server().await;
        let mut clients = Vec::new();
        for _ in 0..3 {
            clients.push(connect(addr, &state).await);
        }

        clients[1]
            .send(WsMessage::Text(
                r#"{"type":"chat","message":"to everyone"}"#.to_string(),
            ))
            .await
            .unwrap();

        let mut payloads = Vec::new();
        for client in &mut clients {
            payloads.push(next_json(client).await);
        }
        assert!(payloads.iter().all(|p| p == &payloads[0]));

        for client in &mut clients {
            let extra = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
            assert!(extra.is_err(), "received more than one delivery");
        }
    }

    #[tokio::test]
    async fn test_closed_channel_gets_nothing() {
        let (addr, state) = spawn_server().await;
        let mut a = connect(addr, &state).await;
        let mut b = connect(addr, &state).await;
        let mut c = connect(addr, &state).await;

        c.close(None).await.unwrap();
        wait_for_channels(&state, 2).await;

        a.send(WsMessage::Text(
            r#"{"type":"chat","message":"after close"}"#.to_string(),
        ))
        .await
        .unwrap();

        assert_eq!(next_json(&mut a).await["data"]["message"], "after close");
        assert_eq!(next_json(&mut b).await["data"]["message"], "after close");
    }

    #[tokio::test]
    async fn test_http_create_does_not_broadcast() {
        let (addr, state) = spawn_server().await;
        let mut client = connect(addr, &state).await;

        let response = build_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat/messages")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"userId":"u-1","username":"Hanako","message":"via http"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let pushed = tokio::time::timeout(Duration::from_millis(300), client.next()).await;
        assert!(pushed.is_err(), "HTTP create must not push to channels");

        let history = get_messages(&state).await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["message"], "via http");
    }

    #[tokio::test]
    async fn test_malformed_frame_does_not_close_socket() {
        let (addr, state) = spawn_server().await;
        let mut client = connect(addr, &state).await;

        client
            .send(WsMessage::Text("definitely not json".to_string()))
            .await
            .unwrap();
        client
            .send(WsMessage::Text(
                r#"{"type":"chat","message":"recovered"}"#.to_string(),
            ))
            .await
            .unwrap();

        assert_eq!(next_json(&mut client).await["data"]["message"], "recovered");
        assert_eq!(state.hub.channel_count().await, 1);
    }
}
