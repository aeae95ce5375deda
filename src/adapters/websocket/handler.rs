//! WebSocket transport: upgrade routes and the per-connection socket loop.
//!
//! One generic loop serves all three channel spaces. A `Channel`
//! implementation supplies the vocabulary (client/server event types), the
//! room manager owning its membership, and the event dispatch; the loop
//! owns framing, the outbound writer task, per-handler error isolation and
//! disconnect cleanup.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use http::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::domain::foundation::{Identity, RealtimeError};

use super::call::CallChannel;
use super::chat::ChatChannel;
use super::gateway::{ConnectParams, ConnectionGateway};
use super::notifications::NotificationChannel;
use super::rooms::{ConnectionId, RemovedConnection, RoomManager};

/// One channel space served by the generic socket loop.
#[async_trait]
pub trait Channel: Send + Sync + 'static {
    type ClientEvent: DeserializeOwned + Send;
    type ServerEvent: Serialize + Clone + Send + 'static;

    /// The room manager owning this space's membership.
    fn rooms(&self) -> &RoomManager<Self::ServerEvent>;

    /// The space's `error` frame.
    fn error_event(message: String) -> Self::ServerEvent;

    /// Dispatch one client frame. A returned error is converted into an
    /// `error` frame for the originating connection; it never reaches
    /// other connections or tears the socket down.
    async fn handle(
        &self,
        conn: ConnectionId,
        identity: &Identity,
        event: Self::ClientEvent,
    ) -> Result<(), RealtimeError>;

    /// Called once after the connection's memberships were removed.
    async fn on_disconnect(&self, conn: ConnectionId, removed: &RemovedConnection) {
        let _ = (conn, removed);
    }
}

/// Everything the upgrade routes need.
pub struct RealtimeApp {
    pub gateway: ConnectionGateway,
    pub chat: Arc<ChatChannel>,
    pub notifications: Arc<NotificationChannel>,
    pub call: Arc<CallChannel>,
}

/// The service's router: three channel routes plus a liveness probe.
pub fn router(app: Arc<RealtimeApp>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws/chat", get(ws_chat))
        .route("/ws/notifications", get(ws_notifications))
        .route("/ws/call", get(ws_call))
        .with_state(app)
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_chat(
    State(app): State<Arc<RealtimeApp>>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let identity = app.gateway.resolve(&params, &headers).await;
    let channel = Arc::clone(&app.chat);
    ws.on_upgrade(move |socket| serve_channel(channel, identity, socket))
}

async fn ws_notifications(
    State(app): State<Arc<RealtimeApp>>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let identity = app.gateway.resolve(&params, &headers).await;
    let channel = Arc::clone(&app.notifications);
    ws.on_upgrade(move |socket| serve_channel(channel, identity, socket))
}

async fn ws_call(
    State(app): State<Arc<RealtimeApp>>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let identity = app.gateway.resolve(&params, &headers).await;
    let channel = Arc::clone(&app.call);
    ws.on_upgrade(move |socket| serve_channel(channel, identity, socket))
}

/// Run one connection until the client goes away.
///
/// A writer task drains the connection's outbound queue; the reader loop
/// below dispatches inbound frames. Dropping out of either path funnels
/// into the same cleanup: memberships removed (which feeds the emptiness
/// signal) and the channel's disconnect hook.
pub async fn serve_channel<C: Channel>(channel: Arc<C>, identity: Identity, socket: WebSocket) {
    let conn = ConnectionId::new();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<C::ServerEvent>();
    channel
        .rooms()
        .register(conn, identity.clone(), outbound_tx)
        .await;
    info!(connection_id = %conn, identity = %identity, "connection opened");

    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    error!(error = %err, "outbound frame serialization failed");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = ws_rx.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(err) => {
                debug!(connection_id = %conn, error = %err, "transport error");
                break;
            }
        };

        match message {
            Message::Text(text) => {
                dispatch_frame(&channel, conn, &identity, &text).await;
            }
            Message::Close(_) => break,
            // Pings are answered by axum; binary frames are not part of
            // the protocol.
            _ => {}
        }
    }

    if let Some(removed) = channel.rooms().remove_connection(conn).await {
        channel.on_disconnect(conn, &removed).await;
    }
    writer.abort();
    info!(connection_id = %conn, "connection closed");
}

/// Parse and dispatch one inbound frame, converting any failure into an
/// `error` frame for this connection only.
async fn dispatch_frame<C: Channel>(
    channel: &Arc<C>,
    conn: ConnectionId,
    identity: &Identity,
    text: &str,
) {
    let event = match serde_json::from_str::<C::ClientEvent>(text) {
        Ok(event) => event,
        Err(err) => {
            debug!(connection_id = %conn, error = %err, "unparseable frame");
            channel
                .rooms()
                .send_to_connection(conn, C::error_event("Malformed event".to_string()))
                .await;
            return;
        }
    };

    if let Err(err) = channel.handle(conn, identity, event).await {
        match &err {
            RealtimeError::Internal(detail) => {
                error!(connection_id = %conn, detail = %detail, "handler failed");
            }
            other => {
                warn!(connection_id = %conn, error = %other, "event rejected");
            }
        }
        channel
            .rooms()
            .send_to_connection(conn, C::error_event(err.client_message()))
            .await;
    }
}
