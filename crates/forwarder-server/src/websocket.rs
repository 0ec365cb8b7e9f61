//! The `/ws` endpoint: per-connection receive loop and message dispatch.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        ConnectInfo, State, WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, interval_at};

use forwarder_protocol::{Message, codec};

use crate::config::ServerConfig;
use crate::registry::SessionRegistry;
use crate::results::{CommandResult, ResultStore};
use crate::session::{Registration, Session};

/// Interval between transport-level keep-alive pings.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Shared state for the `/ws` route.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub registry: Arc<SessionRegistry>,
    pub results: Arc<ResultStore>,
    pub shutdown: watch::Receiver<bool>,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
}

/// Drive one session end-to-end: register, receive, dispatch, clean up.
async fn handle_socket(socket: WebSocket, addr: SocketAddr, mut state: AppState) {
    if let Some(limit) = state.config.max_sessions {
        if state.registry.count().await >= limit {
            tracing::warn!("rejecting {addr}: session limit of {limit} reached");
            return;
        }
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Writer task: owns the sink, drains the session's queue, and pings
    // the peer so half-dead connections surface as transport errors.
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let send_task = tokio::spawn(async move {
        let mut ping = interval_at(Instant::now() + PING_INTERVAL, PING_INTERVAL);
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else { break };
                    let frame = codec::encode(&msg);
                    if ws_sender.send(WsMessage::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if ws_sender.send(WsMessage::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let session = Arc::new(Session::new(addr, tx));
    state.registry.register(Arc::clone(&session)).await;
    tracing::info!(
        "agent connected from {addr} ({} active)",
        state.registry.count().await
    );

    loop {
        let frame = tokio::select! {
            frame = ws_receiver.next() => frame,
            _ = state.shutdown.changed() => break,
        };

        let text = match frame {
            Some(Ok(WsMessage::Text(text))) => text,
            Some(Ok(WsMessage::Binary(data))) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s.into(),
                Err(_) => continue,
            },
            Some(Ok(WsMessage::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::warn!("transport error on {}: {e}", session.label());
                break;
            }
        };

        match codec::decode(&text) {
            Ok(msg) => dispatch(&session, msg, &state),
            // A bad frame never costs the connection.
            Err(e) => tracing::warn!("dropping frame from {}: {e}", session.label()),
        }
    }

    // Single cleanup path for every exit: peer close, transport error,
    // or server shutdown.
    state.registry.unregister(addr).await;
    send_task.abort();
    tracing::info!(
        "agent {} disconnected ({} active)",
        session.label(),
        state.registry.count().await
    );
}

/// Apply one decoded message to its session.
fn dispatch(session: &Session, msg: Message, state: &AppState) {
    match msg {
        Message::Register {
            plugin_id,
            tab_id,
            url,
            title,
            capabilities,
        } => {
            tracing::info!(
                "agent {} registered as {plugin_id} (tab {tab_id:?}, capabilities {capabilities:?})",
                session.addr()
            );
            session.set_registration(Registration {
                plugin_id: plugin_id.clone(),
                tab_id,
                url,
                title,
                capabilities,
            });
            let _ = session.send(Message::register_ack(
                plugin_id,
                state.config.heartbeat_interval,
            ));
        }
        Message::Heartbeat { .. } => {
            tracing::debug!("heartbeat from {}", session.label());
            let _ = session.send(Message::heartbeat_ack());
        }
        Message::Result {
            command_id,
            status,
            data,
            error,
        } => {
            tracing::info!("result for {command_id} from {}: {status}", session.label());
            state.results.push(CommandResult {
                reporter: session.label(),
                command_id,
                status,
                data,
                error,
            });
        }
        Message::Error { message } => {
            tracing::error!("agent {} reported an error: {message}", session.label());
        }
        Message::Unknown => {
            tracing::warn!("unrecognized message kind from {}", session.label());
        }
        // Server-to-agent kinds have no business arriving inbound.
        Message::RegisterAck { .. } | Message::HeartbeatAck { .. } | Message::Command { .. } => {
            tracing::warn!("unexpected outbound message kind from {}", session.label());
        }
    }
}
