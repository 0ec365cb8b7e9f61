//! Background task pushing commands to whichever agent is connected.

use std::sync::Arc;
use std::time::Duration;

use forwarder_protocol::Message;
use serde_json::{Value, json};
use tokio::sync::watch;

use crate::config::ServerConfig;
use crate::registry::SessionRegistry;

/// Action issued by the periodic dispatch loop.
const DEFAULT_ACTION: &str = "dom_capture";

/// Pushes commands to an arbitrary connected agent, independent of any
/// single connection. Delivery is fire-and-forget: a failed send is
/// logged and never retried.
pub struct CommandDispatcher {
    registry: Arc<SessionRegistry>,
    config: Arc<ServerConfig>,
}

impl CommandDispatcher {
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>, config: Arc<ServerConfig>) -> Self {
        Self { registry, config }
    }

    /// Periodic dispatch loop; returns when `shutdown` fires.
    ///
    /// With the command interval disabled this just waits for shutdown,
    /// leaving [`dispatch`](Self::dispatch) as the only trigger.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let Some(secs) = self.config.command_interval else {
            let _ = shutdown.changed().await;
            return;
        };

        let mut ticker = tokio::time::interval(Duration::from_secs(secs));
        ticker.tick().await; // the first tick fires immediately
        loop {
            tokio::select! {
                _ = ticker.tick() => self.dispatch(DEFAULT_ACTION, json!({})).await,
                _ = shutdown.changed() => break,
            }
        }
    }

    /// Push one command with the given action to any connected agent.
    ///
    /// An empty registry is a warning, not an error; which session gets
    /// the command is deliberately unspecified.
    pub async fn dispatch(&self, action: &str, payload: Value) {
        let Some(session) = self.registry.any_active().await else {
            tracing::warn!("no connected agents, skipping command dispatch");
            return;
        };

        tracing::info!("dispatching `{action}` to {}", session.label());
        if let Err(e) = session.send(Message::command(action, payload)) {
            tracing::error!("command dispatch failed: {e}");
        }
    }
}
