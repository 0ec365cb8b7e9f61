//! One live agent connection.

use std::net::SocketAddr;
use std::sync::RwLock;

use forwarder_protocol::Message;
use thiserror::Error;
use tokio::sync::mpsc;

/// Metadata reported by an agent in its registration handshake.
///
/// `capabilities` is recorded verbatim and never used to gate dispatch.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub plugin_id: String,
    pub tab_id: Option<u32>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub capabilities: Vec<String>,
}

/// Send-side failure: the connection's writer task is gone.
#[derive(Debug, Error)]
#[error("session {0} is closed")]
pub struct SessionClosed(pub SocketAddr);

/// One live connection.
///
/// Owned by its connection handler; the registry and the command
/// dispatcher hold references. The send handle is a queue into the
/// connection's writer task, so it is safe to use from the handler and
/// the dispatcher at the same time.
pub struct Session {
    addr: SocketAddr,
    tx: mpsc::UnboundedSender<Message>,
    registration: RwLock<Option<Registration>>,
}

impl Session {
    #[must_use]
    pub fn new(addr: SocketAddr, tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            addr,
            tx,
            registration: RwLock::new(None),
        }
    }

    /// Transport identifier: the peer's socket address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Queue a message for the connection's writer task.
    ///
    /// # Errors
    /// Returns [`SessionClosed`] once the connection has shut down.
    pub fn send(&self, msg: Message) -> Result<(), SessionClosed> {
        self.tx.send(msg).map_err(|_| SessionClosed(self.addr))
    }

    /// Whether the connection can still accept outbound messages.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Record a completed registration handshake. Registration is the only
    /// message that mutates session identity.
    pub fn set_registration(&self, registration: Registration) {
        *self.registration.write().unwrap() = Some(registration);
    }

    /// Agent-assigned id, present only after registration.
    #[must_use]
    pub fn plugin_id(&self) -> Option<String> {
        self.registration
            .read()
            .unwrap()
            .as_ref()
            .map(|r| r.plugin_id.clone())
    }

    /// Identity for logs: the plugin id when registered, the socket
    /// address otherwise.
    #[must_use]
    pub fn label(&self) -> String {
        self.plugin_id().unwrap_or_else(|| self.addr.to_string())
    }
}
