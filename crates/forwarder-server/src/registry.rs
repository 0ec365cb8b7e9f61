//! Concurrency-safe registry of live sessions.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::session::Session;

/// Set of live sessions, keyed by transport address.
///
/// A session is present exactly while its connection is open: handlers
/// register on accept and unregister on their single cleanup path. All
/// operations are safe under concurrent use from connection handlers and
/// the command dispatcher.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SocketAddr, Arc<Session>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session. Idempotent: re-registering an address replaces
    /// the entry.
    pub async fn register(&self, session: Arc<Session>) {
        self.sessions.write().await.insert(session.addr(), session);
    }

    /// Remove a session by transport address. No-op when absent.
    pub async fn unregister(&self, addr: SocketAddr) {
        self.sessions.write().await.remove(&addr);
    }

    /// An arbitrary live session, if any.
    ///
    /// Selection is intentionally unspecified; callers must not depend on
    /// which session comes back.
    pub async fn any_active(&self) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .await
            .values()
            .find(|s| s.is_alive())
            .cloned()
    }

    /// Number of registered sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use forwarder_protocol::Message;
    use tokio::sync::mpsc;

    use super::*;

    fn session_at(port: u16) -> (Arc<Session>, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let addr = format!("127.0.0.1:{port}").parse().unwrap();
        (Arc::new(Session::new(addr, tx)), rx)
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let registry = SessionRegistry::new();
        let (session, _rx) = session_at(9001);

        registry.register(Arc::clone(&session)).await;
        registry.register(session).await;
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_unregister_absent_is_noop() {
        let registry = SessionRegistry::new();
        registry.unregister("127.0.0.1:9001".parse().unwrap()).await;
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_register_then_unregister() {
        let registry = SessionRegistry::new();
        let (session, _rx) = session_at(9001);
        let addr = session.addr();

        registry.register(session).await;
        assert_eq!(registry.count().await, 1);

        registry.unregister(addr).await;
        assert_eq!(registry.count().await, 0);
        assert!(registry.any_active().await.is_none());
    }

    #[tokio::test]
    async fn test_any_active_empty_registry() {
        let registry = SessionRegistry::new();
        assert!(registry.any_active().await.is_none());
    }

    #[tokio::test]
    async fn test_any_active_skips_closed_sessions() {
        let registry = SessionRegistry::new();
        let (dead, dead_rx) = session_at(9001);
        let (live, _live_rx) = session_at(9002);
        drop(dead_rx);

        registry.register(dead).await;
        registry.register(Arc::clone(&live)).await;

        let picked = registry.any_active().await.unwrap();
        assert_eq!(picked.addr(), live.addr());
    }
}
