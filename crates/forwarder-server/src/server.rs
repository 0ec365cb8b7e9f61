//! Server bootstrap: bind the endpoint, accept connections, shut down
//! cleanly.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::dispatcher::CommandDispatcher;
use crate::registry::SessionRegistry;
use crate::results::ResultStore;
use crate::websocket::{AppState, ws_handler};

/// Fatal server errors. Everything else is recovered closer to where it
/// happens.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// The forwarder server: one WebSocket endpoint plus the background
/// command dispatcher.
pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    registry: Arc<SessionRegistry>,
    results: Arc<ResultStore>,
}

impl Server {
    /// Bind the listening endpoint.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] when the address cannot be bound;
    /// this is the one startup error that aborts the process.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let addr = config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            config: Arc::new(config),
            registry: Arc::new(SessionRegistry::new()),
            results: Arc::new(ResultStore::new()),
        })
    }

    /// The address the listener actually bound (relevant with port 0).
    ///
    /// # Errors
    /// Returns an error when the local address cannot be read back.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Registry of live sessions.
    #[must_use]
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Store of results reported by agents.
    #[must_use]
    pub fn results(&self) -> Arc<ResultStore> {
        Arc::clone(&self.results)
    }

    /// Serve until `shutdown` resolves, then stop the accept loop, every
    /// connection, and the dispatcher.
    ///
    /// # Errors
    /// Returns an error when the accept loop fails.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            shutdown.await;
            tracing::info!("shutdown signal received");
            let _ = stop_tx.send(true);
        });

        let state = AppState {
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
            results: Arc::clone(&self.results),
            shutdown: stop_rx.clone(),
        };

        let dispatcher =
            CommandDispatcher::new(Arc::clone(&self.registry), Arc::clone(&self.config));
        let dispatcher_task = tokio::spawn(dispatcher.run(stop_rx.clone()));

        let app = Router::new()
            .route("/ws", get(ws_handler))
            .layer(TraceLayer::new_for_http())
            // Agents connect from arbitrary extension origins.
            .layer(CorsLayer::permissive())
            .with_state(state);

        tracing::info!("listening on ws://{}/ws", self.listener.local_addr()?);

        let mut stop = stop_rx;
        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = stop.changed().await;
        })
        .await?;

        let _ = dispatcher_task.await;
        tracing::info!("server stopped");
        Ok(())
    }
}
