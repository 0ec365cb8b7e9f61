//! Forwarder server binary.
//!
//! Listens for agent WebSocket connections and runs until interrupted.
//! Configuration comes from the environment; see
//! [`ServerConfig::from_env`].

use forwarder_server::{Server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        "starting forwarder on {} (heartbeat {}s)",
        config.addr(),
        config.heartbeat_interval
    );

    let server = Server::bind(config).await?;
    server
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("forwarder stopped");
    Ok(())
}
