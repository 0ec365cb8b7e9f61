//! Server configuration.

use std::env;
use std::str::FromStr;

/// Runtime configuration for the forwarder server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host the listener binds to.
    pub host: String,
    /// Port the listener binds to.
    pub port: u16,
    /// Heartbeat interval advertised to agents, in seconds.
    ///
    /// Advisory only: the server never evicts a session for missing
    /// heartbeats, it relies on transport close to detect disconnection.
    pub heartbeat_interval: u64,
    /// Seconds between periodic command dispatches. `None` disables the
    /// periodic loop; commands can still be pushed on demand.
    pub command_interval: Option<u64>,
    /// Maximum number of concurrent sessions. `None` means unlimited.
    pub max_sessions: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            heartbeat_interval: 30,
            command_interval: Some(30),
            max_sessions: None,
        }
    }
}

impl ServerConfig {
    /// Build a configuration from the environment, falling back to the
    /// defaults for anything unset or unparsable.
    ///
    /// Recognized variables: `FORWARDER_HOST`, `FORWARDER_PORT`,
    /// `FORWARDER_HEARTBEAT_INTERVAL`, `FORWARDER_COMMAND_INTERVAL`
    /// (0 disables), `FORWARDER_MAX_SESSIONS` (0 means unlimited).
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("FORWARDER_HOST").unwrap_or(defaults.host),
            port: env_parse("FORWARDER_PORT").unwrap_or(defaults.port),
            heartbeat_interval: env_parse("FORWARDER_HEARTBEAT_INTERVAL")
                .unwrap_or(defaults.heartbeat_interval),
            command_interval: match env_parse::<u64>("FORWARDER_COMMAND_INTERVAL") {
                Some(0) => None,
                Some(secs) => Some(secs),
                None => defaults.command_interval,
            },
            max_sessions: match env_parse::<usize>("FORWARDER_MAX_SESSIONS") {
                Some(0) | None => defaults.max_sessions,
                Some(limit) => Some(limit),
            },
        }
    }

    /// The `host:port` pair the listener binds to.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
