//! Fan-out store for results reported by agents.

use std::collections::VecDeque;
use std::sync::RwLock;

use serde_json::Value;
use tokio::sync::broadcast;

/// Most recent results kept for consumers that subscribe late.
const HISTORY_LIMIT: usize = 256;

/// A command outcome reported by an agent.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Identity of the reporting session (plugin id or address).
    pub reporter: String,
    /// Correlation id of the command this result answers.
    pub command_id: String,
    pub status: String,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl CommandResult {
    /// Whether the agent reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Result store with broadcast and history support.
///
/// The connection handler pushes every reported result here; any number
/// of downstream consumers subscribe for live results, and `recent`
/// serves whatever arrived before they did.
pub struct ResultStore {
    history: RwLock<VecDeque<CommandResult>>,
    sender: broadcast::Sender<CommandResult>,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            history: RwLock::new(VecDeque::with_capacity(32)),
            sender,
        }
    }

    /// Record a result and fan it out to live subscribers.
    pub fn push(&self, result: CommandResult) {
        let _ = self.sender.send(result.clone()); // live listeners
        let mut history = self.history.write().unwrap();
        if history.len() == HISTORY_LIMIT {
            history.pop_front();
        }
        history.push_back(result);
    }

    /// Receiver for live results.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CommandResult> {
        self.sender.subscribe()
    }

    /// Snapshot of recently reported results, oldest first.
    #[must_use]
    pub fn recent(&self) -> Vec<CommandResult> {
        self.history.read().unwrap().iter().cloned().collect()
    }
}
