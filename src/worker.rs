// src/worker.rs
//
// Lifecycle trait for the two background loops (serial monitor, egram
// streamer). Workers run a blocking loop on a dedicated thread, cancel
// cooperatively through a flag checked once per iteration, and `stop` awaits
// the join handle so the loop gets to observe the flag and exit.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Current state of a background loop
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum WorkerState {
    Stopped,
    Starting,
    Running,
    Paused,
    Error(String),
}

/// Trait for the link's background loops.
#[async_trait]
pub trait LinkWorker: Send + Sync {
    /// Start the loop on its own thread.
    async fn start(&mut self) -> Result<(), String>;

    /// Signal cancellation and wait for the loop to exit.
    async fn stop(&mut self) -> Result<(), String>;

    /// Pause the loop (if supported). The loop keeps running but stops
    /// reporting. Default implementation returns an error.
    async fn pause(&mut self) -> Result<(), String> {
        Err("This worker does not support pausing".to_string())
    }

    /// Resume from pause (if supported).
    async fn resume(&mut self) -> Result<(), String> {
        Err("This worker does not support pausing".to_string())
    }

    /// Get current state
    fn state(&self) -> WorkerState;
}
