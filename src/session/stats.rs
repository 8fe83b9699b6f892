use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a streaming session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionPhase {
    /// First stream is being opened
    Starting,
    /// A live upstream stream is installed
    Active,
    /// Waiting to open a replacement stream (1-based attempt number)
    Reconnecting { attempt: u32 },
    /// Retries exhausted; writes are dropped until termination
    Failed,
    /// Terminated; absorbing
    Terminated,
}

/// Statistics about a streaming session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Connection the session serves
    pub connection_id: String,

    pub phase: SessionPhase,

    /// Reconnects scheduled so far
    pub retry_count: u32,

    /// Upstream streams opened, including the first one
    pub streams_started: u64,

    /// Audio chunks accepted by an upstream stream
    pub chunks_written: u64,

    /// Transcript messages sent to the client
    pub results_delivered: u64,

    /// Error messages sent to the client
    pub errors_delivered: u64,

    /// When the connection opened
    pub connected_at: DateTime<Utc>,
}
