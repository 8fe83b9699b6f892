use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Message sent back to a connected client
///
/// Serialises to either `{ ...resultFields, "timestamp": <epoch-millis> }`
/// or `{ "error": "<message>" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    Error { error: String },
    Transcript(Map<String, Value>),
}

impl OutboundMessage {
    /// Merge a result entry with its capture timestamp
    pub fn transcript(result: &Map<String, Value>, timestamp_ms: i64) -> Self {
        let mut fields = result.clone();
        fields.insert("timestamp".to_string(), Value::from(timestamp_ms));
        Self::Transcript(fields)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Per-connection outbound channel
///
/// Fire-and-forget: delivery failures are never reported back to the session.
pub trait OutboundSink: Send + Sync {
    fn deliver(&self, message: OutboundMessage);
}

/// Sink backed by a bounded tokio channel, drained by the transport
///
/// When the queue is full the newest message is dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<OutboundMessage>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl OutboundSink for ChannelSink {
    fn deliver(&self, message: OutboundMessage) {
        match self.tx.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(message)) => {
                warn!(is_error = message.is_error(), "Outbound queue full, dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Outbound channel closed, dropping message");
            }
        }
    }
}
