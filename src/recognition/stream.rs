use super::config::RecognitionConfig;
use anyhow::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tokio::sync::mpsc;

/// A batch of recognition results emitted by an upstream stream
///
/// Each entry is forwarded to the client as-is, so the fields are kept as raw
/// JSON (alternatives, isFinal, stability, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultEvent {
    #[serde(default)]
    pub results: Option<Vec<Map<String, Value>>>,
}

impl ResultEvent {
    pub fn new(results: Vec<Map<String, Value>>) -> Self {
        Self {
            results: Some(results),
        }
    }

    /// First result entry, if the event carries one
    pub fn first(&self) -> Option<&Map<String, Value>> {
        self.results.as_ref().and_then(|results| results.first())
    }
}

/// Stream-level failure reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Everything an upstream stream can report
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Result(ResultEvent),
    Failure(ErrorInfo),
}

/// Write/close handle of one upstream recognition stream
#[async_trait::async_trait]
pub trait RecognitionStream: Send {
    /// Whether the stream currently accepts audio
    fn is_writable(&self) -> bool;

    /// Send one audio chunk upstream
    ///
    /// Returns `Ok(false)` when the stream declined the chunk without failing.
    async fn write(&mut self, chunk: Bytes) -> Result<bool>;

    /// Close the stream. Must be safe to call more than once.
    async fn close(&mut self);
}

/// A freshly opened stream and the channel its events arrive on
pub struct OpenedStream {
    pub stream: Box<dyn RecognitionStream>,
    pub events: mpsc::Receiver<StreamEvent>,
}

/// Speech-recognition service that can open streaming calls
///
/// Implementations:
/// - `NatsRecognitionBackend`: relays through NATS subjects to the STT service
#[async_trait::async_trait]
pub trait RecognitionBackend: Send + Sync {
    /// Open a new bidirectional recognition stream
    async fn open(&self, config: &RecognitionConfig) -> Result<OpenedStream>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
