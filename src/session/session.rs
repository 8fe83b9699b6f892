use super::config::SessionConfig;
use super::registry::ConnectionId;
use super::sink::{OutboundMessage, OutboundSink};
use super::stats::{SessionPhase, SessionStats};
use crate::recognition::{
    ErrorInfo, RecognitionBackend, RecognitionStream, ResultEvent, StreamEvent,
};
use anyhow::{Context, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One recognition conversation for one client connection
///
/// Owns at most one live upstream stream at a time. When the stream fails the
/// session reports the error to the client, closes the stream and reopens a
/// fresh one after an exponential backoff, up to `RetryPolicy::max_retries`
/// times. Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct StreamingSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    connection_id: ConnectionId,
    backend: Arc<dyn RecognitionBackend>,
    config: SessionConfig,
    sink: Arc<dyn OutboundSink>,
    connected_at: DateTime<Utc>,

    /// Serialises write, close and replace of the current stream
    state: Mutex<SessionState>,

    /// Cancelled on terminate; stops event pumps and pending reconnects
    shutdown: CancellationToken,
}

struct SessionState {
    current: Option<ActiveStream>,
    generation: u64,
    retry_count: u32,
    terminated: bool,
    phase: SessionPhase,
    streams_started: u64,
    chunks_written: u64,
    results_delivered: u64,
    errors_delivered: u64,
}

/// Installed stream, tagged so late events from replaced streams can be told apart
struct ActiveStream {
    generation: u64,
    stream: Box<dyn RecognitionStream>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            current: None,
            generation: 0,
            retry_count: 0,
            terminated: false,
            phase: SessionPhase::Starting,
            streams_started: 0,
            chunks_written: 0,
            results_delivered: 0,
            errors_delivered: 0,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.current.as_ref().map(|active| active.generation) == Some(generation)
    }
}

impl StreamingSession {
    /// Create a session; no upstream stream is opened until `start`
    pub fn new(
        connection_id: ConnectionId,
        backend: Arc<dyn RecognitionBackend>,
        config: SessionConfig,
        sink: Arc<dyn OutboundSink>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                connection_id,
                backend,
                config,
                sink,
                connected_at: Utc::now(),
                state: Mutex::new(SessionState::new()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Open an upstream stream and install it as the current one
    ///
    /// Any previously installed stream is closed first. Fails only if the
    /// backend cannot open the stream.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        self.inner.install_stream(&mut state).await
    }

    /// Forward an audio chunk to the current stream
    ///
    /// Dropped silently while terminated, reconnecting, failed, or when the
    /// stream is not writable. A write error is reported to the client and
    /// otherwise swallowed.
    pub async fn write(&self, chunk: Bytes) {
        let mut state = self.inner.state.lock().await;
        if state.terminated {
            debug!(connection_id = %self.inner.connection_id, "Session terminated, dropping audio");
            return;
        }

        let Some(active) = state.current.as_mut() else {
            debug!(connection_id = %self.inner.connection_id, "No live stream, dropping audio");
            return;
        };

        if !active.stream.is_writable() {
            debug!(connection_id = %self.inner.connection_id, "Stream not writable, dropping audio");
            return;
        }

        let outcome = active.stream.write(chunk).await;
        match outcome {
            Ok(true) => state.chunks_written += 1,
            Ok(false) => {
                debug!(connection_id = %self.inner.connection_id, "Stream declined audio chunk");
            }
            Err(e) => {
                warn!(connection_id = %self.inner.connection_id, "Error writing to stream: {:#}", e);
                let message = e.to_string();
                let message = if message.is_empty() {
                    "Stream write error".to_string()
                } else {
                    message
                };
                self.inner.deliver_error(&mut state, message);
            }
        }
    }

    /// Stop the session for good
    ///
    /// Idempotent. Cancels a pending reconnect, closes the current stream and
    /// stops event delivery.
    pub async fn terminate(&self) {
        self.inner.shutdown.cancel();

        let mut state = self.inner.state.lock().await;
        if state.terminated {
            return;
        }

        state.terminated = true;
        state.phase = SessionPhase::Terminated;

        if let Some(mut active) = state.current.take() {
            active.stream.close().await;
        }

        info!(connection_id = %self.inner.connection_id, "Session terminated");
    }

    pub async fn is_terminated(&self) -> bool {
        self.inner.state.lock().await.terminated
    }

    /// Get current session statistics
    pub async fn stats(&self) -> SessionStats {
        let state = self.inner.state.lock().await;

        SessionStats {
            connection_id: self.inner.connection_id.to_string(),
            phase: state.phase,
            retry_count: state.retry_count,
            streams_started: state.streams_started,
            chunks_written: state.chunks_written,
            results_delivered: state.results_delivered,
            errors_delivered: state.errors_delivered,
            connected_at: self.inner.connected_at,
        }
    }
}

impl SessionInner {
    async fn install_stream(self: &Arc<Self>, state: &mut SessionState) -> Result<()> {
        if state.terminated {
            debug!(connection_id = %self.connection_id, "Session terminated, not opening stream");
            return Ok(());
        }

        if let Some(mut previous) = state.current.take() {
            previous.stream.close().await;
        }

        let opened = self
            .backend
            .open(&self.config.recognition)
            .await
            .context("Failed to open recognition stream")?;

        state.generation += 1;
        let generation = state.generation;

        state.current = Some(ActiveStream {
            generation,
            stream: opened.stream,
        });
        state.streams_started += 1;
        state.phase = SessionPhase::Active;

        tokio::spawn(Arc::clone(self).pump_events(generation, opened.events));

        info!(
            connection_id = %self.connection_id,
            generation,
            "Recognition stream started on {}",
            self.backend.name()
        );

        Ok(())
    }

    /// Relay one stream's events until it fails, closes, or the session ends
    fn pump_events(
        self: Arc<Self>,
        generation: u64,
        mut events: mpsc::Receiver<StreamEvent>,
    ) -> BoxFuture<'static, ()> {
        async move {
            loop {
                let event = tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => {
                            debug!(connection_id = %self.connection_id, generation, "Stream event channel closed");
                            break;
                        }
                    },
                };

                match event {
                    StreamEvent::Result(result) => self.on_result(generation, result).await,
                    StreamEvent::Failure(error) => {
                        self.on_failure(generation, error).await;
                        break;
                    }
                }
            }
        }
        .boxed()
    }

    async fn on_result(&self, generation: u64, event: ResultEvent) {
        let mut state = self.state.lock().await;
        if state.terminated || !state.is_current(generation) {
            debug!(connection_id = %self.connection_id, generation, "Dropping result from stale stream");
            return;
        }

        let Some(result) = event.first() else {
            debug!(connection_id = %self.connection_id, "Dropping result event without results");
            return;
        };

        let timestamp = Utc::now().timestamp_millis();
        self.sink.deliver(OutboundMessage::transcript(result, timestamp));
        state.results_delivered += 1;
    }

    async fn on_failure(self: &Arc<Self>, generation: u64, error: ErrorInfo) {
        let mut state = self.state.lock().await;
        if state.terminated || !state.is_current(generation) {
            debug!(
                connection_id = %self.connection_id,
                generation,
                "Ignoring failure from stale stream: {}",
                error
            );
            return;
        }

        warn!(connection_id = %self.connection_id, generation, "Recognition stream failed: {}", error);
        self.fail_current(&mut state, error).await;
    }

    /// Report the failure, close the current stream and schedule the next attempt
    async fn fail_current(self: &Arc<Self>, state: &mut SessionState, error: ErrorInfo) {
        self.deliver_error(state, error.message);

        if let Some(mut failed) = state.current.take() {
            failed.stream.close().await;
        }

        match self.config.retry.delay_for(state.retry_count) {
            Some(delay) => {
                state.retry_count += 1;
                let attempt = state.retry_count;
                state.phase = SessionPhase::Reconnecting { attempt };

                info!(
                    connection_id = %self.connection_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling recognition stream reconnect"
                );

                tokio::spawn(self.reconnect_after(delay, attempt));
            }
            None => {
                state.phase = SessionPhase::Failed;
                warn!(
                    connection_id = %self.connection_id,
                    retries = state.retry_count,
                    "Giving up on recognition stream, retries exhausted"
                );
            }
        }
    }

    fn reconnect_after(self: &Arc<Self>, delay: Duration, attempt: u32) -> BoxFuture<'static, ()> {
        let inner = Arc::clone(self);

        async move {
            tokio::select! {
                _ = inner.shutdown.cancelled() => {
                    debug!(connection_id = %inner.connection_id, attempt, "Reconnect cancelled");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let mut state = inner.state.lock().await;
            if state.terminated {
                return;
            }

            info!(connection_id = %inner.connection_id, attempt, "Retrying recognition stream");

            if let Err(e) = inner.install_stream(&mut state).await {
                warn!(connection_id = %inner.connection_id, attempt, "Reconnect failed: {:#}", e);
                inner
                    .fail_current(&mut state, ErrorInfo::new(format!("{:#}", e)))
                    .await;
            }
        }
        .boxed()
    }

    fn deliver_error(&self, state: &mut SessionState, message: String) {
        self.sink.deliver(OutboundMessage::error(message));
        state.errors_delivered += 1;
    }
}
