use super::messages::{AudioFrameMessage, StreamErrorMessage, StreamStartMessage};
use crate::config::NatsConfig;
use crate::recognition::{
    ErrorInfo, OpenedStream, RecognitionBackend, RecognitionConfig, RecognitionStream,
    ResultEvent, StreamEvent,
};
use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use base64::Engine;
use bytes::Bytes;
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Recognition backend that relays streams through NATS
///
/// Per stream (identified by a fresh UUID):
/// - `<control>.start.<id>` receives the recognition request once
/// - `<audio>.<id>` receives audio chunks, then a final empty frame on close
/// - `<result>.<id>` carries result batches back
/// - `<error>.<id>` carries stream failures back
pub struct NatsRecognitionBackend {
    client: Client,
    config: NatsConfig,
}

impl NatsRecognitionBackend {
    /// Connect to NATS server
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        info!("Connecting to NATS at {}", config.url);

        let client = async_nats::connect(config.url.as_str())
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client, config })
    }
}

#[async_trait::async_trait]
impl RecognitionBackend for NatsRecognitionBackend {
    async fn open(&self, config: &RecognitionConfig) -> Result<OpenedStream> {
        let stream_id = uuid::Uuid::new_v4().to_string();

        // Subscribe before announcing the stream so no early result is missed
        let results = self
            .client
            .subscribe(format!("{}.{}", self.config.result_subject_prefix, stream_id))
            .await
            .context("Failed to subscribe to recognition results")?;
        let errors = self
            .client
            .subscribe(format!("{}.{}", self.config.error_subject_prefix, stream_id))
            .await
            .context("Failed to subscribe to recognition errors")?;

        let start = StreamStartMessage {
            stream_id: stream_id.clone(),
            config: config.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_vec(&start)?;
        let control_subject = format!("{}.start.{}", self.config.control_subject_prefix, stream_id);

        self.client
            .publish(control_subject, payload.into())
            .await
            .context("Failed to publish stream start")?;

        info!("Opened recognition stream {}", stream_id);

        let (tx, rx) = mpsc::channel(self.config.event_buffer);
        let closed = CancellationToken::new();
        tokio::spawn(forward_events(
            stream_id.clone(),
            results,
            errors,
            tx,
            closed.clone(),
        ));

        let stream = NatsRecognitionStream {
            client: self.client.clone(),
            audio_subject: format!("{}.{}", self.config.audio_subject_prefix, stream_id),
            stream_id,
            sequence: 0,
            closed,
        };

        Ok(OpenedStream {
            stream: Box::new(stream),
            events: rx,
        })
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Merge result and error subscriptions into one event channel
async fn forward_events(
    stream_id: String,
    mut results: Subscriber,
    mut errors: Subscriber,
    tx: mpsc::Sender<StreamEvent>,
    closed: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = closed.cancelled() => break,
            msg = results.next() => match msg {
                Some(msg) => match decode_result(&msg.payload) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Failed to parse recognition result on {}: {}", stream_id, e);
                        continue;
                    }
                },
                None => subscription_closed("result"),
            },
            msg = errors.next() => match msg {
                Some(msg) => decode_error(&msg.payload),
                None => subscription_closed("error"),
            },
        };

        let is_failure = matches!(event, StreamEvent::Failure(_));
        if tx.send(event).await.is_err() || is_failure {
            break;
        }
    }

    debug!("Event forwarding stopped for stream {}", stream_id);
}

/// A result payload that does not parse is skipped by the caller
fn decode_result(payload: &[u8]) -> serde_json::Result<StreamEvent> {
    serde_json::from_slice::<ResultEvent>(payload).map(StreamEvent::Result)
}

/// Every error payload is a failure; non-JSON payloads carry their raw text
fn decode_error(payload: &[u8]) -> StreamEvent {
    let message = match serde_json::from_slice::<StreamErrorMessage>(payload) {
        Ok(err) => err.message,
        Err(_) => String::from_utf8_lossy(payload).into_owned(),
    };
    StreamEvent::Failure(ErrorInfo::new(message))
}

fn subscription_closed(kind: &str) -> StreamEvent {
    StreamEvent::Failure(ErrorInfo::new(format!(
        "Recognition {} subscription closed",
        kind
    )))
}

/// Write/close handle of one NATS-relayed stream
pub struct NatsRecognitionStream {
    client: Client,
    stream_id: String,
    audio_subject: String,
    sequence: u64,
    closed: CancellationToken,
}

impl NatsRecognitionStream {
    async fn publish_frame(&mut self, audio: &[u8], is_final: bool) -> Result<()> {
        let message = AudioFrameMessage {
            stream_id: self.stream_id.clone(),
            sequence: self.sequence,
            audio: base64::engine::general_purpose::STANDARD.encode(audio),
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame: is_final,
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(self.audio_subject.clone(), payload.into())
            .await
            .context("Failed to publish audio frame")?;

        debug!(
            "Published audio frame to {} (seq={}, bytes={}, final={})",
            self.audio_subject,
            self.sequence,
            audio.len(),
            is_final
        );

        self.sequence += 1;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecognitionStream for NatsRecognitionStream {
    fn is_writable(&self) -> bool {
        !self.closed.is_cancelled()
            && matches!(
                self.client.connection_state(),
                async_nats::connection::State::Connected
            )
    }

    async fn write(&mut self, chunk: Bytes) -> Result<bool> {
        if self.closed.is_cancelled() {
            return Ok(false);
        }

        self.publish_frame(&chunk, false).await?;
        Ok(true)
    }

    async fn close(&mut self) {
        if self.closed.is_cancelled() {
            return;
        }

        // Stop forwarding first; dropping the subscribers unsubscribes
        self.closed.cancel();

        if let Err(e) = self.publish_frame(&[], true).await {
            warn!("Failed to send final frame for {}: {}", self.stream_id, e);
        }

        info!("Closed recognition stream {}", self.stream_id);
    }
}
