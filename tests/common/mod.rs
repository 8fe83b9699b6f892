// Test doubles shared by the integration tests
//
// ScriptedBackend opens in-process streams whose writes, closes and events
// are fully observable; CollectingSink records every outbound message.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use bytes::Bytes;
use loqa_speech_gateway::{
    ConnectionId, ErrorInfo, OpenedStream, OutboundMessage, OutboundSink, RecognitionBackend,
    RecognitionConfig, RecognitionStream, ResultEvent, SessionConfig, StreamEvent,
    StreamingSession,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Observable side of one opened stream
#[derive(Clone)]
pub struct StreamHandle {
    events: mpsc::Sender<StreamEvent>,
    writes: Arc<Mutex<Vec<Bytes>>>,
    close_calls: Arc<AtomicUsize>,
    writable: Arc<AtomicBool>,
    write_error: Arc<Mutex<Option<String>>>,
}

impl StreamHandle {
    /// Push an event as if the backend emitted it; ignored once the session stopped listening
    pub async fn emit(&self, event: StreamEvent) {
        let _ = self.events.send(event).await;
    }

    pub async fn emit_result(&self, result: Value) {
        let entry = result.as_object().cloned().unwrap_or_default();
        self.emit(StreamEvent::Result(ResultEvent::new(vec![entry])))
            .await;
    }

    pub async fn fail(&self, message: &str) {
        self.emit(StreamEvent::Failure(ErrorInfo::new(message))).await;
    }

    pub fn writes(&self) -> Vec<Bytes> {
        self.writes.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.close_calls() > 0
    }

    pub fn set_writable(&self, writable: bool) {
        self.writable.store(writable, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, message: &str) {
        *self.write_error.lock().unwrap() = Some(message.to_string());
    }
}

struct ScriptedStream {
    handle: StreamHandle,
}

#[async_trait::async_trait]
impl RecognitionStream for ScriptedStream {
    fn is_writable(&self) -> bool {
        self.handle.writable.load(Ordering::SeqCst) && !self.handle.is_closed()
    }

    async fn write(&mut self, chunk: Bytes) -> Result<bool> {
        if let Some(message) = self.handle.write_error.lock().unwrap().clone() {
            return Err(anyhow!(message));
        }

        self.handle.writes.lock().unwrap().push(chunk);
        Ok(true)
    }

    async fn close(&mut self) {
        self.handle.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Script {
    /// Failure emitted right after open, consumed per stream
    immediate_failures: VecDeque<String>,
    /// Emit this failure on every stream once `immediate_failures` is drained
    always_fail: Option<String>,
    /// Open errors returned instead of a stream, consumed per attempt
    open_errors: VecDeque<String>,
}

/// In-process recognition backend driven by the test
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
    handles: Mutex<Vec<StreamHandle>>,
    open_times: Mutex<Vec<Instant>>,
    open_attempts: AtomicUsize,
    configs: Mutex<Vec<RecognitionConfig>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every stream fails with `message` as soon as it opens
    pub fn fail_every_stream(&self, message: &str) {
        self.script.lock().unwrap().always_fail = Some(message.to_string());
    }

    /// The next `count` streams fail with `message` as soon as they open
    pub fn fail_next_streams(&self, count: usize, message: &str) {
        let mut script = self.script.lock().unwrap();
        for _ in 0..count {
            script.immediate_failures.push_back(message.to_string());
        }
    }

    /// The next `count` open calls return an error
    pub fn reject_next_opens(&self, count: usize, message: &str) {
        let mut script = self.script.lock().unwrap();
        for _ in 0..count {
            script.open_errors.push_back(message.to_string());
        }
    }

    /// Streams successfully opened so far
    pub fn opens(&self) -> usize {
        self.handles.lock().unwrap().len()
    }

    /// Open calls so far, including rejected ones
    pub fn open_attempts(&self) -> usize {
        self.open_attempts.load(Ordering::SeqCst)
    }

    pub fn open_times(&self) -> Vec<Instant> {
        self.open_times.lock().unwrap().clone()
    }

    pub fn stream(&self, index: usize) -> StreamHandle {
        self.handles.lock().unwrap()[index].clone()
    }

    pub fn last_stream(&self) -> StreamHandle {
        self.handles
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no stream opened yet")
    }

    pub fn total_writes(&self) -> usize {
        self.handles
            .lock()
            .unwrap()
            .iter()
            .map(|handle| handle.writes().len())
            .sum()
    }

    pub fn configs(&self) -> Vec<RecognitionConfig> {
        self.configs.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RecognitionBackend for ScriptedBackend {
    async fn open(&self, config: &RecognitionConfig) -> Result<OpenedStream> {
        self.open_attempts.fetch_add(1, Ordering::SeqCst);

        let failure = {
            let mut script = self.script.lock().unwrap();
            if let Some(message) = script.open_errors.pop_front() {
                return Err(anyhow!(message));
            }
            script
                .immediate_failures
                .pop_front()
                .or_else(|| script.always_fail.clone())
        };

        let (tx, rx) = mpsc::channel(16);
        let handle = StreamHandle {
            events: tx,
            writes: Arc::new(Mutex::new(Vec::new())),
            close_calls: Arc::new(AtomicUsize::new(0)),
            writable: Arc::new(AtomicBool::new(true)),
            write_error: Arc::new(Mutex::new(None)),
        };

        if let Some(message) = failure {
            handle
                .events
                .try_send(StreamEvent::Failure(ErrorInfo::new(message)))
                .expect("fresh channel has room");
        }

        self.configs.lock().unwrap().push(config.clone());
        self.open_times.lock().unwrap().push(Instant::now());
        self.handles.lock().unwrap().push(handle.clone());

        Ok(OpenedStream {
            stream: Box::new(ScriptedStream { handle }),
            events: rx,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Sink that records every delivered message
#[derive(Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<OutboundMessage>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                OutboundMessage::Error { error } => Some(error),
                _ => None,
            })
            .collect()
    }

    pub fn transcripts(&self) -> Vec<serde_json::Map<String, Value>> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                OutboundMessage::Transcript(fields) => Some(fields),
                _ => None,
            })
            .collect()
    }

    /// Wait until at least `count` messages arrived (or two seconds passed)
    pub async fn wait_for(&self, count: usize) -> Vec<OutboundMessage> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while self.count() < count && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.messages()
    }
}

impl OutboundSink for CollectingSink {
    fn deliver(&self, message: OutboundMessage) {
        self.messages.lock().unwrap().push(message);
    }
}

/// Let spawned session tasks drain their queues without moving the clock much
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub fn new_session(
    backend: &Arc<ScriptedBackend>,
    sink: &Arc<CollectingSink>,
) -> StreamingSession {
    StreamingSession::new(
        ConnectionId::from("conn-test"),
        backend.clone(),
        SessionConfig::default(),
        sink.clone(),
    )
}
