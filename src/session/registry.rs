use super::config::SessionConfig;
use super::session::StreamingSession;
use super::sink::OutboundSink;
use super::stats::SessionStats;
use crate::recognition::RecognitionBackend;
use anyhow::Result;
use bytes::Bytes;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Opaque identity of one live client connection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Mint a fresh identity for a newly accepted connection
    pub fn generate() -> Self {
        Self(format!("conn-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Active streaming sessions (connection → session)
///
/// Lookups, inserts and removals on different connections do not block each
/// other. Session operations are awaited on a cloned handle, never while a map
/// shard is locked.
pub struct SessionRegistry {
    sessions: DashMap<ConnectionId, StreamingSession>,
    backend: Arc<dyn RecognitionBackend>,
    config: SessionConfig,
}

impl SessionRegistry {
    pub fn new(backend: Arc<dyn RecognitionBackend>, config: SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            backend,
            config,
        }
    }

    /// Create and start a session for a newly opened connection
    ///
    /// Only a failure to open the first upstream stream is returned; nothing
    /// is registered in that case.
    pub async fn on_connect(
        &self,
        connection_id: ConnectionId,
        sink: Arc<dyn OutboundSink>,
    ) -> Result<()> {
        info!(connection_id = %connection_id, "Client connected");

        let session = StreamingSession::new(
            connection_id.clone(),
            Arc::clone(&self.backend),
            self.config.clone(),
            sink,
        );

        session.start().await?;

        if let Some(replaced) = self.sessions.insert(connection_id.clone(), session) {
            warn!(connection_id = %connection_id, "Connection already had a session, replacing it");
            replaced.terminate().await;
        }

        Ok(())
    }

    /// Forward an inbound audio frame; unknown connections are ignored
    pub async fn on_audio(&self, connection_id: &ConnectionId, chunk: Bytes) {
        let session = self.sessions.get(connection_id).map(|entry| entry.value().clone());

        match session {
            Some(session) => session.write(chunk).await,
            None => {
                debug!(connection_id = %connection_id, "Audio for unknown connection, ignoring");
            }
        }
    }

    /// Forget and terminate the connection's session; no-op if absent
    pub async fn on_disconnect(&self, connection_id: &ConnectionId) {
        // Remove before terminating so no later frame can reach the session
        let removed = self.sessions.remove(connection_id);

        if let Some((_, session)) = removed {
            info!(connection_id = %connection_id, "Client disconnected");
            session.terminate().await;
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.sessions.contains_key(connection_id)
    }

    /// Statistics for one connection's session
    pub async fn stats(&self, connection_id: &ConnectionId) -> Option<SessionStats> {
        let session = self.sessions.get(connection_id).map(|entry| entry.value().clone())?;
        Some(session.stats().await)
    }

    /// Statistics for every active session
    pub async fn all_stats(&self) -> Vec<SessionStats> {
        let sessions: Vec<StreamingSession> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut stats = Vec::with_capacity(sessions.len());
        for session in sessions {
            stats.push(session.stats().await);
        }
        stats
    }

    /// Terminate every session (process shutdown)
    pub async fn shutdown(&self) {
        let ids: Vec<ConnectionId> = self.sessions.iter().map(|entry| entry.key().clone()).collect();

        info!("Shutting down {} session(s)", ids.len());

        for id in ids {
            self.on_disconnect(&id).await;
        }
    }
}
