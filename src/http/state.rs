use crate::session::SessionRegistry;
use std::sync::Arc;

/// Shared application state for HTTP and WebSocket handlers
#[derive(Clone)]
pub struct AppState {
    /// Active streaming sessions (connection → session)
    pub registry: Arc<SessionRegistry>,
    /// Per-connection outbound message bound
    pub outbound_queue: usize,
}

impl AppState {
    pub fn new(registry: Arc<SessionRegistry>, outbound_queue: usize) -> Self {
        Self {
            registry,
            outbound_queue,
        }
    }
}
