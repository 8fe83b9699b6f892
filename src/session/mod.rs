//! Streaming session management
//!
//! This module provides the per-connection `StreamingSession` and the
//! `SessionRegistry` that binds connections to sessions:
//! - One upstream recognition stream per connection
//! - Audio writes multiplexed onto the current stream
//! - Results and errors relayed to the connection's outbound sink
//! - Reconnect with exponential backoff after upstream failures

mod config;
mod registry;
mod session;
mod sink;
mod stats;

pub use self::config::{RetryPolicy, SessionConfig};
pub use registry::{ConnectionId, SessionRegistry};
pub use session::StreamingSession;
pub use sink::{ChannelSink, OutboundMessage, OutboundSink};
pub use stats::{SessionPhase, SessionStats};
