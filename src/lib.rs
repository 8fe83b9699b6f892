pub mod config;
pub mod http;
pub mod nats;
pub mod recognition;
pub mod session;

pub use config::Config;
pub use http::{create_router, AppState};
pub use nats::NatsRecognitionBackend;
pub use recognition::{
    ErrorInfo, OpenedStream, RecognitionBackend, RecognitionConfig, RecognitionStream,
    ResultEvent, StreamEvent,
};
pub use session::{
    ChannelSink, ConnectionId, OutboundMessage, OutboundSink, RetryPolicy, SessionConfig,
    SessionPhase, SessionRegistry, SessionStats, StreamingSession,
};
