//! HTTP surface of the gateway
//!
//! - GET /ws - WebSocket: binary audio in, JSON transcripts/errors out
//! - GET /sessions - Statistics for every active session
//! - GET /sessions/:id/status - Statistics for one session
//! - GET /health - Health check

mod handlers;
mod routes;
mod socket;
mod state;

pub use routes::create_router;
pub use state::AppState;
