//! HTTP API for a presentation layer
//!
//! This module exposes the chat session over a local REST API:
//! - GET /session, GET /session/events - snapshot and its SSE feed
//! - POST /session/url, /session/query, /session/draft - input
//! - POST /session/dictate, /session/dictate/stop, /session/voice - voice
//! - POST /session/reset - start over
//! - GET /history, POST /history/toggle - query history
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
