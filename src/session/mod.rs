//! Chat session management
//!
//! This module provides the `ChatSession` controller that reconciles:
//! - URL submission and the summarize call (with cooldown)
//! - Typed and dictated queries against the chat endpoint
//! - Read-aloud playback of bot replies
//! - Query-history mirroring
//! into one transcript, published as `SessionSnapshot`s.

mod config;
mod session;
mod state;

pub use config::{SessionConfig, INVITATION_PROMPT, SUMMARY_HEADING};
pub use session::ChatSession;
pub use state::{Message, Mode, Role, SessionSnapshot, SpeechState, VoiceState};
