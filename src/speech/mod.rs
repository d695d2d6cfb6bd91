//! Speech capability adapter
//!
//! Wraps an external continuous-recognition / text-to-speech provider behind
//! [`SpeechBackend`]:
//! - at most one recognition and one synthesis active at a time
//! - a new `speak` cancels the previous one (never queued)
//! - a disabled variant when credentials are absent

mod backend;
mod disabled;
mod provider;

pub use backend::{
    RecognitionEvent, SpeechBackend, SpeechBackendFactory, SpeechDone, SpeechEngine, SpeechError,
};
pub use disabled::DisabledSpeech;
pub use provider::ProviderSpeech;
