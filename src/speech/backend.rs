use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::SpeechSettings;

/// Errors reported by a speech backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeechError {
    #[error("Speech configuration not initialized")]
    NotConfigured,

    #[error("Voice recognition is already active")]
    AlreadyListening,

    #[error("Speech device unavailable: {0}")]
    Unavailable(String),

    #[error("Speech provider failed: {0}")]
    Failed(String),
}

/// Event delivered on the channel returned by [`SpeechBackend::start_recognition`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Best current hypothesis, superseded by the next event
    Partial(String),
    /// Final transcript; the recognizer is idle once this is delivered
    Final(String),
    /// Recognition ended with an error; the recognizer is idle
    Failed(SpeechError),
}

/// Completion callback for [`SpeechBackend::speak`]
pub type SpeechDone = Box<dyn FnOnce(Result<(), SpeechError>) + Send + 'static>;

/// External speech provider (continuous recognition + text-to-speech)
///
/// Implementations only talk to the device/service. Slot management
/// (one recognition, one synthesis, supersede-on-speak) lives in
/// [`super::ProviderSpeech`].
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Run one recognition pass
    ///
    /// Interim hypotheses go to `partials`; the returned string is the final
    /// transcript. Dropping the future must release the microphone.
    async fn recognize(&self, partials: mpsc::Sender<String>) -> Result<String, SpeechError>;

    /// Play `text` through the default output device until finished
    ///
    /// Dropping the future must stop playback.
    async fn synthesize(&self, text: &str) -> Result<(), SpeechError>;

    /// Engine name for logging
    fn name(&self) -> &str;
}

/// Speech capability as seen by the session
///
/// Variants:
/// - [`super::ProviderSpeech`]: credentials present and an engine linked
/// - [`super::DisabledSpeech`]: every operation is a safe no-op
pub trait SpeechBackend: Send + Sync {
    /// Begin continuous recognition
    ///
    /// Emits zero or more `Partial` events followed by exactly one terminal
    /// event on natural completion. Fails with `AlreadyListening` while a
    /// recognition is active.
    fn start_recognition(&self) -> Result<mpsc::Receiver<RecognitionEvent>, SpeechError>;

    /// Stop recognition; idempotent. The event channel closes without a
    /// terminal event.
    fn stop_recognition(&self);

    /// Speak `text`, cancelling any synthesis already in progress
    ///
    /// `on_done` runs exactly once unless this playback is superseded by a
    /// later `speak` or by `cancel_speech`. It is not invoked when `speak`
    /// itself returns an error.
    fn speak(&self, text: &str, on_done: SpeechDone) -> Result<(), SpeechError>;

    /// Stop any active synthesis without invoking its `on_done`; idempotent
    fn cancel_speech(&self);

    fn is_listening(&self) -> bool;

    fn is_speaking(&self) -> bool;

    /// Whether speech is usable at all
    fn is_available(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Speech backend factory
pub struct SpeechBackendFactory;

impl SpeechBackendFactory {
    /// Pick the speech variant for the given settings
    ///
    /// Both credentials and an engine are required for the configured
    /// variant; anything less yields [`super::DisabledSpeech`].
    pub fn create(
        settings: &SpeechSettings,
        engine: Option<Arc<dyn SpeechEngine>>,
    ) -> Arc<dyn SpeechBackend> {
        if !settings.credentials_present() {
            return Arc::new(super::DisabledSpeech::new("Speech configuration is missing"));
        }

        match engine {
            Some(engine) => {
                info!(
                    "Speech enabled via {} (voice={}, language={})",
                    engine.name(),
                    settings.voice_name,
                    settings.recognition_language
                );
                Arc::new(super::ProviderSpeech::new(engine))
            }
            None => {
                warn!("Speech credentials present but no speech engine is linked");
                Arc::new(super::DisabledSpeech::new("No speech engine available"))
            }
        }
    }
}
