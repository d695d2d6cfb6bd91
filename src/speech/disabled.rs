use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::backend::{RecognitionEvent, SpeechBackend, SpeechDone, SpeechError};

/// Speech variant used when credentials or an engine are missing
///
/// Recognition and synthesis report `NotConfigured`; stop/cancel do nothing.
pub struct DisabledSpeech {
    reason: String,
}

impl DisabledSpeech {
    pub fn new(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("Speech disabled: {}", reason);
        Self { reason }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl SpeechBackend for DisabledSpeech {
    fn start_recognition(&self) -> Result<mpsc::Receiver<RecognitionEvent>, SpeechError> {
        debug!("Recognition requested while speech is disabled");
        Err(SpeechError::NotConfigured)
    }

    fn stop_recognition(&self) {}

    fn speak(&self, _text: &str, _on_done: SpeechDone) -> Result<(), SpeechError> {
        Err(SpeechError::NotConfigured)
    }

    fn cancel_speech(&self) {}

    fn is_listening(&self) -> bool {
        false
    }

    fn is_speaking(&self) -> bool {
        false
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "disabled"
    }
}
