use serde::{Deserialize, Serialize};

use crate::config::SessionSettings;

/// First bot message after a successful summarize
pub const SUMMARY_HEADING: &str = "Summary of the page:";

/// Closing bot message of the preamble; the only preamble line spoken aloud
pub const INVITATION_PROMPT: &str = "I have summarized the page. What would you like to know?";

/// Configuration for a chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds the summarize endpoint stays blocked after a summary
    /// Default: 20
    pub cooldown_secs: u32,

    /// Speak bot replies when a speech backend is available
    pub voice_enabled: bool,

    pub summary_heading: String,

    pub invitation: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 20,
            voice_enabled: true,
            summary_heading: SUMMARY_HEADING.to_string(),
            invitation: INVITATION_PROMPT.to_string(),
        }
    }
}

impl From<&SessionSettings> for SessionConfig {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            cooldown_secs: settings.cooldown_secs,
            voice_enabled: settings.voice_enabled,
            ..Self::default()
        }
    }
}
