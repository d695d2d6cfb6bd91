use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Waiting for a URL to summarize
    CollectingUrl,
    /// A page is loaded and queries are accepted
    Chatting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    /// Position in the transcript, fixed once assigned
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceState {
    pub listening: bool,
    pub partial_transcript: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechState {
    pub speaking: bool,
    /// Transcript index of the message being read aloud
    pub speaking_message_index: Option<usize>,
}

/// Everything a presentation layer needs to render the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub user_id: String,
    pub mode: Mode,
    pub original_url: String,
    pub page_content: String,
    pub summary: String,
    pub transcript: Vec<Message>,
    /// Current input-box text
    pub draft: String,
    pub voice: VoiceState,
    pub speech: SpeechState,
    pub voice_enabled: bool,
    pub speech_available: bool,
    pub cooldown_remaining_secs: u32,
    /// A summarize or chat call is in flight
    pub pending: bool,
    /// Last user-visible error, cleared when the next request is accepted
    pub banner: Option<String>,
}
