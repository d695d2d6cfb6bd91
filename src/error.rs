use crate::speech::SpeechError;
use crate::transport::TransportError;

/// Errors surfaced by [`crate::session::ChatSession`]
///
/// `Display` is the banner text shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Empty input, or an operation not valid in the current mode
    #[error("{0}")]
    Validation(String),

    #[error("Please wait {remaining_secs} seconds between requests")]
    Cooldown { remaining_secs: u32 },

    #[error("A request is already in progress")]
    Busy,

    /// No response reached the client
    #[error("{0}")]
    Transport(String),

    /// Non-2xx response; `message` is the server body verbatim
    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("{0}")]
    Speech(SpeechError),

    #[error("Speech configuration not initialized")]
    NotConfigured,

    /// Dictation finished without text and nothing was pending
    #[error("No command detected. Please say a URL or a question.")]
    NoCommand,
}

impl SessionError {
    /// Short machine-readable category
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Validation(_) => "validation",
            SessionError::Cooldown { .. } => "cooldown",
            SessionError::Busy => "busy",
            SessionError::Transport(_) => "transport",
            SessionError::Remote { .. } => "remote",
            SessionError::Speech(_) => "speech",
            SessionError::NotConfigured => "not_configured",
            SessionError::NoCommand => "no_command",
        }
    }

    /// Rejected before any network call; the transcript is untouched
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            SessionError::Validation(_)
                | SessionError::Cooldown { .. }
                | SessionError::Busy
                | SessionError::NoCommand
        )
    }
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Remote { status, message } => SessionError::Remote { status, message },
            TransportError::Unreachable(message) => SessionError::Transport(message),
            e @ TransportError::InvalidResponse(_) => SessionError::Transport(e.to_string()),
        }
    }
}

impl From<SpeechError> for SessionError {
    fn from(err: SpeechError) -> Self {
        match err {
            SpeechError::NotConfigured => SessionError::NotConfigured,
            other => SessionError::Speech(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_message_is_verbatim() {
        let err: SessionError = TransportError::Remote {
            status: 500,
            message: "model unavailable".to_string(),
        }
        .into();

        assert_eq!(err.to_string(), "model unavailable");
        assert_eq!(err.kind(), "remote");
        assert!(!err.is_local());
    }

    #[test]
    fn test_cooldown_display() {
        let err = SessionError::Cooldown { remaining_secs: 7 };
        assert_eq!(err.to_string(), "Please wait 7 seconds between requests");
        assert!(err.is_local());
    }

    #[test]
    fn test_speech_not_configured_maps_to_own_variant() {
        let err: SessionError = SpeechError::NotConfigured.into();
        assert_eq!(err, SessionError::NotConfigured);

        let err: SessionError = SpeechError::AlreadyListening.into();
        assert!(matches!(err, SessionError::Speech(SpeechError::AlreadyListening)));
    }

    #[test]
    fn test_unreachable_maps_to_transport() {
        let err: SessionError = TransportError::Unreachable("connection refused".to_string()).into();
        assert_eq!(err, SessionError::Transport("connection refused".to_string()));
    }
}
