pub mod config;
pub mod cooldown;
pub mod error;
pub mod history;
pub mod http;
pub mod identity;
pub mod session;
pub mod speech;
pub mod transport;

pub use config::Config;
pub use cooldown::CooldownGovernor;
pub use error::SessionError;
pub use history::{HistoryMirror, HistoryView};
pub use http::{create_router, AppState};
pub use identity::{init_user_id, ClientStateStore, UserId};
pub use session::{ChatSession, Message, Mode, Role, SessionConfig, SessionSnapshot};
pub use speech::{
    DisabledSpeech, ProviderSpeech, RecognitionEvent, SpeechBackend, SpeechBackendFactory,
    SpeechDone, SpeechEngine, SpeechError,
};
pub use transport::{
    BackendClient, ChatRequest, HistoryEntry, HistoryRecord, HistoryStore, PageSummary,
    QueryService, TransportError,
};
