use super::config::SessionConfig;
use super::state::{Message, Mode, Role, SessionSnapshot, SpeechState, VoiceState};
use crate::cooldown::CooldownGovernor;
use crate::error::SessionError;
use crate::history::{HistoryMirror, HistoryView};
use crate::identity::UserId;
use crate::speech::{RecognitionEvent, SpeechBackend, SpeechDone, SpeechError};
use crate::transport::{ChatRequest, HistoryEntry, HistoryRecord, PageSummary, QueryService, TransportError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Mutable session state, only ever touched under `Inner::state`
struct SessionState {
    mode: Mode,
    original_url: String,
    page_content: String,
    summary: String,
    transcript: Vec<Message>,
    draft: String,
    voice: VoiceState,
    speech: SpeechState,
    voice_enabled: bool,
    banner: Option<String>,
    in_flight: bool,
    /// Bumped by every reset; responses from an older epoch are dropped
    epoch: u64,
}

impl SessionState {
    fn new(voice_enabled: bool, epoch: u64) -> Self {
        Self {
            mode: Mode::CollectingUrl,
            original_url: String::new(),
            page_content: String::new(),
            summary: String::new(),
            transcript: Vec::new(),
            draft: String::new(),
            voice: VoiceState::default(),
            speech: SpeechState::default(),
            voice_enabled,
            banner: None,
            in_flight: false,
            epoch,
        }
    }

    fn push(&mut self, role: Role, text: impl Into<String>) -> usize {
        let index = self.transcript.len();
        self.transcript.push(Message {
            role,
            text: text.into(),
            index,
        });
        index
    }
}

struct Inner {
    user_id: UserId,
    config: SessionConfig,
    state: Mutex<SessionState>,
    snapshots: watch::Sender<SessionSnapshot>,
    queries: Arc<dyn QueryService>,
    history: HistoryMirror,
    speech: Arc<dyn SpeechBackend>,
    cooldown: CooldownGovernor,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot_of(&self, state: &SessionState) -> SessionSnapshot {
        SessionSnapshot {
            user_id: self.user_id.to_string(),
            mode: state.mode,
            original_url: state.original_url.clone(),
            page_content: state.page_content.clone(),
            summary: state.summary.clone(),
            transcript: state.transcript.clone(),
            draft: state.draft.clone(),
            voice: state.voice.clone(),
            speech: state.speech.clone(),
            voice_enabled: state.voice_enabled,
            speech_available: self.speech.is_available(),
            cooldown_remaining_secs: self.cooldown.seconds_remaining(),
            pending: state.in_flight,
            banner: state.banner.clone(),
        }
    }

    fn publish(&self, state: &SessionState) -> SessionSnapshot {
        debug_assert_eq!(
            state.mode == Mode::Chatting,
            !state.page_content.is_empty(),
            "chatting iff page content is loaded"
        );

        let snapshot = self.snapshot_of(state);
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }

    /// Show `err` as the banner and hand it back
    fn reject(&self, state: &mut SessionState, err: SessionError) -> SessionError {
        if err.is_local() {
            debug!("Rejected: {}", err);
        } else {
            warn!("Request failed: {}", err);
        }
        state.banner = Some(err.to_string());
        self.publish(state);
        err
    }

    fn admit_summarize(&self, state: &SessionState, url: &str) -> Result<(), SessionError> {
        if state.in_flight {
            return Err(SessionError::Busy);
        }
        if state.mode == Mode::Chatting {
            return Err(SessionError::Validation(
                "Reset the session before summarizing a new URL".to_string(),
            ));
        }
        if url.is_empty() {
            return Err(SessionError::Validation("Please enter a URL".to_string()));
        }
        if self.cooldown.is_blocked() {
            return Err(SessionError::Cooldown {
                remaining_secs: self.cooldown.seconds_remaining(),
            });
        }
        Ok(())
    }

    fn admit_query(&self, state: &SessionState, query: &str) -> Result<(), SessionError> {
        if state.in_flight {
            return Err(SessionError::Busy);
        }
        if state.mode != Mode::Chatting {
            return Err(SessionError::Validation(
                "Summarize a page before asking questions".to_string(),
            ));
        }
        if query.is_empty() {
            return Err(SessionError::Validation("Please enter a query".to_string()));
        }
        Ok(())
    }

    /// The backend rejects early resubmits with a "N seconds" message
    ///
    /// The local countdown is armed from that reply so the next attempt is
    /// refused without a round trip.
    fn summarize_failure(&self, err: TransportError) -> SessionError {
        let marker = format!("{} seconds", self.config.cooldown_secs);
        match &err {
            TransportError::Remote { message, .. } if message.contains(&marker) => {
                self.cooldown.arm(self.config.cooldown_secs);
                SessionError::Cooldown {
                    remaining_secs: self.config.cooldown_secs,
                }
            }
            _ => err.into(),
        }
    }

    /// Read transcript message `index` aloud, replacing any current playback
    fn speak(self: &Arc<Self>, state: &mut SessionState, index: usize) {
        if !state.voice_enabled || !self.speech.is_available() {
            return;
        }
        let Some(text) = state.transcript.get(index).map(|m| m.text.clone()) else {
            return;
        };

        let weak = Arc::downgrade(self);
        let on_done: SpeechDone = Box::new(move |outcome| {
            if let Some(inner) = weak.upgrade() {
                inner.finish_speech(index, outcome);
            }
        });

        match self.speech.speak(&text, on_done) {
            Ok(()) => {
                state.speech = SpeechState {
                    speaking: true,
                    speaking_message_index: Some(index),
                };
            }
            Err(e) => {
                warn!("Could not start speech playback: {}", e);
                Self::speech_failed(state, e);
            }
        }
    }

    fn finish_speech(&self, index: usize, outcome: Result<(), SpeechError>) {
        let mut state = self.lock();
        if state.speech.speaking_message_index == Some(index) {
            state.speech = SpeechState::default();
        }
        if let Err(e) = outcome {
            Self::speech_failed(&mut state, e);
        }
        self.publish(&state);
    }

    /// Show a playback failure; an unavailable device also turns read-aloud
    /// off until the user enables it again. Other failures retry next reply.
    fn speech_failed(state: &mut SessionState, err: SpeechError) {
        if matches!(err, SpeechError::Unavailable(_)) && state.voice_enabled {
            warn!("Read-aloud turned off: {}", err);
            state.voice_enabled = false;
        }
        state.banner = Some(SessionError::from(err).to_string());
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cooldown.cancel();
        self.speech.stop_recognition();
        self.speech.cancel_speech();
    }
}

/// Conversational session controller
///
/// Reconciles typed input, dictation, speech playback and backend calls into
/// one transcript. Cloning yields another handle to the same session.
///
/// Ordering: the user message is appended before the chat call is awaited,
/// the bot message only after it resolves, and a second call while one is
/// pending is rejected with [`SessionError::Busy`].
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

impl ChatSession {
    pub fn new(
        user_id: UserId,
        config: SessionConfig,
        queries: Arc<dyn QueryService>,
        history: HistoryMirror,
        speech: Arc<dyn SpeechBackend>,
    ) -> Self {
        let state = SessionState::new(config.voice_enabled, 0);
        let (snapshots, _) = watch::channel(SessionSnapshot {
            user_id: user_id.to_string(),
            mode: state.mode,
            original_url: String::new(),
            page_content: String::new(),
            summary: String::new(),
            transcript: Vec::new(),
            draft: String::new(),
            voice: VoiceState::default(),
            speech: SpeechState::default(),
            voice_enabled: state.voice_enabled,
            speech_available: speech.is_available(),
            cooldown_remaining_secs: 0,
            pending: false,
            banner: None,
        });

        info!(
            "Chat session for {} (speech: {})",
            user_id,
            speech.name()
        );

        Self {
            inner: Arc::new(Inner {
                user_id,
                config,
                state: Mutex::new(state),
                snapshots,
                queries,
                history,
                speech,
                cooldown: CooldownGovernor::new(),
            }),
        }
    }

    /// Summarize `url` and enter chat mode
    ///
    /// Seeds the transcript with the heading, the page content and the
    /// invitation, and speaks only the invitation.
    ///
    /// If the session is reset while the summary is pending, the summary is
    /// dropped and the returned snapshot is the fresh post-reset state.
    pub async fn submit_url(&self, url: &str) -> Result<SessionSnapshot, SessionError> {
        let inner = &self.inner;
        let url = url.trim().to_string();

        let epoch = {
            let mut state = inner.lock();
            if let Err(err) = inner.admit_summarize(&state, &url) {
                return Err(inner.reject(&mut state, err));
            }
            state.in_flight = true;
            state.banner = None;
            state.draft = url.clone();
            inner.publish(&state);
            state.epoch
        };

        info!("Summarizing {}", url);
        let outcome = inner.queries.summarize(&url).await;

        let mut state = inner.lock();
        if state.epoch != epoch {
            debug!("Discarding summary of {} after reset", url);
            return Ok(inner.publish(&state));
        }
        state.in_flight = false;

        let PageSummary {
            summary,
            page_content,
        } = match outcome {
            Ok(page) if !page.page_content.trim().is_empty() => page,
            Ok(_) => {
                let err =
                    SessionError::Transport("Summary response contained no page content".to_string());
                return Err(inner.reject(&mut state, err));
            }
            Err(e) => {
                let err = inner.summarize_failure(e);
                return Err(inner.reject(&mut state, err));
            }
        };

        state.mode = Mode::Chatting;
        state.original_url = url;
        state.page_content = page_content.clone();
        state.summary = summary;
        state.draft.clear();
        state.transcript.clear();
        state.push(Role::Bot, inner.config.summary_heading.clone());
        state.push(Role::Bot, page_content);
        let invitation = state.push(Role::Bot, inner.config.invitation.clone());

        inner.cooldown.arm(inner.config.cooldown_secs);
        inner.speak(&mut state, invitation);

        info!("Chatting about {}", state.original_url);
        Ok(inner.publish(&state))
    }

    /// Ask a question about the loaded page
    ///
    /// A reply that arrives after a reset is dropped; the returned snapshot
    /// is then the post-reset state with no reply in it.
    pub async fn submit_query(&self, text: &str) -> Result<SessionSnapshot, SessionError> {
        let inner = &self.inner;
        let query = text.trim().to_string();

        let (request, epoch) = {
            let mut state = inner.lock();
            if let Err(err) = inner.admit_query(&state, &query) {
                return Err(inner.reject(&mut state, err));
            }
            state.push(Role::User, query.clone());
            state.in_flight = true;
            state.banner = None;
            inner.publish(&state);

            let request = ChatRequest {
                url: state.original_url.clone(),
                page_content: state.page_content.clone(),
                query: query.clone(),
            };
            (request, state.epoch)
        };

        debug!("Sending query ({} chars)", query.len());
        let outcome = inner.queries.chat_query(&request).await;

        let mut state = inner.lock();
        if state.epoch != epoch {
            debug!("Discarding chat reply after reset");
            return Ok(inner.publish(&state));
        }
        state.in_flight = false;

        match outcome {
            Ok(reply) => {
                let index = state.push(Role::Bot, reply);
                state.draft.clear();

                inner.history.record(HistoryRecord {
                    user_id: inner.user_id.to_string(),
                    url: request.url,
                    page_content: request.page_content,
                    summary: state.summary.clone(),
                    queries: vec![query],
                });

                inner.speak(&mut state, index);
                Ok(inner.publish(&state))
            }
            Err(e) => {
                let err = SessionError::from(e);
                state.push(Role::Bot, format!("Error: {}", err));
                Err(inner.reject(&mut state, err))
            }
        }
    }

    /// Listen for one utterance and submit it like typed input
    ///
    /// The final transcript is trimmed and lower-cased. An empty result
    /// resubmits whatever was in the input box before dictation started, or
    /// fails with [`SessionError::NoCommand`] when that was empty too.
    /// Stopping dictation ends this call without submitting anything.
    pub async fn dictate(&self) -> Result<SessionSnapshot, SessionError> {
        let inner = &self.inner;

        let (mut events, epoch, pending_draft) = {
            let mut state = inner.lock();
            let events = match inner.speech.start_recognition() {
                Ok(events) => events,
                Err(e) => return Err(inner.reject(&mut state, e.into())),
            };

            // Our own playback would be picked up by the microphone
            inner.speech.cancel_speech();
            state.speech = SpeechState::default();
            state.voice = VoiceState {
                listening: true,
                partial_transcript: String::new(),
            };
            state.banner = None;
            inner.publish(&state);
            (events, state.epoch, state.draft.clone())
        };

        let mut outcome = None;
        while let Some(event) = events.recv().await {
            match event {
                RecognitionEvent::Partial(text) => {
                    let mut state = inner.lock();
                    if state.epoch != epoch || !state.voice.listening {
                        break;
                    }
                    state.voice.partial_transcript = text.clone();
                    state.draft = text;
                    inner.publish(&state);
                }
                RecognitionEvent::Final(text) => {
                    outcome = Some(Ok(text));
                    break;
                }
                RecognitionEvent::Failed(e) => {
                    outcome = Some(Err(e));
                    break;
                }
            }
        }

        let (text, mode) = {
            let mut state = inner.lock();
            if state.epoch != epoch {
                return Ok(inner.publish(&state));
            }
            // A result already queued when dictation was stopped is ignored
            let stopped = !state.voice.listening;
            state.voice = VoiceState::default();

            let text = match outcome {
                _ if stopped => {
                    debug!("Dictation stopped; ignoring recognition result");
                    return Ok(inner.publish(&state));
                }
                None => {
                    debug!("Dictation stopped before a final result");
                    return Ok(inner.publish(&state));
                }
                Some(Err(e)) => return Err(inner.reject(&mut state, e.into())),
                Some(Ok(text)) => text.trim().to_lowercase(),
            };

            let text = if !text.is_empty() {
                text
            } else if !pending_draft.trim().is_empty() {
                pending_draft.trim().to_string()
            } else {
                state.draft.clear();
                return Err(inner.reject(&mut state, SessionError::NoCommand));
            };

            state.draft = text.clone();
            inner.publish(&state);
            (text, state.mode)
        };

        info!("Dictated {:?}", text);
        match mode {
            Mode::CollectingUrl => self.submit_url(&text).await,
            Mode::Chatting => self.submit_query(&text).await,
        }
    }

    /// Abort an active dictation; idempotent
    pub fn stop_dictation(&self) -> SessionSnapshot {
        let inner = &self.inner;
        inner.speech.stop_recognition();

        let mut state = inner.lock();
        state.voice = VoiceState::default();
        inner.publish(&state)
    }

    /// Replace the input-box text
    pub fn set_draft(&self, text: &str) -> SessionSnapshot {
        let mut state = self.inner.lock();
        state.draft = text.to_string();
        self.inner.publish(&state)
    }

    /// Turn reading replies aloud on or off; off also silences playback
    pub fn set_voice_enabled(&self, enabled: bool) -> SessionSnapshot {
        let inner = &self.inner;
        let mut state = inner.lock();
        state.voice_enabled = enabled;
        if !enabled {
            inner.speech.cancel_speech();
            state.speech = SpeechState::default();
        }
        inner.publish(&state)
    }

    /// Clear the page and transcript and return to URL collection
    ///
    /// Active recognition, playback and the cooldown countdown are all
    /// released.
    pub fn reset(&self) -> SessionSnapshot {
        let inner = &self.inner;
        inner.cooldown.cancel();
        inner.speech.stop_recognition();
        inner.speech.cancel_speech();

        let mut state = inner.lock();
        let voice_enabled = state.voice_enabled;
        let epoch = state.epoch + 1;
        *state = SessionState::new(voice_enabled, epoch);

        info!("Session reset");
        inner.publish(&state)
    }

    /// Release the cooldown timer, microphone and audio output
    pub fn shutdown(&self) {
        let inner = &self.inner;
        inner.cooldown.cancel();
        inner.speech.stop_recognition();
        inner.speech.cancel_speech();

        let mut state = inner.lock();
        state.voice = VoiceState::default();
        state.speech = SpeechState::default();
        inner.publish(&state);
        info!("Session shut down");
    }

    pub async fn fetch_history(&self) -> Vec<HistoryEntry> {
        self.inner.history.fetch(self.inner.user_id.as_str()).await
    }

    pub async fn toggle_history(&self) -> HistoryView {
        self.inner.history.toggle(self.inner.user_id.as_str()).await
    }

    pub fn history_view(&self) -> HistoryView {
        self.inner.history.view()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.lock();
        self.inner.snapshot_of(&state)
    }

    /// Snapshots published after every transition
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshots.subscribe()
    }

    /// Cooldown seconds as they tick down
    pub fn subscribe_cooldown(&self) -> watch::Receiver<u32> {
        self.inner.cooldown.subscribe()
    }

    pub fn user_id(&self) -> &UserId {
        &self.inner.user_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }
}
