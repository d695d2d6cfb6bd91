// Test doubles shared by the integration tests
//
// FakeBackend stands in for the summarize/chat/history endpoints and
// ScriptedEngine for the external speech provider.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use so_assistant::{
    ChatRequest, ChatSession, HistoryEntry, HistoryMirror, HistoryRecord, HistoryStore,
    PageSummary, ProviderSpeech, QueryService, RecognitionEvent, SessionConfig, SpeechBackend,
    SpeechDone, SpeechEngine, SpeechError, TransportError, UserId,
};
use tokio::sync::{mpsc, Semaphore};

pub const TEST_URL: &str = "https://x/q/1";

/// Summarize/chat backend with scripted replies
///
/// When `gate` is set every call waits for a permit, so a test can hold a
/// request in flight.
pub struct FakeBackend {
    pub summary: Mutex<Result<PageSummary, TransportError>>,
    pub replies: Mutex<VecDeque<Result<String, TransportError>>>,
    pub gate: Option<Arc<Semaphore>>,
    pub summarize_calls: AtomicUsize,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            summary: Mutex::new(Ok(PageSummary {
                summary: "S".to_string(),
                page_content: "P".to_string(),
            })),
            replies: Mutex::new(VecDeque::new()),
            gate: None,
            summarize_calls: AtomicUsize::new(0),
            chat_requests: Mutex::new(Vec::new()),
        }
    }

    /// Calls block until `release` is called
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new()
        }
    }

    pub fn release(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }

    pub fn with_summary(self, summary: Result<PageSummary, TransportError>) -> Self {
        *self.summary.lock().unwrap() = summary;
        self
    }

    pub fn push_reply(&self, reply: Result<String, TransportError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn summarize_calls(&self) -> usize {
        self.summarize_calls.load(Ordering::SeqCst)
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.lock().unwrap().clone()
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl QueryService for FakeBackend {
    async fn summarize(&self, _url: &str) -> Result<PageSummary, TransportError> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        self.summary.lock().unwrap().clone()
    }

    async fn chat_query(&self, request: &ChatRequest) -> Result<String, TransportError> {
        self.chat_requests.lock().unwrap().push(request.clone());
        self.wait_gate().await;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("answer to {}", request.query)))
    }
}

/// History store that remembers writes and serves `entries`
#[derive(Default)]
pub struct FakeHistory {
    pub stored: Mutex<Vec<HistoryRecord>>,
    pub entries: Mutex<Vec<HistoryEntry>>,
    pub fail: bool,
}

impl FakeHistory {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn stored(&self) -> Vec<HistoryRecord> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryStore for FakeHistory {
    async fn store(&self, record: &HistoryRecord) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::Unreachable("history offline".to_string()));
        }
        self.stored.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn fetch(&self, user_id: &str) -> Result<Vec<HistoryEntry>, TransportError> {
        if self.fail {
            return Err(TransportError::Unreachable("history offline".to_string()));
        }
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }
}

pub fn history_entry(user_id: &str, url: &str, queries: &[&str]) -> HistoryEntry {
    HistoryEntry {
        user_id: user_id.to_string(),
        url: url.to_string(),
        page_content: "P".to_string(),
        summary: "S".to_string(),
        queries: queries.iter().map(|q| q.to_string()).collect(),
        timestamp: None,
    }
}

/// Speech provider driven by a script
///
/// `recognize` sends `partials`, waits `listen_for`, then returns
/// `final_text` (or `recognition_error`). `synthesize` waits `speak_for`.
pub struct ScriptedEngine {
    pub partials: Vec<String>,
    pub final_text: String,
    pub recognition_error: Option<SpeechError>,
    pub listen_for: Duration,
    pub speak_for: Duration,
    pub synthesis_error: Option<SpeechError>,
    pub spoken: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            partials: Vec::new(),
            final_text: String::new(),
            recognition_error: None,
            listen_for: Duration::from_millis(10),
            speak_for: Duration::from_secs(2),
            synthesis_error: None,
            spoken: Mutex::new(Vec::new()),
        }
    }

    pub fn hearing(mut self, partials: &[&str], final_text: &str) -> Self {
        self.partials = partials.iter().map(|p| p.to_string()).collect();
        self.final_text = final_text.to_string();
        self
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechEngine for ScriptedEngine {
    async fn recognize(&self, partials: mpsc::Sender<String>) -> Result<String, SpeechError> {
        for partial in &self.partials {
            let _ = partials.send(partial.clone()).await;
        }
        tokio::time::sleep(self.listen_for).await;
        match &self.recognition_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.final_text.clone()),
        }
    }

    async fn synthesize(&self, text: &str) -> Result<(), SpeechError> {
        self.spoken.lock().unwrap().push(text.to_string());
        tokio::time::sleep(self.speak_for).await;
        match &self.synthesis_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Speech backend whose recognition events are pushed by the test
///
/// `stop_recognition` leaves the channel open, as when a result was already
/// queued at the moment dictation was stopped.
#[derive(Default)]
pub struct ManualSpeech {
    events: Mutex<Option<mpsc::Sender<RecognitionEvent>>>,
}

impl ManualSpeech {
    pub fn deliver(&self, event: RecognitionEvent) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            tx.try_send(event).unwrap();
        }
    }
}

impl SpeechBackend for ManualSpeech {
    fn start_recognition(&self) -> Result<mpsc::Receiver<RecognitionEvent>, SpeechError> {
        let (tx, rx) = mpsc::channel(8);
        *self.events.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    fn stop_recognition(&self) {}

    fn speak(&self, _text: &str, _on_done: SpeechDone) -> Result<(), SpeechError> {
        Ok(())
    }

    fn cancel_speech(&self) {}

    fn is_listening(&self) -> bool {
        self.events.lock().unwrap().is_some()
    }

    fn is_speaking(&self) -> bool {
        false
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "manual"
    }
}

pub struct Harness {
    pub session: ChatSession,
    pub backend: Arc<FakeBackend>,
    pub history: Arc<FakeHistory>,
}

pub fn harness(backend: FakeBackend, speech: Arc<dyn SpeechBackend>) -> Harness {
    harness_with(backend, FakeHistory::default(), speech)
}

pub fn harness_with(
    backend: FakeBackend,
    history: FakeHistory,
    speech: Arc<dyn SpeechBackend>,
) -> Harness {
    let backend = Arc::new(backend);
    let history = Arc::new(history);
    let session = ChatSession::new(
        UserId::new("user_test"),
        SessionConfig::default(),
        backend.clone(),
        HistoryMirror::new(history.clone()),
        speech,
    );
    Harness {
        session,
        backend,
        history,
    }
}

pub fn provider_speech(engine: Arc<ScriptedEngine>) -> Arc<dyn SpeechBackend> {
    Arc::new(ProviderSpeech::new(engine))
}

/// Yield until `condition` holds; panics after many rounds
pub async fn settle(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
