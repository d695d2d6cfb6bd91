use super::state::AppState;
use crate::error::SessionError;
use crate::session::{ChatSession, SessionSnapshot};
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitUrlRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitQueryRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct VoiceRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
    pub snapshot: SessionSnapshot,
}

fn status_for(err: &SessionError) -> StatusCode {
    match err {
        SessionError::Validation(_) => StatusCode::BAD_REQUEST,
        SessionError::NoCommand => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::Busy => StatusCode::CONFLICT,
        SessionError::Cooldown { .. } => StatusCode::TOO_MANY_REQUESTS,
        SessionError::Remote { .. } | SessionError::Transport(_) => StatusCode::BAD_GATEWAY,
        SessionError::Speech(_) | SessionError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn respond(session: &ChatSession, result: Result<SessionSnapshot, SessionError>) -> Response {
    match result {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => (
            status_for(&err),
            Json(ErrorResponse {
                error: err.to_string(),
                kind: err.kind(),
                snapshot: session.snapshot(),
            }),
        )
            .into_response(),
    }
}

/// Yields once per change of `rx`, ends when the sender is gone
fn changes<T>(rx: watch::Receiver<T>) -> impl Stream<Item = ()>
where
    T: Send + Sync + 'static,
{
    stream::unfold(rx, |mut rx| async move {
        rx.changed().await.ok()?;
        Some(((), rx))
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session
pub async fn get_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.snapshot())
}

/// GET /session/events
/// Server-sent events: the current snapshot, then one per change
pub async fn session_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let session = state.session.clone();
    let updates = stream::select(
        changes(session.subscribe()),
        changes(session.subscribe_cooldown()),
    );

    let events = stream::once(async {})
        .chain(updates)
        .map(move |()| Event::default().json_data(session.snapshot()));

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// POST /session/url
pub async fn submit_url(
    State(state): State<AppState>,
    Json(req): Json<SubmitUrlRequest>,
) -> Response {
    info!("Summarize requested for {}", req.url);
    let result = state.session.submit_url(&req.url).await;
    respond(&state.session, result)
}

/// POST /session/query
pub async fn submit_query(
    State(state): State<AppState>,
    Json(req): Json<SubmitQueryRequest>,
) -> Response {
    let result = state.session.submit_query(&req.query).await;
    respond(&state.session, result)
}

/// POST /session/draft
pub async fn set_draft(
    State(state): State<AppState>,
    Json(req): Json<DraftRequest>,
) -> impl IntoResponse {
    Json(state.session.set_draft(&req.text))
}

/// POST /session/dictate
/// Resolves once the utterance has been submitted (or dictation stopped)
pub async fn dictate(State(state): State<AppState>) -> Response {
    let result = state.session.dictate().await;
    respond(&state.session, result)
}

/// POST /session/dictate/stop
pub async fn stop_dictation(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.stop_dictation())
}

/// POST /session/voice
pub async fn set_voice(
    State(state): State<AppState>,
    Json(req): Json<VoiceRequest>,
) -> impl IntoResponse {
    Json(state.session.set_voice_enabled(req.enabled))
}

/// POST /session/reset
pub async fn reset(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.reset())
}

/// GET /history
pub async fn get_history(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.fetch_history().await)
}

/// POST /history/toggle
pub async fn toggle_history(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.toggle_history().await)
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
