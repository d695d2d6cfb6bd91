// Tests for the speech capability adapter
//
// ProviderSpeech is driven by a scripted engine on tokio's paused clock.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::ScriptedEngine;
use so_assistant::config::SpeechSettings;
use so_assistant::{
    DisabledSpeech, ProviderSpeech, RecognitionEvent, SpeechBackend, SpeechBackendFactory,
    SpeechEngine, SpeechError,
};

fn counter() -> (Arc<AtomicUsize>, impl FnOnce(Result<(), SpeechError>) + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let hook = Arc::clone(&count);
    (count, move |_| {
        hook.fetch_add(1, Ordering::SeqCst);
    })
}

#[tokio::test(start_paused = true)]
async fn test_recognition_emits_partials_then_one_final() {
    let engine = Arc::new(ScriptedEngine::new().hearing(&["what", "what is"], "What is yield"));
    let speech = ProviderSpeech::new(engine);

    let mut events = speech.start_recognition().unwrap();
    assert!(speech.is_listening());

    let mut received = Vec::new();
    while let Some(event) = events.recv().await {
        received.push(event);
    }

    assert_eq!(
        received,
        vec![
            RecognitionEvent::Partial("what".to_string()),
            RecognitionEvent::Partial("what is".to_string()),
            RecognitionEvent::Final("What is yield".to_string()),
        ]
    );
    assert!(!speech.is_listening(), "recognizer goes idle after the final result");
}

#[tokio::test(start_paused = true)]
async fn test_second_recognition_is_rejected_while_active() {
    let mut engine = ScriptedEngine::new().hearing(&[], "x");
    engine.listen_for = Duration::from_secs(30);
    let speech = ProviderSpeech::new(Arc::new(engine));

    let _events = speech.start_recognition().unwrap();
    let second = speech.start_recognition();

    assert_eq!(second.err(), Some(SpeechError::AlreadyListening));
}

#[tokio::test(start_paused = true)]
async fn test_stop_recognition_is_idempotent_and_closes_channel() {
    let mut engine = ScriptedEngine::new().hearing(&[], "never delivered");
    engine.listen_for = Duration::from_secs(30);
    let speech = ProviderSpeech::new(Arc::new(engine));

    // Safe while idle
    speech.stop_recognition();

    let mut events = speech.start_recognition().unwrap();
    speech.stop_recognition();
    speech.stop_recognition();

    assert!(!speech.is_listening());
    assert_eq!(events.recv().await, None, "no terminal event after stop");

    // Can listen again afterwards
    assert!(speech.start_recognition().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_recognition_failure_is_reported() {
    let mut engine = ScriptedEngine::new();
    engine.recognition_error = Some(SpeechError::Unavailable("no microphone".to_string()));
    let speech = ProviderSpeech::new(Arc::new(engine));

    let mut events = speech.start_recognition().unwrap();

    assert_eq!(
        events.recv().await,
        Some(RecognitionEvent::Failed(SpeechError::Unavailable(
            "no microphone".to_string()
        )))
    );
    assert!(!speech.is_listening());
}

#[tokio::test(start_paused = true)]
async fn test_speak_invokes_on_done_once() {
    let engine = Arc::new(ScriptedEngine::new());
    let speech = ProviderSpeech::new(engine.clone());
    let (done, on_done) = counter();

    speech.speak("hello", Box::new(on_done)).unwrap();
    assert!(speech.is_speaking());

    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(done.load(Ordering::SeqCst), 1);
    assert!(!speech.is_speaking());
    assert_eq!(engine.spoken(), vec!["hello".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_new_speak_supersedes_previous() {
    let speech = ProviderSpeech::new(Arc::new(ScriptedEngine::new()));
    let (done_a, on_done_a) = counter();
    let (done_b, on_done_b) = counter();

    speech.speak("A", Box::new(on_done_a)).unwrap();
    speech.speak("B", Box::new(on_done_b)).unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(done_a.load(Ordering::SeqCst), 0, "superseded playback never completes");
    assert_eq!(done_b.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_speech_suppresses_on_done() {
    let speech = ProviderSpeech::new(Arc::new(ScriptedEngine::new()));
    let (done, on_done) = counter();

    speech.speak("A", Box::new(on_done)).unwrap();
    speech.cancel_speech();
    speech.cancel_speech();

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(done.load(Ordering::SeqCst), 0);
    assert!(!speech.is_speaking());
}

#[tokio::test(start_paused = true)]
async fn test_synthesis_error_reaches_on_done() {
    let mut engine = ScriptedEngine::new();
    engine.synthesis_error = Some(SpeechError::Failed("network".to_string()));
    let speech = ProviderSpeech::new(Arc::new(engine));

    let outcome = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&outcome);
    speech
        .speak("A", Box::new(move |result: Result<(), SpeechError>| {
            *slot.lock().unwrap() = Some(result)
        }))
        .unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(
        *outcome.lock().unwrap(),
        Some(Err(SpeechError::Failed("network".to_string())))
    );
}

#[tokio::test]
async fn test_disabled_variant_reports_not_configured() {
    let speech = DisabledSpeech::new("Speech configuration is missing");
    let (done, on_done) = counter();

    assert_eq!(speech.start_recognition().err(), Some(SpeechError::NotConfigured));
    assert_eq!(speech.speak("hi", Box::new(on_done)), Err(SpeechError::NotConfigured));

    speech.stop_recognition();
    speech.cancel_speech();

    assert!(!speech.is_available());
    assert!(!speech.is_listening());
    assert!(!speech.is_speaking());
    assert_eq!(done.load(Ordering::SeqCst), 0);
    assert_eq!(speech.reason(), "Speech configuration is missing");
}

#[tokio::test]
async fn test_factory_requires_both_credentials() {
    let engine: Arc<dyn SpeechEngine> = Arc::new(ScriptedEngine::new());

    let key_only = SpeechSettings {
        key: Some("secret".to_string()),
        ..SpeechSettings::default()
    };
    assert!(!SpeechBackendFactory::create(&key_only, Some(engine.clone())).is_available());

    let blank_region = SpeechSettings {
        key: Some("secret".to_string()),
        region: Some("  ".to_string()),
        ..SpeechSettings::default()
    };
    assert!(!SpeechBackendFactory::create(&blank_region, Some(engine.clone())).is_available());

    let complete = SpeechSettings {
        key: Some("secret".to_string()),
        region: Some("westeurope".to_string()),
        ..SpeechSettings::default()
    };
    let speech = SpeechBackendFactory::create(&complete, Some(engine));
    assert!(speech.is_available());
    assert_eq!(speech.name(), "scripted");

    assert!(!SpeechBackendFactory::create(&complete, None).is_available());
}
