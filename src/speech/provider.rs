use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{RecognitionEvent, SpeechBackend, SpeechDone, SpeechEngine, SpeechError};

/// Capacity of the recognition event channel
const EVENT_BUFFER: usize = 32;

/// One active-operation slot (recognition or synthesis)
///
/// `generation` is bumped whenever the slot is taken over or cleared, so a
/// task that finishes late can tell it no longer owns the slot.
#[derive(Default)]
struct Slot {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl Slot {
    fn claim(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn abort(&mut self) -> bool {
        self.generation += 1;
        match self.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Release the slot if `generation` still owns it
    fn release(&mut self, generation: u64) -> bool {
        if self.generation == generation {
            self.task = None;
            true
        } else {
            false
        }
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Configured speech variant driving a [`SpeechEngine`]
pub struct ProviderSpeech {
    engine: Arc<dyn SpeechEngine>,
    recognition: Arc<Mutex<Slot>>,
    synthesis: Arc<Mutex<Slot>>,
}

impl ProviderSpeech {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            recognition: Arc::new(Mutex::new(Slot::default())),
            synthesis: Arc::new(Mutex::new(Slot::default())),
        }
    }
}

impl SpeechBackend for ProviderSpeech {
    fn start_recognition(&self) -> Result<mpsc::Receiver<RecognitionEvent>, SpeechError> {
        let mut slot = lock(&self.recognition);
        if slot.task.is_some() {
            return Err(SpeechError::AlreadyListening);
        }

        let generation = slot.claim();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let engine = Arc::clone(&self.engine);
        let recognition = Arc::clone(&self.recognition);

        info!("Starting voice recognition via {}", engine.name());

        let task = tokio::spawn(async move {
            let (partial_tx, mut partial_rx) = mpsc::channel::<String>(EVENT_BUFFER);

            let forward_tx = tx.clone();
            let forward = async move {
                while let Some(text) = partial_rx.recv().await {
                    if forward_tx.send(RecognitionEvent::Partial(text)).await.is_err() {
                        break;
                    }
                }
            };

            let (outcome, ()) = tokio::join!(engine.recognize(partial_tx), forward);

            let terminal = match outcome {
                Ok(text) => RecognitionEvent::Final(text),
                Err(e) => {
                    warn!("Voice recognition failed: {}", e);
                    RecognitionEvent::Failed(e)
                }
            };

            // Idle before the terminal event reaches the caller
            let owned = lock(&recognition).release(generation);
            if owned {
                let _ = tx.send(terminal).await;
            }

            debug!("Recognition task finished");
        });

        slot.task = Some(task);
        Ok(rx)
    }

    fn stop_recognition(&self) {
        if lock(&self.recognition).abort() {
            info!("Voice recognition stopped");
        }
    }

    fn speak(&self, text: &str, on_done: SpeechDone) -> Result<(), SpeechError> {
        let mut slot = lock(&self.synthesis);
        if slot.abort() {
            debug!("Previous synthesis superseded");
        }

        let generation = slot.claim();
        let engine = Arc::clone(&self.engine);
        let synthesis = Arc::clone(&self.synthesis);
        let text = text.to_string();

        debug!("Speaking {} characters", text.len());

        let task = tokio::spawn(async move {
            let outcome = engine.synthesize(&text).await;
            if let Err(e) = &outcome {
                warn!("Speech synthesis failed: {}", e);
            }

            let owned = lock(&synthesis).release(generation);
            if owned {
                on_done(outcome);
            }
        });

        slot.task = Some(task);
        Ok(())
    }

    fn cancel_speech(&self) {
        if lock(&self.synthesis).abort() {
            debug!("Speech synthesis cancelled");
        }
    }

    fn is_listening(&self) -> bool {
        lock(&self.recognition).task.is_some()
    }

    fn is_speaking(&self) -> bool {
        lock(&self.synthesis).task.is_some()
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        self.engine.name()
    }
}

impl Drop for ProviderSpeech {
    fn drop(&mut self) {
        lock(&self.recognition).abort();
        lock(&self.synthesis).abort();
    }
}
