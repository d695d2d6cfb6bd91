use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::transport::{HistoryEntry, HistoryRecord, HistoryStore};

/// What the history panel shows
#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub visible: bool,
    pub entries: Vec<HistoryEntry>,
}

/// Best-effort replication of query exchanges to a [`HistoryStore`]
///
/// Holds no authoritative state: only the last successful fetch and the
/// panel visibility.
#[derive(Clone)]
pub struct HistoryMirror {
    store: Arc<dyn HistoryStore>,
    last_fetch: Arc<Mutex<Vec<HistoryEntry>>>,
    visible: Arc<AtomicBool>,
}

impl HistoryMirror {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            last_fetch: Arc::new(Mutex::new(Vec::new())),
            visible: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Write `record` in the background; failures are only logged
    pub fn record(&self, record: HistoryRecord) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match store.store(&record).await {
                Ok(()) => debug!(
                    "Stored {} queries for {}",
                    record.queries.len(),
                    record.url
                ),
                Err(e) => warn!("Failed to store query history: {}", e),
            }
        })
    }

    /// Fetch the user's history; empty on any failure
    pub async fn fetch(&self, user_id: &str) -> Vec<HistoryEntry> {
        match self.store.fetch(user_id).await {
            Ok(entries) => {
                *self.last_fetch.lock().unwrap_or_else(PoisonError::into_inner) = entries.clone();
                entries
            }
            Err(e) => {
                warn!("Failed to retrieve query history: {}", e);
                Vec::new()
            }
        }
    }

    /// Flip visibility, fetching first when the panel is about to open
    pub async fn toggle(&self, user_id: &str) -> HistoryView {
        if !self.visible.load(Ordering::SeqCst) {
            self.fetch(user_id).await;
        }
        self.visible.fetch_xor(true, Ordering::SeqCst);
        self.view()
    }

    pub fn view(&self) -> HistoryView {
        HistoryView {
            visible: self.visible.load(Ordering::SeqCst),
            entries: self
                .last_fetch
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}
