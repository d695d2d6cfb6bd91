pub mod client;
pub mod messages;

pub use client::{BackendClient, HistoryStore, QueryService, TransportError};
pub use messages::{ChatRequest, HistoryEntry, HistoryRecord, PageSummary};
