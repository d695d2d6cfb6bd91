//! Query-history mirror
//!
//! Fire-and-forget writes of each chat exchange and on-demand reads for the
//! history panel. Nothing here is allowed to fail the chat flow.

mod mirror;

pub use mirror::{HistoryMirror, HistoryView};
