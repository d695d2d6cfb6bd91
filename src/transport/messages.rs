use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response of `GET /api/summarize`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub summary: String,
    pub page_content: String,
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub url: String,
    pub page_content: String,
    pub query: String,
}

/// Body of `POST /api/store-query`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub user_id: String,
    pub url: String,
    pub page_content: String,
    pub summary: String,
    pub queries: Vec<String>,
}

/// One element of `GET /api/retrieve-query-history`
///
/// The backend owns this record; fields it leaves out default to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default)]
    pub user_id: String,
    pub url: String,
    #[serde(default)]
    pub page_content: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub queries: Vec<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339, naive ISO 8601 (taken as UTC) or epoch milliseconds
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Zoned(DateTime<Utc>),
        Naive(NaiveDateTime),
        Millis(i64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Zoned(ts)) => Some(ts),
            Some(Raw::Naive(ts)) => Some(Utc.from_utc_datetime(&ts)),
            Some(Raw::Millis(ms)) => Utc.timestamp_millis_opt(ms).single(),
            None => None,
        })
    }
}
