//! Process-wide user identity
//!
//! The user id is read from the persisted client state at startup, or
//! generated once and written back. It never changes for the lifetime of the
//! process and is handed to the session explicitly.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

/// Storage key the user id is kept under
pub const USER_ID_KEY: &str = "stackoverflow-assistant-userId";

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static USER_ID: OnceLock<UserId> = OnceLock::new();

/// Serialises the load-or-create step of [`init_user_id`]
static USER_ID_INIT: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `user_<unix-millis>_<9 base-36 chars>`
    pub fn generate() -> Self {
        Self(format!(
            "user_{}_{}",
            Utc::now().timestamp_millis(),
            random_suffix()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn random_suffix() -> String {
    let mut bits = uuid::Uuid::new_v4().as_u128();
    (0..SUFFIX_LEN)
        .map(|_| {
            let c = BASE36[(bits % 36) as usize] as char;
            bits /= 36;
            c
        })
        .collect()
}

/// JSON key/value file standing in for browser local storage
pub struct ClientStateStore {
    path: PathBuf,
}

impl ClientStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the stored user id, creating and persisting one if absent
    pub fn load_or_create_user_id(&self) -> Result<UserId> {
        let mut state = self.read()?;

        if let Some(Value::String(id)) = state.get(USER_ID_KEY) {
            if !id.is_empty() {
                return Ok(UserId(id.clone()));
            }
        }

        let id = UserId::generate();
        state.insert(USER_ID_KEY.to_string(), Value::String(id.0.clone()));
        self.write(&state)?;

        info!("Created user id {} in {:?}", id, self.path);
        Ok(id)
    }

    fn read(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read client state: {:?}", self.path))?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&raw)
            .with_context(|| format!("Client state is not a JSON object: {:?}", self.path))
    }

    fn write(&self, state: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory: {:?}", parent))?;
        }

        // Write-then-rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)
            .with_context(|| format!("Failed to write client state: {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace client state: {:?}", self.path))?;

        Ok(())
    }
}

/// Initialise the process-wide user id from `state_path`
///
/// Only the first call touches storage; later calls, including ones racing
/// the first, return the same id.
pub fn init_user_id(state_path: &Path) -> Result<&'static UserId> {
    if let Some(id) = USER_ID.get() {
        return Ok(id);
    }

    let _init = USER_ID_INIT.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(id) = USER_ID.get() {
        return Ok(id);
    }

    let id = ClientStateStore::new(state_path).load_or_create_user_id()?;
    Ok(USER_ID.get_or_init(|| id))
}

/// The process-wide user id, if [`init_user_id`] has run
pub fn user_id() -> Option<&'static UserId> {
    USER_ID.get()
}
