use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;

/// Environment prefix, e.g. `SO_ASSISTANT__BACKEND__BASE_URL`
const ENV_PREFIX: &str = "SO_ASSISTANT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    pub speech: SpeechSettings,
    pub session: SessionSettings,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "so-assistant".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3030,
        }
    }
}

/// Summarize/chat/history backend
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7071".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Speech provider credentials and voice options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub key: Option<String>,
    pub region: Option<String>,
    pub voice_name: String,
    pub recognition_language: String,
}

impl SpeechSettings {
    /// Both `key` and `region` are set and non-blank
    pub fn credentials_present(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.key) && filled(&self.region)
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            key: None,
            region: None,
            voice_name: "en-US-AriaNeural".to_string(),
            recognition_language: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub cooldown_secs: u32,
    pub voice_enabled: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: 20,
            voice_enabled: true,
        }
    }
}

/// Persisted client state (the user id lives here)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub state_path: String,
}

impl StorageConfig {
    /// `state_path` with a leading `~` expanded
    pub fn resolved_state_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.state_path).into_owned())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: "~/.so-assistant/state.json".to_string(),
        }
    }
}

impl Config {
    /// Load defaults, then `path` (any format `config` understands, optional),
    /// then `SO_ASSISTANT__*` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
