//! Configuration (layered: code > env / `.env` > TOML file > defaults).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::backend::file::default_cadence_dir;
use crate::display::DisplayTime;
use crate::error::{CadenceError, Result};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful scheduling assistant.";
pub const DEFAULT_MAX_LOOPS: usize = 3;
pub const DEFAULT_TOKEN_BUDGET: usize = 3000;

/// Runtime settings for the dialogue loop, store and limiter.
///
/// Fields are public so code can override anything after loading.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub max_loops: usize,
    pub token_budget: usize,
    pub conversation_ttl_secs: u64,
    pub rate_limit: u32,
    pub rate_window_secs: u64,
    /// IANA zone name used when rewriting timestamps in answers.
    pub display_timezone: String,
    pub data_dir: PathBuf,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_loops: DEFAULT_MAX_LOOPS,
            token_budget: DEFAULT_TOKEN_BUDGET,
            conversation_ttl_secs: 86_400,
            rate_limit: 20,
            rate_window_secs: 60,
            display_timezone: "UTC".to_string(),
            data_dir: default_cadence_dir(),
        }
    }
}

impl fmt::Debug for CadenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CadenceConfig")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_base_url", &self.openai_base_url)
            .field("model", &self.model)
            .field("max_loops", &self.max_loops)
            .field("token_budget", &self.token_budget)
            .field("conversation_ttl_secs", &self.conversation_ttl_secs)
            .field("rate_limit", &self.rate_limit)
            .field("rate_window_secs", &self.rate_window_secs)
            .field("display_timezone", &self.display_timezone)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl CadenceConfig {
    /// Defaults overlaid with environment variables (`.env` is loaded if present).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| CadenceError::Configuration(format!("invalid config: {e}")))
    }

    /// Read a TOML file, then overlay environment variables.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CadenceError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env();
        Ok(config)
    }

    /// Overwrite fields from `OPENAI_*` and `CADENCE_*` variables.
    ///
    /// Numeric values that are zero or fail to parse are ignored.
    pub fn apply_env(&mut self) {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error

        if let Some(key) = env_string("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(url) = env_string("OPENAI_BASE_URL") {
            self.openai_base_url = url;
        }
        if let Some(model) = env_string("CADENCE_MODEL") {
            self.model = model;
        }
        if let Some(prompt) = env_string("CADENCE_SYSTEM_PROMPT") {
            self.system_prompt = prompt;
        }
        if let Some(tz) = env_string("CADENCE_DISPLAY_TZ") {
            self.display_timezone = tz;
        }
        if let Some(dir) = env_string("CADENCE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        env_positive("CADENCE_MAX_LOOPS", &mut self.max_loops);
        env_positive("CADENCE_TOKEN_BUDGET", &mut self.token_budget);
        env_positive("CADENCE_CONVERSATION_TTL_SECS", &mut self.conversation_ttl_secs);
        env_positive("CADENCE_RATE_LIMIT", &mut self.rate_limit);
        env_positive("CADENCE_RATE_WINDOW_SECS", &mut self.rate_window_secs);
    }

    pub fn require_api_key(&self) -> Result<String> {
        self.openai_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CadenceError::Configuration("OPENAI_API_KEY is not set".into()))
    }

    pub fn display_tz(&self) -> Result<Tz> {
        DisplayTime::from_name(&self.display_timezone).map(|d| d.timezone())
    }

    pub fn display_time(&self) -> Result<DisplayTime> {
        DisplayTime::from_name(&self.display_timezone)
    }

    pub fn conversation_ttl(&self) -> Duration {
        Duration::from_secs(self.conversation_ttl_secs)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    /// Directory used by the file-backed key-value store.
    pub fn kv_dir(&self) -> PathBuf {
        self.data_dir.join("kv")
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_positive<T>(key: &str, slot: &mut T)
where
    T: FromStr + PartialOrd + Default,
{
    if let Some(value) = env_string(key).and_then(|v| v.trim().parse::<T>().ok()) {
        if value > T::default() {
            *slot = value;
        }
    }
}
