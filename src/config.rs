use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_COLLAPSE_DELAY_MS: u64 = 500;
/// One display frame at 60 Hz.
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

pub const ENV_BASE_URL: &str = "VIGIL_BASE_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "VIGIL_POLL_INTERVAL_MS";
pub const ENV_COLLAPSE_DELAY_MS: &str = "VIGIL_COLLAPSE_DELAY_MS";
pub const ENV_FRAME_INTERVAL_MS: &str = "VIGIL_FRAME_INTERVAL_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "VIGIL_REQUEST_TIMEOUT_MS";
pub const ENV_LOG_FILE: &str = "VIGIL_LOG_FILE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config JSON: {0}")]
    Parse(String),
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub collapse_delay_ms: u64,
    pub frame_interval_ms: u64,
    pub request_timeout_ms: Option<u64>,
    /// Append logs here instead of stderr, keeping them off the rendered page.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            collapse_delay_ms: DEFAULT_COLLAPSE_DELAY_MS,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            request_timeout_ms: None,
            log_file: None,
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn collapse_delay(&self) -> Duration {
        Duration::from_millis(self.collapse_delay_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("pollIntervalMs"));
        }
        if self.collapse_delay_ms == 0 {
            return Err(ConfigError::ZeroInterval("collapseDelayMs"));
        }
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("frameIntervalMs"));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroInterval("requestTimeoutMs"));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "baseUrl",
                value: self.base_url,
            });
        }
        Ok(self)
    }
}

pub fn vigil_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".vigil"))
}

pub fn default_config_path() -> Option<PathBuf> {
    vigil_data_dir().map(|dir| dir.join("config.json"))
}

/// Load configuration from defaults, `~/.vigil/config.json` and `VIGIL_*` variables.
pub fn load() -> Result<Config, ConfigError> {
    let path = default_config_path();
    load_from(path.as_deref(), |key| std::env::var(key).ok())
}

/// Layer an optional JSON file and then environment overrides on top of the defaults.
/// A missing file is not an error.
pub fn load_from<F>(path: Option<&Path>, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut merged =
        serde_json::to_value(Config::default()).map_err(|e| ConfigError::Parse(e.to_string()))?;

    if let Some(path) = path.filter(|p| p.exists()) {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let patch: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        merge_json(&mut merged, &patch);
        debug!(path = %path.display(), "Loaded config file");
    }

    let mut config: Config =
        serde_json::from_value(merged).map_err(|e| ConfigError::Parse(e.to_string()))?;
    apply_env(&mut config, env)?;
    config.validate()
}

fn apply_env<F>(config: &mut Config, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env(ENV_BASE_URL) {
        config.base_url = url;
    }
    if let Some(ms) = parse_millis(&env, ENV_POLL_INTERVAL_MS)? {
        config.poll_interval_ms = ms;
    }
    if let Some(ms) = parse_millis(&env, ENV_COLLAPSE_DELAY_MS)? {
        config.collapse_delay_ms = ms;
    }
    if let Some(ms) = parse_millis(&env, ENV_FRAME_INTERVAL_MS)? {
        config.frame_interval_ms = ms;
    }
    if let Some(ms) = parse_millis(&env, ENV_REQUEST_TIMEOUT_MS)? {
        config.request_timeout_ms = Some(ms);
    }
    if let Some(path) = env(ENV_LOG_FILE).filter(|p| !p.trim().is_empty()) {
        config.log_file = Some(PathBuf::from(path));
    }
    Ok(())
}

fn parse_millis<F>(env: &F, key: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match env(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

/// Deep-merge `patch` into `base`; nested objects merge key by key, everything else replaces.
fn merge_json(base: &mut serde_json::Value, patch: &serde_json::Value) {
    if let (serde_json::Value::Object(base_map), serde_json::Value::Object(patch_map)) =
        (base, patch)
    {
        for (key, value) in patch_map {
            match base_map.get_mut(key) {
                Some(existing) if existing.is_object() && value.is_object() => {
                    merge_json(existing, value);
                }
                _ => {
                    base_map.insert(key.clone(), value.clone());
                }
            }
        }
    }
}
