// Client configuration for the DirectAI tools

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "https://api.alpha.directai.io";
pub const DEFAULT_STREAM_URL: &str = "https://watch.directai.io";

pub const CLIENT_ID_ENV: &str = "DIRECTAI_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "DIRECTAI_CLIENT_SECRET";

/// Defaults applied when a detector request is synthesized from class names
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorDefaults {
    pub detection_threshold: f64,
    pub nms_threshold: f64,
}

impl Default for DetectorDefaults {
    fn default() -> Self {
        Self {
            detection_threshold: 0.1,
            nms_threshold: 0.4,
        }
    }
}

/// Endpoint and request settings for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API host, e.g. `https://api.alpha.directai.io`
    pub base_url: String,
    /// Host serving rebroadcast streams
    pub stream_url: String,
    /// Path of the token endpoint relative to `base_url`
    pub token_path: String,
    pub request_timeout_secs: u64,
    pub detector: DetectorDefaults,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            token_path: "/token".to_string(),
            request_timeout_secs: 120,
            detector: DetectorDefaults::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a JSON, TOML or YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a string in any supported format
    pub fn from_str(content: &str) -> Result<Self> {
        if let Ok(config) = serde_json::from_str::<ClientConfig>(content) {
            return Ok(config);
        }

        if let Ok(config) = toml::from_str::<ClientConfig>(content) {
            return Ok(config);
        }

        if let Ok(config) = serde_yaml::from_str::<ClientConfig>(content) {
            return Ok(config);
        }

        Err(Error::Config("unknown client config format".to_string()))
    }

    /// Defaults overridden by `DIRECTAI_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from `DIRECTAI_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("DIRECTAI_BASE_URL") {
            self.base_url = url;
        }

        if let Ok(url) = std::env::var("DIRECTAI_STREAM_URL") {
            self.stream_url = url;
        }

        if let Ok(timeout) = std::env::var("DIRECTAI_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring invalid DIRECTAI_TIMEOUT_SECS: {}", timeout),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, url) in [("base_url", &self.base_url), ("stream_url", &self.stream_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::Config(format!(
                    "{} must be an http(s) URL, got '{}'",
                    field, url
                )));
            }
        }

        if !self.token_path.starts_with('/') {
            return Err(Error::Config("token_path must start with '/'".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be > 0".to_string()));
        }

        let thresholds = [
            ("detection_threshold", self.detector.detection_threshold),
            ("nms_threshold", self.detector.nms_threshold),
        ];
        for (field, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!("{} must be within [0, 1]", field)));
            }
        }

        Ok(())
    }

    /// Build `{base_url}{path}` without doubling the slash
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn token_endpoint(&self) -> String {
        self.endpoint(&self.token_path)
    }

    /// Public URL where a rebroadcast stream can be watched
    pub fn watch_url(&self, tracker_instance_id: &str) -> String {
        format!("{}/{}", self.stream_url.trim_end_matches('/'), tracker_instance_id)
    }
}

/// Client id/secret pair exchanged for a bearer token
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("{} is not set", name)))
        };
        Ok(Self::new(read(CLIENT_ID_ENV)?, read(CLIENT_SECRET_ENV)?))
    }
}

// Secret stays out of logs and panic messages
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}
