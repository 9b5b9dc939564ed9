// Live-stream inference sessions

use crate::client::{DeploymentHandle, DirectAIClient};
use crate::error::{ClientError, Result};
use directai_core::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// The stream endpoints expect Python-style `"True"` / `"False"` strings
mod python_bool {
    use super::*;

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Flag {
            Bool(bool),
            Text(String),
        }

        match Flag::deserialize(deserializer)? {
            Flag::Bool(b) => Ok(b),
            Flag::Text(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                other => Err(serde::de::Error::custom(format!("invalid flag '{}'", other))),
            },
        }
    }
}

fn default_rebroadcast() -> bool {
    true
}

/// Detector entry of a tracker config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDetector {
    pub name: String,
    pub incs: Vec<String>,
    #[serde(default)]
    pub excs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerSettings {
    #[serde(with = "python_bool", default = "default_rebroadcast")]
    pub rebroadcast_annotations: bool,
    pub detectors: Vec<StreamDetector>,
}

/// Body of `/run_tracker_on_url_stream`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub stream_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    pub tracker_config: TrackerSettings,
}

impl TrackerConfig {
    /// Parse a tracker config file without validating it; `start_tracker`
    /// validates after any overrides are applied
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read tracker config {}: {}", path.display(), e))
        })?;
        let config = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_stream_url(&self.stream_url)?;
        if self.tracker_config.detectors.is_empty() {
            return Err(Error::Config("tracker config has no detectors".to_string()).into());
        }
        Ok(())
    }
}

/// Body of `/run_classifier_on_url_stream`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamClassifierConfig {
    pub stream_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(with = "python_bool", default = "default_rebroadcast")]
    pub rebroadcast_annotations: bool,
    pub deployed_id: String,
}

impl StreamClassifierConfig {
    pub fn new(stream_url: impl Into<String>, handle: &DeploymentHandle) -> Self {
        Self {
            stream_url: stream_url.into(),
            webhook_url: None,
            rebroadcast_annotations: true,
            deployed_id: handle.deployed_id.clone(),
        }
    }

    pub fn with_webhook(mut self, webhook_url: Option<String>) -> Self {
        self.webhook_url = webhook_url;
        self
    }
}

fn validate_stream_url(url: &str) -> Result<()> {
    let supported = ["rtsp://", "rtsps://", "rtmp://", "http://", "https://"];
    if !supported.iter().any(|scheme| url.starts_with(scheme)) {
        return Err(Error::Config(format!("unsupported stream URL '{}'", url)).into());
    }
    Ok(())
}

/// A running server-side tracker or classifier session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSession {
    pub tracker_instance_id: String,
    pub watch_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// The service answered without confirming; carries its message
    NotConfirmed(String),
}

impl DirectAIClient {
    /// Start tracking detections on a live stream
    pub async fn start_tracker(&self, config: &TrackerConfig) -> Result<StreamSession> {
        config.validate()?;
        let json = self
            .post_json("/run_tracker_on_url_stream", &[] as &[(&str, &str)], Some(config))
            .await?;
        self.session_from(json)
    }

    /// Run an already deployed classifier on a live stream
    pub async fn start_classifier_stream(&self, config: &StreamClassifierConfig) -> Result<StreamSession> {
        validate_stream_url(&config.stream_url)?;
        let json = self
            .post_json("/run_classifier_on_url_stream", &[] as &[(&str, &str)], Some(config))
            .await?;
        self.session_from(json)
    }

    pub async fn stop_stream(&self, session: &StreamSession) -> Result<StopOutcome> {
        let json = self
            .post_json(
                "/stop_tracker",
                &[("tracker_instance_id", session.tracker_instance_id.as_str())],
                None::<&Value>,
            )
            .await?;

        let message = json
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or_default()
            .to_string();
        if message.contains("OK") {
            info!("Stopped stream {}", session.tracker_instance_id);
            Ok(StopOutcome::Stopped)
        } else {
            Ok(StopOutcome::NotConfirmed(message))
        }
    }

    fn session_from(&self, json: Value) -> Result<StreamSession> {
        let tracker_instance_id = json
            .get("tracker_instance_id")
            .and_then(|id| match id {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .ok_or_else(|| {
                ClientError::InvalidResponse(format!(
                    "stream response has no tracker_instance_id: {}",
                    json
                ))
            })?;

        let watch_url = self.config().watch_url(&tracker_instance_id);
        info!("View stream here: {}", watch_url);
        Ok(StreamSession {
            tracker_instance_id,
            watch_url,
        })
    }
}
