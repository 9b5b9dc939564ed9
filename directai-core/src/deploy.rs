// Deployable model configurations and request bodies

use crate::config::DetectorDefaults;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

/// One named class, described by text examples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub examples_to_include: Vec<String>,
    #[serde(default)]
    pub examples_to_exclude: Vec<String>,
    /// Only meaningful for detectors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_threshold: Option<f64>,
    /// Fields the service understands but this crate does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelConfig {
    /// Shortcut config: the class name is its own single include example
    pub fn from_class_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            examples_to_include: vec![name.clone()],
            name,
            examples_to_exclude: Vec::new(),
            detection_threshold: None,
            extra: Map::new(),
        }
    }

    pub fn with_detection_threshold(mut self, threshold: f64) -> Self {
        self.detection_threshold = Some(threshold);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierRequest {
    pub classifier_configs: Vec<ModelConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorRequest {
    pub detector_configs: Vec<ModelConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nms_threshold: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Which deploy endpoint a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentKind {
    Classifier,
    Detector,
}

impl DeploymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentKind::Classifier => "classifier",
            DeploymentKind::Detector => "detector",
        }
    }

    pub fn deploy_path(&self) -> &'static str {
        match self {
            DeploymentKind::Classifier => "/deploy_classifier",
            DeploymentKind::Detector => "/deploy_detector",
        }
    }
}

/// Body posted to a deploy endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DeployRequest {
    Classifier(ClassifierRequest),
    Detector(DetectorRequest),
}

impl DeployRequest {
    /// Synthesize a request with one config per class name, in the given order
    pub fn from_class_names(
        kind: DeploymentKind,
        class_names: &[String],
        defaults: &DetectorDefaults,
    ) -> Self {
        match kind {
            DeploymentKind::Classifier => DeployRequest::Classifier(ClassifierRequest {
                classifier_configs: class_names
                    .iter()
                    .map(ModelConfig::from_class_name)
                    .collect(),
                extra: Map::new(),
            }),
            DeploymentKind::Detector => DeployRequest::Detector(DetectorRequest {
                detector_configs: class_names
                    .iter()
                    .map(|name| {
                        ModelConfig::from_class_name(name)
                            .with_detection_threshold(defaults.detection_threshold)
                    })
                    .collect(),
                nms_threshold: Some(defaults.nms_threshold),
                extra: Map::new(),
            }),
        }
    }

    /// Parse a JSON request body for the given kind
    pub fn from_json(kind: DeploymentKind, content: &str) -> Result<Self> {
        let request = match kind {
            DeploymentKind::Classifier => serde_json::from_str(content).map(DeployRequest::Classifier),
            DeploymentKind::Detector => serde_json::from_str(content).map(DeployRequest::Detector),
        };
        request.map_err(|e| Error::Config(format!("invalid {} configuration: {}", kind.as_str(), e)))
    }

    pub fn from_file(kind: DeploymentKind, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read configuration file {}: {}", path.display(), e))
        })?;
        Self::from_json(kind, &content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn kind(&self) -> DeploymentKind {
        match self {
            DeployRequest::Classifier(_) => DeploymentKind::Classifier,
            DeployRequest::Detector(_) => DeploymentKind::Detector,
        }
    }

    pub fn configs(&self) -> &[ModelConfig] {
        match self {
            DeployRequest::Classifier(req) => &req.classifier_configs,
            DeployRequest::Detector(req) => &req.detector_configs,
        }
    }

    pub fn class_names(&self) -> Vec<String> {
        self.configs().iter().map(|c| c.name.clone()).collect()
    }

    /// Reject bodies the service would deploy as an empty or ambiguous model
    pub fn validate(&self) -> Result<()> {
        let configs = self.configs();
        if configs.is_empty() {
            return Err(Error::Config(format!(
                "{} request contains no model configs",
                self.kind().as_str()
            )));
        }

        let mut seen = HashSet::new();
        for config in configs {
            if config.name.trim().is_empty() {
                return Err(Error::Config("model config name cannot be empty".to_string()));
            }
            if !seen.insert(config.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate model config name '{}'",
                    config.name
                )));
            }
        }

        Ok(())
    }
}

/// Resolve the body to deploy: explicit class names win over the config file
pub fn resolve_config(
    kind: DeploymentKind,
    class_names: &[String],
    config_file: Option<&Path>,
    defaults: &DetectorDefaults,
) -> Result<DeployRequest> {
    let request = if !class_names.is_empty() {
        tracing::debug!("Building {} config from {} class names", kind.as_str(), class_names.len());
        DeployRequest::from_class_names(kind, class_names, defaults)
    } else if let Some(path) = config_file {
        tracing::debug!("Loading {} config from {}", kind.as_str(), path.display());
        DeployRequest::from_file(kind, path)?
    } else {
        return Err(Error::Config(
            "no class names or configuration file provided".to_string(),
        ));
    };

    request.validate()?;
    Ok(request)
}
