use crate::client::{DeploymentHandle, DirectAIClient, ImageUpload};
use crate::error::Result;
use crate::models::kind::ModelKind;
use async_trait::async_trait;
use directai_core::{DeployRequest, DeploymentKind, Error};
use directai_eye::{annotate_file, first_image, parse_detections, AnnotationStyle};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Object detector, one `/detect` call per image.
///
/// Detections are not routed into class directories; with annotation enabled
/// each image is redrawn with its boxes as `annotated_<file>` in the results
/// directory.
pub struct Detector {
    request: DeployRequest,
    annotation: Option<AnnotationStyle>,
}

impl Detector {
    pub fn new(request: DeployRequest) -> Result<Self> {
        if request.kind() != DeploymentKind::Detector {
            return Err(Error::Config("detector run needs detector_configs".to_string()).into());
        }
        request.validate()?;
        Ok(Self {
            request,
            annotation: None,
        })
    }

    pub fn with_annotation(mut self, style: AnnotationStyle) -> Self {
        self.annotation = Some(style);
        self
    }
}

#[async_trait]
impl ModelKind for Detector {
    type Handle = DeploymentHandle;

    fn name(&self) -> &'static str {
        "detector"
    }

    fn results_file_name(&self) -> &'static str {
        "detection_results.json"
    }

    fn class_names(&self) -> Vec<String> {
        self.request.class_names()
    }

    async fn deploy(&self, client: &DirectAIClient) -> Result<DeploymentHandle> {
        client.deploy(&self.request).await
    }

    async fn submit(
        &self,
        client: &DirectAIClient,
        handle: &DeploymentHandle,
        upload: &ImageUpload,
    ) -> Result<Value> {
        let payload = client
            .infer("/detect", &[("deployed_id", handle.deployed_id.as_str())], upload)
            .await?;
        Ok(first_image(&payload).clone())
    }

    fn routing_keys(&self, _payload: &Value) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn after_submit(&self, source: &Path, payload: &Value, results_dir: &Path) -> Result<()> {
        let Some(style) = &self.annotation else {
            return Ok(());
        };

        let detections = parse_detections(payload)?;
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let destination = results_dir.join(format!("annotated_{}", file_name));
        debug!("Annotating {} detections on {}", detections.len(), file_name);
        annotate_file(source, &detections, &destination, style)?;
        Ok(())
    }
}
