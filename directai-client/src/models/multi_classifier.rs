use crate::client::{DeploymentHandle, DirectAIClient, ImageUpload};
use crate::error::Result;
use crate::models::kind::{prediction, ModelKind};
use async_trait::async_trait;
use directai_core::{DeployRequest, DeploymentKind, Error};
use serde_json::Value;
use std::collections::HashSet;

/// Several classifiers queried together through `/multi_classify`.
///
/// The payload maps each deployed id to its own classification; every `pred`
/// routes the file into its class directory, so one input can land in
/// several directories.
pub struct MultiClassifier {
    requests: Vec<DeployRequest>,
}

impl MultiClassifier {
    pub fn new(requests: Vec<DeployRequest>) -> Result<Self> {
        if requests.is_empty() {
            return Err(Error::Config("multi-classification needs at least one classifier config".to_string()).into());
        }
        for request in &requests {
            if request.kind() != DeploymentKind::Classifier {
                return Err(Error::Config("multi-classification only accepts classifier configs".to_string()).into());
            }
            request.validate()?;
        }
        Ok(Self { requests })
    }
}

#[async_trait]
impl ModelKind for MultiClassifier {
    type Handle = Vec<DeploymentHandle>;

    fn name(&self) -> &'static str {
        "multi-classifier"
    }

    fn results_file_name(&self) -> &'static str {
        "multi_classification_results.json"
    }

    /// Union of every classifier's class names, first occurrence order
    fn class_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.requests
            .iter()
            .flat_map(|r| r.class_names())
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    async fn deploy(&self, client: &DirectAIClient) -> Result<Vec<DeploymentHandle>> {
        let mut handles = Vec::with_capacity(self.requests.len());
        for request in &self.requests {
            handles.push(client.deploy(request).await?);
        }
        Ok(handles)
    }

    async fn submit(
        &self,
        client: &DirectAIClient,
        handles: &Vec<DeploymentHandle>,
        upload: &ImageUpload,
    ) -> Result<Value> {
        let query: Vec<(&str, &str)> = handles
            .iter()
            .map(|h| ("deployed_ids", h.deployed_id.as_str()))
            .collect();
        client.infer("/multi_classify", &query, upload).await
    }

    fn routing_keys(&self, payload: &Value) -> Result<Vec<String>> {
        let per_classifier = payload.as_object().ok_or_else(|| {
            crate::error::ClientError::InvalidResponse(format!(
                "multi-classification payload is not an object: {}",
                payload
            ))
        })?;
        per_classifier.values().map(prediction).collect()
    }
}
