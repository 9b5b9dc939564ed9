use crate::client::{DeploymentHandle, DirectAIClient, ImageUpload};
use crate::error::Result;
use crate::models::kind::{prediction, ModelKind};
use async_trait::async_trait;
use directai_core::{DeployRequest, DeploymentKind, Error};
use serde_json::Value;

/// Single classifier, one `/classify` call per image
pub struct Classifier {
    request: DeployRequest,
}

impl Classifier {
    pub fn new(request: DeployRequest) -> Result<Self> {
        if request.kind() != DeploymentKind::Classifier {
            return Err(Error::Config("classifier run needs classifier_configs".to_string()).into());
        }
        request.validate()?;
        Ok(Self { request })
    }
}

#[async_trait]
impl ModelKind for Classifier {
    type Handle = DeploymentHandle;

    fn name(&self) -> &'static str {
        "classifier"
    }

    fn results_file_name(&self) -> &'static str {
        "classification_results.json"
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
        client
            .infer("/classify", &[("deployed_id", handle.deployed_id.as_str())], upload)
            .await
    }

    fn routing_keys(&self, payload: &Value) -> Result<Vec<String>> {
        Ok(vec![prediction(payload)?])
    }
}
