use crate::client::{DirectAIClient, ImageUpload};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// What differs between classification, detection and multi-classification
/// runs. The batch runner drives any implementation the same way.
#[async_trait]
pub trait ModelKind: Send + Sync {
    /// Whatever `deploy` hands back and `submit` needs
    type Handle: Send + Sync + std::fmt::Debug;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// File written under the results directory at the end of a run
    fn results_file_name(&self) -> &'static str;

    /// Class names that need a result directory when routing is enabled
    fn class_names(&self) -> Vec<String>;

    /// Deploy the configuration server-side
    async fn deploy(&self, client: &DirectAIClient) -> Result<Self::Handle>;

    /// Submit one image and return the payload to record for it
    async fn submit(
        &self,
        client: &DirectAIClient,
        handle: &Self::Handle,
        upload: &ImageUpload,
    ) -> Result<Value>;

    /// Predicted class names the source file should be copied under
    fn routing_keys(&self, payload: &Value) -> Result<Vec<String>>;

    /// Per-file side output, run after the payload is recorded
    fn after_submit(&self, _source: &Path, _payload: &Value, _results_dir: &Path) -> Result<()> {
        Ok(())
    }
}

/// `pred` of a classification payload
pub(crate) fn prediction(payload: &Value) -> Result<String> {
    payload
        .get("pred")
        .and_then(|p| p.as_str())
        .map(|p| p.to_string())
        .ok_or_else(|| {
            crate::error::ClientError::InvalidResponse(format!(
                "classification payload has no 'pred' field: {}",
                payload
            ))
        })
}
