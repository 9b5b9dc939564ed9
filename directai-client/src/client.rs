// Authenticated HTTP client for the DirectAI API

use crate::auth;
use crate::error::{ClientError, Result};
use directai_core::{ClientConfig, Credentials, DeployRequest, DeploymentKind, MediaType};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const MAX_ERROR_BODY: usize = 1000;

/// Server-side deployment, addressed by an opaque id. Lives for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentHandle {
    pub kind: DeploymentKind,
    pub deployed_id: String,
}

impl fmt::Display for DeploymentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.deployed_id)
    }
}

/// Image bytes ready to be posted as the multipart `data` field
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Type the file by extension, then read it.
    /// Unsupported extensions fail before any IO.
    pub fn from_path(path: &Path) -> Result<Self> {
        let media_type = MediaType::from_path(path)?;
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            file_name,
            media_type,
            bytes,
        })
    }

    fn to_form(&self) -> Result<Form> {
        let part = Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(self.media_type.mime())?;
        Ok(Form::new().part("data", part))
    }
}

pub struct DirectAIClient {
    http: Client,
    config: ClientConfig,
    token: String,
}

impl DirectAIClient {
    /// Build the shared HTTP client with the configured timeout
    pub fn http_client(config: &ClientConfig) -> Result<Client> {
        Ok(Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?)
    }

    /// Authenticate once and keep the token for the rest of the run
    pub async fn connect(config: ClientConfig, credentials: &Credentials) -> Result<Self> {
        config.validate()?;
        let http = Self::http_client(&config)?;
        let token = auth::obtain_token(&http, credentials, &config.token_endpoint()).await?;
        info!("Authenticated against {}", config.base_url);
        Ok(Self { http, config, token })
    }

    /// Use an already issued token
    pub fn with_token(config: ClientConfig, token: impl Into<String>) -> Result<Self> {
        config.validate()?;
        let http = Self::http_client(&config)?;
        Ok(Self {
            http,
            config,
            token: token.into(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(self.config.endpoint(path))
            .bearer_auth(&self.token)
    }

    /// Deploy a classifier or detector and return its handle
    pub async fn deploy(&self, request: &DeployRequest) -> Result<DeploymentHandle> {
        let kind = request.kind();
        debug!(
            "Deploying {} with classes {:?}",
            kind.as_str(),
            request.class_names()
        );

        let response = self.post(kind.deploy_path()).json(request).send().await?;
        let json = expect_ok(response, ClientError::Deployment).await?;

        let deployed_id = json
            .get("deployed_id")
            .and_then(|id| id.as_str())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ClientError::InvalidResponse(format!("deploy response has no deployed_id: {}", json))
            })?
            .to_string();

        let handle = DeploymentHandle { kind, deployed_id };
        info!("Deployed {}", handle);
        Ok(handle)
    }

    /// Post one image to an inference endpoint
    pub async fn infer<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
        upload: &ImageUpload,
    ) -> Result<Value> {
        let response = self
            .post(path)
            .query(query)
            .multipart(upload.to_form()?)
            .send()
            .await?;
        expect_ok(response, ClientError::Inference).await
    }

    /// Post a JSON body, returning the parsed response
    pub(crate) async fn post_json<B, Q>(
        &self,
        path: &str,
        query: &Q,
        body: Option<&B>,
    ) -> Result<Value>
    where
        B: Serialize + ?Sized,
        Q: Serialize + ?Sized,
    {
        let mut request = self.post(path).query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        expect_ok(response, ClientError::Stream).await
    }
}

/// Parse a 200 response as JSON; anything else becomes `on_error` carrying
/// the server's message
async fn expect_ok(response: Response, on_error: fn(String) -> ClientError) -> Result<Value> {
    let status = response.status();
    let body = response.text().await?;
    if status != StatusCode::OK {
        return Err(on_error(format!("HTTP {}: {}", status, server_message(&body))));
    }
    serde_json::from_str(&body).map_err(|e| {
        ClientError::InvalidResponse(format!("{}: {}", e, truncate_body(&body)))
    })
}

/// The `message` field of a JSON error body, or the raw body
pub(crate) fn server_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("message").map(|m| match m.as_str() {
                Some(s) => s.to_string(),
                None => m.to_string(),
            })
        })
        .unwrap_or_else(|| truncate_body(body))
}

pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
