// Bearer token exchange

use crate::error::{ClientError, Result};
use directai_core::Credentials;
use reqwest::{Client, StatusCode};
use tracing::debug;

/// Exchange a client id/secret pair for a bearer token.
///
/// The token is fetched once per run; there is no caching or refresh.
pub async fn obtain_token(
    http: &Client,
    credentials: &Credentials,
    auth_endpoint: &str,
) -> Result<String> {
    debug!("Requesting access token for client {}", credentials.client_id);

    let response = http
        .post(auth_endpoint)
        .query(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ])
        .send()
        .await
        // the request URL carries the client secret
        .map_err(|e| ClientError::HttpRequest(e.without_url()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ClientError::HttpRequest(e.without_url()))?;
    if status != StatusCode::OK {
        return Err(ClientError::Authentication(format!(
            "HTTP {}: {}",
            status,
            crate::client::truncate_body(&body)
        )));
    }

    let json: serde_json::Value = serde_json::from_str(&body)?;
    json.get("access_token")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .ok_or_else(|| ClientError::InvalidResponse("token response has no access_token".to_string()))
}
