// Shared fixtures for the integration tests

#![allow(dead_code)]

use directai_client::DirectAIClient;
use directai_core::{ClientConfig, Credentials};
use mockito::{Matcher, Mock, ServerGuard};
use std::fs;
use std::path::Path;

pub const TOKEN: &str = "integration-token";

/// Mock the token endpoint and authenticate against it.
/// The returned mock must stay alive for the rest of the test.
pub async fn connect(server: &mut ServerGuard) -> (DirectAIClient, Mock) {
    let token = server
        .mock("POST", "/token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("client_id".into(), "test-id".into()),
            Matcher::UrlEncoded("client_secret".into(), "test-secret".into()),
        ]))
        .with_status(200)
        .with_body(format!(r#"{{"access_token": "{}"}}"#, TOKEN))
        .create_async()
        .await;

    let client = DirectAIClient::connect(config_for(server), &credentials())
        .await
        .unwrap();
    (client, token)
}

pub fn config_for(server: &ServerGuard) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.base_url = server.url();
    config
}

pub fn credentials() -> Credentials {
    Credentials::new("test-id", "test-secret")
}

pub fn bearer() -> String {
    format!("Bearer {}", TOKEN)
}

pub async fn mock_deploy(server: &mut ServerGuard, path: &str, id: &str) -> Mock {
    server
        .mock("POST", path)
        .match_header("authorization", bearer().as_str())
        .with_status(200)
        .with_body(format!(r#"{{"deployed_id": "{}"}}"#, id))
        .create_async()
        .await
}

pub fn write_files(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for name in names {
        fs::write(dir.join(name), format!("bytes of {}", name)).unwrap();
    }
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
