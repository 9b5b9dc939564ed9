// Shared fixtures for the unit tests

use crate::client::DirectAIClient;
use directai_core::ClientConfig;
use std::fs;
use std::path::Path;

pub(crate) const TOKEN: &str = "test-token";
pub(crate) const BEARER: &str = "Bearer test-token";

/// Client pointed at a mock server with a pre-issued token
pub(crate) fn client_for(server: &mockito::ServerGuard) -> DirectAIClient {
    let mut config = ClientConfig::default();
    config.base_url = server.url();
    DirectAIClient::with_token(config, TOKEN).unwrap()
}

/// Write small text files under `dir`; the mock server never decodes them
pub(crate) fn write_inputs(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for name in names {
        fs::write(dir.join(name), format!("image bytes of {}", name)).unwrap();
    }
}

pub(crate) fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
