//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::Config;
use tempfile::TempDir;

/// Test environment that sets up a home directory with a Config and a client secret.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("monzo-receipts");
        let secret_path = temp_dir.path().join("client_secret.json");

        let secret_content = r#"{
            "client_id": "oauth2client_test",
            "client_secret": "mnzconf.test-secret"
        }"#;
        std::fs::write(&secret_path, secret_content).unwrap();

        let config = Config::create(&root, &secret_path).await.unwrap();

        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    pub fn config(&self) -> Config {
        self.config.clone()
    }
}
