//! Serialization and deserialization structures for the OAuth client credentials file.

use crate::{utils, Result};
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Represents `client_secret.json`, holding the credentials of the confidential OAuth client
/// created in the Monzo developer portal.
///
/// Example:
/// ```json
/// {
///   "client_id": "oauth2client_00009abc",
///   "client_secret": "mnzconf.XXXXXXXX"
/// }
/// ```
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub(super) struct SecretFile {
    client_id: String,
    client_secret: String,
}

impl SecretFile {
    /// Loads the OAuth client credentials and checks that neither value is empty.
    pub(super) async fn load(path: &Path) -> Result<SecretFile> {
        let secret: SecretFile = utils::deserialize(path)
            .await
            .context("Unable to read the OAuth client secret file")?;
        ensure!(
            !secret.client_id.trim().is_empty(),
            "The client_id in {} is empty",
            path.display()
        );
        ensure!(
            !secret.client_secret.trim().is_empty(),
            "The client_secret in {} is empty",
            path.display()
        );
        Ok(secret)
    }

    pub(super) fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(super) fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

#[tokio::test]
async fn test_client_secret_good() {
    use tempfile::TempDir;

    let json_data = r#"{"client_id": "oauth2client_1", "client_secret": "mnzconf.abc"}"#;
    let temp_dir = TempDir::new().unwrap();
    let p = temp_dir.path().join("file.json");
    utils::write(&p, json_data).await.unwrap();
    let secret_file = SecretFile::load(&p).await.unwrap();
    assert_eq!("oauth2client_1", secret_file.client_id());
    assert_eq!("mnzconf.abc", secret_file.client_secret());
}

#[tokio::test]
async fn test_client_secret_empty_id() {
    use tempfile::TempDir;

    let json_data = r#"{"client_id": " ", "client_secret": "mnzconf.abc"}"#;
    let temp_dir = TempDir::new().unwrap();
    let p = temp_dir.path().join("file.json");
    utils::write(&p, json_data).await.unwrap();
    let message = SecretFile::load(&p).await.unwrap_err().to_string();
    assert!(message.contains("client_id"));
}

#[tokio::test]
async fn test_client_secret_missing_field() {
    use tempfile::TempDir;

    let json_data = r#"{"client_id": "oauth2client_1"}"#;
    let temp_dir = TempDir::new().unwrap();
    let p = temp_dir.path().join("file.json");
    utils::write(&p, json_data).await.unwrap();
    assert!(SecretFile::load(&p).await.is_err());
}
