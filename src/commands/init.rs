use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the home directory, its subdirectories and:
/// - Creates an initial `config.json` file with default settings
/// - Copies `secret_file` into its default location in the home directory.
///
/// # Arguments
/// - `home` - The directory that will be the home directory, e.g. `$HOME/monzo-receipts`
/// - `secret_file` - The JSON file holding the `client_id` and `client_secret` of the Monzo OAuth
///   client.
///
/// # Errors
/// - Returns an error if any file operations fail.
pub async fn init(home: &Path, secret_file: &Path) -> Result<Out<()>> {
    let config = Config::create(home, secret_file)
        .await
        .context("Unable to create the home directory and configs")?;
    Ok(format!(
        "Successfully created the configuration at {}",
        config.config_path().display()
    )
    .into())
}

#[tokio::test]
async fn test_init() {
    let tmp = tempfile::TempDir::new().unwrap();
    let secret = tmp.path().join("secret.json");
    crate::utils::write(&secret, r#"{"client_id":"c","client_secret":"s"}"#)
        .await
        .unwrap();
    let home = tmp.path().join("home");
    let out = init(&home, &secret).await.unwrap();
    assert!(out.message().contains("config.json"));
    assert!(Config::load(&home).await.is_ok());
}

#[tokio::test]
async fn test_init_missing_secret() {
    let tmp = tempfile::TempDir::new().unwrap();
    let home = tmp.path().join("home");
    assert!(init(&home, &tmp.path().join("nope.json")).await.is_err());
}
