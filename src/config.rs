//! Configuration file handling.
//!
//! The configuration file is stored at `$MONZO_RECEIPTS_HOME/config.json` and holds the API
//! endpoints used for the OAuth flow and REST calls along with the location of the OAuth client
//! credentials.

use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "monzo-receipts";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const CLIENT_SECRET_JSON: &str = "client_secret.json";
const CONFIG_JSON: &str = "config.json";
const DEFAULT_API_URL: &str = "https://api.monzo.com";
const DEFAULT_AUTH_URL: &str = "https://auth.monzo.com";
const DEFAULT_TOKEN_URL: &str = "https://api.monzo.com/oauth2/token";
const DEFAULT_REDIRECT_PORT: u16 = 3030;

/// The OAuth callback listener binds this address and the redirect URI names it, so the browser
/// never has to pick between IPv4 and IPv6 for `localhost`.
pub(crate) const REDIRECT_HOST: &str = "127.0.0.1";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to the home directory and from there it loads `config.json`. It provides paths to the
/// secrets that are expected in a certain location within the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the home directory, its `.secrets` subdirectory and:
    /// - Writes an initial `config.json` file with default settings
    /// - Copies `secret_file` into its default location in the home directory.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the home directory, e.g. `$HOME/monzo-receipts`
    /// - `secret_file` - A JSON file holding the `client_id` and `client_secret` of the OAuth
    ///   client registered in the Monzo developer portal.
    ///
    /// # Errors
    /// - Returns an error if any file operations fail.
    pub async fn create(dir: impl Into<PathBuf>, secret_file: &Path) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;

        let secret_destination = secrets.join(CLIENT_SECRET_JSON);
        utils::copy(secret_file, &secret_destination).await?;
        utils::restrict_permissions(&secret_destination)?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile::default();
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            secrets,
            config_path,
            config_file,
        })
    }

    /// This will
    /// - validate that the home directory and the config file exist
    /// - load the config file
    /// - validate that the secrets directory exists
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The home directory is missing, run 'monzo-receipts init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let config = Self {
            secrets: root.join(SECRETS),
            root,
            config_path,
            config_file,
        };
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn api_url(&self) -> &str {
        &self.config_file.api_url
    }

    pub fn auth_url(&self) -> &str {
        &self.config_file.auth_url
    }

    pub fn token_url(&self) -> &str {
        &self.config_file.token_url
    }

    pub fn redirect_port(&self) -> u16 {
        self.config_file.redirect_port
    }

    /// The URI that the browser is sent back to after the user authorises the client. This must be
    /// registered as a redirect URL for the client in the Monzo developer portal.
    pub fn redirect_uri(&self) -> String {
        format!("http://{REDIRECT_HOST}:{}/callback", self.redirect_port())
    }

    /// Returns the stored `client_secret_path` if it is absolute, otherwise resolves the relative
    /// path against the home directory.
    pub fn client_secret_path(&self) -> PathBuf {
        let p = self
            .config_file
            .client_secret_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(CLIENT_SECRET_JSON));
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "monzo-receipts",
///   "config_version": 1,
///   "api_url": "https://api.monzo.com",
///   "auth_url": "https://auth.monzo.com",
///   "token_url": "https://api.monzo.com/oauth2/token",
///   "redirect_port": 3030,
///   "client_secret_path": ".secrets/client_secret.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "monzo-receipts"
    app_name: String,

    config_version: u8,

    #[serde(default = "default_api_url")]
    api_url: String,

    #[serde(default = "default_auth_url")]
    auth_url: String,

    #[serde(default = "default_token_url")]
    token_url: String,

    /// Port of the local listener that receives the OAuth redirect
    #[serde(default = "default_redirect_port")]
    redirect_port: u16,

    /// Path to the OAuth client credentials file (optional, relative to the home or absolute)
    /// Defaults to $MONZO_RECEIPTS_HOME/.secrets/client_secret.json if not specified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_secret_path: Option<PathBuf>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_redirect_port() -> u16 {
    DEFAULT_REDIRECT_PORT
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            api_url: default_api_url(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            redirect_port: DEFAULT_REDIRECT_PORT,
            client_secret_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from `path` and validates its `app_name`.
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.config_version <= CONFIG_VERSION,
            "Config version {} is unsupported, is a newer version of {} available?",
            config.config_version,
            APP_NAME
        );

        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}
