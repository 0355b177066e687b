//! The OAuth collaborator and authenticated HTTP wrapper used by the receipts client.
//!
//! `ApiClient` is the seam: `MonzoClient` talks to the real API and `TestClient` answers from
//! memory so the whole program can run top-to-bottom without network access.

mod files;
mod monzo_client;
mod oauth;
mod test_client;

use crate::{Config, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub use test_client::{Method, RecordedRequest, TestClient, TestState};

pub(crate) const WHOAMI: &str = "ping/whoami";
pub(crate) const ACCOUNTS: &str = "accounts";
pub(crate) const TRANSACTIONS: &str = "transactions";
pub(crate) const TRANSACTION_RECEIPTS: &str = "transaction-receipts";
pub(crate) const RECEIPT_UPLOAD: &str = "transaction-receipts/";

/// When this environment variable is set and non-empty the program runs against `TestClient`.
const TEST_MODE_ENV: &str = "MONZO_RECEIPTS_IN_TEST_MODE";

/// The outcome of a request that reached the API: whether it succeeded and the parsed body. When
/// the body is not JSON it is carried as a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub success: bool,
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            success: true,
            status: 200,
            body,
        }
    }

    pub fn failed(status: u16, body: Value) -> Self {
        Self {
            success: false,
            status,
            body,
        }
    }
}

/// The operations the receipts client needs from the provider.
#[async_trait::async_trait]
pub trait ApiClient {
    /// Runs the interactive OAuth2 authorization-code flow and keeps the resulting bearer token.
    async fn start_auth(&mut self) -> Result<()>;

    /// A lightweight authenticated request. The returned payload should carry an `authenticated`
    /// marker when the token works.
    async fn test_api_call(&mut self) -> Result<Value>;

    /// `GET {path}?{params}`. `Err` means no response was received at all.
    async fn get(&mut self, path: &str, params: &[(&str, &str)]) -> Result<ApiResponse>;

    /// `PUT {path}` with a JSON `body`. `Err` means no response was received at all.
    async fn put(&mut self, path: &str, body: &Value) -> Result<ApiResponse>;
}

/// Selects the real Monzo API or the in-memory test provider.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Monzo,
    Test,
}

serde_plain::derive_display_from_serialize!(Mode);
serde_plain::derive_fromstr_from_deserialize!(Mode);

impl Mode {
    /// `Mode::Test` when `MONZO_RECEIPTS_IN_TEST_MODE` is set and non-empty, otherwise
    /// `Mode::Monzo`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Monzo,
        }
    }
}

/// Creates the `ApiClient` for `mode`.
pub(crate) async fn client(config: &Config, mode: Mode) -> Result<Box<dyn ApiClient + Send>> {
    debug!("Creating the {mode} API client");
    Ok(match mode {
        Mode::Monzo => Box::new(monzo_client::MonzoClient::new(config.clone()).await?),
        Mode::Test => Box::new(TestClient::default()),
    })
}

#[test]
fn test_mode_display_and_parse() {
    assert_eq!(Mode::Test.to_string(), "test");
    assert_eq!("monzo".parse::<Mode>().unwrap(), Mode::Monzo);
}
