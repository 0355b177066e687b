//! Command handlers for the monzo-receipts CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod auth;
mod demo;
mod init;
mod merchant;
mod receipt;
mod transactions;

use crate::api::{self, Mode};
use crate::{Config, ReceiptsClient, Result};
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use auth::auth;
pub use demo::{demo, DemoSummary};
pub use init::init;
pub use merchant::merchant;
pub use receipt::{receipt_add, receipt_junk, receipt_read};
pub use transactions::transactions;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Creates the API client for `mode` and authenticates, leaving the session `Ready` with the
/// personal account selected.
async fn session(config: &Config, mode: Mode) -> Result<ReceiptsClient> {
    let api = api::client(config, mode).await?;
    let mut client = ReceiptsClient::new(api);
    client.do_auth().await?;
    Ok(client)
}

/// Like `session` but also loads the transactions of the account.
async fn session_with_transactions(config: &Config, mode: Mode) -> Result<ReceiptsClient> {
    let mut client = session(config, mode).await?;
    client.list_transactions().await?;
    Ok(client)
}
