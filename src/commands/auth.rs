//! Handles the `monzo-receipts auth` command.

use crate::api::Mode;
use crate::commands::{session, Out};
use crate::{Account, Config, Result};
use anyhow::Context;

/// Runs the OAuth consent flow, verifies the token with a test call and selects the personal
/// account.
///
/// The token is not saved, so this is only useful for checking that the OAuth client and the
/// account are set up correctly.
///
/// # Errors
/// Returns an error if the OAuth flow or the test call fail, or no personal account exists.
pub async fn auth(config: &Config, mode: Mode) -> Result<Out<Account>> {
    let client = session(config, mode).await?;
    let account = client
        .account()
        .context("Authentication finished without an account")?
        .clone();
    Ok(Out::new(
        format!("Authenticated, using personal account {}", account.id),
        account,
    ))
}

#[tokio::test]
async fn test_auth_in_test_mode() {
    let env = crate::test::TestEnv::new().await;
    let out = auth(&env.config(), Mode::Test).await.unwrap();
    assert_eq!(out.structure().unwrap().id, "acc_1");
    assert!(out.message().contains("acc_1"));
}
