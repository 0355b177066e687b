use crate::api::Mode;
use crate::commands::{session_with_transactions, Out};
use crate::{Config, Result, Transaction};

/// Lists every transaction of the personal account. The transactions are returned as the
/// structured output.
pub async fn transactions(config: &Config, mode: Mode) -> Result<Out<Vec<Transaction>>> {
    let client = session_with_transactions(config, mode).await?;
    let transactions = client.transactions().to_vec();
    Ok(Out::new(
        format!("Loaded {} transactions", transactions.len()),
        transactions,
    ))
}

#[tokio::test]
async fn test_transactions_in_test_mode() {
    let env = crate::test::TestEnv::new().await;
    let out = transactions(&env.config(), Mode::Test).await.unwrap();
    assert_eq!(out.message(), "Loaded 2 transactions");
    assert_eq!(out.structure().unwrap()[1].id, "tx_2");
}
