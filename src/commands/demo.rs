use crate::api::Mode;
use crate::commands::{session_with_transactions, Out};
use crate::{Config, Receipt, Result};
use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// What the demo did, for the structured output.
#[derive(Debug, Clone, Serialize)]
pub struct DemoSummary {
    pub account_id: String,
    pub transaction_count: usize,
    pub merchant: String,
    pub uploaded: Receipt,
    pub read_back: Value,
}

/// Walks through the whole API: authenticate, list transactions, replace the receipt of the first
/// transaction with a junk item and read it back by its derived external id.
///
/// This overwrites a real receipt when run against Monzo.
pub async fn demo(config: &Config, mode: Mode) -> Result<Out<DemoSummary>> {
    let mut client = session_with_transactions(config, mode).await?;
    let account_id = client
        .account()
        .map(|a| a.id.clone())
        .context("Authentication finished without an account")?;
    let transaction = client
        .transactions()
        .first()
        .cloned()
        .context("The account has no transactions to attach a receipt to")?;
    let transaction_count = client.transactions().len();

    let merchant = client.transaction_merchant(&transaction).await?;
    info!("First transaction {} is from {merchant}", transaction.id);

    let uploaded = client.add_junk_data_receipt(&transaction).await?;
    let read_back = client.read_receipt(&uploaded.external_id).await?;

    Ok(Out::new(
        format!(
            "Uploaded and read back receipt {} for transaction {}",
            uploaded.external_id, transaction.id
        ),
        DemoSummary {
            account_id,
            transaction_count,
            merchant,
            uploaded,
            read_back,
        },
    ))
}

#[tokio::test]
async fn test_demo_in_test_mode() {
    let env = crate::test::TestEnv::new().await;
    let out = demo(&env.config(), Mode::Test).await.unwrap();
    let summary = out.structure().unwrap();
    assert_eq!(summary.account_id, "acc_1");
    assert_eq!(summary.transaction_count, 2);
    assert_eq!(summary.merchant, "Acme");
    assert_eq!(
        summary.uploaded.external_id,
        crate::receipt_id(&crate::Transaction::new("tx_1"))
    );
    assert_eq!(
        summary.read_back["receipt"]["external_id"],
        summary.uploaded.external_id.as_str()
    );
}
