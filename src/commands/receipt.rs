//! Receipt command handlers.

use crate::api::Mode;
use crate::args::{AddReceiptArgs, JunkReceiptArgs, ReadReceiptArgs};
use crate::commands::{session, session_with_transactions, Out};
use crate::{Config, Receipt, ReceiptRequest, Result};
use anyhow::ensure;
use serde_json::Value;

/// Reads the receipt stored under `--external-id` and returns the API payload unchanged.
pub async fn receipt_read(
    config: &Config,
    mode: Mode,
    args: &ReadReceiptArgs,
) -> Result<Out<Value>> {
    let mut client = session(config, mode).await?;
    let receipt = client.read_receipt(args.external_id()).await?;
    Ok(Out::new(
        format!("Receipt read: {receipt}"),
        receipt,
    ))
}

/// Uploads a receipt built from `--item` and `--implied` for a transaction of the personal account.
///
/// # Errors
/// - Returns an error if neither `--item` nor `--implied` was given.
/// - Returns an error if the transaction is not one of the personal account's transactions.
/// - Returns an error if the upload is rejected.
pub async fn receipt_add(
    config: &Config,
    mode: Mode,
    args: &AddReceiptArgs,
) -> Result<Out<Receipt>> {
    ensure!(
        !args.items().is_empty() || !args.implied_items().is_empty(),
        "A receipt needs at least one --item or --implied item"
    );
    let request = ReceiptRequest::new(args.implied_items().to_vec(), args.items().to_vec());
    let mut client = session_with_transactions(config, mode).await?;
    let transaction = client.find_transaction(args.transaction_id())?.clone();
    let receipt = client.add_receipt_data(&transaction, &request).await?;
    Ok(Out::new(
        format!(
            "Successfully uploaded receipt {} for {}",
            receipt.external_id, transaction.id
        ),
        receipt,
    ))
}

/// Uploads a receipt with a single placeholder item for a transaction of the personal account.
pub async fn receipt_junk(
    config: &Config,
    mode: Mode,
    args: &JunkReceiptArgs,
) -> Result<Out<Receipt>> {
    let mut client = session_with_transactions(config, mode).await?;
    let transaction = client.find_transaction(args.transaction_id())?.clone();
    let receipt = client.add_junk_data_receipt(&transaction).await?;
    Ok(Out::new(
        format!(
            "Successfully uploaded junk receipt {} for {}",
            receipt.external_id, transaction.id
        ),
        receipt,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;
    use crate::{client_error, receipt_id, ClientError, LineItem, Transaction};

    #[tokio::test]
    async fn test_receipt_add() {
        let env = TestEnv::new().await;
        let args = AddReceiptArgs::new(
            "tx_2",
            vec![LineItem::new("Flat white", 325, 2)],
            vec!["Napkin".to_string()],
        );
        let out = receipt_add(&env.config(), Mode::Test, &args).await.unwrap();
        let receipt = out.structure().unwrap();
        assert_eq!(receipt.external_id, receipt_id(&Transaction::new("tx_2")));
        assert_eq!(receipt.total, 650);
        assert_eq!(receipt.items.len(), 2);
    }

    #[tokio::test]
    async fn test_receipt_add_requires_items() {
        let env = TestEnv::new().await;
        let args = AddReceiptArgs::new("tx_2", Vec::new(), Vec::new());
        assert!(receipt_add(&env.config(), Mode::Test, &args).await.is_err());
    }

    #[tokio::test]
    async fn test_receipt_junk_unknown_transaction() {
        let env = TestEnv::new().await;
        let args = JunkReceiptArgs::new("tx_joint_1");
        let e = receipt_junk(&env.config(), Mode::Test, &args)
            .await
            .unwrap_err();
        assert_eq!(
            client_error(&e),
            Some(&ClientError::UnknownTransaction("tx_joint_1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_receipt_read_missing() {
        let env = TestEnv::new().await;
        let args = ReadReceiptArgs::new("never-uploaded");
        assert!(receipt_read(&env.config(), Mode::Test, &args).await.is_err());
    }
}
