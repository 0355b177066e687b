use crate::api::Mode;
use crate::args::MerchantArgs;
use crate::commands::{session, Out};
use crate::{Config, Result, Transaction};

/// Looks up the merchant name of a transaction. Prints `NONE` when the transaction has no named
/// merchant.
///
/// The transaction is looked up directly by id, so it does not need to belong to the personal
/// account's loaded transactions.
pub async fn merchant(config: &Config, mode: Mode, args: &MerchantArgs) -> Result<Out<String>> {
    let mut client = session(config, mode).await?;
    let transaction = Transaction::new(args.transaction_id());
    let name = client.transaction_merchant(&transaction).await?;
    Ok(Out::new(
        format!("Merchant of {}: {name}", transaction.id),
        name,
    ))
}

#[tokio::test]
async fn test_merchant_in_test_mode() {
    let env = crate::test::TestEnv::new().await;
    let config = env.config();

    let out = merchant(&config, Mode::Test, &MerchantArgs::new("tx_2"))
        .await
        .unwrap();
    assert_eq!(out.structure().unwrap(), "Pret A Manger");

    let out = merchant(&config, Mode::Test, &MerchantArgs::new("tx_joint_1"))
        .await
        .unwrap();
    assert_eq!(out.structure().unwrap(), "NONE");

    assert!(merchant(&config, Mode::Test, &MerchantArgs::new("tx_nope"))
        .await
        .is_err());
}
