//! A single-account client of the Monzo transaction receipts API.
//!
//! The client authenticates, picks the user's personal account, loads its transactions and reads
//! or writes receipts for them. Every call other than the authentication test call requires the
//! session to be `Ready`.

use crate::api::{
    ApiClient, ApiResponse, ACCOUNTS, RECEIPT_UPLOAD, TRANSACTIONS, TRANSACTION_RECEIPTS,
};
use crate::model::{
    select_personal_account, Account, Receipt, ReceiptMerchant, ReceiptRequest, Transaction,
};
use crate::{ClientError, Result};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

/// Returned by `transaction_merchant` when the merchant name is not available.
pub const MERCHANT_NONE: &str = "NONE";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticating,
    Ready,
}

/// Holds the OAuth session, the selected account and the most recently listed transactions.
pub struct ReceiptsClient {
    api: Box<dyn ApiClient + Send>,
    state: SessionState,
    account: Option<Account>,
    transactions: Vec<Transaction>,
}

impl ReceiptsClient {
    pub fn new(api: Box<dyn ApiClient + Send>) -> Self {
        Self {
            api,
            state: SessionState::default(),
            account: None,
            transactions: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// The transactions loaded by the last call to `list_transactions`.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Runs the OAuth flow, checks the token with a test call and selects the personal account.
    ///
    /// # Errors
    /// - `ClientError::AuthFailed` if the test call does not report an authenticated session.
    /// - Any error from `resolve_account`.
    pub async fn do_auth(&mut self) -> Result<&Account> {
        self.state = SessionState::Authenticating;
        if let Err(e) = self.authenticate().await {
            self.state = SessionState::Unauthenticated;
            return Err(e);
        }
        self.state = SessionState::Ready;

        self.resolve_account().await
    }

    async fn authenticate(&mut self) -> Result<()> {
        self.api.start_auth().await?;

        info!("OAuth2 flow completed, testing API call...");
        let response = self.api.test_api_call().await?;
        if response.get("authenticated").and_then(Value::as_bool) != Some(true) {
            return Err(ClientError::AuthFailed.into());
        }
        info!("API call test successful!");
        Ok(())
    }

    /// Lists the user's accounts and keeps the first personal (`uk_retail`) one.
    pub async fn resolve_account(&mut self) -> Result<&Account> {
        self.ensure_ready()?;
        info!("Retrieving account information...");
        let response = self.api.get(ACCOUNTS, &[]).await?;
        let body = check(response, "List accounts")?;
        let accounts: Vec<Account> = match body.get("accounts") {
            Some(accounts) => field(accounts, "List accounts")?,
            None => return Err(ClientError::NoAccounts.into()),
        };
        if accounts.is_empty() {
            return Err(ClientError::NoAccounts.into());
        }
        let account = select_personal_account(&accounts)
            .ok_or(ClientError::NoPersonalAccount)?
            .clone();
        info!("Retrieved account information.");
        debug!("Selected account {}", account.id);
        Ok(self.account.insert(account))
    }

    /// Loads every transaction of the selected account in one unpaginated call, replacing the
    /// previously loaded list. Accounts with many transactions make this slow.
    pub async fn list_transactions(&mut self) -> Result<&[Transaction]> {
        let account_id = self.account_id()?.to_string();
        let response = self
            .api
            .get(TRANSACTIONS, &[("account_id", account_id.as_str())])
            .await?;
        let body = check(response, "List transactions")?;
        let transactions = body
            .get("transactions")
            .ok_or_else(|| ClientError::missing("List transactions", "transactions"))?;
        self.transactions = field(transactions, "List transactions")?;
        info!("All transactions loaded.");
        debug!("Loaded {} transactions", self.transactions.len());
        Ok(&self.transactions)
    }

    /// Finds a loaded transaction by id.
    pub fn find_transaction(&self, transaction_id: &str) -> Result<&Transaction> {
        Ok(self
            .transactions
            .iter()
            .find(|t| t.id == transaction_id)
            .ok_or_else(|| ClientError::UnknownTransaction(transaction_id.to_string()))?)
    }

    /// Reads the receipt that was stored under `external_id`. The payload is returned as is.
    pub async fn read_receipt(&mut self, external_id: &str) -> Result<Value> {
        self.ensure_ready()?;
        let response = self
            .api
            .get(TRANSACTION_RECEIPTS, &[("external_id", external_id)])
            .await?;
        let body = check(response, "Load receipt")?;
        info!("Receipt read: {external_id}");
        Ok(body)
    }

    /// Builds the receipt for `transaction` from `request` and uploads it. The external id is
    /// derived from the transaction, so a second upload replaces the first. Listed transactions
    /// only carry the merchant id, so the merchant name is looked up when it is missing.
    pub async fn add_receipt_data(
        &mut self,
        transaction: &Transaction,
        request: &ReceiptRequest,
    ) -> Result<Receipt> {
        self.ensure_ready()?;
        let mut receipt = Receipt::new(transaction, request);
        if receipt.merchant.is_none() {
            receipt.merchant = self
                .merchant_name(transaction)
                .await?
                .map(ReceiptMerchant::new);
        }
        let body = receipt.marshal()?;
        let response = self.api.put(RECEIPT_UPLOAD, &body).await?;
        let response = check(response, "Upload receipt")?;
        info!(
            "Successfully uploaded receipt {}: {response}",
            receipt.external_id
        );
        Ok(receipt)
    }

    /// Replaces the receipt of `transaction` with a single placeholder item. For demonstration
    /// only.
    pub async fn add_junk_data_receipt(&mut self, transaction: &Transaction) -> Result<Receipt> {
        self.add_receipt_data(transaction, &ReceiptRequest::junk())
            .await
    }

    /// Fetches `transaction` with its merchant expanded and returns the merchant name.
    ///
    /// Returns `Ok(None)` when the transaction has no merchant or the merchant has no name.
    ///
    /// # Errors
    /// Transport failures, non-success responses and a response without `transaction` are errors.
    pub async fn merchant_name(&mut self, transaction: &Transaction) -> Result<Option<String>> {
        self.ensure_ready()?;
        let path = format!("{TRANSACTIONS}/{}", transaction.id);
        let response = self.api.get(&path, &[("expand[]", "merchant")]).await?;
        let body = check(response, "Get transaction")?;
        let expanded = body
            .get("transaction")
            .ok_or_else(|| ClientError::missing("Get transaction", "transaction"))?;
        Ok(expanded
            .get("merchant")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Like `merchant_name` but falls back to `MERCHANT_NONE`.
    pub async fn transaction_merchant(&mut self, transaction: &Transaction) -> Result<String> {
        Ok(self
            .merchant_name(transaction)
            .await?
            .unwrap_or_else(|| MERCHANT_NONE.to_string()))
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            SessionState::Ready => Ok(()),
            _ => Err(ClientError::NotReady.into()),
        }
    }

    fn account_id(&self) -> Result<&str> {
        self.ensure_ready()?;
        self.account
            .as_ref()
            .map(|a| a.id.as_str())
            .context("No account has been resolved")
    }
}

/// Turns an unsuccessful response into `ClientError::Request`, otherwise returns the body.
fn check(response: ApiResponse, operation: &str) -> Result<Value> {
    if !response.success {
        return Err(ClientError::request(operation, response.status, response.body).into());
    }
    Ok(response.body)
}

fn field<T: DeserializeOwned>(value: &Value, operation: &str) -> Result<T> {
    T::deserialize(value).with_context(|| format!("{operation} returned an unexpected shape"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Method, TestClient, TestState};
    use crate::model::receipt_id;
    use crate::client_error;
    use serde_json::json;

    fn client(state: TestState) -> (ReceiptsClient, TestClient) {
        let api = TestClient::new(state);
        (ReceiptsClient::new(Box::new(api.clone())), api)
    }

    async fn ready(state: TestState) -> (ReceiptsClient, TestClient) {
        let (mut client, api) = client(state);
        client.do_auth().await.unwrap();
        (client, api)
    }

    #[tokio::test]
    async fn test_calls_before_auth_are_rejected() {
        let (mut client, api) = client(TestState::seeded());
        let tx = Transaction::new("tx_1");
        let mut errors = Vec::new();
        errors.push(client.resolve_account().await.unwrap_err());
        errors.push(client.list_transactions().await.unwrap_err());
        errors.push(client.read_receipt("r").await.unwrap_err());
        errors.push(client.add_junk_data_receipt(&tx).await.unwrap_err());
        errors.push(client.merchant_name(&tx).await.unwrap_err());
        for e in errors {
            assert_eq!(client_error(&e), Some(&ClientError::NotReady));
        }
        assert!(api.requests().is_empty());
        assert_eq!(client.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_auth_selects_personal_account() {
        let (mut client, _api) = client(TestState::seeded());
        let account = client.do_auth().await.unwrap();
        assert_eq!(account.id, "acc_1");
        assert_eq!(client.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_auth_fails_without_marker() {
        let (mut client, api) = client(TestState::seeded());
        api.set_response(
            Method::Get,
            crate::api::WHOAMI,
            ApiResponse::ok(json!({"client_id": "oauth2client_test"})),
        );
        let e = client.do_auth().await.unwrap_err();
        assert_eq!(client_error(&e), Some(&ClientError::AuthFailed));
        assert_eq!(client.state(), SessionState::Unauthenticated);
        assert!(client.list_transactions().await.is_err());
    }

    #[tokio::test]
    async fn test_no_personal_account() {
        let mut state = TestState::seeded();
        state.accounts.retain(|a| a["type"] != "uk_retail");
        let (mut client, _api) = client(state);
        let e = client.do_auth().await.unwrap_err();
        assert_eq!(client_error(&e), Some(&ClientError::NoPersonalAccount));
    }

    #[tokio::test]
    async fn test_no_accounts() {
        let (mut client, api) = client(TestState::empty());
        let e = client.do_auth().await.unwrap_err();
        assert_eq!(client_error(&e), Some(&ClientError::NoAccounts));

        api.set_response(Method::Get, ACCOUNTS, ApiResponse::ok(json!({})));
        let e = client.resolve_account().await.unwrap_err();
        assert_eq!(client_error(&e), Some(&ClientError::NoAccounts));
    }

    #[tokio::test]
    async fn test_accounts_request_failure() {
        let (mut client, api) = client(TestState::seeded());
        api.set_response(
            Method::Get,
            ACCOUNTS,
            ApiResponse::failed(500, json!({"code": "internal_service"})),
        );
        let e = client.do_auth().await.unwrap_err();
        match client_error(&e) {
            Some(ClientError::Request { status, .. }) => assert_eq!(*status, 500),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_transactions() {
        let (mut client, api) = ready(TestState::seeded()).await;
        let ids: Vec<String> = client
            .list_transactions()
            .await
            .unwrap()
            .iter()
            .map(|t| t.id.clone())
            .collect();
        assert_eq!(ids, vec!["tx_1", "tx_2"]);
        let last = api.requests().pop().unwrap();
        assert_eq!(last.path, TRANSACTIONS);
        assert_eq!(last.param("account_id"), Some("acc_1"));
    }

    #[tokio::test]
    async fn test_list_transactions_replaces_and_empties() {
        let (mut client, api) = ready(TestState::seeded()).await;
        assert_eq!(client.list_transactions().await.unwrap().len(), 2);
        api.set_response(
            Method::Get,
            TRANSACTIONS,
            ApiResponse::ok(json!({"transactions": []})),
        );
        assert!(client.list_transactions().await.unwrap().is_empty());
        assert!(client.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_list_transactions_missing_key() {
        let (mut client, api) = ready(TestState::seeded()).await;
        api.set_response(Method::Get, TRANSACTIONS, ApiResponse::ok(json!({})));
        let e = client.list_transactions().await.unwrap_err();
        assert_eq!(
            client_error(&e),
            Some(&ClientError::missing("List transactions", "transactions"))
        );
    }

    #[tokio::test]
    async fn test_find_transaction() {
        let (mut client, _api) = ready(TestState::seeded()).await;
        client.list_transactions().await.unwrap();
        assert_eq!(client.find_transaction("tx_2").unwrap().id, "tx_2");
        let e = client.find_transaction("tx_joint_1").unwrap_err();
        assert_eq!(
            client_error(&e),
            Some(&ClientError::UnknownTransaction("tx_joint_1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_merchant_lookup() {
        let (mut client, api) = ready(TestState::seeded()).await;
        let tx = Transaction::new("tx_1");
        assert_eq!(client.transaction_merchant(&tx).await.unwrap(), "Acme");
        let last = api.requests().pop().unwrap();
        assert_eq!(last.path, "transactions/tx_1");
        assert_eq!(last.param("expand[]"), Some("merchant"));

        let joint = Transaction::new("tx_joint_1");
        assert_eq!(client.merchant_name(&joint).await.unwrap(), None);
        assert_eq!(
            client.transaction_merchant(&joint).await.unwrap(),
            MERCHANT_NONE
        );
    }

    #[tokio::test]
    async fn test_merchant_lookup_without_merchant_field() {
        let (mut client, api) = ready(TestState::seeded()).await;
        api.set_response(
            Method::Get,
            "transactions/tx_1",
            ApiResponse::ok(json!({"transaction": {"id": "tx_1", "amount": -99}})),
        );
        let tx = Transaction::new("tx_1");
        assert_eq!(client.transaction_merchant(&tx).await.unwrap(), "NONE");
    }

    #[tokio::test]
    async fn test_merchant_lookup_errors_are_not_swallowed() {
        let (mut client, api) = ready(TestState::seeded()).await;
        let tx = Transaction::new("tx_1");
        api.set_response(Method::Get, "transactions/tx_1", ApiResponse::ok(json!({})));
        let e = client.transaction_merchant(&tx).await.unwrap_err();
        assert_eq!(
            client_error(&e),
            Some(&ClientError::missing("Get transaction", "transaction"))
        );

        let unknown = Transaction::new("tx_nope");
        let e = client.transaction_merchant(&unknown).await.unwrap_err();
        assert!(matches!(
            client_error(&e),
            Some(ClientError::Request { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_junk_receipt_upload() {
        let (mut client, api) = ready(TestState::seeded()).await;
        let tx = Transaction::new("tx_1");
        let receipt = client.add_junk_data_receipt(&tx).await.unwrap();
        assert_eq!(receipt.external_id, receipt_id(&tx));

        let put = api.requests().pop().unwrap();
        assert_eq!(put.method, Method::Put);
        assert_eq!(put.path, RECEIPT_UPLOAD);
        let body = put.body.unwrap();
        assert_eq!(body["external_id"], receipt_id(&tx).as_str());
        assert_eq!(body["items"][0]["description"], "Junk Item");
        assert_eq!(body["items"][0]["amount"], 99);
        assert_eq!(body["items"][0]["quantity"], 1);
    }

    #[tokio::test]
    async fn test_receipt_upload_is_idempotent() {
        let (mut client, api) = ready(TestState::seeded()).await;
        let tx = Transaction::new("tx_2");
        client.add_junk_data_receipt(&tx).await.unwrap();
        let request = ReceiptRequest::new(
            vec!["Napkin".to_string()],
            vec![crate::LineItem::new("Flat white", 325, 1)],
        );
        client.add_receipt_data(&tx, &request).await.unwrap();

        let receipts = api.state().receipts;
        assert_eq!(receipts.len(), 1);
        let stored = receipts.get(&receipt_id(&tx)).unwrap();
        assert_eq!(stored["items"][0]["description"], "Flat white");
        assert_eq!(stored["items"][1]["description"], "Napkin");
    }

    #[tokio::test]
    async fn test_receipt_upload_failure() {
        let (mut client, api) = ready(TestState::seeded()).await;
        api.set_response(
            Method::Put,
            RECEIPT_UPLOAD,
            ApiResponse::failed(400, json!({"code": "bad_request.invalid_receipt"})),
        );
        let e = client
            .add_junk_data_receipt(&Transaction::new("tx_1"))
            .await
            .unwrap_err();
        assert!(e.to_string().contains("Upload receipt failed with status 400"));
    }

    #[tokio::test]
    async fn test_read_receipt() {
        let (mut client, _api) = ready(TestState::seeded()).await;
        let e = client.read_receipt("missing").await.unwrap_err();
        assert!(matches!(
            client_error(&e),
            Some(ClientError::Request { status: 404, .. })
        ));

        let tx = Transaction::new("tx_1");
        let receipt = client.add_junk_data_receipt(&tx).await.unwrap();
        let read = client.read_receipt(&receipt.external_id).await.unwrap();
        assert_eq!(read["receipt"]["transaction_id"], "tx_1");
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let (mut client, api) = client(TestState::seeded());
        assert_eq!(client.do_auth().await.unwrap().id, "acc_1");
        let transactions = client.list_transactions().await.unwrap().to_vec();
        assert_eq!(transactions.len(), 2);
        client.add_junk_data_receipt(&transactions[0]).await.unwrap();

        let put = api
            .requests()
            .into_iter()
            .find(|r| r.method == Method::Put)
            .unwrap();
        let body = put.body.unwrap();
        assert_eq!(body["external_id"], receipt_id(&transactions[0]).as_str());
        assert_eq!(body["merchant"]["name"], "Acme");
    }

    #[tokio::test]
    async fn test_receipt_without_merchant_omits_it() {
        let (mut client, api) = ready(TestState::seeded()).await;
        let tx = Transaction::new("tx_joint_1");
        let receipt = client.add_junk_data_receipt(&tx).await.unwrap();
        assert_eq!(receipt.merchant, None);
        let put = api.requests().pop().unwrap();
        assert!(put.body.unwrap().get("merchant").is_none());
    }
}
