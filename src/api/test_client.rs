//! Implements the `ApiClient` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without talking to Monzo.

use crate::api::{
    ApiClient, ApiResponse, ACCOUNTS, RECEIPT_UPLOAD, TRANSACTIONS, TRANSACTION_RECEIPTS, WHOAMI,
};
use crate::Result;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
}

/// A request as it was received by the `TestClient`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RecordedRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The provider-side data held by a `TestClient`.
#[derive(Debug, Clone, Default)]
pub struct TestState {
    pub authenticated: bool,
    pub accounts: Vec<Value>,
    /// Transactions with their merchant expanded. `account_id` scopes them to an account.
    pub transactions: Vec<Value>,
    /// Uploaded receipts keyed by external id
    pub receipts: BTreeMap<String, Value>,
    /// Canned responses that take precedence over the built-in routes
    pub overrides: HashMap<(Method, String), ApiResponse>,
    pub requests: Vec<RecordedRequest>,
}

impl TestState {
    /// An empty provider with no accounts or transactions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Seed data: a prepaid, a joint and a personal account, two transactions on the personal
    /// account `acc_1` and one on the joint account.
    pub fn seeded() -> Self {
        Self {
            accounts: vec![
                json!({"id": "acc_prepaid", "type": "uk_prepaid", "description": "prepaid"}),
                json!({"id": "acc_joint", "type": "uk_retail_joint", "description": "joint"}),
                json!({"id": "acc_1", "type": "uk_retail", "description": "user_00009test"}),
            ],
            transactions: vec![
                json!({
                    "id": "tx_1",
                    "account_id": "acc_1",
                    "amount": -99,
                    "currency": "GBP",
                    "created": "2025-10-20T09:15:30.000Z",
                    "description": "ACME STORES",
                    "merchant": {"id": "merch_acme", "name": "Acme"},
                }),
                json!({
                    "id": "tx_2",
                    "account_id": "acc_1",
                    "amount": -675,
                    "currency": "GBP",
                    "created": "2025-10-19T08:45:12.000Z",
                    "description": "PRET A MANGER",
                    "merchant": {"id": "merch_pret", "name": "Pret A Manger"},
                }),
                json!({
                    "id": "tx_joint_1",
                    "account_id": "acc_joint",
                    "amount": -14267,
                    "currency": "GBP",
                    "created": "2025-10-16T06:00:00.000Z",
                    "description": "OCTOPUS ENERGY",
                    "merchant": null,
                }),
            ],
            ..Self::default()
        }
    }
}

/// An implementation of the `ApiClient` trait that answers from memory. Clones share the same
/// state, so a test can keep a handle while the client itself is boxed inside a `ReceiptsClient`.
#[derive(Debug, Clone)]
pub struct TestClient {
    state: Arc<Mutex<TestState>>,
}

impl Default for TestClient {
    /// Uses the seed data from `TestState::seeded`.
    fn default() -> Self {
        Self::new(TestState::seeded())
    }
}

impl TestClient {
    pub fn new(state: TestState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> TestState {
        self.lock().clone()
    }

    /// Makes `method path` answer with `response` regardless of the stored data.
    pub fn set_response(&self, method: Method, path: &str, response: ApiResponse) {
        self.lock()
            .overrides
            .insert((method, path.to_string()), response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, TestState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, method: Method, path: &str, params: &[(&str, &str)], body: Option<&Value>) {
        self.lock().requests.push(RecordedRequest {
            method,
            path: path.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.cloned(),
        });
    }

    fn route_get(&self, path: &str, params: &[(&str, &str)]) -> ApiResponse {
        let state = self.lock();
        if let Some(response) = state.overrides.get(&(Method::Get, path.to_string())) {
            return response.clone();
        }
        if !state.authenticated {
            return unauthorized();
        }
        let param = |key: &str| params.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);

        match path {
            WHOAMI => ApiResponse::ok(json!({
                "authenticated": true,
                "client_id": "oauth2client_test",
                "user_id": "user_00009test",
            })),
            ACCOUNTS => ApiResponse::ok(json!({ "accounts": state.accounts })),
            TRANSACTIONS => {
                let Some(account_id) = param("account_id") else {
                    return bad_request("account_id is required");
                };
                let transactions: Vec<Value> = state
                    .transactions
                    .iter()
                    .filter(|t| t.get("account_id").and_then(Value::as_str) == Some(account_id))
                    .map(collapse_merchant)
                    .collect();
                ApiResponse::ok(json!({ "transactions": transactions }))
            }
            TRANSACTION_RECEIPTS => {
                let Some(external_id) = param("external_id") else {
                    return bad_request("external_id is required");
                };
                match state.receipts.get(external_id) {
                    Some(receipt) => ApiResponse::ok(json!({ "receipt": receipt })),
                    None => not_found(),
                }
            }
            _ => {
                let Some(id) = path.strip_prefix("transactions/") else {
                    return not_found();
                };
                let Some(transaction) = state
                    .transactions
                    .iter()
                    .find(|t| t.get("id").and_then(Value::as_str) == Some(id))
                else {
                    return not_found();
                };
                let transaction = if param("expand[]") == Some("merchant") {
                    transaction.clone()
                } else {
                    collapse_merchant(transaction)
                };
                ApiResponse::ok(json!({ "transaction": transaction }))
            }
        }
    }

    fn route_put(&self, path: &str, body: &Value) -> ApiResponse {
        let mut state = self.lock();
        if let Some(response) = state.overrides.get(&(Method::Put, path.to_string())) {
            return response.clone();
        }
        if !state.authenticated {
            return unauthorized();
        }
        if path != RECEIPT_UPLOAD && path != TRANSACTION_RECEIPTS {
            return not_found();
        }
        let Some(external_id) = body.get("external_id").and_then(Value::as_str) else {
            return bad_request("external_id is required");
        };
        let known = body
            .get("transaction_id")
            .and_then(Value::as_str)
            .map(|id| {
                state
                    .transactions
                    .iter()
                    .any(|t| t.get("id").and_then(Value::as_str) == Some(id))
            })
            .unwrap_or(false);
        if !known {
            return bad_request("transaction_id does not match a transaction");
        }
        state.receipts.insert(external_id.to_string(), body.clone());
        ApiResponse::ok(json!({}))
    }
}

#[async_trait::async_trait]
impl ApiClient for TestClient {
    async fn start_auth(&mut self) -> Result<()> {
        self.lock().authenticated = true;
        Ok(())
    }

    async fn test_api_call(&mut self) -> Result<Value> {
        self.record(Method::Get, WHOAMI, &[], None);
        Ok(self.route_get(WHOAMI, &[]).body)
    }

    async fn get(&mut self, path: &str, params: &[(&str, &str)]) -> Result<ApiResponse> {
        self.record(Method::Get, path, params, None);
        Ok(self.route_get(path, params))
    }

    async fn put(&mut self, path: &str, body: &Value) -> Result<ApiResponse> {
        self.record(Method::Put, path, &[], Some(body));
        Ok(self.route_put(path, body))
    }
}

/// The list endpoints return the merchant id only, unless the merchant is expanded.
fn collapse_merchant(transaction: &Value) -> Value {
    let mut transaction = transaction.clone();
    if let Some(merchant) = transaction.get_mut("merchant") {
        if let Some(id) = merchant.get("id").cloned() {
            *merchant = id;
        }
    }
    transaction
}

fn unauthorized() -> ApiResponse {
    ApiResponse::failed(
        401,
        json!({"code": "unauthorized.bad_access_token", "message": "Access token is invalid"}),
    )
}

fn bad_request(message: &str) -> ApiResponse {
    ApiResponse::failed(400, json!({"code": "bad_request", "message": message}))
}

fn not_found() -> ApiResponse {
    ApiResponse::failed(404, json!({"code": "not_found", "message": "Not found"}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requires_auth() {
        let mut client = TestClient::default();
        let response = client.get(ACCOUNTS, &[]).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.status, 401);
        assert_eq!(
            client.test_api_call().await.unwrap().get("authenticated"),
            None
        );
    }

    #[tokio::test]
    async fn test_transactions_scoped_to_account() {
        let mut client = TestClient::default();
        client.start_auth().await.unwrap();
        let response = client
            .get(TRANSACTIONS, &[("account_id", "acc_joint")])
            .await
            .unwrap();
        let transactions = response.body["transactions"].as_array().unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0]["id"], "tx_joint_1");
    }

    #[tokio::test]
    async fn test_merchant_expansion() {
        let mut client = TestClient::default();
        client.start_auth().await.unwrap();
        let collapsed = client.get("transactions/tx_1", &[]).await.unwrap();
        assert_eq!(collapsed.body["transaction"]["merchant"], "merch_acme");
        let expanded = client
            .get("transactions/tx_1", &[("expand[]", "merchant")])
            .await
            .unwrap();
        assert_eq!(expanded.body["transaction"]["merchant"]["name"], "Acme");
        let missing = client.get("transactions/tx_nope", &[]).await.unwrap();
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn test_receipt_put_then_get() {
        let mut client = TestClient::default();
        client.start_auth().await.unwrap();
        let body = json!({"transaction_id": "tx_2", "external_id": "r-1", "items": []});
        assert!(client.put(RECEIPT_UPLOAD, &body).await.unwrap().success);
        let read = client
            .get(TRANSACTION_RECEIPTS, &[("external_id", "r-1")])
            .await
            .unwrap();
        assert_eq!(read.body["receipt"], body);

        let unknown = json!({"transaction_id": "tx_nope", "external_id": "r-2"});
        assert_eq!(client.put(RECEIPT_UPLOAD, &unknown).await.unwrap().status, 400);
    }

    #[tokio::test]
    async fn test_override_and_recording() {
        let mut client = TestClient::default();
        let handle = client.clone();
        handle.set_response(Method::Get, ACCOUNTS, ApiResponse::failed(503, json!("down")));
        client.start_auth().await.unwrap();
        let response = client.get(ACCOUNTS, &[]).await.unwrap();
        assert_eq!(response.status, 503);
        let requests = handle.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Get);
        assert_eq!(requests[0].path, ACCOUNTS);
    }
}
