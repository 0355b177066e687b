mod api;
pub mod args;
mod client;
pub mod commands;
mod config;
mod error;
mod model;
mod utils;

#[cfg(test)]
mod test;

pub use api::{ApiClient, ApiResponse, Method, Mode, RecordedRequest, TestClient, TestState};
pub use client::{ReceiptsClient, SessionState, MERCHANT_NONE};
pub use config::Config;
pub use error::{client_error, ClientError, Error, Result};
pub use model::{
    receipt_id, select_personal_account, Account, LineItem, Receipt, ReceiptItem, ReceiptMerchant,
    ReceiptRequest, Transaction, PERSONAL_ACCOUNT_TYPE,
};
