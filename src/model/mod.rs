//! Data shapes exchanged with the Monzo API.

mod account;
mod receipt;
mod transaction;

pub use account::{select_personal_account, Account, PERSONAL_ACCOUNT_TYPE};
pub use receipt::{receipt_id, LineItem, Receipt, ReceiptItem, ReceiptMerchant, ReceiptRequest};
pub use transaction::Transaction;
