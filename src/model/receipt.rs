//! Receipts attached to transactions through the `transaction-receipts` endpoint.

use crate::model::Transaction;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Namespace for the receipt external ids. Changing this changes every derived id and would orphan
/// receipts that were already uploaded.
const RECEIPT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6d6f_6e7a_6f2d_4972_8563_6569_7074_7321);

/// Derives the external id of the receipt for `transaction`. Only the transaction id participates,
/// so uploading a receipt for the same transaction again overwrites the earlier one.
pub fn receipt_id(transaction: &Transaction) -> String {
    Uuid::new_v5(&RECEIPT_ID_NAMESPACE, transaction.id.as_bytes())
        .hyphenated()
        .to_string()
}

/// A priced line of a receipt request: description, unit price in minor units and quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub description: String,
    pub price: i64,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(description: impl Into<String>, price: i64, quantity: u32) -> Self {
        Self {
            description: description.into(),
            price,
            quantity,
        }
    }
}

/// Parses `DESCRIPTION:PRICE:QUANTITY`. The description may itself contain colons.
impl FromStr for LineItem {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(3, ':');
        let (Some(quantity), Some(price), Some(description)) =
            (parts.next(), parts.next(), parts.next())
        else {
            bail!("Expected DESCRIPTION:PRICE:QUANTITY but got '{s}'");
        };
        if description.trim().is_empty() {
            bail!("The item description in '{s}' is empty");
        }
        let price = price
            .trim()
            .parse::<i64>()
            .with_context(|| format!("Invalid price in '{s}', use minor units e.g. 250"))?;
        let quantity = quantity
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Invalid quantity in '{s}'"))?;
        Ok(Self::new(description.trim(), price, quantity))
    }
}

/// What the caller wants on a receipt before it is tied to a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiptRequest {
    /// Items known to be part of the purchase but without a price of their own.
    pub implied_items: Vec<String>,
    pub items: Vec<LineItem>,
}

impl ReceiptRequest {
    pub fn new(implied_items: Vec<String>, items: Vec<LineItem>) -> Self {
        Self {
            implied_items,
            items,
        }
    }

    /// A single placeholder item, for demonstrating uploads only.
    pub fn junk() -> Self {
        Self::new(Vec::new(), vec![LineItem::new("Junk Item", 99, 1)])
    }
}

/// The receipt body accepted by `PUT /transaction-receipts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_id: String,
    pub external_id: String,
    /// Sum of the item amounts in minor units
    pub total: i64,
    pub currency: String,
    /// Omitted when the merchant of the transaction is unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<ReceiptMerchant>,
    pub items: Vec<ReceiptItem>,
    #[serde(default)]
    pub taxes: Vec<serde_json::Value>,
    #[serde(default)]
    pub payments: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptMerchant {
    pub name: String,
}

impl ReceiptMerchant {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub description: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit: String,
    /// Line total in minor units, i.e. unit price times quantity
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub tax: i64,
    #[serde(default)]
    pub sub_items: Vec<ReceiptItem>,
}

impl ReceiptItem {
    fn new(description: &str, amount: i64, quantity: u32, currency: &str) -> Self {
        Self {
            description: description.to_string(),
            quantity,
            unit: String::new(),
            amount,
            currency: currency.to_string(),
            tax: 0,
            sub_items: Vec::new(),
        }
    }
}

impl Receipt {
    /// Builds the receipt for `transaction`. Priced items come first, followed by one zero-amount
    /// item per implied item. The external id is always `receipt_id(transaction)`. The merchant is
    /// taken from the transaction when it carries an expanded merchant.
    pub fn new(transaction: &Transaction, request: &ReceiptRequest) -> Self {
        let currency = transaction.currency();
        let mut items: Vec<ReceiptItem> = request
            .items
            .iter()
            .map(|i| {
                ReceiptItem::new(
                    &i.description,
                    i.price * i64::from(i.quantity),
                    i.quantity,
                    currency,
                )
            })
            .collect();
        items.extend(
            request
                .implied_items
                .iter()
                .map(|d| ReceiptItem::new(d, 0, 1, currency)),
        );
        Self {
            transaction_id: transaction.id.clone(),
            external_id: receipt_id(transaction),
            total: items.iter().map(|i| i.amount).sum(),
            currency: currency.to_string(),
            merchant: transaction.merchant_name().map(ReceiptMerchant::new),
            items,
            taxes: Vec::new(),
            payments: Vec::new(),
        }
    }

    /// Serializes the receipt to the JSON body of the upload request.
    pub fn marshal(&self) -> crate::Result<serde_json::Value> {
        serde_json::to_value(self).context("Unable to serialize the receipt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transaction(value: serde_json::Value) -> Transaction {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_receipt_id_is_deterministic() {
        let a = transaction(json!({"id": "tx_1", "amount": -99}));
        let b = transaction(json!({"id": "tx_1", "amount": -4200, "notes": "edited"}));
        let c = transaction(json!({"id": "tx_2", "amount": -99}));
        assert_eq!(receipt_id(&a), receipt_id(&a));
        assert_eq!(receipt_id(&a), receipt_id(&b));
        assert_ne!(receipt_id(&a), receipt_id(&c));
        assert_eq!(receipt_id(&a).len(), 36);
    }

    #[test]
    fn test_junk_receipt_wire_format() {
        let tx = transaction(json!({
            "id": "tx_1",
            "amount": -99,
            "currency": "GBP",
            "merchant": {"id": "merch_acme", "name": "Acme"}
        }));
        let receipt = Receipt::new(&tx, &ReceiptRequest::junk());
        let expected = json!({
            "transaction_id": "tx_1",
            "external_id": receipt_id(&tx),
            "total": 99,
            "currency": "GBP",
            "merchant": {"name": "Acme"},
            "items": [{
                "description": "Junk Item",
                "quantity": 1,
                "unit": "",
                "amount": 99,
                "currency": "GBP",
                "tax": 0,
                "sub_items": []
            }],
            "taxes": [],
            "payments": []
        });
        assert_eq!(receipt.marshal().unwrap(), expected);
    }

    #[test]
    fn test_unknown_merchant_is_omitted() {
        let collapsed = transaction(json!({"id": "tx_1", "merchant": "merch_acme"}));
        let receipt = Receipt::new(&collapsed, &ReceiptRequest::junk());
        assert_eq!(receipt.merchant, None);
        assert!(receipt.marshal().unwrap().get("merchant").is_none());
    }

    #[test]
    fn test_line_totals_and_implied_items() {
        let tx = transaction(json!({"id": "tx_9", "currency": "EUR"}));
        let request = ReceiptRequest::new(
            vec!["Carrier bag".to_string()],
            vec![
                LineItem::new("Peanut Butter", 300, 2),
                LineItem::new("Bread", 125, 1),
            ],
        );
        let receipt = Receipt::new(&tx, &request);
        assert_eq!(receipt.total, 725);
        assert_eq!(receipt.currency, "EUR");
        let amounts: Vec<(&str, i64, u32)> = receipt
            .items
            .iter()
            .map(|i| (i.description.as_str(), i.amount, i.quantity))
            .collect();
        assert_eq!(
            amounts,
            vec![
                ("Peanut Butter", 600, 2),
                ("Bread", 125, 1),
                ("Carrier bag", 0, 1)
            ]
        );
    }

    #[test]
    fn test_parse_line_item() {
        let item: LineItem = "Coffee: large:350:2".parse().unwrap();
        assert_eq!(item, LineItem::new("Coffee: large", 350, 2));
        assert!("Coffee:350".parse::<LineItem>().is_err());
        assert!("Coffee:3.50:1".parse::<LineItem>().is_err());
        assert!(":350:1".parse::<LineItem>().is_err());
        assert!("Coffee:350:-1".parse::<LineItem>().is_err());
    }
}
