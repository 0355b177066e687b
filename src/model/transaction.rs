use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const DEFAULT_CURRENCY: &str = "GBP";

/// A transaction as returned by the transactions endpoints. The provider defines many fields
/// (amount, merchant, category, settled, ...); only `id` is required and the rest are held
/// opaquely in `other_fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(flatten)]
    pub other_fields: Map<String, Value>,
}

impl Transaction {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            other_fields: Map::new(),
        }
    }

    /// The amount in minor units, negative for debits.
    pub fn amount(&self) -> Option<i64> {
        self.other_fields.get("amount").and_then(Value::as_i64)
    }

    /// The ISO 4217 currency code, `GBP` when the transaction does not carry one.
    pub fn currency(&self) -> &str {
        self.other_fields
            .get("currency")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_CURRENCY)
    }

    /// The merchant name when the merchant has been expanded into an object. A merchant that is
    /// absent, null, or a bare merchant id yields `None`.
    pub fn merchant_name(&self) -> Option<&str> {
        self.other_fields
            .get("merchant")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
    }
}
