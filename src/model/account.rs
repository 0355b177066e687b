use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The account type of a personal, non-joint current account.
pub const PERSONAL_ACCOUNT_TYPE: &str = "uk_retail";

/// An account as returned by `GET /accounts`. Only `id` and `type` are interpreted; the remaining
/// fields are kept so they can be printed back out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    #[serde(flatten)]
    pub other_fields: Map<String, Value>,
}

impl Account {
    pub fn is_personal(&self) -> bool {
        self.account_type.as_deref() == Some(PERSONAL_ACCOUNT_TYPE)
    }
}

/// Returns the first personal account in provider order.
pub fn select_personal_account(accounts: &[Account]) -> Option<&Account> {
    accounts.iter().find(|a| a.is_personal())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn accounts(value: Value) -> Vec<Account> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_selects_only_personal() {
        let accounts = accounts(json!([
            {"id": "acc_prepaid", "type": "uk_prepaid"},
            {"id": "acc_joint", "type": "uk_retail_joint", "description": "joint"},
            {"id": "acc_1", "type": "uk_retail", "description": "user_000"},
            {"id": "acc_flex", "type": "uk_monzo_flex"},
        ]));
        let selected = select_personal_account(&accounts).unwrap();
        assert_eq!(selected.id, "acc_1");
        assert_eq!(
            selected.other_fields.get("description"),
            Some(&json!("user_000"))
        );
    }

    #[test]
    fn test_first_match_wins() {
        let accounts = accounts(json!([
            {"id": "acc_a", "type": "uk_retail"},
            {"id": "acc_b", "type": "uk_retail"},
        ]));
        assert_eq!(select_personal_account(&accounts).unwrap().id, "acc_a");
    }

    #[test]
    fn test_no_personal_account() {
        let accounts = accounts(json!([
            {"id": "acc_joint", "type": "uk_retail_joint"},
            {"id": "acc_untyped"},
        ]));
        assert!(select_personal_account(&accounts).is_none());
        assert!(select_personal_account(&[]).is_none());
    }
}
