use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Direction of a money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Income => write!(f, "Income"),
            TransactionType::Expense => write!(f, "Expense"),
            TransactionType::Transfer => write!(f, "Transfer"),
        }
    }
}

/// A single money movement. Transfers carry a destination account and,
/// when the two accounts differ in currency, a destination amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    #[serde(rename = "accountId")]
    pub account_id: i64,
    #[serde(rename = "dstAccountId")]
    pub dst_account_id: Option<i64>,
    #[serde(rename = "categoryId")]
    pub category_id: Option<i64>,
    #[serde(rename = "tagIds", default)]
    pub tag_ids: Vec<i64>,
    /// Amount in minor units of the source account's currency.
    pub amount: i64,
    /// Amount credited to the destination account, in its currency's
    /// minor units. Only set on cross-currency transfers.
    #[serde(rename = "dstAmount")]
    pub dst_amount: Option<i64>,
    pub date: NaiveDate,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Fields for creating a transaction; the server assigns the id.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    pub account_id: i64,
    pub dst_account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub tag_ids: Vec<i64>,
    pub amount: i64,
    pub dst_amount: Option<i64>,
    pub date: NaiveDate,
    pub comment: Option<String>,
}

/// Full replacement payload for an existing transaction.
#[derive(Debug, Clone)]
pub struct TransactionUpdate {
    pub id: i64,
    pub transaction_type: TransactionType,
    pub account_id: i64,
    pub dst_account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub tag_ids: Vec<i64>,
    pub amount: i64,
    pub dst_amount: Option<i64>,
    pub date: NaiveDate,
    pub comment: Option<String>,
}
