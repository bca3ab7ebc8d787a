use serde::{Deserialize, Serialize};

/// A money account (wallet, card, cash jar) owned by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub title: String,
    /// ISO 4217 code the account is denominated in. Fixed at creation.
    pub currency: String,
    /// Current balance in minor units (cents).
    #[serde(default)]
    pub balance: i64,
    #[serde(default)]
    pub hidden: bool,
    #[serde(rename = "displayOrder", default)]
    pub display_order: u32,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Fields for creating an account; the server assigns id and display order.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub title: String,
    pub currency: String,
    pub icon: Option<String>,
}

/// Editable account fields sent with an update.
#[derive(Debug, Clone)]
pub struct AccountUpdate {
    pub id: i64,
    pub title: String,
    pub icon: Option<String>,
}
