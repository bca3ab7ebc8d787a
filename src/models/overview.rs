use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One time window requested from the overview endpoint. The `key` is an
/// opaque label the server echoes back so responses can be matched to
/// windows without re-deriving date bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewPeriod {
    pub key: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Income and expense totals for a single currency inside one window.
/// Amounts are in the currency's minor units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyAmounts {
    pub currency: String,
    #[serde(default)]
    pub income: i64,
    #[serde(default)]
    pub expense: i64,
}

/// Per-window response row: the echoed window key plus one entry per
/// currency that had activity in the window.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WindowAmounts {
    pub key: String,
    #[serde(default)]
    pub amounts: Vec<CurrencyAmounts>,
}
