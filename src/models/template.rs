use serde::{Deserialize, Serialize};

/// Kind of transaction a template prefills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    Income,
    Expense,
    Transfer,
}

impl TemplateType {
    /// All partitions, in display order.
    pub const ALL: [TemplateType; 3] = [
        TemplateType::Expense,
        TemplateType::Income,
        TemplateType::Transfer,
    ];

    /// Wire spelling, as used in JSON bodies and query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Income => "income",
            TemplateType::Expense => "expense",
            TemplateType::Transfer => "transfer",
        }
    }
}

impl std::fmt::Display for TemplateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateType::Income => write!(f, "Income"),
            TemplateType::Expense => write!(f, "Expense"),
            TemplateType::Transfer => write!(f, "Transfer"),
        }
    }
}

/// A saved transaction prefill. Lists are fetched and cached per
/// [`TemplateType`] partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub template_type: TemplateType,
    #[serde(rename = "accountId")]
    pub account_id: Option<i64>,
    #[serde(rename = "categoryId")]
    pub category_id: Option<i64>,
    /// Prefilled amount in minor units, when the template fixes one.
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(rename = "displayOrder", default)]
    pub display_order: u32,
}

/// Fields for creating a template; the server assigns id and display order.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub title: String,
    pub template_type: TemplateType,
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub amount: Option<i64>,
    pub comment: Option<String>,
}

/// Editable template fields sent with an update. A `template_type`
/// differing from the cached one moves the template between partitions
/// and is never applied incrementally.
#[derive(Debug, Clone)]
pub struct TemplateUpdate {
    pub id: i64,
    pub title: String,
    pub template_type: TemplateType,
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub amount: Option<i64>,
    pub comment: Option<String>,
}
