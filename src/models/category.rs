use serde::{Deserialize, Serialize};

/// Top-level partition a category belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Income,
    Expense,
    Transfer,
}

impl CategoryType {
    /// All partitions, in display order.
    pub const ALL: [CategoryType; 3] = [
        CategoryType::Expense,
        CategoryType::Income,
        CategoryType::Transfer,
    ];

    /// Wire spelling, as used in JSON bodies and query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Income => "income",
            CategoryType::Expense => "expense",
            CategoryType::Transfer => "transfer",
        }
    }
}

impl std::fmt::Display for CategoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryType::Income => write!(f, "Income"),
            CategoryType::Expense => write!(f, "Expense"),
            CategoryType::Transfer => write!(f, "Transfer"),
        }
    }
}

/// A transaction category. Root categories own an ordered list of
/// subcategories; a subcategory's `parent_id` is the owning root's id and
/// its own `subcategories` list is always empty (one level of nesting).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    #[serde(rename = "parentId")]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(rename = "displayOrder", default)]
    pub display_order: u32,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub subcategories: Vec<Category>,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Fields for creating a category; the server assigns id and display order.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub title: String,
    pub category_type: CategoryType,
    pub parent_id: Option<i64>,
    pub icon: Option<String>,
}

/// Editable category fields sent with an update. A `parent_id` differing
/// from the cached one is a reparent and is never applied incrementally.
#[derive(Debug, Clone)]
pub struct CategoryUpdate {
    pub id: i64,
    pub title: String,
    pub parent_id: Option<i64>,
    pub icon: Option<String>,
}
