use serde::{Deserialize, Serialize};

/// A free-form label attached to transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(rename = "displayOrder", default)]
    pub display_order: u32,
}

/// Fields for creating a tag; the server assigns id and display order.
#[derive(Debug, Clone)]
pub struct NewTag {
    pub title: String,
}

/// Editable tag fields sent with an update.
#[derive(Debug, Clone)]
pub struct TagUpdate {
    pub id: i64,
    pub title: String,
}
