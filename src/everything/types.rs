//! Everything HTTP API type definitions
//!
//! These types mirror the `json=1` responses of the Everything HTTP server.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One search hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Display path (directory joined with the item name)
    pub path: String,

    /// Size in bytes, 0 when unknown
    #[serde(default)]
    pub size: i64,

    /// Modification date as reported by the server
    #[serde(default)]
    pub date: String,

    /// `file` or `folder`, empty when unknown
    #[serde(default, rename = "type")]
    pub kind: String,

    /// Full path of the item
    #[serde(default)]
    pub full_path: String,
}

impl SearchResult {
    pub fn is_folder(&self) -> bool {
        self.kind == "folder"
    }
}

/// Raw search response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Total number of matches on the server
    #[serde(default)]
    pub total_results: u64,

    /// Returned items
    #[serde(default)]
    pub results: Vec<SearchItem>,
}

/// Raw search item
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    /// `file` or `folder`
    #[serde(default, rename = "type")]
    pub kind: String,

    /// Item name
    #[serde(default)]
    pub name: String,

    /// Parent directory
    #[serde(default)]
    pub path: String,

    /// Size in bytes; the server sends either a number or a numeric string
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: i64,

    /// Modification date, when the date column was requested
    #[serde(default)]
    pub date_modified: Option<Value>,
}

impl SearchItem {
    /// Directory and name joined with a backslash
    pub fn full_path(&self) -> String {
        match (self.path.is_empty(), self.name.is_empty()) {
            (false, false) => format!("{}\\{}", self.path, self.name),
            (_, false) => self.name.clone(),
            _ => self.path.clone(),
        }
    }
}

impl From<SearchItem> for SearchResult {
    fn from(item: SearchItem) -> Self {
        let full_path = item.full_path();
        let date = match &item.date_modified {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        SearchResult {
            path: full_path.clone(),
            size: item.size,
            date,
            kind: item.kind,
            full_path,
        }
    }
}

fn lenient_size<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}
