//! Todo item model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;
use crate::sync::SyncRecord;

/// Client-generated identifier for a todo item.
///
/// New ids are UUID v7 strings, so two clients never mint the same id. Ids
/// assigned elsewhere are accepted verbatim as long as they are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create a new unique item ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ItemId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("Item ID cannot be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A todo item as stored locally and on the remote table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Stable identifier
    pub id: ItemId,
    /// Item text
    pub text: String,
    /// Completion flag
    #[serde(default)]
    pub complete: bool,
    /// Server-assigned concurrency token, absent until the first push lands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Tombstone flag
    #[serde(default)]
    pub deleted: bool,
}

impl TodoItem {
    /// Create a new, not yet synced item
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            text: text.into(),
            complete: false,
            version: None,
            deleted: false,
        }
    }

    /// Attach a version token
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Get the text truncated to `max_len` characters
    #[must_use]
    pub fn text_preview(&self, max_len: usize) -> String {
        self.text.lines().next().unwrap_or("").chars().take(max_len).collect()
    }
}

impl SyncRecord for TodoItem {
    fn record_id(&self) -> &str {
        self.id.as_str()
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn set_version(&mut self, version: Option<String>) {
        self.version = version;
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn same_payload(&self, other: &Self) -> bool {
        self.text == other.text && self.complete == other.complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_unique() {
        assert_ne!(ItemId::new(), ItemId::new());
    }

    #[test]
    fn test_item_id_parse_rejects_empty() {
        assert!("  ".parse::<ItemId>().is_err());
        assert_eq!("A".parse::<ItemId>().unwrap(), ItemId::from("A"));
    }

    #[test]
    fn test_item_new() {
        let item = TodoItem::new("Buy milk");
        assert_eq!(item.text, "Buy milk");
        assert!(!item.complete);
        assert!(!item.deleted);
        assert!(item.version.is_none());
    }

    #[test]
    fn test_item_serializes_id_as_plain_string() {
        let item = TodoItem {
            id: ItemId::from("A"),
            text: "foo".into(),
            complete: false,
            version: Some("v2".into()),
            deleted: false,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "A");
        assert_eq!(json["version"], "v2");
    }

    #[test]
    fn test_item_deserializes_with_defaults() {
        let item: TodoItem = serde_json::from_str(r#"{"id":"A","text":"foo"}"#).unwrap();
        assert!(!item.complete);
        assert!(!item.deleted);
        assert!(item.version.is_none());
    }

    #[test]
    fn test_same_payload_ignores_identity_fields() {
        let local = TodoItem::new("foo");
        let mut remote = local.clone().with_version("v2");
        remote.id = ItemId::from("other");
        remote.deleted = true;
        assert!(local.same_payload(&remote));

        remote.complete = true;
        assert!(!local.same_payload(&remote));
    }

    #[test]
    fn test_text_preview() {
        let item = TodoItem::new("First line\nSecond line");
        assert_eq!(item.text_preview(50), "First line");
        assert_eq!(item.text_preview(5), "First");
    }
}
