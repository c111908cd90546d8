//! Records the sync engine can reconcile

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Serialized field names the engine owns. They are never user-editable.
pub const IDENTITY_FIELDS: [&str; 3] = ["id", "version", "deleted"];

/// A record with an identity, an optimistic-concurrency version and a
/// tombstone flag, plus any payload.
///
/// Implementors must serialize the identity under the names in
/// [`IDENTITY_FIELDS`].
pub trait SyncRecord: Clone + std::fmt::Debug + Serialize + DeserializeOwned {
    fn record_id(&self) -> &str;

    fn version(&self) -> Option<&str>;

    fn set_version(&mut self, version: Option<String>);

    fn is_deleted(&self) -> bool;

    /// Compare every mutable payload field, ignoring id, version and the
    /// tombstone flag.
    fn same_payload(&self, other: &Self) -> bool;

    /// Copy the version stamp of `other` onto this record
    #[must_use]
    fn with_version_of(mut self, other: &Self) -> Self {
        self.set_version(other.version().map(str::to_string));
        self
    }

    /// The user-editable part of the record, as JSON
    fn candidate(&self) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(fields) = &mut value {
            for field in IDENTITY_FIELDS {
                fields.remove(field);
            }
        }
        Ok(value)
    }

    /// Rebuild a record from an edited candidate, taking id and version from
    /// `remote`. Returns the rejection reason when the candidate is malformed.
    fn from_candidate(candidate: Value, remote: &Self) -> Result<Self, String> {
        let Value::Object(mut fields) = candidate else {
            return Err("custom record must be a JSON object".to_string());
        };
        fields.remove("deleted");
        fields.insert(
            "id".to_string(),
            Value::String(remote.record_id().to_string()),
        );
        match remote.version() {
            Some(version) => {
                fields.insert("version".to_string(), Value::String(version.to_string()));
            }
            None => {
                fields.remove("version");
            }
        }

        serde_json::from_value::<Self>(Value::Object(fields))
            .map(|record| record.with_version_of(remote))
            .map_err(|error| format!("custom record is malformed: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemId, TodoItem};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn remote() -> TodoItem {
        TodoItem {
            id: ItemId::from("A"),
            text: "bar".into(),
            complete: false,
            version: Some("v2".into()),
            deleted: false,
        }
    }

    #[test]
    fn candidate_strips_identity_fields() {
        let candidate = remote().candidate().unwrap();
        assert_eq!(candidate, json!({"text": "bar", "complete": false}));
    }

    #[test]
    fn from_candidate_restores_identity_from_remote() {
        let record =
            TodoItem::from_candidate(json!({"text": "custom", "complete": true}), &remote())
                .unwrap();
        assert_eq!(record.id, ItemId::from("A"));
        assert_eq!(record.version.as_deref(), Some("v2"));
        assert_eq!(record.text, "custom");
        assert!(record.complete);
    }

    #[test]
    fn from_candidate_overrides_supplied_identity() {
        let record = TodoItem::from_candidate(
            json!({"id": "Z", "version": "v9", "deleted": true, "text": "x"}),
            &remote(),
        )
        .unwrap();
        assert_eq!(record.id, ItemId::from("A"));
        assert_eq!(record.version.as_deref(), Some("v2"));
        assert!(!record.deleted);
    }

    #[test]
    fn from_candidate_rejects_non_objects() {
        let error = TodoItem::from_candidate(json!("just text"), &remote()).unwrap_err();
        assert!(error.contains("JSON object"));
    }

    #[test]
    fn from_candidate_rejects_missing_payload() {
        let error = TodoItem::from_candidate(json!({"complete": true}), &remote()).unwrap_err();
        assert!(error.contains("malformed"));
    }
}
