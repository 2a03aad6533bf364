use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

use crate::auth::OwnerId;

/// System fields that can only be set by the session, never by entity values
pub const SYSTEM_FIELDS: &[&str] = &["owner_id"];

/// Errors that can occur during Record operations
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("System field '{0}' cannot be set from entity values")]
    SystemFieldNotAllowed(&'static str),
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("Record has no valid 'id' field")]
    MissingId,
    #[error("Failed to convert record: {0}")]
    Conversion(#[from] serde_json::Error),
}

/// A stored row: entity fields plus system fields, with change tracking
/// against the state it was loaded with.
#[derive(Debug, Clone, Default)]
pub struct Record {
    /// Original state from storage (None for rows created in this session)
    original: Option<Map<String, Value>>,
    /// Current field values
    fields: Map<String, Value>,
    /// Fields that have been modified since original
    modified_fields: HashSet<String>,
}

impl Record {
    /// Create a new empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize an entity into a record, rejecting system fields
    pub fn from_entity<E: Serialize>(entity: &E) -> Result<Self, RecordError> {
        match serde_json::to_value(entity)? {
            Value::Object(map) => {
                if let Some(field) = SYSTEM_FIELDS.iter().find(|f| map.contains_key(**f)) {
                    return Err(RecordError::SystemFieldNotAllowed(*field));
                }
                let record = Self {
                    original: None,
                    fields: map,
                    modified_fields: HashSet::new(),
                };
                record.id().ok_or(RecordError::MissingId)?;
                Ok(record)
            }
            _ => Err(RecordError::InvalidJson("Expected JSON object".to_string())),
        }
    }

    /// Create record from stored data (allows system fields)
    pub fn from_stored(data: Map<String, Value>) -> Self {
        Self {
            original: Some(data.clone()),
            fields: data,
            modified_fields: HashSet::new(),
        }
    }

    /// Deserialize the entity value, dropping system fields
    pub fn to_entity<E: DeserializeOwned>(&self) -> Result<E, RecordError> {
        let mut fields = self.fields.clone();
        for field in SYSTEM_FIELDS {
            fields.remove(*field);
        }
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Replace entity fields with the values of `next`, keeping system fields
    /// and tracking which fields changed
    pub fn overwrite_from(&mut self, next: Record) -> &mut Self {
        let system: Vec<(String, Value)> = SYSTEM_FIELDS
            .iter()
            .filter_map(|f| self.fields.get(*f).map(|v| (f.to_string(), v.clone())))
            .collect();

        for (key, value) in next.fields {
            self.set(key, value);
        }
        for (key, value) in system {
            self.fields.insert(key, value);
        }
        self
    }

    /// Get field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set field value with automatic change tracking
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();

        if SYSTEM_FIELDS.contains(&key.as_str()) {
            tracing::warn!("Attempted to set system field '{}' - ignoring", key);
            return self;
        }

        if self.original.is_some() {
            self.modified_fields.insert(key.clone());
        }

        self.fields.insert(key, value.into());
        self
    }

    /// Set system field (session only)
    pub(crate) fn set_system_field(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        let key = key.into();

        if self.original.is_some() {
            self.modified_fields.insert(key.clone());
        }

        self.fields.insert(key, value.into());
        self
    }

    // ========================================
    // Standard field accessors
    // ========================================

    /// Get record ID
    pub fn id(&self) -> Option<Uuid> {
        self.get("id").and_then(|v| v.as_str()).and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Owner of a tenant-scoped row
    pub fn owner_id(&self) -> Option<OwnerId> {
        self.get("owner_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(OwnerId)
    }

    pub(crate) fn set_owner_id(&mut self, owner: OwnerId) -> &mut Self {
        self.set_system_field("owner_id", Value::String(owner.to_string()))
    }

    // ========================================
    // Change tracking
    // ========================================

    /// Check if a specific field has been changed
    fn changed(&self, key: &str) -> bool {
        match (&self.original, self.fields.get(key)) {
            (Some(original), Some(current)) => original.get(key) != Some(current),
            (Some(original), None) => original.contains_key(key),
            (None, Some(_)) => true, // New field on create
            (None, None) => false,
        }
    }

    /// Names of the fields whose value differs from the original, sorted
    pub fn changed_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = match &self.original {
            Some(_) => self
                .modified_fields
                .iter()
                .filter(|f| self.changed(f))
                .cloned()
                .collect(),
            None => self.fields.keys().cloned().collect(),
        };
        fields.sort();
        fields
    }

    // ========================================
    // Serialization
    // ========================================

    /// Stored representation
    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: Uuid,
        text: String,
    }

    #[derive(Serialize)]
    struct Sneaky {
        id: Uuid,
        owner_id: Uuid,
    }

    #[test]
    fn test_entity_roundtrip_strips_system_fields() {
        let note = Note { id: Uuid::new_v4(), text: "hello".to_string() };
        let mut record = Record::from_entity(&note).unwrap();
        record.set_owner_id(OwnerId(Uuid::new_v4()));

        assert!(record.owner_id().is_some());
        assert_eq!(record.to_entity::<Note>().unwrap(), note);
    }

    #[test]
    fn test_from_entity_rejects_system_fields() {
        let value = Sneaky { id: Uuid::new_v4(), owner_id: Uuid::new_v4() };
        assert!(matches!(
            Record::from_entity(&value),
            Err(RecordError::SystemFieldNotAllowed("owner_id"))
        ));
    }

    #[test]
    fn test_set_ignores_system_fields() {
        let mut record = Record::new();
        record.set("owner_id", json!(Uuid::new_v4().to_string()));
        assert!(record.owner_id().is_none());
    }

    #[test]
    fn test_overwrite_tracks_changes_and_keeps_owner() {
        let id = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let stored = json!({ "id": id.to_string(), "text": "old", "owner_id": owner.to_string() });
        let mut record = match stored {
            Value::Object(map) => Record::from_stored(map),
            _ => unreachable!(),
        };

        let next = Record::from_entity(&Note { id, text: "new".to_string() }).unwrap();
        record.overwrite_from(next);

        assert_eq!(record.changed_fields(), vec!["text".to_string()]);
        assert_eq!(record.owner_id(), Some(OwnerId(owner)));
        assert!(!record.changed("id"));
    }
}
