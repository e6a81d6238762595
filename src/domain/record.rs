//! Record and pending-operation models
//!
//! A [`Record`] is a transient in-memory copy of a document owned by the
//! remote store. A [`PendingOperation`] is a write that has been decided on
//! but not yet dispatched.

use super::ids::{EntityName, RecordId, RecordRef};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field payload of a record or write operation
pub type Payload = Map<String, Value>;

/// A record read from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record type
    pub entity: EntityName,

    /// Record identifier
    pub id: RecordId,

    /// Field values keyed by field name
    pub fields: Payload,
}

impl Record {
    /// Creates a new record
    pub fn new(entity: EntityName, id: RecordId, fields: Payload) -> Self {
        Self { entity, id, fields }
    }

    /// Reference to this record
    pub fn reference(&self) -> RecordRef {
        RecordRef::new(self.entity.clone(), self.id)
    }

    /// Raw field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    /// String field value
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Identifier stored in a field (lookup or key column)
    pub fn get_id(&self, field: &str) -> Option<RecordId> {
        self.get_str(field).and_then(|s| s.parse().ok())
    }

    /// Timestamp field value
    ///
    /// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates, the latter
    /// read as midnight UTC.
    pub fn get_datetime(&self, field: &str) -> Option<DateTime<Utc>> {
        let raw = self.get_str(field)?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}

/// A write decided on by a provider but not yet sent
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOperation {
    /// Create a record of the given type
    Create { entity: EntityName, payload: Payload },

    /// Update fields of an existing record
    Update { target: RecordRef, payload: Payload },

    /// Delete an existing record
    Delete { target: RecordRef },
}

impl PendingOperation {
    /// Shorthand for a create
    pub fn create(entity: EntityName, payload: Payload) -> Self {
        PendingOperation::Create { entity, payload }
    }

    /// Shorthand for an update
    pub fn update(target: RecordRef, payload: Payload) -> Self {
        PendingOperation::Update { target, payload }
    }

    /// Shorthand for a delete
    pub fn delete(target: RecordRef) -> Self {
        PendingOperation::Delete { target }
    }

    /// Record type the operation touches
    pub fn entity(&self) -> &EntityName {
        match self {
            PendingOperation::Create { entity, .. } => entity,
            PendingOperation::Update { target, .. } | PendingOperation::Delete { target } => {
                &target.entity
            }
        }
    }

    /// Short verb naming the operation kind
    pub fn kind(&self) -> &'static str {
        match self {
            PendingOperation::Create { .. } => "create",
            PendingOperation::Update { .. } => "update",
            PendingOperation::Delete { .. } => "delete",
        }
    }

    /// Returns true for creates
    pub fn is_create(&self) -> bool {
        matches!(self, PendingOperation::Create { .. })
    }
}
