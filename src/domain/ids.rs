//! Domain identifier types with validation
//!
//! Newtype wrappers for record-store identifiers. Each type keeps record types
//! and record identifiers from being mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Record type name
///
/// The collection name the record store addresses a record type by
/// (for example `questionnaires`).
///
/// # Examples
///
/// ```
/// use grantflow::domain::ids::EntityName;
/// use std::str::FromStr;
///
/// let entity = EntityName::from_str("questionnaires").unwrap();
/// assert_eq!(entity.as_str(), "questionnaires");
/// assert!(EntityName::from_str("bad name").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityName(String);

impl EntityName {
    /// Creates a new EntityName from a string
    ///
    /// Names must be non-empty and contain only ASCII letters, digits and
    /// underscores so they can be embedded in request paths unescaped.
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("Entity name cannot be empty".to_string());
        }

        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!(
                "Invalid entity name '{name}'. Only ASCII letters, digits and '_' are allowed"
            ));
        }

        Ok(Self(name))
    }

    /// Returns the entity name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for EntityName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntityName> for String {
    fn from(name: EntityName) -> Self {
        name.0
    }
}

impl AsRef<str> for EntityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Record identifier
///
/// Every record in the store is identified by a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Wraps an existing UUID
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for RecordId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| format!("Invalid record id '{s}': {e}"))
    }
}

impl From<Uuid> for RecordId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Reference to a stored record: its type plus its identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    /// Record type
    pub entity: EntityName,

    /// Record identifier
    pub id: RecordId,
}

impl RecordRef {
    /// Creates a new record reference
    pub fn new(entity: EntityName, id: RecordId) -> Self {
        Self { entity, id }
    }

    /// Relative resource path of the record, `/{entity}({id})`
    ///
    /// Used both as a request path and as the value of a lookup binding in
    /// create/update payloads.
    pub fn resource_path(&self) -> String {
        format!("/{}({})", self.entity, self.id)
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.entity, self.id)
    }
}
