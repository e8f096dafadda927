//! The external store abstraction.
//!
//! Every service in this crate depends only on the narrow [`Store`] contract.
//! The concrete backend (a hosted relational store in production) is wired in
//! by the application; [`MemoryStore`] serves tests and local development.
//!
//! Records are JSON documents with a per-record version counter. The version
//! is the single-row optimistic guarantee the registry leans on: an
//! [`Store::update`] only commits when the caller proves it saw the latest
//! version, otherwise it fails with [`StoreError::Conflict`].

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by the store layer.
///
/// `Unavailable` is the only kind callers may retry; every other kind is
/// terminal for the given call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A conditional write lost against a concurrent writer, or an insert
    /// reused an existing id.
    #[error("write conflict on {collection}/{id}")]
    Conflict {
        /// Collection the write targeted.
        collection: String,
        /// Record id the write targeted.
        id: String,
    },

    /// The addressed record does not exist.
    #[error("record not found: {collection}/{id}")]
    NotFound {
        /// Collection that was addressed.
        collection: String,
        /// Record id that was addressed.
        id: String,
    },

    /// Stored data could not be encoded or decoded. Corruption is reported,
    /// never silently skipped.
    #[error("stored data could not be decoded: {0}")]
    Serialization(String),
}

/// A stored record: a JSON document plus its id and version.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Record id within its collection. Store-assigned serial ids are the
    /// decimal rendering of the number.
    pub id: String,
    /// Monotonic per-record version, starting at 1 and bumped on every
    /// update.
    pub version: u64,
    /// The document body.
    pub data: Value,
}

/// A conjunction of top-level field-equality predicates.
///
/// The empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    /// The filter that matches every record.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// A filter requiring `field == value`.
    #[must_use]
    pub fn field(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(name, value)
    }

    /// Add another `field == value` requirement.
    #[must_use]
    pub fn and(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((name.into(), value.into()));
        self
    }

    /// Whether the given document satisfies every clause.
    #[must_use]
    pub fn matches(&self, data: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(name, value)| data.get(name) == Some(value))
    }
}

/// The narrow contract every concrete backend implements.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch a record by id, or `None` if absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError>;

    /// List the records in a collection that match the filter.
    async fn list(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>, StoreError>;

    /// Insert a new record.
    ///
    /// With `id: None` the store assigns the next sequential numeric id
    /// (serial semantics). Supplying an id that already exists fails with
    /// [`StoreError::Conflict`].
    async fn insert(
        &self,
        collection: &str,
        id: Option<&str>,
        data: Value,
    ) -> Result<Record, StoreError>;

    /// Replace a record's document, conditioned on its version.
    ///
    /// Fails with [`StoreError::Conflict`] when `expected_version` is stale
    /// and [`StoreError::NotFound`] when the record is absent.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        expected_version: u64,
    ) -> Result<Record, StoreError>;

    /// Delete a record. Fails with [`StoreError::NotFound`] when absent.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// Decode a record body into a domain type.
pub(crate) fn decode<T: DeserializeOwned>(record: &Record) -> Result<T, StoreError> {
    serde_json::from_value(record.data.clone()).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Encode a domain value into a record body.
pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_filter_matches_anything() {
        assert!(Filter::all().matches(&json!({"a": 1})));
        assert!(Filter::all().matches(&json!({})));
    }

    #[test]
    fn test_single_clause() {
        let f = Filter::field("goal_id", 7);
        assert!(f.matches(&json!({"goal_id": 7, "x": "y"})));
        assert!(!f.matches(&json!({"goal_id": 8})));
        assert!(!f.matches(&json!({})));
    }

    #[test]
    fn test_conjunction() {
        let f = Filter::field("a", 1).and("b", "two");
        assert!(f.matches(&json!({"a": 1, "b": "two"})));
        assert!(!f.matches(&json!({"a": 1, "b": "three"})));
    }
}
