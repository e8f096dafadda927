//! In-memory store implementation.
//!
//! Backs the integration tests and local development. Implements the same
//! contract a hosted backend would: sequential id assignment for serial
//! collections and compare-and-swap updates on the per-record version.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Filter, Record, Store, StoreError};

#[derive(Default)]
struct Collection {
    /// Next id handed out for inserts without an explicit id.
    next_id: i64,
    /// Records keyed by id. BTreeMap keeps listing order deterministic.
    records: BTreeMap<String, (u64, Value)>,
}

/// An in-memory [`Store`].
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|c| {
            c.records.get(id).map(|(version, data)| Record {
                id: id.to_owned(),
                version: *version,
                data: data.clone(),
            })
        }))
    }

    async fn list(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        let collections = self.collections.read().await;
        let Some(c) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(c.records
            .iter()
            .filter(|(_, (_, data))| filter.matches(data))
            .map(|(id, (version, data))| Record {
                id: id.clone(),
                version: *version,
                data: data.clone(),
            })
            .collect())
    }

    async fn insert(
        &self,
        collection: &str,
        id: Option<&str>,
        data: Value,
    ) -> Result<Record, StoreError> {
        let mut collections = self.collections.write().await;
        let c = collections.entry(collection.to_owned()).or_default();

        let id = match id {
            Some(id) => {
                if c.records.contains_key(id) {
                    return Err(StoreError::Conflict {
                        collection: collection.to_owned(),
                        id: id.to_owned(),
                    });
                }
                id.to_owned()
            }
            None => {
                c.next_id += 1;
                c.next_id.to_string()
            }
        };

        c.records.insert(id.clone(), (1, data.clone()));
        Ok(Record {
            id,
            version: 1,
            data,
        })
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        expected_version: u64,
    ) -> Result<Record, StoreError> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .and_then(|c| c.records.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_owned(),
                id: id.to_owned(),
            })?;

        let (version, stored) = entry;
        if *version != expected_version {
            return Err(StoreError::Conflict {
                collection: collection.to_owned(),
                id: id.to_owned(),
            });
        }

        *version += 1;
        *stored = data.clone();
        Ok(Record {
            id: id.to_owned(),
            version: *version,
            data,
        })
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(collection)
            .and_then(|c| c.records.remove(id));
        match removed {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                collection: collection.to_owned(),
                id: id.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sequential_id_assignment() {
        let store = MemoryStore::new();
        let a = store.insert("plans", None, json!({"n": "a"})).await.unwrap();
        let b = store.insert("plans", None, json!({"n": "b"})).await.unwrap();
        assert_eq!(a.id, "1");
        assert_eq!(b.id, "2");
    }

    #[tokio::test]
    async fn test_insert_existing_id_conflicts() {
        let store = MemoryStore::new();
        store
            .insert("events", Some("e1"), json!({}))
            .await
            .unwrap();
        let err = store
            .insert("events", Some("e1"), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_rejects_stale() {
        let store = MemoryStore::new();
        let rec = store
            .insert("events", Some("e1"), json!({"v": 0}))
            .await
            .unwrap();
        assert_eq!(rec.version, 1);

        let rec = store
            .update("events", "e1", json!({"v": 1}), 1)
            .await
            .unwrap();
        assert_eq!(rec.version, 2);

        // A writer still holding version 1 must lose.
        let err = store
            .update("events", "e1", json!({"v": 99}), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        let current = store.get("events", "e1").await.unwrap().unwrap();
        assert_eq!(current.data, json!({"v": 1}));
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = MemoryStore::new();
        let err = store
            .update("events", "nope", json!({}), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_filters_on_fields() {
        let store = MemoryStore::new();
        store
            .insert("progress", None, json!({"goal_id": 1, "p": 10}))
            .await
            .unwrap();
        store
            .insert("progress", None, json!({"goal_id": 2, "p": 20}))
            .await
            .unwrap();
        store
            .insert("progress", None, json!({"goal_id": 1, "p": 30}))
            .await
            .unwrap();

        let all = store.list("progress", &Filter::all()).await.unwrap();
        assert_eq!(all.len(), 3);

        let one = store
            .list("progress", &Filter::field("goal_id", 1))
            .await
            .unwrap();
        assert_eq!(one.len(), 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        store.insert("events", Some("e1"), json!({})).await.unwrap();
        store.delete("events", "e1").await.unwrap();
        assert!(store.get("events", "e1").await.unwrap().is_none());
        assert!(matches!(
            store.delete("events", "e1").await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_list_unknown_collection_is_empty() {
        let store = MemoryStore::new();
        assert!(store.list("nothing", &Filter::all()).await.unwrap().is_empty());
    }
}
