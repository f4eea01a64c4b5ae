use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;

use super::{Document, DocumentStore, StoreError, StoreResult};

/// In-process document store keyed by `(collection, id)`
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<(String, String), Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.documents
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .count()
    }
}

fn key(collection: &str, id: &str) -> (String, String) {
    (collection.to_string(), id.to_string())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .documents
            .get(&key(collection, id))
            .map(|doc| doc.value().clone()))
    }

    async fn create(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()> {
        match self.documents.entry(key(collection, id)) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(format!("{collection}/{id}"))),
            Entry::Vacant(slot) => {
                slot.insert(doc);
                Ok(())
            }
        }
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()> {
        self.documents.insert(key(collection, id), doc);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        Ok(self.documents.remove(&key(collection, id)).is_some())
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<Document>> {
        Ok(self
            .documents
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .filter(|entry| entry.value().get(field).and_then(Value::as_str) == Some(value))
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let store = MemoryStore::new();
        store
            .create("projects", "p1", doc(json!({"name": "One"})))
            .await
            .unwrap();

        let fetched = store.get("projects", "p1").await.unwrap().unwrap();
        assert_eq!(fetched.get("name"), Some(&json!("One")));
        assert!(store.get("projects", "missing").await.unwrap().is_none());

        assert!(store.delete("projects", "p1").await.unwrap());
        assert!(!store.delete("projects", "p1").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let store = MemoryStore::new();
        store.create("projects", "p1", Document::new()).await.unwrap();
        let err = store
            .create("projects", "p1", Document::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_set_replaces() {
        let store = MemoryStore::new();
        store
            .set("projects", "p1", doc(json!({"a": 1, "b": 2})))
            .await
            .unwrap();
        store
            .set("projects", "p1", doc(json!({"a": 3})))
            .await
            .unwrap();
        let fetched = store.get("projects", "p1").await.unwrap().unwrap();
        assert_eq!(fetched.get("a"), Some(&json!(3)));
        assert!(fetched.get("b").is_none());
    }

    #[tokio::test]
    async fn test_query_eq_scoped_to_collection() {
        let store = MemoryStore::new();
        store
            .set("projects", "p1", doc(json!({"ownerId": "a"})))
            .await
            .unwrap();
        store
            .set("projects", "p2", doc(json!({"ownerId": "b"})))
            .await
            .unwrap();
        store
            .set("other", "x", doc(json!({"ownerId": "a"})))
            .await
            .unwrap();

        let found = store.query_eq("projects", "ownerId", "a").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(store.count("projects"), 2);
    }
}
