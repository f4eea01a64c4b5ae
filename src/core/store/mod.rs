//! Document database abstraction
//!
//! Projects and email records are stored as JSON object documents grouped in collections.
//! Two backends implement [`DocumentStore`]:
//! - [`MemoryStore`]: process-local, used when Firestore is not configured and in tests
//! - [`FirestoreStore`]: the Firestore REST API

mod firestore;
mod memory;
mod value;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use value::{decode_fields, decode_value, encode_fields, encode_value};

/// A stored document: a JSON object
pub type Document = Map<String, Value>;

/// Errors from document store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {0} already exists")]
    AlreadyExists(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid document path: {0}")]
    InvalidPath(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Minimal document database contract used by the services
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` when it does not exist
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Insert a new document, failing with [`StoreError::AlreadyExists`] if the id is taken
    async fn create(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()>;

    /// Insert or fully replace a document
    async fn set(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()>;

    /// Delete a document, returning whether it existed
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;

    /// All documents whose top-level string `field` equals `value`
    async fn query_eq(&self, collection: &str, field: &str, value: &str)
    -> StoreResult<Vec<Document>>;

    /// Backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Serialize a model into a document; the model must serialize to a JSON object
pub fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected an object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Deserialize a document into a model
pub fn from_document<T: DeserializeOwned>(doc: Document) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
