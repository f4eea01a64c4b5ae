//! Firestore REST backend
//!
//! # API Reference
//!
//! - Get:    `GET    {base}/projects/{p}/databases/{d}/documents/{collection}/{id}`
//! - Create: `POST   {base}/projects/{p}/databases/{d}/documents/{collection}?documentId={id}`
//! - Set:    `PATCH  {base}/projects/{p}/databases/{d}/documents/{collection}/{id}`
//! - Delete: `DELETE {base}/projects/{p}/databases/{d}/documents/{collection}/{id}?currentDocument.exists=true`
//! - Query:  `POST   {base}/projects/{p}/databases/{d}/documents:runQuery`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::value::{decode_fields, encode_fields};
use super::{Document, DocumentStore, StoreError, StoreResult};
use crate::config::FirestoreConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Document store backed by the Firestore REST API
#[derive(Clone)]
pub struct FirestoreStore {
    client: Client,
    documents_url: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for FirestoreStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreStore")
            .field("documents_url", &self.documents_url)
            .field("authenticated", &self.access_token.is_some())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<FirestoreDocument>,
}

impl FirestoreStore {
    pub fn new(config: &FirestoreConfig) -> StoreResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &FirestoreConfig) -> Self {
        let documents_url = format!(
            "{}/projects/{}/databases/{}/documents",
            config.base_url.trim_end_matches('/'),
            config.project_id,
            config.database
        );
        Self {
            client,
            documents_url,
            access_token: config.access_token.clone(),
        }
    }

    /// URL of `collection/id`, each pushed as one percent-encoded path segment
    fn document_url(&self, collection: &str, id: &str) -> StoreResult<Url> {
        self.documents_child(&[collection, id])
    }

    fn documents_child(&self, segments: &[&str]) -> StoreResult<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(StoreError::InvalidPath(format!("'{bad}'")));
        }
        let mut url = Url::parse(&self.documents_url)
            .map_err(|e| StoreError::InvalidPath(format!("{}: {e}", self.documents_url)))?;
        url.path_segments_mut()
            .map_err(|()| StoreError::InvalidPath(self.documents_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn backend_error(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
        StoreError::Backend { status, message }
    }

    fn body_for(doc: &Document) -> Value {
        json!({ "fields": encode_fields(doc) })
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let response = self
            .authorize(self.client.get(self.document_url(collection, id)?))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let doc: FirestoreDocument = response.json().await?;
                Ok(Some(decode_fields(&doc.fields)?))
            }
            _ => Err(Self::backend_error(response).await),
        }
    }

    async fn create(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()> {
        let url = self.documents_child(&[collection])?;
        let response = self
            .authorize(self.client.post(url))
            .query(&[("documentId", id)])
            .json(&Self::body_for(&doc))
            .send()
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Err(StoreError::AlreadyExists(format!("{collection}/{id}"))),
            status if status.is_success() => {
                debug!(collection, id, "Created Firestore document");
                Ok(())
            }
            _ => Err(Self::backend_error(response).await),
        }
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()> {
        let response = self
            .authorize(self.client.patch(self.document_url(collection, id)?))
            .json(&Self::body_for(&doc))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::backend_error(response).await)
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let response = self
            .authorize(self.client.delete(self.document_url(collection, id)?))
            .query(&[("currentDocument.exists", "true")])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(Self::backend_error(response).await),
        }
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<Document>> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": { "stringValue": value }
                    }
                }
            }
        });

        let response = self
            .authorize(self.client.post(format!("{}:runQuery", self.documents_url)))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response).await);
        }

        let items: Vec<RunQueryItem> = response.json().await?;
        items
            .into_iter()
            .filter_map(|item| item.document)
            .map(|doc| decode_fields(&doc.fields))
            .collect()
    }

    fn backend_name(&self) -> &'static str {
        "firestore"
    }
}
