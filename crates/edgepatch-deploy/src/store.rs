//! # Object Storage
//!
//! Documents are stored as JSON objects addressed by `(bucket, key)`.
//! [`ObjectStore::put`] returns the storage path `{bucket}/{key}` that is
//! reported back in deployment results.
//!
//! Two backends:
//! - [`InMemoryObjectStore`]: `DashMap`-backed, for tests and dry runs.
//! - [`HttpObjectStore`]: `GET`/`PUT {base}/{bucket}/{key}` with a bearer
//!   token. A `404` on read means "not deployed yet".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use url::Url;
use zeroize::Zeroizing;

use edgepatch_cdn::retry::RetryPolicy;

use crate::error::StorageError;

/// Durable key-value storage for configuration documents.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object; `Ok(None)` when it does not exist.
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write an object, replacing any previous version. Returns the
    /// storage path.
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<String, StorageError>;
}

/// Storage path reported for an object.
pub fn storage_path(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}")
}

struct Inner {
    objects: DashMap<String, Vec<u8>>,
}

/// In-memory object store.
///
/// Cheaply cloneable via `Arc`; all clones share the same data.
#[derive(Clone)]
pub struct InMemoryObjectStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                objects: DashMap::new(),
            }),
        }
    }

    /// Raw contents of an object.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.inner
            .objects
            .get(&storage_path(bucket, key))
            .map(|entry| entry.value().clone())
    }

    /// Seed an object directly.
    pub fn insert(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.inner.objects.insert(storage_path(bucket, key), body);
    }

    /// Storage paths of every object, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.inner.objects.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.inner.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.object(bucket, key))
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<String, StorageError> {
        let path = storage_path(bucket, key);
        self.inner.objects.insert(path.clone(), body);
        Ok(path)
    }
}

/// HTTP object store client.
pub struct HttpObjectStore {
    http: reqwest::Client,
    base_url: String,
    token: Option<Zeroizing<String>>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for HttpObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpObjectStore")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl HttpObjectStore {
    pub fn new(
        base_url: &Url,
        token: Option<Zeroizing<String>>,
        timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StorageError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            token,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, bucket: &str, key: &str) -> String {
        format!("{}/{bucket}/{key}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.as_deref() {
            Some(token) => request.bearer_auth(token.as_str()),
            None => request,
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let endpoint = self.endpoint(bucket, key);
        let resp = self
            .retry
            .send(&endpoint, || self.authorize(self.http.get(&endpoint)).send())
            .await
            .map_err(|source| StorageError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        let bytes = resp.bytes().await.map_err(|source| StorageError::Http {
            endpoint: endpoint.clone(),
            source,
        })?;
        Ok(Some(bytes.to_vec()))
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<String, StorageError> {
        let endpoint = self.endpoint(bucket, key);
        let resp = self.retry.send(&endpoint, || {
            self.authorize(self.http.put(&endpoint))
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone())
                .send()
        })
        .await
        .map_err(|source| StorageError::Http {
            endpoint: endpoint.clone(),
            source,
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(bucket, key, "stored object");
        Ok(storage_path(bucket, key))
    }
}
