//! Object storage seam for staged CSV files and migrated images
//!
//! The pipelines only need fetch, upload and delete, so that is the whole
//! trait. Production uses the HTTP-backed store; tests use the in-memory one.

use async_trait::async_trait;
use paindex_common::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's bytes by key
    async fn fetch(&self, key: &str) -> Result<Vec<u8>>;

    /// Upload bytes under a key; returns the public URL of the stored object
    async fn upload(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String>;

    /// Delete an object. Missing objects are not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Object store backed by an HTTP service (PUT/GET/DELETE by key)
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpObjectStore {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let url = self.url_for(key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("GET {} failed: {}", url, e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("Object not found: {}", key)));
        }
        let response = response
            .error_for_status()
            .map_err(|e| Error::Http(format!("GET {} failed: {}", url, e)))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Http(format!("Reading {} failed: {}", url, e)))?;
        Ok(bytes.to_vec())
    }

    async fn upload(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String> {
        let url = self.url_for(key);
        self.client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::Http(format!("PUT {} failed: {}", url, e)))?
            .error_for_status()
            .map_err(|e| Error::Http(format!("PUT {} failed: {}", url, e)))?;
        Ok(url)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let url = self.url_for(key);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("DELETE {} failed: {}", url, e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        response
            .error_for_status()
            .map_err(|e| Error::Http(format!("DELETE {} failed: {}", url, e)))?;
        Ok(())
    }
}

/// In-memory object store for tests
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object before a test run
    pub fn put(&self, key: &str, bytes: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Object not found: {}", key)))
    }

    async fn upload(&self, key: &str, _content_type: &str, bytes: Vec<u8>) -> Result<String> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes);
        Ok(format!("memory://{}", key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}
