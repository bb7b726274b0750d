//! In-memory object store for testing
//!
//! This store keeps objects in memory and serves paginated listings the way S3
//! does. It's useful for:
//! - Unit testing the object-store backend without credentials
//! - Exercising pagination with tiny page sizes
//! - Simulating failures for specific keys
//!
//! ## Usage
//!
//! ```rust,ignore
//! let store = MemoryObjectStore::new().with_page_size(2);
//! store.put("contracts", "specs/provider/orders.json", br#"{"openapi":"3.0.0"}"#).await;
//!
//! let backend = S3Backend::new(config, Arc::new(store))?;
//! let names = backend.list(ContractRole::Provider).await?;
//! ```

use crate::s3::{ObjectPage, ObjectStoreClient};
use contractnav_core::StoreError;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default number of keys per listing page (same as S3)
const DEFAULT_PAGE_SIZE: usize = 1000;

/// In-memory object store
///
/// Cloning shares the underlying buckets and request counters.
#[derive(Clone)]
pub struct MemoryObjectStore {
    /// Objects by bucket, then key (ordered, like S3 listings)
    buckets: Arc<RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>>,

    /// Errors to return for specific keys
    errors: Arc<RwLock<HashMap<String, StoreError>>>,

    page_size: usize,
    latency_ms: u64,

    list_requests: Arc<AtomicUsize>,
    get_requests: Arc<AtomicUsize>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            errors: Arc::new(RwLock::new(HashMap::new())),
            page_size: DEFAULT_PAGE_SIZE,
            latency_ms: 0,
            list_requests: Arc::new(AtomicUsize::new(0)),
            get_requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Limit the number of keys returned per listing page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delay every request by `latency_ms` milliseconds
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Store an object
    pub async fn put(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body.into());
    }

    /// Make every request for `key` fail with `error`
    pub async fn fail_key(&self, key: &str, error: StoreError) {
        self.errors.write().await.insert(key.to_string(), error);
    }

    /// Number of listing pages served so far
    pub fn list_requests(&self) -> usize {
        self.list_requests.load(Ordering::SeqCst)
    }

    /// Number of object fetches served so far
    pub fn get_requests(&self) -> usize {
        self.get_requests.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ObjectStoreClient for MemoryObjectStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, StoreError> {
        self.list_requests.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let buckets = self.buckets.read().await;
        let Some(objects) = buckets.get(bucket) else {
            return Err(StoreError::ObjectStore(format!("NoSuchBucket: {}", bucket)));
        };

        // The token is the last key of the previous page
        let start = match &continuation_token {
            Some(after) => Bound::Excluded(after.clone()),
            None => Bound::Included(prefix.to_string()),
        };

        let mut matching = objects
            .range((start, Bound::Unbounded))
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix));

        let keys: Vec<String> = matching.by_ref().take(self.page_size).cloned().collect();
        let truncated = matching.next().is_some();

        Ok(ObjectPage {
            next_continuation_token: if truncated { keys.last().cloned() } else { None },
            keys,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.get_requests.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if let Some(error) = self.errors.read().await.get(key) {
            return Err(error.clone());
        }

        self.buckets
            .read()
            .await
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("s3://{}/{}", bucket, key)))
    }
}
