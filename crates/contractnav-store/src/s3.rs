//! Object-store contract backend
//!
//! Contracts live under the flat key namespace `<prefix>/<role>/<name>.json`
//! in a single bucket. Requests go through the [`ObjectStoreClient`] seam so the
//! listing and loading rules can run against the AWS SDK (feature `s3`) or the
//! in-memory store used in tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! // Real bucket (requires the `s3` feature)
//! let backend = S3Backend::connect(S3Config {
//!     region: "eu-west-2".into(),
//!     bucket: "contracts".into(),
//!     prefix: "openapi-contracts".into(),
//! }).await?;
//!
//! // In-memory bucket
//! let store = Arc::new(MemoryObjectStore::new());
//! let backend = S3Backend::new(config, store)?;
//! ```

use crate::backend::{parse_contract, ContractBackend};
use contractnav_core::{ContractId, ContractRole, S3Config, StoreError, JSON_EXTENSION};
use serde_json::Value;
use std::sync::Arc;

/// One page of a prefix listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    /// Full object keys on this page
    pub keys: Vec<String>,

    /// Token for the next page; only set while the listing is truncated
    pub next_continuation_token: Option<String>,
}

/// Minimal object-store client used by [`S3Backend`]
#[async_trait::async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// List one page of keys under `prefix`
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, StoreError>;

    /// Fetch the full body of an object
    ///
    /// Missing objects are reported as [`StoreError::NotFound`].
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;
}

fn require_bucket(config: &S3Config) -> Result<(), StoreError> {
    if config.bucket.is_empty() {
        return Err(StoreError::Config(
            "S3_BUCKET is required when S3_ENABLED=true".to_string(),
        ));
    }
    Ok(())
}

/// Object-store-backed contract store
pub struct S3Backend {
    config: S3Config,
    client: Arc<dyn ObjectStoreClient>,
}

impl S3Backend {
    /// Create a backend over an existing client
    ///
    /// Fails with [`StoreError::Config`] when no bucket is configured.
    pub fn new(config: S3Config, client: Arc<dyn ObjectStoreClient>) -> Result<Self, StoreError> {
        require_bucket(&config)?;
        Ok(Self { config, client })
    }

    /// Create a backend talking to AWS S3 with the default credential chain
    #[cfg(feature = "s3")]
    pub async fn connect(config: S3Config) -> Result<Self, StoreError> {
        require_bucket(&config)?;

        let client = crate::aws::AwsObjectStore::from_region(&config.region).await;
        Self::new(config, Arc::new(client))
    }

    /// Create backend without s3 feature (returns error)
    #[cfg(not(feature = "s3"))]
    pub async fn connect(config: S3Config) -> Result<Self, StoreError> {
        let _ = config;
        Err(StoreError::Config(
            "S3 support not compiled. Rebuild with: cargo build --features s3".to_string(),
        ))
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }

    fn clean_prefix(&self) -> &str {
        self.config.prefix.trim_end_matches('/')
    }

    fn prefix_for(&self, role: ContractRole) -> String {
        format!("{}/{}/", self.clean_prefix(), role)
    }

    fn key_for(&self, role: ContractRole, name: &str) -> Result<String, StoreError> {
        let name = ContractId::ensure_json(name)?;
        Ok(format!("{}/{}/{}", self.clean_prefix(), role, name))
    }

    fn display_key(&self, key: &str) -> String {
        format!("s3://{}/{}", self.config.bucket, key)
    }
}

#[async_trait::async_trait]
impl ContractBackend for S3Backend {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn list(&self, role: ContractRole) -> Result<Vec<String>, StoreError> {
        let prefix = self.prefix_for(role);
        let mut names = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .client
                .list_page(&self.config.bucket, &prefix, token.take())
                .await?;
            pages += 1;

            for key in page.keys {
                if !key.ends_with(JSON_EXTENSION) {
                    continue;
                }
                if let Some(name) = key.strip_prefix(&prefix) {
                    if !name.is_empty() {
                        names.push(name.to_string());
                    }
                }
            }

            match page.next_continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        tracing::debug!(bucket = %self.config.bucket, %prefix, pages, count = names.len(), "listed object prefix");

        names.sort();
        Ok(names)
    }

    async fn load(&self, role: ContractRole, name: &str) -> Result<Value, StoreError> {
        let key = self.key_for(role, name)?;
        tracing::debug!(key = %self.display_key(&key), "loading contract");

        let body = self.client.get_object(&self.config.bucket, &key).await?;
        if body.is_empty() {
            return Err(StoreError::EmptyBody(self.display_key(&key)));
        }

        let text = String::from_utf8(body).map_err(|e| StoreError::parse(name, e))?;
        parse_contract(name, text.as_bytes())
    }
}
