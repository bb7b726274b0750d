//! Spec store: one access point across backends
//!
//! Dispatches on [`ContractSource`] to the local or object-store backend,
//! normalizes whatever the backend returns and caches the result per contract
//! identity for the life of the store.

use crate::backend::ContractBackend;
use crate::cache::SpecCache;
use crate::local::LocalBackend;
use crate::s3::S3Backend;
use contractnav_core::{
    normalize_spec, Config, ContractId, ContractRole, ContractSource, S3Info, SafeInfo, StoreError,
};
use serde_json::Value;
use std::sync::Arc;

/// Multi-source contract store with normalization and caching
pub struct SpecStore {
    local: LocalBackend,
    s3: Option<S3Backend>,
    cache: SpecCache,
}

impl SpecStore {
    /// Compose a store from its backends and an owned cache
    pub fn new(local: LocalBackend, s3: Option<S3Backend>, cache: SpecCache) -> Self {
        Self { local, s3, cache }
    }

    /// Local-only store with a fresh cache
    pub fn local(root: impl Into<std::path::PathBuf>) -> Self {
        Self::new(LocalBackend::new(root), None, SpecCache::new())
    }

    /// Build a store from configuration
    ///
    /// Connects to the object store when an S3 section is present. A missing
    /// bucket fails with [`StoreError::Config`].
    pub async fn from_config(config: &Config) -> Result<Self, StoreError> {
        let local = LocalBackend::new(&config.contracts_dir);
        let s3 = match &config.s3 {
            Some(s3_config) => Some(S3Backend::connect(s3_config.clone()).await?),
            None => None,
        };

        tracing::info!(
            contracts_dir = %config.contracts_dir.display(),
            s3_enabled = s3.is_some(),
            "spec store ready"
        );

        Ok(Self::new(local, s3, SpecCache::new()))
    }

    /// Whether the remote backend was configured
    pub fn is_s3_enabled(&self) -> bool {
        self.s3.is_some()
    }

    /// Whether a source can serve requests
    pub fn is_enabled(&self, source: ContractSource) -> bool {
        match source {
            ContractSource::Local => true,
            ContractSource::S3 => self.is_s3_enabled(),
        }
    }

    /// Sources that can currently serve requests
    pub fn enabled_sources(&self) -> Vec<ContractSource> {
        ContractSource::ALL
            .into_iter()
            .filter(|source| self.is_enabled(*source))
            .collect()
    }

    fn backend(&self, source: ContractSource) -> Result<&dyn ContractBackend, StoreError> {
        match source {
            ContractSource::Local => Ok(&self.local),
            ContractSource::S3 => self
                .s3
                .as_ref()
                .map(|s3| s3 as &dyn ContractBackend)
                .ok_or(StoreError::SourceDisabled),
        }
    }

    /// List contract names of a role from one source
    pub async fn list_contracts(
        &self,
        source: ContractSource,
        role: ContractRole,
    ) -> Result<Vec<String>, StoreError> {
        let backend = self.backend(source)?;
        tracing::debug!(backend = backend.name(), %role, "listing contracts");
        backend.list(role).await
    }

    /// Load a contract in normalized form
    ///
    /// Repeated calls with the same identity return the same `Arc`, so callers
    /// can compare with [`Arc::ptr_eq`] instead of deep equality.
    pub async fn load_spec(
        &self,
        source: ContractSource,
        role: ContractRole,
        name: &str,
    ) -> Result<Arc<Value>, StoreError> {
        let id = ContractId::new(source, role, name);
        self.load(&id).await
    }

    /// Load a contract by identity
    pub async fn load(&self, id: &ContractId) -> Result<Arc<Value>, StoreError> {
        if let Some(spec) = self.cache.get(id) {
            return Ok(spec);
        }

        let backend = self.backend(id.source)?;
        self.cache
            .get_or_try_load(id, || async {
                let raw = backend.load(id.role, &id.name).await?;
                Ok(normalize_spec(raw))
            })
            .await
    }

    /// Configuration summary without credentials
    pub fn safe_info(&self) -> SafeInfo {
        SafeInfo {
            local_contracts_dir: self.local.root().display().to_string(),
            s3_enabled: self.is_s3_enabled(),
            s3: self.s3.as_ref().map(|s3| {
                let config = s3.config();
                S3Info {
                    region: config.region.clone(),
                    bucket: config.bucket.clone(),
                    prefix: config.prefix.clone(),
                }
            }),
        }
    }

    /// Number of cached specs
    pub fn cached_specs(&self) -> usize {
        self.cache.len()
    }
}
