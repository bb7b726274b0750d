//! Filesystem contract backend
//!
//! Contracts live under `<root>/provider/*.json` and `<root>/consumer/*.json`.
//! The older flat layout, with every contract directly under `<root>`, is still
//! honoured as a fallback for both listing and loading.

use crate::backend::{parse_contract, ContractBackend};
use contractnav_core::{ContractId, ContractRole, StoreError};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Filesystem-backed contract store
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Configured contracts root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn role_dir(&self, role: ContractRole) -> PathBuf {
        self.root.join(role.as_str())
    }

    /// Names must end in `.json` and contain no path separator
    fn validate_name(name: &str) -> Result<&str, StoreError> {
        let name = ContractId::ensure_json(name)?;

        if name.contains('/') || name.contains('\\') {
            return Err(StoreError::InvalidName(format!(
                "Contract name must be a bare file name: {}",
                name
            )));
        }

        Ok(name)
    }

    /// List `.json` regular files directly inside `dir`, or `None` if it does not exist
    async fn list_dir(dir: &Path) -> Result<Option<Vec<String>>, StoreError> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Io(format!(
                    "Failed to read {}: {}",
                    dir.display(),
                    e
                )))
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StoreError::Io(e.to_string()))?;
            if !file_type.is_file() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.ends_with(contractnav_core::JSON_EXTENSION) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(Some(names))
    }

    async fn is_file(path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }
}

#[async_trait::async_trait]
impl ContractBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn list(&self, role: ContractRole) -> Result<Vec<String>, StoreError> {
        let role_dir = self.role_dir(role);
        if let Some(names) = Self::list_dir(&role_dir).await? {
            tracing::debug!(dir = %role_dir.display(), count = names.len(), "listed role directory");
            return Ok(names);
        }

        // Legacy flat layout
        let names = Self::list_dir(&self.root).await?.unwrap_or_default();
        tracing::debug!(dir = %self.root.display(), count = names.len(), "listed contracts root");
        Ok(names)
    }

    async fn load(&self, role: ContractRole, name: &str) -> Result<Value, StoreError> {
        let name = Self::validate_name(name)?;

        let preferred = self.role_dir(role).join(name);
        let fallback = self.root.join(name);

        let path = if Self::is_file(&preferred).await {
            preferred
        } else if Self::is_file(&fallback).await {
            fallback
        } else {
            return Err(StoreError::NotFound(format!(
                "{} (looked in {} and {})",
                name,
                preferred.display(),
                fallback.display()
            )));
        };

        tracing::debug!(path = %path.display(), "loading contract");

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| StoreError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

        parse_contract(name, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_only() {
        assert!(LocalBackend::validate_name("api.json").is_ok());
        assert!(LocalBackend::validate_name("api.v2.json").is_ok());
        assert!(LocalBackend::validate_name("api").is_err());
        assert!(LocalBackend::validate_name("../secrets.json").is_err());
        assert!(LocalBackend::validate_name("provider/api.json").is_err());
        assert!(LocalBackend::validate_name("..\\api.json").is_err());
    }
}
