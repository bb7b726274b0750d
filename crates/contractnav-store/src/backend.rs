//! Storage backend trait for listing and loading contracts

use contractnav_core::{ContractRole, StoreError};
use serde_json::Value;

/// Uniform capability shared by every contract storage backend
///
/// Backends hand back raw, unmodified JSON. Normalization and caching are
/// the spec store's job.
#[async_trait::async_trait]
pub trait ContractBackend: Send + Sync {
    /// Get the backend name (e.g., "local", "s3")
    fn name(&self) -> &'static str;

    /// List contract names for a role, sorted by ordinal string comparison
    ///
    /// An absent directory or prefix is an empty listing, not an error.
    async fn list(&self, role: ContractRole) -> Result<Vec<String>, StoreError>;

    /// Load the raw JSON document for a named contract
    async fn load(&self, role: ContractRole, name: &str) -> Result<Value, StoreError>;
}

/// Parse raw contract bytes as JSON
pub(crate) fn parse_contract(name: &str, bytes: &[u8]) -> Result<Value, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::parse(name, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_contract_reports_name() {
        let err = parse_contract("broken.json", b"{not json").unwrap_err();
        match err {
            StoreError::Parse { name, .. } => assert_eq!(name, "broken.json"),
            other => panic!("unexpected error: {other:?}"),
        }

        let value = parse_contract("ok.json", br#"{"openapi":"3.0.0"}"#).unwrap();
        assert_eq!(value["openapi"], "3.0.0");
    }
}
