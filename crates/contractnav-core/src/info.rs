//! Configuration summary safe to expose to clients

use serde::{Deserialize, Serialize};

/// Object-store location, without credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Info {
    pub region: String,
    pub bucket: String,
    pub prefix: String,
}

/// Safe configuration record
///
/// Only carries locations. Credentials are resolved by the object-store SDK
/// and never pass through this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeInfo {
    pub local_contracts_dir: String,
    pub s3_enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Info>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_block_is_omitted_when_disabled() {
        let info = SafeInfo {
            local_contracts_dir: "/contracts".to_string(),
            s3_enabled: false,
            s3: None,
        };

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["localContractsDir"], "/contracts");
        assert_eq!(json["s3Enabled"], false);
        assert!(json.get("s3").is_none());
    }
}
