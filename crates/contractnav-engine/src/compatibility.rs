//! Provider/consumer compatibility check

use crate::diff::{DiffError, DiffResult, SpecDiffer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Verdict of diffing a consumer contract against its provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityReport {
    pub is_compatible: bool,
    pub breaking_differences_found: bool,
    pub breaking_differences: Vec<Value>,

    /// Full diff the verdict was derived from
    pub raw: DiffResult,
}

impl CompatibilityReport {
    pub fn from_diff(raw: DiffResult) -> Self {
        Self {
            is_compatible: !raw.breaking_differences_found,
            breaking_differences_found: raw.breaking_differences_found,
            breaking_differences: raw.breaking_differences.clone(),
            raw,
        }
    }
}

impl SpecDiffer {
    /// Check whether `consumer` introduces breaking differences relative to `provider`
    pub fn check_compatibility(
        &self,
        provider: &Value,
        consumer: &Value,
    ) -> Result<CompatibilityReport, DiffError> {
        self.diff(provider, consumer).map(CompatibilityReport::from_diff)
    }
}
