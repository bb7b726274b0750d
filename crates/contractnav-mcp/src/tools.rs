//! `diff_contracts` and `validate_compatibility` tools
//!
//! Tool failures never become protocol errors: they come back as a result
//! with `isError` set and a text message.

use crate::protocol::{parse_params, CallToolResult, JsonRpcError};
use contractnav_core::{ContractId, ContractRef, ContractRole, StoreError};
use contractnav_engine::{DiffError, SpecDiffer};
use contractnav_store::SpecStore;
use serde::Deserialize;
use serde_json::{json, Value};

pub const DIFF_CONTRACTS: &str = "diff_contracts";
pub const VALIDATE_COMPATIBILITY: &str = "validate_compatibility";

/// Tool failure, rendered into the text of an error result
#[derive(Debug, thiserror::Error)]
enum ToolError {
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error("Failed to encode result: {0}")]
    Output(String),
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    name: String,

    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct DiffContractsArgs {
    base: ContractRef,
    compare: ContractRef,
}

/// Contract on a fixed side of a compatibility check
#[derive(Debug, Deserialize)]
struct SidedContract {
    source: String,
    name: String,
}

impl SidedContract {
    fn to_id(&self, role: ContractRole) -> Result<ContractId, StoreError> {
        Ok(ContractId::new(self.source.parse()?, role, self.name.clone()))
    }
}

#[derive(Debug, Deserialize)]
struct ValidateCompatibilityArgs {
    provider: SidedContract,
    consumer: SidedContract,
}

fn arguments<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, ToolError> {
    serde_json::from_value(value.clone()).map_err(|e| ToolError::Arguments(e.to_string()))
}

fn contract_ref_schema(with_kind: bool) -> Value {
    let mut properties = json!({
        "source": {"type": "string", "enum": ["local", "s3"]},
        "name": {"type": "string"}
    });
    let mut required = vec!["source", "name"];

    if with_kind {
        properties["kind"] = json!({"type": "string", "enum": ["provider", "consumer"]});
        required.insert(1, "kind");
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

/// `tools/list`
pub fn list_tools() -> Value {
    let differences = json!({"type": "array", "items": {}});

    json!({
        "tools": [
            {
                "name": DIFF_CONTRACTS,
                "title": "Diff OpenAPI contracts (breaking/non-breaking)",
                "description": "Diff two OpenAPI JSON specs and return structured results, including breaking changes.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "base": contract_ref_schema(true),
                        "compare": contract_ref_schema(true)
                    },
                    "required": ["base", "compare"]
                },
                "outputSchema": {
                    "type": "object",
                    "properties": {
                        "breakingDifferencesFound": {"type": "boolean"},
                        "nonBreakingDifferences": differences,
                        "unclassifiedDifferences": differences,
                        "breakingDifferences": differences
                    },
                    "required": ["breakingDifferencesFound", "nonBreakingDifferences", "unclassifiedDifferences"]
                }
            },
            {
                "name": VALIDATE_COMPATIBILITY,
                "title": "Validate consumer vs provider compatibility",
                "description": "Contract testing helper: checks whether consumer changes introduce breaking differences compared to provider.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "provider": contract_ref_schema(false),
                        "consumer": contract_ref_schema(false)
                    },
                    "required": ["provider", "consumer"]
                },
                "outputSchema": {
                    "type": "object",
                    "properties": {
                        "isCompatible": {"type": "boolean"},
                        "breakingDifferencesFound": {"type": "boolean"},
                        "breakingDifferences": differences,
                        "raw": {"type": "object"}
                    },
                    "required": ["isCompatible", "raw"]
                }
            }
        ]
    })
}

/// `tools/call`
///
/// Only an unknown tool or malformed call envelope is a protocol error.
pub async fn call_tool(
    store: &SpecStore,
    differ: &SpecDiffer,
    params: &Value,
) -> Result<CallToolResult, JsonRpcError> {
    let call: ToolCall = parse_params(params)?;
    tracing::debug!(tool = %call.name, "Calling tool");

    let result = match call.name.as_str() {
        DIFF_CONTRACTS => diff_contracts(store, differ, &call.arguments)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Error in diff_contracts tool");
                CallToolResult::error(format!("Error diffing contracts: {e}"))
            }),
        VALIDATE_COMPATIBILITY => validate_compatibility(store, differ, &call.arguments)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Error in validate_compatibility tool");
                CallToolResult::error(format!("Error validating compatibility: {e}"))
            }),
        other => return Err(JsonRpcError::invalid_params(format!("Unknown tool: {other}"))),
    };

    Ok(result)
}

async fn diff_contracts(
    store: &SpecStore,
    differ: &SpecDiffer,
    args: &Value,
) -> Result<CallToolResult, ToolError> {
    let args: DiffContractsArgs = arguments(args)?;
    let base_id = args.base.to_id()?;
    let compare_id = args.compare.to_id()?;

    let base = store.load(&base_id).await?;
    let compare = store.load(&compare_id).await?;

    let result = differ.diff(&base, &compare)?;
    let output = serde_json::to_value(&result).map_err(|e| ToolError::Output(e.to_string()))?;

    Ok(CallToolResult::structured(output))
}

async fn validate_compatibility(
    store: &SpecStore,
    differ: &SpecDiffer,
    args: &Value,
) -> Result<CallToolResult, ToolError> {
    let args: ValidateCompatibilityArgs = arguments(args)?;
    let provider_id = args.provider.to_id(ContractRole::Provider)?;
    let consumer_id = args.consumer.to_id(ContractRole::Consumer)?;

    let provider = store.load(&provider_id).await?;
    let consumer = store.load(&consumer_id).await?;

    let report = differ.check_compatibility(&provider, &consumer)?;
    let output = serde_json::to_value(&report).map_err(|e| ToolError::Output(e.to_string()))?;

    Ok(CallToolResult::structured(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_both_tools() {
        let tools = list_tools();
        let names: Vec<&str> = tools["tools"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect();

        assert_eq!(names, vec![DIFF_CONTRACTS, VALIDATE_COMPATIBILITY]);
    }

    #[test]
    fn compatibility_input_has_no_kind() {
        let tools = list_tools();
        let provider = &tools["tools"][1]["inputSchema"]["properties"]["provider"];

        assert!(provider["properties"].get("kind").is_none());
        assert_eq!(provider["required"], json!(["source", "name"]));
    }

    #[test]
    fn diff_input_requires_kind() {
        let tools = list_tools();
        let base = &tools["tools"][0]["inputSchema"]["properties"]["base"];

        assert_eq!(base["required"], json!(["source", "kind", "name"]));
    }

    #[test]
    fn sided_contract_uses_fixed_role() {
        let contract = SidedContract {
            source: "local".to_string(),
            name: "web.json".to_string(),
        };

        let id = contract.to_id(ContractRole::Consumer).unwrap();
        assert_eq!(id.cache_key(), "local:consumer:web.json");
    }
}
