//! `openapi://` resources: index, server info, contract listings and specs

use crate::protocol::{JsonRpcError, ResourceContents};
use contractnav_core::{ContractRole, ContractSource, StoreError};
use contractnav_store::SpecStore;
use serde_json::{json, Value};

pub const SCHEME: &str = "openapi://";
pub const INDEX_URI: &str = "openapi://index";
pub const SERVER_INFO_URI: &str = "openapi://server/info";
pub const JSON_MIME: &str = "application/json";

/// Maximum number of completion values returned
pub const MAX_COMPLETIONS: usize = 50;

/// Parsed resource address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceUri {
    Index,
    ServerInfo,
    Contracts {
        source: ContractSource,
        role: ContractRole,
    },
    Spec {
        source: ContractSource,
        role: ContractRole,
        name: String,
    },
}

impl ResourceUri {
    pub fn parse(uri: &str) -> Result<Self, JsonRpcError> {
        let not_found = || JsonRpcError::resource_not_found(uri);
        let rest = uri.strip_prefix(SCHEME).ok_or_else(not_found)?;

        match rest {
            "index" => return Ok(ResourceUri::Index),
            "server/info" => return Ok(ResourceUri::ServerInfo),
            _ => {}
        }

        let mut parts = rest.splitn(4, '/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("contracts"), Some(source), Some(kind), None) => Ok(ResourceUri::Contracts {
                source: source.parse()?,
                role: kind.parse()?,
            }),
            // Object-store names may be nested, so the name takes the remainder
            (Some("spec"), Some(source), Some(kind), Some(name)) if !name.is_empty() => {
                Ok(ResourceUri::Spec {
                    source: source.parse()?,
                    role: kind.parse()?,
                    name: name.to_string(),
                })
            }
            _ => Err(not_found()),
        }
    }
}

pub fn contracts_uri(source: ContractSource, role: ContractRole) -> String {
    format!("{SCHEME}contracts/{source}/{role}")
}

pub fn spec_uri(source: ContractSource, role: ContractRole, name: &str) -> String {
    format!("{SCHEME}spec/{source}/{role}/{name}")
}

fn source_label(source: ContractSource) -> &'static str {
    match source {
        ContractSource::Local => "Local",
        ContractSource::S3 => "S3",
    }
}

fn role_label(role: ContractRole) -> &'static str {
    match role {
        ContractRole::Provider => "Provider",
        ContractRole::Consumer => "Consumer",
    }
}

/// `resources/list`: fixed resources, listings and every known spec
///
/// Listing failures for a source just leave its specs out.
pub async fn list_resources(store: &SpecStore) -> Value {
    let mut resources = vec![
        json!({
            "uri": INDEX_URI,
            "name": "openapi-index",
            "title": "OpenAPI Contract Index",
            "description": "Lists available OpenAPI provider and consumer contracts",
            "mimeType": JSON_MIME,
        }),
        json!({
            "uri": SERVER_INFO_URI,
            "name": "server-info",
            "title": "OpenAPI MCP Server Info",
            "description": "Configuration summary (safe fields only).",
            "mimeType": JSON_MIME,
        }),
    ];

    for source in store.enabled_sources() {
        for role in ContractRole::ALL {
            resources.push(json!({
                "uri": contracts_uri(source, role),
                "name": format!("{} {} Contracts", source_label(source), role_label(role)),
                "mimeType": JSON_MIME,
            }));
        }

        for role in ContractRole::ALL {
            match store.list_contracts(source, role).await {
                Ok(names) => {
                    for name in names {
                        resources.push(json!({
                            "uri": spec_uri(source, role, &name),
                            "name": name,
                            "mimeType": JSON_MIME,
                        }));
                    }
                }
                Err(e) => tracing::debug!(%source, %role, error = %e, "Skipping spec listing"),
            }
        }
    }

    json!({ "resources": resources })
}

/// `resources/templates/list`: parameterized addresses per enabled source
pub fn list_templates(store: &SpecStore) -> Value {
    let mut templates = Vec::new();

    for source in store.enabled_sources() {
        let label = source_label(source);
        templates.push(json!({
            "uriTemplate": format!("{SCHEME}contracts/{source}/{{kind}}"),
            "name": format!("contracts-{source}"),
            "title": format!("Contract Directory ({label})"),
            "description": format!("Lists {label} JSON OpenAPI contracts for provider/consumer."),
            "mimeType": JSON_MIME,
        }));
        templates.push(json!({
            "uriTemplate": format!("{SCHEME}spec/{source}/{{kind}}/{{name}}"),
            "name": format!("openapi-{source}"),
            "title": format!("OpenAPI Contract ({label})"),
            "description": format!("Reads a {label} OpenAPI JSON spec."),
            "mimeType": JSON_MIME,
        }));
    }

    json!({ "resourceTemplates": templates })
}

/// `resources/read`
pub async fn read_resource(store: &SpecStore, uri: &str) -> Result<Value, JsonRpcError> {
    let body = match ResourceUri::parse(uri)? {
        ResourceUri::Index => index(store).await?,
        ResourceUri::ServerInfo => serde_json::to_value(store.safe_info())
            .map_err(|e| JsonRpcError::internal(e.to_string()))?,
        ResourceUri::Contracts { source, role } => {
            let contracts = store.list_contracts(source, role).await?;
            json!({ "source": source.as_str(), "kind": role.as_str(), "contracts": contracts })
        }
        ResourceUri::Spec { source, role, name } => {
            let spec = store.load_spec(source, role, &name).await?;
            spec.as_ref().clone()
        }
    };

    let text = serde_json::to_string_pretty(&body).map_err(|e| JsonRpcError::internal(e.to_string()))?;
    let contents = ResourceContents {
        uri: uri.to_string(),
        mime_type: JSON_MIME,
        text,
    };

    Ok(json!({ "contents": [contents] }))
}

/// Contract index across sources
///
/// The object store is optional: if listing it fails the index still
/// answers, with empty S3 lists.
pub async fn index(store: &SpecStore) -> Result<Value, StoreError> {
    let providers = store
        .list_contracts(ContractSource::Local, ContractRole::Provider)
        .await?;
    let consumers = store
        .list_contracts(ContractSource::Local, ContractRole::Consumer)
        .await?;
    let s3_enabled = store.is_s3_enabled();

    let s3 = if s3_enabled {
        let listed = async {
            let providers = store.list_contracts(ContractSource::S3, ContractRole::Provider).await?;
            let consumers = store.list_contracts(ContractSource::S3, ContractRole::Consumer).await?;
            Ok::<_, StoreError>((providers, consumers))
        };

        let (providers, consumers) = listed.await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to list S3 contracts");
            (Vec::new(), Vec::new())
        });
        json!({ "providers": providers, "consumers": consumers })
    } else {
        Value::Null
    };

    Ok(json!({
        "local": { "providers": providers, "consumers": consumers },
        "s3": s3,
        "sources": { "local": true, "s3": s3_enabled },
    }))
}

/// `completion/complete` for the `kind` and `name` template arguments
pub async fn complete(store: &SpecStore, params: &Value) -> Result<Value, JsonRpcError> {
    let template = params
        .pointer("/ref/uri")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonRpcError::invalid_params("Missing ref.uri"))?;
    let argument = params
        .pointer("/argument/name")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonRpcError::invalid_params("Missing argument.name"))?;
    let prefix = params
        .pointer("/argument/value")
        .and_then(Value::as_str)
        .unwrap_or("");

    let source = template_source(template)?;

    let values: Vec<String> = match argument {
        "kind" => ContractRole::ALL
            .iter()
            .map(|role| role.as_str().to_string())
            .filter(|role| role.starts_with(prefix))
            .collect(),
        "name" => {
            let kind = params
                .pointer("/context/arguments/kind")
                .and_then(Value::as_str)
                .ok_or_else(|| JsonRpcError::invalid_params("Missing context.arguments.kind"))?;
            let role: ContractRole = kind.parse()?;

            store
                .list_contracts(source, role)
                .await?
                .into_iter()
                .filter(|name| name.starts_with(prefix))
                .collect()
        }
        _ => Vec::new(),
    };

    let total = values.len();
    let values: Vec<String> = values.into_iter().take(MAX_COMPLETIONS).collect();

    Ok(json!({
        "completion": {
            "values": values,
            "total": total,
            "hasMore": total > MAX_COMPLETIONS,
        }
    }))
}

/// Source segment of a resource template such as `openapi://spec/local/{kind}/{name}`
fn template_source(template: &str) -> Result<ContractSource, JsonRpcError> {
    let source = template
        .strip_prefix(SCHEME)
        .and_then(|rest| rest.split('/').nth(1))
        .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown resource template: {template}")))?;

    Ok(source.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_uris() {
        assert_eq!(ResourceUri::parse(INDEX_URI).unwrap(), ResourceUri::Index);
        assert_eq!(ResourceUri::parse(SERVER_INFO_URI).unwrap(), ResourceUri::ServerInfo);
    }

    #[test]
    fn parses_contract_listing_uri() {
        assert_eq!(
            ResourceUri::parse("openapi://contracts/local/Provider").unwrap(),
            ResourceUri::Contracts {
                source: ContractSource::Local,
                role: ContractRole::Provider,
            }
        );
    }

    #[test]
    fn spec_names_may_be_nested() {
        assert_eq!(
            ResourceUri::parse("openapi://spec/s3/consumer/team/web.json").unwrap(),
            ResourceUri::Spec {
                source: ContractSource::S3,
                role: ContractRole::Consumer,
                name: "team/web.json".to_string(),
            }
        );
    }

    #[test]
    fn rejects_unknown_uris() {
        for uri in ["http://index", "openapi://nothing", "openapi://spec/local/provider", "openapi://spec/local/provider/"] {
            let err = ResourceUri::parse(uri).unwrap_err();
            assert_eq!(err.code, crate::protocol::RESOURCE_NOT_FOUND, "{uri}");
        }
    }

    #[test]
    fn invalid_kind_is_invalid_params() {
        let err = ResourceUri::parse("openapi://contracts/local/both").unwrap_err();
        assert_eq!(err.code, crate::protocol::INVALID_PARAMS);
        assert!(err.message.contains("both"));
    }

    #[test]
    fn builds_uris() {
        assert_eq!(
            spec_uri(ContractSource::Local, ContractRole::Provider, "a.json"),
            "openapi://spec/local/provider/a.json"
        );
        assert_eq!(
            contracts_uri(ContractSource::S3, ContractRole::Consumer),
            "openapi://contracts/s3/consumer"
        );
    }

    #[test]
    fn template_source_from_uri_template() {
        assert_eq!(
            template_source("openapi://spec/s3/{kind}/{name}").unwrap(),
            ContractSource::S3
        );
        assert!(template_source("file:///tmp").is_err());
    }
}
