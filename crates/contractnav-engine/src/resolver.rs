//! In-memory `$ref` dereferencing
//!
//! Produces a self-contained copy of a spec with every internal reference
//! replaced by the structure it points to. Resolution never touches the
//! filesystem or the network: references that point outside the document
//! (relative files, URLs) are rejected.

use serde_json::{Map, Value};

/// Key holding a reference pointer
const REF_KEY: &str = "$ref";

/// Default bound on the nesting depth of a resolved document
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Errors that can occur while dereferencing a spec
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Pointer does not match anything in the document
    #[error("Missing $ref pointer \"{0}\". Token not found in document")]
    MissingTarget(String),

    /// Reference to another file or URL
    #[error("External $ref \"{0}\" is not supported: file and network resolution are disabled")]
    ExternalReference(String),

    /// Malformed pointer
    #[error("Invalid $ref \"{reference}\": {reason}")]
    InvalidReference { reference: String, reason: String },

    /// Reference cycle, with [`CircularRefs::Reject`]
    #[error("Circular $ref \"{0}\"")]
    Circular(String),

    /// Resolved document nests deeper than [`ResolverOptions::max_depth`]
    #[error("Maximum resolution depth of {limit} exceeded at $ref \"{reference}\"")]
    TooDeep { reference: String, limit: usize },
}

/// What to do when a reference leads back into itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CircularRefs {
    /// Leave the recurring `$ref` node in place
    #[default]
    Preserve,

    /// Fail with [`ResolveError::Circular`]
    Reject,
}

/// Resolver settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    pub circular: CircularRefs,

    /// Nesting depth the resolved document may reach
    pub max_depth: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            circular: CircularRefs::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Dereferences internal `$ref` pointers of a JSON document
#[derive(Debug, Clone, Default)]
pub struct RefResolver {
    options: ResolverOptions,
}

impl RefResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ResolverOptions) -> Self {
        Self { options }
    }

    /// Return a fully dereferenced copy of `spec`
    pub fn resolve(&self, spec: &Value) -> Result<Value, ResolveError> {
        let mut in_progress = Vec::new();
        self.resolve_node(spec, spec, 0, &mut in_progress)
    }

    fn resolve_node(
        &self,
        root: &Value,
        node: &Value,
        depth: usize,
        in_progress: &mut Vec<String>,
    ) -> Result<Value, ResolveError> {
        match node {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get(REF_KEY) {
                    return self.resolve_reference(root, map, reference, depth, in_progress);
                }

                let mut out = Map::new();
                for (key, child) in map {
                    out.insert(key.clone(), self.resolve_node(root, child, depth + 1, in_progress)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_node(root, item, depth + 1, in_progress))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            scalar => Ok(scalar.clone()),
        }
    }

    fn resolve_reference(
        &self,
        root: &Value,
        ref_node: &Map<String, Value>,
        reference: &str,
        depth: usize,
        in_progress: &mut Vec<String>,
    ) -> Result<Value, ResolveError> {
        if depth >= self.options.max_depth {
            return Err(ResolveError::TooDeep {
                reference: reference.to_string(),
                limit: self.options.max_depth,
            });
        }

        let pointer = internal_pointer(reference)?;

        if in_progress.contains(&pointer) {
            return match self.options.circular {
                CircularRefs::Preserve => Ok(Value::Object(ref_node.clone())),
                CircularRefs::Reject => Err(ResolveError::Circular(reference.to_string())),
            };
        }

        let target = root
            .pointer(&pointer)
            .ok_or_else(|| ResolveError::MissingTarget(reference.to_string()))?;

        in_progress.push(pointer);
        let resolved = self.resolve_node(root, target, depth, in_progress);
        in_progress.pop();
        let mut resolved = resolved?;

        // Keys next to "$ref" extend the resolved object
        if let Value::Object(resolved_map) = &mut resolved {
            for (key, sibling) in ref_node.iter().filter(|(key, _)| key.as_str() != REF_KEY) {
                let sibling = self.resolve_node(root, sibling, depth + 1, in_progress)?;
                resolved_map.insert(key.clone(), sibling);
            }
        }

        Ok(resolved)
    }
}

/// Turn `#/a/b` into the JSON pointer `/a/b`; anything without `#` is external
fn internal_pointer(reference: &str) -> Result<String, ResolveError> {
    let Some(fragment) = reference.strip_prefix('#') else {
        return Err(ResolveError::ExternalReference(reference.to_string()));
    };

    let pointer = percent_decode(fragment).ok_or_else(|| ResolveError::InvalidReference {
        reference: reference.to_string(),
        reason: "malformed percent-encoding".to_string(),
    })?;

    if !pointer.is_empty() && !pointer.starts_with('/') {
        return Err(ResolveError::InvalidReference {
            reference: reference.to_string(),
            reason: "fragment must be empty or start with '/'".to_string(),
        });
    }

    Ok(pointer)
}

/// Decode `%XX` escapes in a URI fragment
fn percent_decode(input: &str) -> Option<String> {
    if !input.contains('%') {
        return Some(input.to_string());
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_component_schema() {
        let spec = json!({
            "paths": {"/users": {"get": {"responses": {"200": {
                "content": {"application/json": {"schema": {"$ref": "#/components/schemas/User"}}}
            }}}}},
            "components": {"schemas": {"User": {"type": "object", "properties": {"id": {"type": "integer"}}}}}
        });

        let resolved = RefResolver::new().resolve(&spec).unwrap();
        let schema = &resolved["paths"]["/users"]["get"]["responses"]["200"]["content"]["application/json"]["schema"];

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["id"]["type"], "integer");
        assert!(schema.get("$ref").is_none());
    }

    #[test]
    fn follows_reference_chains() {
        let spec = json!({
            "a": {"$ref": "#/b"},
            "b": {"$ref": "#/c"},
            "c": {"value": 1}
        });

        let resolved = RefResolver::new().resolve(&spec).unwrap();
        assert_eq!(resolved["a"], json!({"value": 1}));
        assert_eq!(resolved["b"], json!({"value": 1}));
    }

    #[test]
    fn decodes_escaped_pointer_tokens() {
        let spec = json!({
            "paths": {"/users/{id}": {"get": {"operationId": "getUser"}}},
            "alias": {"$ref": "#/paths/~1users~1%7Bid%7D/get"}
        });

        let resolved = RefResolver::new().resolve(&spec).unwrap();
        assert_eq!(resolved["alias"]["operationId"], "getUser");
    }

    #[test]
    fn siblings_extend_the_target() {
        let spec = json!({
            "defs": {"Name": {"type": "string"}},
            "field": {"$ref": "#/defs/Name", "description": "display name"}
        });

        let resolved = RefResolver::new().resolve(&spec).unwrap();
        assert_eq!(resolved["field"], json!({"type": "string", "description": "display name"}));
    }

    #[test]
    fn dangling_reference_fails() {
        let spec = json!({"a": {"$ref": "#/components/schemas/Missing"}});

        let err = RefResolver::new().resolve(&spec).unwrap_err();
        assert_eq!(err, ResolveError::MissingTarget("#/components/schemas/Missing".to_string()));
    }

    #[test]
    fn external_references_are_never_fetched() {
        for reference in ["other.json#/User", "https://example.com/spec.json", "./schemas/user.json"] {
            let spec = json!({"a": {"$ref": reference}});
            let err = RefResolver::new().resolve(&spec).unwrap_err();
            assert!(matches!(err, ResolveError::ExternalReference(_)), "{reference}");
        }
    }

    #[test]
    fn malformed_fragment_is_invalid() {
        let spec = json!({"a": {"$ref": "#components"}});
        assert!(matches!(
            RefResolver::new().resolve(&spec),
            Err(ResolveError::InvalidReference { .. })
        ));

        let spec = json!({"a": {"$ref": "#/bad%zz"}});
        assert!(matches!(
            RefResolver::new().resolve(&spec),
            Err(ResolveError::InvalidReference { .. })
        ));
    }

    #[test]
    fn circular_references_are_preserved_by_default() {
        let spec = json!({
            "components": {"schemas": {"Node": {
                "type": "object",
                "properties": {"next": {"$ref": "#/components/schemas/Node"}}
            }}},
            "root": {"$ref": "#/components/schemas/Node"}
        });

        let resolved = RefResolver::new().resolve(&spec).unwrap();
        assert_eq!(resolved["root"]["type"], "object");
        assert_eq!(
            resolved["root"]["properties"]["next"],
            json!({"$ref": "#/components/schemas/Node"})
        );
    }

    #[test]
    fn circular_references_can_be_rejected() {
        let spec = json!({"a": {"$ref": "#/b"}, "b": {"inner": {"$ref": "#/a"}}});
        let resolver = RefResolver::with_options(ResolverOptions {
            circular: CircularRefs::Reject,
            ..ResolverOptions::default()
        });

        assert!(matches!(resolver.resolve(&spec), Err(ResolveError::Circular(_))));
    }

    /// `S0 -> S1 -> ... -> S{len}`, each schema nesting the next under a property
    fn schema_chain(len: usize) -> Value {
        let mut schemas = Map::new();
        for i in 0..len {
            schemas.insert(
                format!("S{i}"),
                json!({"type": "object", "properties": {"x": {"$ref": format!("#/defs/S{}", i + 1)}}}),
            );
        }
        schemas.insert(format!("S{len}"), json!({"type": "string"}));
        json!({"root": {"$ref": "#/defs/S0"}, "defs": schemas})
    }

    #[test]
    fn long_reference_chains_hit_the_depth_limit() {
        let err = RefResolver::new().resolve(&schema_chain(5000)).unwrap_err();
        assert!(matches!(err, ResolveError::TooDeep { limit: DEFAULT_MAX_DEPTH, .. }));
    }

    #[test]
    fn depth_limit_is_configurable() {
        let spec = schema_chain(10);
        assert!(RefResolver::new().resolve(&spec).is_ok());

        let resolver = RefResolver::with_options(ResolverOptions {
            max_depth: 8,
            ..ResolverOptions::default()
        });
        assert!(matches!(resolver.resolve(&spec), Err(ResolveError::TooDeep { limit: 8, .. })));
    }

    #[test]
    fn non_string_ref_keys_are_plain_properties() {
        let spec = json!({"properties": {"$ref": {"type": "string"}}});
        let resolved = RefResolver::new().resolve(&spec).unwrap();
        assert_eq!(resolved, spec);
    }
}
