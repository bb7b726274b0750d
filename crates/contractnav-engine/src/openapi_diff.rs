//! Structural diff engine for OpenAPI documents
//!
//! Compares two fully-dereferenced specs and classifies every difference as
//! breaking, non-breaking or unclassified from the point of view of an
//! existing client of the source spec.
//!
//! The engine sits behind the [`DiffEngine`] trait and only ever sees spec
//! content as text tagged with a format and a location label, the way an
//! out-of-process diff tool would.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// HTTP methods that name an operation under a path item
const METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// Top-level keys that get a structural comparison instead of a generic one
const STRUCTURAL_KEYS: [&str; 2] = ["paths", "components"];

/// Document flavour a spec is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    OpenApi3,
    Swagger2,
}

impl SpecFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecFormat::OpenApi3 => "openapi3",
            SpecFormat::Swagger2 => "swagger2",
        }
    }

    /// `swagger: "2.0"` documents are Swagger 2, everything else is OpenAPI 3
    pub fn detect(spec: &Value) -> Self {
        match spec.get("swagger").and_then(Value::as_str) {
            Some(version) if version.starts_with('2') => SpecFormat::Swagger2,
            _ => SpecFormat::OpenApi3,
        }
    }
}

impl fmt::Display for SpecFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of a diff as handed to an engine
#[derive(Debug, Clone, PartialEq)]
pub struct SpecInput {
    /// Serialized spec
    pub content: String,

    /// Label used in difference records; never read from disk
    pub location: String,

    pub format: SpecFormat,
}

/// Errors reported by a diff engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Unable to parse spec at {location}: {message}")]
    InvalidContent { location: String, message: String },

    #[error("Cannot compare a {source_format} spec against a {destination_format} spec")]
    FormatMismatch {
        source_format: SpecFormat,
        destination_format: SpecFormat,
    },
}

/// Anything that can compare two specs
///
/// The outcome is a JSON object with `breakingDifferencesFound` and the
/// `breakingDifferences`, `nonBreakingDifferences` and
/// `unclassifiedDifferences` collections. Engines may omit any of them.
pub trait DiffEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn diff_specs(&self, source: &SpecInput, destination: &SpecInput) -> Result<Value, EngineError>;
}

/// Classification of a single difference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Breaking,
    NonBreaking,
    Unclassified,
}

impl Severity {
    fn as_str(&self) -> &'static str {
        match self {
            Severity::Breaking => "breaking",
            Severity::NonBreaking => "non-breaking",
            Severity::Unclassified => "unclassified",
        }
    }
}

/// Built-in engine covering paths, operations, parameters, request bodies,
/// responses and top-level metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenApiDiffEngine;

impl OpenApiDiffEngine {
    pub fn new() -> Self {
        Self
    }
}

impl DiffEngine for OpenApiDiffEngine {
    fn name(&self) -> &'static str {
        "openapi-diff"
    }

    fn diff_specs(&self, source: &SpecInput, destination: &SpecInput) -> Result<Value, EngineError> {
        if source.format != destination.format {
            return Err(EngineError::FormatMismatch {
                source_format: source.format,
                destination_format: destination.format,
            });
        }

        let source_spec = parse_input(source)?;
        let destination_spec = parse_input(destination)?;

        let mut collector = Collector::new(&source.location, &destination.location);
        collector.compare_top_level(&source_spec, &destination_spec);
        collector.compare_paths(
            &object_or_empty(source_spec.get("paths")),
            &object_or_empty(destination_spec.get("paths")),
        );

        tracing::debug!(
            breaking = collector.breaking.len(),
            non_breaking = collector.non_breaking.len(),
            unclassified = collector.unclassified.len(),
            "Compared specs"
        );

        Ok(collector.into_outcome())
    }
}

fn parse_input(input: &SpecInput) -> Result<Map<String, Value>, EngineError> {
    let invalid = |message: String| EngineError::InvalidContent {
        location: input.location.clone(),
        message,
    };

    // Resolved documents can nest past the default limit; the resolver bounds depth
    let mut deserializer = serde_json::Deserializer::from_str(&input.content);
    deserializer.disable_recursion_limit();

    let parsed = Value::deserialize(&mut deserializer).and_then(|value| {
        deserializer.end()?;
        Ok(value)
    });

    match parsed {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(invalid("document root must be an object".to_string())),
        Err(e) => Err(invalid(e.to_string())),
    }
}

fn object_or_empty(value: Option<&Value>) -> Map<String, Value> {
    value.and_then(Value::as_object).cloned().unwrap_or_default()
}

fn key_union<'a>(left: &'a Map<String, Value>, right: &'a Map<String, Value>) -> BTreeSet<&'a str> {
    left.keys().chain(right.keys()).map(String::as_str).collect()
}

/// Parameters of an operation keyed by `in.name`
///
/// Operation-level parameters override path-level ones with the same key.
fn collect_parameters(path_item: &Value, operation: &Value) -> BTreeMap<String, Value> {
    let mut parameters = BTreeMap::new();

    for list in [path_item.get("parameters"), operation.get("parameters")] {
        let Some(items) = list.and_then(Value::as_array) else {
            continue;
        };

        for parameter in items {
            let location = parameter.get("in").and_then(Value::as_str);
            let name = parameter.get("name").and_then(Value::as_str);
            if let (Some(location), Some(name)) = (location, name) {
                parameters.insert(format!("{location}.{name}"), parameter.clone());
            }
        }
    }

    parameters
}

fn is_required_parameter(parameter: &Value) -> bool {
    parameter.get("in").and_then(Value::as_str) == Some("path")
        || parameter.get("required").and_then(Value::as_bool).unwrap_or(false)
}

fn is_required_body(body: &Value) -> bool {
    body.get("required").and_then(Value::as_bool).unwrap_or(false)
}

/// Shape-bearing part of a request body or response
fn body_shape(value: &Value) -> Option<&Value> {
    value.get("content").or_else(|| value.get("schema"))
}

/// Parameter shape: the schema in OpenAPI 3, the inline type fields in Swagger 2
fn parameter_shape(parameter: &Value) -> Value {
    if let Some(schema) = parameter.get("schema") {
        return schema.clone();
    }

    let mut shape = Map::new();
    for key in ["type", "format", "items", "enum", "collectionFormat"] {
        if let Some(value) = parameter.get(key) {
            shape.insert(key.to_string(), value.clone());
        }
    }
    Value::Object(shape)
}

/// Accumulates difference records per classification
struct Collector<'a> {
    source_location: &'a str,
    destination_location: &'a str,
    breaking: Vec<Value>,
    non_breaking: Vec<Value>,
    unclassified: Vec<Value>,
}

impl<'a> Collector<'a> {
    fn new(source_location: &'a str, destination_location: &'a str) -> Self {
        Self {
            source_location,
            destination_location,
            breaking: Vec::new(),
            non_breaking: Vec::new(),
            unclassified: Vec::new(),
        }
    }

    fn record(
        &mut self,
        severity: Severity,
        code: &str,
        entity: &str,
        location: &str,
        before: Option<&Value>,
        after: Option<&Value>,
    ) {
        let action = code.rsplit('.').next().unwrap_or(code);

        let details = |spec_location: &str, value: Option<&Value>| match value {
            Some(value) => json!([{
                "location": location,
                "specLocation": spec_location,
                "value": value,
            }]),
            None => json!([]),
        };

        let record = json!({
            "type": severity.as_str(),
            "action": action,
            "code": code,
            "entity": entity,
            "source": "openapi-diff",
            "sourceSpecEntityDetails": details(self.source_location, before),
            "destinationSpecEntityDetails": details(self.destination_location, after),
        });

        match severity {
            Severity::Breaking => self.breaking.push(record),
            Severity::NonBreaking => self.non_breaking.push(record),
            Severity::Unclassified => self.unclassified.push(record),
        }
    }

    fn compare_top_level(&mut self, source: &Map<String, Value>, destination: &Map<String, Value>) {
        for key in key_union(source, destination) {
            if STRUCTURAL_KEYS.contains(&key) {
                continue;
            }

            match (source.get(key), destination.get(key)) {
                (Some(before), None) => self.record(
                    Severity::Unclassified,
                    &format!("{key}.remove"),
                    key,
                    key,
                    Some(before),
                    None,
                ),
                (None, Some(after)) => self.record(
                    Severity::Unclassified,
                    &format!("{key}.add"),
                    key,
                    key,
                    None,
                    Some(after),
                ),
                (Some(before), Some(after)) if before != after => self.record(
                    Severity::Unclassified,
                    &format!("{key}.change"),
                    key,
                    key,
                    Some(before),
                    Some(after),
                ),
                _ => {}
            }
        }
    }

    fn compare_paths(&mut self, source: &Map<String, Value>, destination: &Map<String, Value>) {
        for path in key_union(source, destination) {
            let location = format!("paths.{path}");

            match (source.get(path), destination.get(path)) {
                (Some(before), None) => {
                    self.record(Severity::Breaking, "path.remove", "path", &location, Some(before), None)
                }
                (None, Some(after)) => {
                    self.record(Severity::NonBreaking, "path.add", "path", &location, None, Some(after))
                }
                (Some(before), Some(after)) => self.compare_path_item(&location, before, after),
                (None, None) => {}
            }
        }
    }

    fn compare_path_item(&mut self, path_location: &str, source: &Value, destination: &Value) {
        for method in METHODS {
            let location = format!("{path_location}.{method}");

            match (source.get(method), destination.get(method)) {
                (Some(before), None) => {
                    self.record(Severity::Breaking, "method.remove", "method", &location, Some(before), None)
                }
                (None, Some(after)) => {
                    self.record(Severity::NonBreaking, "method.add", "method", &location, None, Some(after))
                }
                (Some(before), Some(after)) => {
                    let before_params = collect_parameters(source, before);
                    let after_params = collect_parameters(destination, after);
                    self.compare_parameters(&location, &before_params, &after_params);

                    self.compare_request_body(&location, before.get("requestBody"), after.get("requestBody"));
                    self.compare_responses(
                        &location,
                        &object_or_empty(before.get("responses")),
                        &object_or_empty(after.get("responses")),
                    );
                }
                (None, None) => {}
            }
        }
    }

    fn compare_parameters(
        &mut self,
        operation_location: &str,
        source: &BTreeMap<String, Value>,
        destination: &BTreeMap<String, Value>,
    ) {
        let keys: BTreeSet<&String> = source.keys().chain(destination.keys()).collect();

        for key in keys {
            let location = format!("{operation_location}.parameters.{key}");
            let entity = format!("parameter.{key}");

            match (source.get(key), destination.get(key)) {
                (Some(before), None) => {
                    self.record(Severity::Breaking, "parameter.remove", &entity, &location, Some(before), None)
                }
                (None, Some(after)) => {
                    let severity = if is_required_parameter(after) {
                        Severity::Breaking
                    } else {
                        Severity::NonBreaking
                    };
                    self.record(severity, "parameter.add", &entity, &location, None, Some(after));
                }
                (Some(before), Some(after)) => {
                    match (is_required_parameter(before), is_required_parameter(after)) {
                        (false, true) => self.record(
                            Severity::Breaking,
                            "parameter.required.change",
                            &entity,
                            &location,
                            Some(before),
                            Some(after),
                        ),
                        (true, false) => self.record(
                            Severity::NonBreaking,
                            "parameter.required.change",
                            &entity,
                            &location,
                            Some(before),
                            Some(after),
                        ),
                        _ => {}
                    }

                    if parameter_shape(before) != parameter_shape(after) {
                        self.record(
                            Severity::Unclassified,
                            "parameter.schema.change",
                            &entity,
                            &location,
                            Some(before),
                            Some(after),
                        );
                    }
                }
                (None, None) => {}
            }
        }
    }

    fn compare_request_body(&mut self, operation_location: &str, source: Option<&Value>, destination: Option<&Value>) {
        let location = format!("{operation_location}.requestBody");
        let entity = "request.body";

        match (source, destination) {
            (None, Some(after)) => {
                let severity = if is_required_body(after) {
                    Severity::Breaking
                } else {
                    Severity::NonBreaking
                };
                self.record(severity, "request.body.add", entity, &location, None, Some(after));
            }
            (Some(before), None) => {
                self.record(Severity::Unclassified, "request.body.remove", entity, &location, Some(before), None)
            }
            (Some(before), Some(after)) => {
                match (is_required_body(before), is_required_body(after)) {
                    (false, true) => self.record(
                        Severity::Breaking,
                        "request.body.required.change",
                        entity,
                        &location,
                        Some(before),
                        Some(after),
                    ),
                    (true, false) => self.record(
                        Severity::NonBreaking,
                        "request.body.required.change",
                        entity,
                        &location,
                        Some(before),
                        Some(after),
                    ),
                    _ => {}
                }

                if body_shape(before) != body_shape(after) {
                    self.record(
                        Severity::Unclassified,
                        "request.body.scope.change",
                        entity,
                        &location,
                        body_shape(before),
                        body_shape(after),
                    );
                }
            }
            (None, None) => {}
        }
    }

    fn compare_responses(
        &mut self,
        operation_location: &str,
        source: &Map<String, Value>,
        destination: &Map<String, Value>,
    ) {
        for status in key_union(source, destination) {
            let location = format!("{operation_location}.responses.{status}");

            match (source.get(status), destination.get(status)) {
                (Some(before), None) => self.record(
                    Severity::Breaking,
                    "response.status-code.remove",
                    "response.status-code",
                    &location,
                    Some(before),
                    None,
                ),
                (None, Some(after)) => self.record(
                    Severity::NonBreaking,
                    "response.status-code.add",
                    "response.status-code",
                    &location,
                    None,
                    Some(after),
                ),
                (Some(before), Some(after)) if body_shape(before) != body_shape(after) => self.record(
                    Severity::Unclassified,
                    "response.body.scope.change",
                    "response.body",
                    &location,
                    body_shape(before),
                    body_shape(after),
                ),
                _ => {}
            }
        }
    }

    fn into_outcome(self) -> Value {
        let mut outcome = Map::new();
        outcome.insert(
            "breakingDifferencesFound".to_string(),
            Value::Bool(!self.breaking.is_empty()),
        );
        outcome.insert("nonBreakingDifferences".to_string(), Value::Array(self.non_breaking));
        outcome.insert("unclassifiedDifferences".to_string(), Value::Array(self.unclassified));
        if !self.breaking.is_empty() {
            outcome.insert("breakingDifferences".to_string(), Value::Array(self.breaking));
        }
        Value::Object(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(spec: &Value, location: &str) -> SpecInput {
        SpecInput {
            content: spec.to_string(),
            location: location.to_string(),
            format: SpecFormat::detect(spec),
        }
    }

    fn diff(before: Value, after: Value) -> Value {
        OpenApiDiffEngine::new()
            .diff_specs(&input(&before, "source"), &input(&after, "destination"))
            .unwrap()
    }

    fn codes(outcome: &Value, collection: &str) -> Vec<String> {
        outcome
            .get(collection)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["code"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn spec_with_operation(operation: Value) -> Value {
        json!({
            "openapi": "3.0.0",
            "info": {"title": "API", "version": "1.0.0"},
            "paths": {"/users": {"get": operation}}
        })
    }

    #[test]
    fn detects_format() {
        assert_eq!(SpecFormat::detect(&json!({"swagger": "2.0"})), SpecFormat::Swagger2);
        assert_eq!(SpecFormat::detect(&json!({"openapi": "3.1.0"})), SpecFormat::OpenApi3);
        assert_eq!(SpecFormat::detect(&json!({})), SpecFormat::OpenApi3);
    }

    #[test]
    fn identical_specs_have_no_differences() {
        let spec = spec_with_operation(json!({"responses": {"200": {"description": "ok"}}}));
        let outcome = diff(spec.clone(), spec);

        assert_eq!(outcome["breakingDifferencesFound"], json!(false));
        assert_eq!(outcome["nonBreakingDifferences"], json!([]));
        assert_eq!(outcome["unclassifiedDifferences"], json!([]));
        assert!(outcome.get("breakingDifferences").is_none());
    }

    #[test]
    fn path_removal_is_breaking_and_addition_is_not() {
        let before = json!({"openapi": "3.0.0", "paths": {"/users": {}, "/orders": {}}});
        let after = json!({"openapi": "3.0.0", "paths": {"/users": {}, "/invoices": {}}});

        let outcome = diff(before, after);
        assert_eq!(outcome["breakingDifferencesFound"], json!(true));
        assert_eq!(codes(&outcome, "breakingDifferences"), vec!["path.remove"]);
        assert_eq!(codes(&outcome, "nonBreakingDifferences"), vec!["path.add"]);
    }

    #[test]
    fn record_shape() {
        let before = json!({"openapi": "3.0.0", "paths": {"/users": {"get": {}}}});
        let after = json!({"openapi": "3.0.0", "paths": {}});

        let outcome = diff(before, after);
        let record = &outcome["breakingDifferences"][0];

        assert_eq!(record["type"], "breaking");
        assert_eq!(record["action"], "remove");
        assert_eq!(record["entity"], "path");
        assert_eq!(record["sourceSpecEntityDetails"][0]["location"], "paths./users");
        assert_eq!(record["sourceSpecEntityDetails"][0]["specLocation"], "source");
        assert_eq!(record["destinationSpecEntityDetails"], json!([]));
    }

    #[test]
    fn method_changes() {
        let before = json!({"paths": {"/users": {"get": {}, "delete": {}}}});
        let after = json!({"paths": {"/users": {"get": {}, "post": {}}}});

        let outcome = diff(before, after);
        assert_eq!(codes(&outcome, "breakingDifferences"), vec!["method.remove"]);
        assert_eq!(codes(&outcome, "nonBreakingDifferences"), vec!["method.add"]);
    }

    #[test]
    fn required_parameter_added_is_breaking() {
        let before = spec_with_operation(json!({}));
        let after = spec_with_operation(json!({"parameters": [
            {"name": "tenant", "in": "header", "required": true},
            {"name": "limit", "in": "query"}
        ]}));

        let outcome = diff(before, after);
        assert_eq!(codes(&outcome, "breakingDifferences"), vec!["parameter.add"]);
        assert_eq!(outcome["breakingDifferences"][0]["entity"], "parameter.header.tenant");
        assert_eq!(codes(&outcome, "nonBreakingDifferences"), vec!["parameter.add"]);
    }

    #[test]
    fn parameter_requirement_changes() {
        let before = spec_with_operation(json!({"parameters": [
            {"name": "a", "in": "query", "required": false},
            {"name": "b", "in": "query", "required": true}
        ]}));
        let after = spec_with_operation(json!({"parameters": [
            {"name": "a", "in": "query", "required": true},
            {"name": "b", "in": "query", "required": false}
        ]}));

        let outcome = diff(before, after);
        assert_eq!(outcome["breakingDifferences"][0]["entity"], "parameter.query.a");
        assert_eq!(outcome["nonBreakingDifferences"][0]["entity"], "parameter.query.b");
    }

    #[test]
    fn path_level_parameters_are_merged() {
        let before = json!({"paths": {"/users/{id}": {
            "parameters": [{"name": "id", "in": "path", "required": true}],
            "get": {}
        }}});
        let after = json!({"paths": {"/users/{id}": {
            "get": {"parameters": [{"name": "id", "in": "path", "required": true}]}
        }}});

        let outcome = diff(before, after);
        assert_eq!(outcome["breakingDifferencesFound"], json!(false));
        assert!(codes(&outcome, "nonBreakingDifferences").is_empty());
    }

    #[test]
    fn parameter_removal_and_schema_change() {
        let before = spec_with_operation(json!({"parameters": [
            {"name": "q", "in": "query", "schema": {"type": "string"}},
            {"name": "page", "in": "query", "schema": {"type": "integer"}}
        ]}));
        let after = spec_with_operation(json!({"parameters": [
            {"name": "q", "in": "query", "schema": {"type": "integer"}}
        ]}));

        let outcome = diff(before, after);
        assert_eq!(codes(&outcome, "breakingDifferences"), vec!["parameter.remove"]);
        assert_eq!(codes(&outcome, "unclassifiedDifferences"), vec!["parameter.schema.change"]);
    }

    #[test]
    fn request_body_rules() {
        let body = |required: bool, kind: &str| {
            json!({"required": required, "content": {"application/json": {"schema": {"type": kind}}}})
        };

        let outcome = diff(
            spec_with_operation(json!({})),
            spec_with_operation(json!({"requestBody": body(true, "object")})),
        );
        assert_eq!(codes(&outcome, "breakingDifferences"), vec!["request.body.add"]);

        let outcome = diff(
            spec_with_operation(json!({})),
            spec_with_operation(json!({"requestBody": body(false, "object")})),
        );
        assert_eq!(codes(&outcome, "nonBreakingDifferences"), vec!["request.body.add"]);

        let outcome = diff(
            spec_with_operation(json!({"requestBody": body(false, "object")})),
            spec_with_operation(json!({"requestBody": body(true, "array")})),
        );
        assert_eq!(codes(&outcome, "breakingDifferences"), vec!["request.body.required.change"]);
        assert_eq!(codes(&outcome, "unclassifiedDifferences"), vec!["request.body.scope.change"]);
    }

    #[test]
    fn response_status_rules() {
        let before = spec_with_operation(json!({"responses": {
            "200": {"content": {"application/json": {"schema": {"type": "object"}}}},
            "404": {"description": "missing"}
        }}));
        let after = spec_with_operation(json!({"responses": {
            "200": {"content": {"application/json": {"schema": {"type": "array"}}}},
            "201": {"description": "created"}
        }}));

        let outcome = diff(before, after);
        assert_eq!(codes(&outcome, "breakingDifferences"), vec!["response.status-code.remove"]);
        assert_eq!(codes(&outcome, "nonBreakingDifferences"), vec!["response.status-code.add"]);
        assert_eq!(codes(&outcome, "unclassifiedDifferences"), vec!["response.body.scope.change"]);
    }

    #[test]
    fn top_level_changes_are_unclassified() {
        let before = json!({"openapi": "3.0.0", "info": {"version": "1.0.0"}, "servers": []});
        let after = json!({"openapi": "3.0.0", "info": {"version": "2.0.0"}, "tags": [], "components": {"schemas": {}}});

        let outcome = diff(before, after);
        assert_eq!(
            codes(&outcome, "unclassifiedDifferences"),
            vec!["info.change", "servers.remove", "tags.add"]
        );
        assert_eq!(outcome["breakingDifferencesFound"], json!(false));
    }

    #[test]
    fn invalid_content_is_an_engine_error() {
        let good = input(&json!({"openapi": "3.0.0"}), "source");
        let bad = SpecInput {
            content: "not json".to_string(),
            location: "destination".to_string(),
            format: SpecFormat::OpenApi3,
        };

        let err = OpenApiDiffEngine::new().diff_specs(&good, &bad).unwrap_err();
        assert!(matches!(err, EngineError::InvalidContent { ref location, .. } if location == "destination"));

        let array = SpecInput {
            content: "[]".to_string(),
            ..bad
        };
        assert!(OpenApiDiffEngine::new().diff_specs(&good, &array).is_err());
    }

    #[test]
    fn mixed_formats_are_rejected() {
        let v3 = input(&json!({"openapi": "3.0.0"}), "source");
        let v2 = input(&json!({"swagger": "2.0"}), "destination");

        let err = OpenApiDiffEngine::new().diff_specs(&v3, &v2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot compare a openapi3 spec against a swagger2 spec"
        );
    }
}
