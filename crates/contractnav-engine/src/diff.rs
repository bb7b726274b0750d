//! Diff orchestration
//!
//! [`SpecDiffer`] resolves both specs, hands them to a [`DiffEngine`] and maps
//! whatever the engine returns into a [`DiffResult`]. Every failure along the
//! way comes back as one [`DiffError`].

use crate::openapi_diff::{DiffEngine, OpenApiDiffEngine, SpecFormat, SpecInput};
use crate::resolver::RefResolver;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Location label for the base spec
pub const SOURCE_LOCATION: &str = "openapi://memory/source";

/// Location label for the compared spec
pub const DESTINATION_LOCATION: &str = "openapi://memory/destination";

/// Structural differences between two specs
///
/// Difference records are passed through from the engine untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub breaking_differences_found: bool,
    pub non_breaking_differences: Vec<Value>,
    pub unclassified_differences: Vec<Value>,
    pub breaking_differences: Vec<Value>,
}

impl DiffResult {
    /// Map a raw engine outcome
    ///
    /// The flag follows JSON truthiness and missing collections become empty.
    pub fn from_outcome(outcome: &Value) -> Self {
        Self {
            breaking_differences_found: outcome
                .get("breakingDifferencesFound")
                .map(is_truthy)
                .unwrap_or(false),
            non_breaking_differences: collection(outcome, "nonBreakingDifferences"),
            unclassified_differences: collection(outcome, "unclassifiedDifferences"),
            breaking_differences: collection(outcome, "breakingDifferences"),
        }
    }

    /// Total number of differences of any kind
    pub fn len(&self) -> usize {
        self.breaking_differences.len()
            + self.non_breaking_differences.len()
            + self.unclassified_differences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0 && !n.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn collection(outcome: &Value, key: &str) -> Vec<Value> {
    match outcome.get(key) {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            tracing::warn!(key, kind = json_kind(other), "Diff engine returned a non-array collection");
            Vec::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Pipeline step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStage {
    ResolveBase,
    ResolveCompare,
    Engine,
}

impl DiffStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffStage::ResolveBase => "resolve-base",
            DiffStage::ResolveCompare => "resolve-compare",
            DiffStage::Engine => "engine",
        }
    }
}

impl fmt::Display for DiffStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any failure while diffing two specs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to diff OpenAPI specs: {message}")]
pub struct DiffError {
    pub stage: DiffStage,
    pub message: String,
}

impl DiffError {
    fn new(stage: DiffStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Resolves and diffs pairs of specs
///
/// Stateless between calls; nothing is cached or retried.
pub struct SpecDiffer {
    resolver: RefResolver,
    engine: Box<dyn DiffEngine>,
}

impl Default for SpecDiffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecDiffer {
    /// Differ using the built-in engine and default resolver
    pub fn new() -> Self {
        Self::with_engine(Box::new(OpenApiDiffEngine::new()))
    }

    pub fn with_engine(engine: Box<dyn DiffEngine>) -> Self {
        Self {
            resolver: RefResolver::new(),
            engine,
        }
    }

    pub fn with_resolver(mut self, resolver: RefResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Diff `compare` against `base`
    ///
    /// Base is resolved first; a failure on either side aborts the diff.
    pub fn diff(&self, base: &Value, compare: &Value) -> Result<DiffResult, DiffError> {
        let base = self
            .resolver
            .resolve(base)
            .map_err(|e| DiffError::new(DiffStage::ResolveBase, e.to_string()))?;
        let compare = self
            .resolver
            .resolve(compare)
            .map_err(|e| DiffError::new(DiffStage::ResolveCompare, e.to_string()))?;

        let source = memory_input(&base, SOURCE_LOCATION)?;
        let destination = memory_input(&compare, DESTINATION_LOCATION)?;

        tracing::debug!(
            engine = self.engine.name(),
            source_format = %source.format,
            destination_format = %destination.format,
            "Diffing specs"
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.engine.diff_specs(&source, &destination)
        }))
        .map_err(|payload| DiffError::new(DiffStage::Engine, panic_message(payload.as_ref())))?
        .map_err(|e| DiffError::new(DiffStage::Engine, e.to_string()))?;

        Ok(DiffResult::from_outcome(&outcome))
    }
}

fn memory_input(spec: &Value, location: &str) -> Result<SpecInput, DiffError> {
    let content =
        serde_json::to_string(spec).map_err(|e| DiffError::new(DiffStage::Engine, e.to_string()))?;

    Ok(SpecInput {
        content,
        location: location.to_string(),
        format: SpecFormat::detect(spec),
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("diff engine panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("diff engine panicked: {message}")
    } else {
        "diff engine panicked".to_string()
    }
}
