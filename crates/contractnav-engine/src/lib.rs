//! Contract Navigator engine
//!
//! This crate implements the diff pipeline for OpenAPI contracts:
//! - In-memory `$ref` resolution
//! - Structural diff engine with breaking-change classification
//! - Diff orchestration with a stable result shape
//! - Provider/consumer compatibility check

pub mod resolver;
pub mod openapi_diff;
pub mod diff;
pub mod compatibility;

pub use resolver::{RefResolver, ResolverOptions, CircularRefs, ResolveError, DEFAULT_MAX_DEPTH};
pub use openapi_diff::{DiffEngine, OpenApiDiffEngine, SpecFormat, SpecInput, EngineError};
pub use diff::{SpecDiffer, DiffResult, DiffError, DiffStage, SOURCE_LOCATION, DESTINATION_LOCATION};
pub use compatibility::CompatibilityReport;
