//! Contract Navigator Core
//!
//! Shared domain model for the contract navigator: contract roles and sources,
//! contract identities, the normalization pass applied to every loaded spec,
//! configuration, and the error taxonomy shared by the storage backends.

pub mod contract;
pub mod error;
pub mod normalize;
pub mod config;
pub mod info;

pub use contract::{ContractRole, ContractSource, ContractId, ContractRef, JSON_EXTENSION};
pub use error::StoreError;
pub use normalize::{normalize_spec, is_normalized};
pub use config::{Config, S3Config, ConfigError, is_truthy};
pub use info::{SafeInfo, S3Info};
