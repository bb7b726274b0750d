//! Contract storage backends and the spec store
//!
//! This crate fetches OpenAPI contracts from a local directory or an S3 bucket,
//! normalizes them and caches the result per contract identity.
//!
//! ## Features
//!
//! Enable object-store support via Cargo features:
//! - `s3` - AWS S3 client for the `s3` source
//!
//! Without `s3`, the object-store backend still works against any
//! [`ObjectStoreClient`], including [`MemoryObjectStore`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use contractnav_store::SpecStore;
//! use contractnav_core::{ContractRole, ContractSource};
//!
//! let store = SpecStore::local("./contracts");
//! let names = store.list_contracts(ContractSource::Local, ContractRole::Provider).await?;
//! let spec = store.load_spec(ContractSource::Local, ContractRole::Provider, &names[0]).await?;
//! ```

pub mod backend;
pub mod local;
pub mod s3;
pub mod mock;
pub mod cache;
pub mod spec_store;

#[cfg(feature = "s3")]
pub mod aws;

pub use backend::ContractBackend;
pub use local::LocalBackend;
pub use s3::{S3Backend, ObjectStoreClient, ObjectPage};
pub use mock::MemoryObjectStore;
pub use cache::SpecCache;
pub use spec_store::SpecStore;

#[cfg(feature = "s3")]
pub use aws::AwsObjectStore;
