//! Contract roles, sources and identities

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// File extension every contract name must carry
pub const JSON_EXTENSION: &str = ".json";

/// Which side of an API relationship a contract describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractRole {
    /// Contract published by the API provider
    Provider,

    /// Contract expected by an API consumer
    Consumer,
}

impl ContractRole {
    /// Both roles, in listing order
    pub const ALL: [ContractRole; 2] = [ContractRole::Provider, ContractRole::Consumer];

    /// Storage partition name for this role
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Consumer => "consumer",
        }
    }
}

impl fmt::Display for ContractRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractRole {
    type Err = StoreError;

    /// Role tags are matched case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "provider" => Ok(Self::Provider),
            "consumer" => Ok(Self::Consumer),
            _ => Err(StoreError::InvalidRole(s.to_string())),
        }
    }
}

/// Where a contract is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractSource {
    /// Local contracts directory
    Local,

    /// Remote object store bucket
    S3,
}

impl ContractSource {
    pub const ALL: [ContractSource; 2] = [ContractSource::Local, ContractSource::S3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::S3 => "s3",
        }
    }
}

impl fmt::Display for ContractSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractSource {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "s3" => Ok(Self::S3),
            other => Err(StoreError::UnknownSource(other.to_string())),
        }
    }
}

/// Identity of a retrievable contract document
///
/// The identity doubles as the spec cache key. Source and role are closed
/// enumerations and the name must end in `.json`, so the joined key cannot
/// collide between different documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractId {
    pub source: ContractSource,
    pub role: ContractRole,
    pub name: String,
}

impl ContractId {
    pub fn new(source: ContractSource, role: ContractRole, name: impl Into<String>) -> Self {
        Self {
            source,
            role,
            name: name.into(),
        }
    }

    /// Composite cache key: `source:role:name`
    pub fn cache_key(&self) -> String {
        format!("{}:{}:{}", self.source, self.role, self.name)
    }

    /// Fail with [`StoreError::InvalidName`] unless the name ends in `.json`
    pub fn ensure_json(name: &str) -> Result<&str, StoreError> {
        if name.ends_with(JSON_EXTENSION) {
            Ok(name)
        } else {
            Err(StoreError::InvalidName(format!("Contract must be .json: {}", name)))
        }
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cache_key())
    }
}

/// Contract reference as typed by a user or protocol client
///
/// Parsed from `source:kind:name`, e.g. `local:provider:orders-v1.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRef {
    pub source: String,
    pub kind: String,
    pub name: String,
}

impl ContractRef {
    pub fn new(source: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Resolve the free-form tags into a typed identity
    pub fn to_id(&self) -> Result<ContractId, StoreError> {
        Ok(ContractId::new(
            self.source.parse()?,
            self.kind.parse()?,
            self.name.clone(),
        ))
    }
}

impl FromStr for ContractRef {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(source), Some(kind), Some(name)) if !name.is_empty() => {
                Ok(Self::new(source, kind, name))
            }
            _ => Err(StoreError::InvalidName(format!(
                "Expected source:kind:name, got '{}'",
                s
            ))),
        }
    }
}
