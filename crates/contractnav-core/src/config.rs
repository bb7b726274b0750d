//! Configuration schema (contractnav.toml + environment)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default local contracts directory
pub const DEFAULT_CONTRACTS_DIR: &str = "./contracts";

/// Default AWS region for the object-store backend
pub const DEFAULT_REGION: &str = "eu-west-2";

/// Default key prefix for contracts in the bucket
pub const DEFAULT_PREFIX: &str = "openapi-contracts";

/// Object-store backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Config {
    #[serde(default = "default_region")]
    pub region: String,

    /// Bucket name (required once S3 is enabled)
    #[serde(default)]
    pub bucket: String,

    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: default_region(),
            bucket: String::new(),
            prefix: default_prefix(),
        }
    }
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_contracts_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CONTRACTS_DIR)
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Local contracts directory (absolute recommended for protocol clients)
    #[serde(default = "default_contracts_dir")]
    pub contracts_dir: PathBuf,

    /// Object-store backend; `None` disables the `s3` source
    #[serde(default)]
    pub s3: Option<S3Config>,

    /// Verbose logging
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            contracts_dir: default_contracts_dir(),
            s3: None,
            debug: false,
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Build config from the process environment alone
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Load an optional TOML file, then overlay the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        Ok(base.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Overlay environment variables read through `lookup`
    ///
    /// Recognised keys: `OPENAPI_CONTRACT_DIR`, `S3_ENABLED`, `AWS_REGION`,
    /// `S3_BUCKET`, `S3_PREFIX`, `DEBUG_MCP`. An explicit falsy `S3_ENABLED`
    /// disables a file-configured bucket.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("OPENAPI_CONTRACT_DIR") {
            self.contracts_dir = PathBuf::from(dir);
        }

        match lookup("S3_ENABLED") {
            Some(flag) if is_truthy(Some(flag.as_str())) => {
                let mut s3 = self.s3.take().unwrap_or_default();
                if let Some(region) = lookup("AWS_REGION") {
                    s3.region = region;
                }
                if let Some(bucket) = lookup("S3_BUCKET") {
                    s3.bucket = bucket;
                }
                if let Some(prefix) = lookup("S3_PREFIX") {
                    s3.prefix = prefix;
                }
                self.s3 = Some(s3);
            }
            Some(_) => self.s3 = None,
            None => {}
        }

        if let Some(flag) = lookup("DEBUG_MCP") {
            self.debug = is_truthy(Some(flag.as_str()));
        }

        self
    }

    /// Default tracing directive for this config
    pub fn log_directive(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

/// Boolean environment flag parsing: only `1`, `true`, `TRUE` and `yes` are true
pub fn is_truthy(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "TRUE" | "yes"))
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}
