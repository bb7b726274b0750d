//! Contract Navigator MCP server
//!
//! Exposes the contract store and diff pipeline to MCP clients over
//! newline-delimited JSON-RPC 2.0 on stdin/stdout.
//!
//! ## Resources
//!
//! - `openapi://index` - contract names per source and role
//! - `openapi://server/info` - configuration summary (safe fields only)
//! - `openapi://contracts/{source}/{kind}` - contract listing
//! - `openapi://spec/{source}/{kind}/{name}` - normalized spec
//!
//! S3 resources are only offered when the object store is configured.
//!
//! ## Tools
//!
//! - `diff_contracts` - breaking/non-breaking diff of two contracts
//! - `validate_compatibility` - consumer vs provider verdict
//!
//! ## Usage
//!
//! ```bash
//! OPENAPI_CONTRACT_DIR=./contracts contractnav-mcp
//! ```

pub mod protocol;
pub mod resources;
pub mod tools;
mod server;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, CallToolResult};
pub use server::McpServer;
