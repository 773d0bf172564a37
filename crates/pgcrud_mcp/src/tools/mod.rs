//! MCP tool implementations.
//!
//! Seven tools cover the whole CRUD surface:
//!
//! - **Discovery**: `list_tables`, `describe_table`
//! - **Read**: `list_records`, `get_record`
//! - **Write**: `create_record`, `update_record`, `delete_record`
//!
//! Every tool runs under the claims bound to the agent session and goes
//! through the same dispatch pipeline as the REST surface; a denied call
//! surfaces as a protocol error envelope, never as a silent success.

mod records;
mod registry;
mod tables;

pub use registry::ToolRegistry;

use async_trait::async_trait;
use serde_json::Value;

use pgcrud_auth::TokenClaims;
use pgcrud_core::{Gateway, GatewayError};

use crate::proto::ToolDefinition;

/// Trait every gateway tool implements.
#[async_trait]
pub trait GatewayTool: Send + Sync {
    /// Stable tool name, e.g. `list_records`.
    fn name(&self) -> &'static str;

    /// Human-readable description shown to the agent.
    fn description(&self) -> &'static str;

    /// JSON Schema for the argument record.
    fn input_schema(&self) -> Value;

    /// Execute under the session's claims.
    async fn execute(
        &self,
        args: Value,
        gateway: &Gateway,
        claims: &TokenClaims,
    ) -> Result<Value, GatewayError>;

    /// Definition for `tools/list`.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Pull a required string argument out of a tool call.
pub(crate) fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, GatewayError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::validation(format!("missing required '{name}' argument")))
}
