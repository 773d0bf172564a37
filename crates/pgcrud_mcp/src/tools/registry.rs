//! Tool registry: discovery and dispatch by name.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use pgcrud_auth::TokenClaims;
use pgcrud_core::{Gateway, GatewayError};

use super::records::{
    CreateRecordTool, DeleteRecordTool, GetRecordTool, ListRecordsTool, UpdateRecordTool,
};
use super::tables::{DescribeTableTool, ListTablesTool};
use super::GatewayTool;
use crate::proto::ToolDefinition;

/// Registry of the gateway's MCP tools.
pub struct ToolRegistry {
    tools: HashMap<&'static str, Box<dyn GatewayTool>>,
}

impl ToolRegistry {
    /// Create a registry with every tool registered.
    pub fn new() -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        registry.register(Box::new(ListTablesTool));
        registry.register(Box::new(DescribeTableTool));
        registry.register(Box::new(ListRecordsTool));
        registry.register(Box::new(GetRecordTool));
        registry.register(Box::new(CreateRecordTool));
        registry.register(Box::new(UpdateRecordTool));
        registry.register(Box::new(DeleteRecordTool));

        debug!("registered {} tools", registry.tools.len());
        registry
    }

    fn register(&mut self, tool: Box<dyn GatewayTool>) {
        self.tools.insert(tool.name(), tool);
    }

    /// Definitions for `tools/list`, sorted by name for stable output.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.values().map(|tool| tool.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Call a tool by name under the session's claims.
    pub async fn call_tool(
        &self,
        name: &str,
        args: Value,
        gateway: &Gateway,
        claims: &TokenClaims,
    ) -> Result<Value, GatewayError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| GatewayError::not_found(format!("Unknown tool '{name}'")))?;
        tool.execute(args, gateway, claims).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
