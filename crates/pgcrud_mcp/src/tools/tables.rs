//! Discovery tools: `list_tables` and `describe_table`.

use async_trait::async_trait;
use serde_json::{json, Value};

use pgcrud_auth::TokenClaims;
use pgcrud_core::{Gateway, GatewayError};

use super::{required_str, GatewayTool};

/// Enumerate the tables the session can access.
pub struct ListTablesTool;

#[async_trait]
impl GatewayTool for ListTablesTool {
    fn name(&self) -> &'static str {
        "list_tables"
    }

    fn description(&self) -> &'static str {
        "List every accessible table with its namespace, REST path, primary key and allowed operations."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(
        &self,
        _args: Value,
        gateway: &Gateway,
        claims: &TokenClaims,
    ) -> Result<Value, GatewayError> {
        let tables: Vec<Value> = gateway
            .list_tables(claims)
            .into_iter()
            .map(|descriptor| {
                json!({
                    "table": descriptor.name,
                    "namespace": descriptor.namespace,
                    "path": descriptor.path,
                    "primary_key": descriptor.primary_key,
                    "operations": descriptor.operations,
                })
            })
            .collect();
        Ok(json!({ "tables": tables, "count": tables.len() }))
    }
}

/// Emit the full agent-facing view of one table.
pub struct DescribeTableTool;

#[async_trait]
impl GatewayTool for DescribeTableTool {
    fn name(&self) -> &'static str {
        "describe_table"
    }

    fn description(&self) -> &'static str {
        "Describe one table: columns with portable types, nullability and defaults, primary key, \
         foreign keys, searchable columns and allowed operations. Address the table by its route \
         segment (e.g. 'users' or 'reporting__metrics')."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "table": {
                    "type": "string",
                    "description": "Route segment of the table to describe"
                }
            },
            "required": ["table"]
        })
    }

    async fn execute(
        &self,
        args: Value,
        gateway: &Gateway,
        claims: &TokenClaims,
    ) -> Result<Value, GatewayError> {
        let segment = required_str(&args, "table")?;
        let descriptor = gateway.describe_table(claims, segment)?;
        serde_json::to_value(descriptor)
            .map_err(|err| GatewayError::Internal(format!("descriptor serialization: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas_declare_required_arguments() {
        let list = ListTablesTool;
        assert_eq!(list.input_schema()["required"], json!([]));

        let describe = DescribeTableTool;
        assert_eq!(describe.input_schema()["required"], json!(["table"]));
    }
}
