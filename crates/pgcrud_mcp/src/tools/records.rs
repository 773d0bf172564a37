//! Record tools: list, get, create, update, delete.
//!
//! Arguments are marshalled into the same shapes the REST surface produces
//! (query pairs, key segments, JSON bodies) and handed to the dispatch
//! core unchanged.

use async_trait::async_trait;
use serde_json::{json, Value};

use pgcrud_auth::TokenClaims;
use pgcrud_core::{Gateway, GatewayError};

use super::{required_str, GatewayTool};

/// Shared description of the filter argument.
const FILTERS_SCHEMA: &str = "Column filters as an object mapping column name to \
'operator:value' (operators: eq, neq, gt, gte, lt, lte, like, ilike, is, in). A value \
without a known operator prefix is matched for equality.";

/// Turn typed list arguments into the query pairs the validator expects.
fn list_args_to_pairs(args: &Value) -> Result<Vec<(String, String)>, GatewayError> {
    let mut pairs = Vec::new();

    for (name, key) in [
        ("page", "page"),
        ("pageSize", "pageSize"),
        ("sortBy", "sortBy"),
        ("sortOrder", "sortOrder"),
        ("select", "select"),
        ("search", "search"),
        ("searchColumns", "searchColumns"),
    ] {
        if let Some(value) = args.get(name) {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
                Value::Null => continue,
                other => {
                    return Err(GatewayError::validation(format!(
                        "argument '{name}' has unsupported value {other}"
                    )))
                }
            };
            pairs.push((key.to_string(), text));
        }
    }

    if let Some(filters) = args.get("filters") {
        let Some(filters) = filters.as_object() else {
            return Err(GatewayError::validation(
                "argument 'filters' must be an object of column: 'operator:value'",
            ));
        };
        for (column, raw) in filters {
            let text = match raw {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(GatewayError::validation(format!(
                        "filter on '{column}' has unsupported value {other}"
                    )))
                }
            };
            pairs.push((format!("filter.{column}"), text));
        }
    }

    Ok(pairs)
}

/// List records with filters, search, sorting and pagination.
pub struct ListRecordsTool;

#[async_trait]
impl GatewayTool for ListRecordsTool {
    fn name(&self) -> &'static str {
        "list_records"
    }

    fn description(&self) -> &'static str {
        "List records from a table with optional filters, full-text search, sorting, column \
         selection and pagination. Returns rows plus a pagination envelope."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "table": { "type": "string", "description": "Route segment of the table" },
                "page": { "type": "integer", "minimum": 1, "default": 1 },
                "pageSize": { "type": "integer", "minimum": 1 },
                "sortBy": { "type": "string", "description": "Column to sort by" },
                "sortOrder": { "type": "string", "enum": ["asc", "desc"], "default": "asc" },
                "select": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Columns to project; omit for all"
                },
                "search": { "type": "string", "description": "Case-insensitive search term" },
                "searchColumns": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Restrict search to these columns"
                },
                "filters": { "type": "object", "description": FILTERS_SCHEMA }
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
        let pairs = list_args_to_pairs(&args)?;
        let response = gateway.list(claims, segment, &pairs).await?;
        serde_json::to_value(response)
            .map_err(|err| GatewayError::Internal(format!("response serialization: {err}")))
    }
}

/// Fetch one record by primary key.
pub struct GetRecordTool;

#[async_trait]
impl GatewayTool for GetRecordTool {
    fn name(&self) -> &'static str {
        "get_record"
    }

    fn description(&self) -> &'static str {
        "Fetch one record by primary key. For composite keys pass the values comma-joined in \
         primary-key order."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "table": { "type": "string", "description": "Route segment of the table" },
                "id": { "type": "string", "description": "Primary key value(s), comma-joined for composite keys" }
            },
            "required": ["table", "id"]
        })
    }

    async fn execute(
        &self,
        args: Value,
        gateway: &Gateway,
        claims: &TokenClaims,
    ) -> Result<Value, GatewayError> {
        let segment = required_str(&args, "table")?;
        let id = required_str(&args, "id")?;
        gateway.read(claims, segment, id).await
    }
}

/// Insert one record or a batch.
pub struct CreateRecordTool;

#[async_trait]
impl GatewayTool for CreateRecordTool {
    fn name(&self) -> &'static str {
        "create_record"
    }

    fn description(&self) -> &'static str {
        "Insert into a table. 'data' is a single object or an array of objects for bulk insert; \
         unknown keys are dropped, and the created row(s) are returned."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "table": { "type": "string", "description": "Route segment of the table" },
                "data": {
                    "description": "Row object, or array of row objects for bulk insert",
                    "oneOf": [
                        { "type": "object" },
                        { "type": "array", "items": { "type": "object" } }
                    ]
                }
            },
            "required": ["table", "data"]
        })
    }

    async fn execute(
        &self,
        args: Value,
        gateway: &Gateway,
        claims: &TokenClaims,
    ) -> Result<Value, GatewayError> {
        let segment = required_str(&args, "table")?;
        let data = args
            .get("data")
            .cloned()
            .ok_or_else(|| GatewayError::validation("missing required 'data' argument"))?;
        let response = gateway.create(claims, segment, data).await?;
        serde_json::to_value(response)
            .map_err(|err| GatewayError::Internal(format!("response serialization: {err}")))
    }
}

/// Partially update one record by primary key.
pub struct UpdateRecordTool;

#[async_trait]
impl GatewayTool for UpdateRecordTool {
    fn name(&self) -> &'static str {
        "update_record"
    }

    fn description(&self) -> &'static str {
        "Partially update one record by primary key. Only the columns present in 'data' change; \
         primary key columns cannot be modified."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "table": { "type": "string", "description": "Route segment of the table" },
                "id": { "type": "string", "description": "Primary key value(s), comma-joined for composite keys" },
                "data": { "type": "object", "description": "Columns to update" }
            },
            "required": ["table", "id", "data"]
        })
    }

    async fn execute(
        &self,
        args: Value,
        gateway: &Gateway,
        claims: &TokenClaims,
    ) -> Result<Value, GatewayError> {
        let segment = required_str(&args, "table")?;
        let id = required_str(&args, "id")?;
        let data = args
            .get("data")
            .cloned()
            .ok_or_else(|| GatewayError::validation("missing required 'data' argument"))?;
        gateway.update(claims, segment, id, data).await
    }
}

/// Delete one record by primary key.
pub struct DeleteRecordTool;

#[async_trait]
impl GatewayTool for DeleteRecordTool {
    fn name(&self) -> &'static str {
        "delete_record"
    }

    fn description(&self) -> &'static str {
        "Delete one record by primary key. Tables with a 'deleted_at' column are soft-deleted \
         (the row is kept and timestamped); the response says which path was taken."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "table": { "type": "string", "description": "Route segment of the table" },
                "id": { "type": "string", "description": "Primary key value(s), comma-joined for composite keys" }
            },
            "required": ["table", "id"]
        })
    }

    async fn execute(
        &self,
        args: Value,
        gateway: &Gateway,
        claims: &TokenClaims,
    ) -> Result<Value, GatewayError> {
        let segment = required_str(&args, "table")?;
        let id = required_str(&args, "id")?;
        let response = gateway.delete(claims, segment, id).await?;
        serde_json::to_value(response)
            .map_err(|err| GatewayError::Internal(format!("response serialization: {err}")))
    }
}
