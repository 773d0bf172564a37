//! Surface resources: the accessible model dump and per-table views.
//!
//! `schema://tables` carries the whole accessible model plus the API
//! capabilities envelope; `schema://tables/{segment}` carries one table.
//! Access control mirrors the tool path: a table in a namespace the
//! session cannot touch is a permission error, not a silent absence.

use serde_json::{json, Value};

use pgcrud_auth::TokenClaims;
use pgcrud_core::{Gateway, GatewayError};

use crate::proto::{ResourceContents, ResourceDefinition};

/// URI of the whole-model resource.
pub const TABLES_URI: &str = "schema://tables";

const MIME_JSON: &str = "application/json";

/// Resources visible to the session: the model dump plus one entry per
/// accessible table.
pub fn list_resources(gateway: &Gateway, claims: &TokenClaims) -> Vec<ResourceDefinition> {
    let mut resources = vec![ResourceDefinition {
        uri: TABLES_URI.to_string(),
        name: "All tables".to_string(),
        description: "Every accessible table with columns, keys and API capabilities".to_string(),
        mime_type: MIME_JSON.to_string(),
    }];

    for descriptor in gateway.list_tables(claims) {
        let segment = descriptor.path.trim_start_matches("/api/").to_string();
        resources.push(ResourceDefinition {
            uri: format!("{TABLES_URI}/{segment}"),
            name: format!("{}.{}", descriptor.namespace, descriptor.name),
            description: format!("Structure of table {}.{}", descriptor.namespace, descriptor.name),
            mime_type: MIME_JSON.to_string(),
        });
    }

    resources
}

/// Read one resource by URI.
pub fn read_resource(
    gateway: &Gateway,
    claims: &TokenClaims,
    uri: &str,
) -> Result<ResourceContents, GatewayError> {
    let body = if uri == TABLES_URI {
        json!({
            "tables": gateway.list_tables(claims),
            "capabilities": gateway.capabilities(),
        })
    } else if let Some(segment) = uri.strip_prefix(&format!("{TABLES_URI}/")) {
        let descriptor = gateway.describe_table(claims, segment)?;
        serde_json::to_value(descriptor)
            .map_err(|err| GatewayError::Internal(format!("descriptor serialization: {err}")))?
    } else {
        return Err(GatewayError::not_found(format!("Unknown resource '{uri}'")));
    };

    Ok(ResourceContents {
        uri: uri.to_string(),
        mime_type: MIME_JSON.to_string(),
        text: serialize(&body)?,
    })
}

fn serialize(value: &Value) -> Result<String, GatewayError> {
    serde_json::to_string_pretty(value)
        .map_err(|err| GatewayError::Internal(format!("resource serialization: {err}")))
}
