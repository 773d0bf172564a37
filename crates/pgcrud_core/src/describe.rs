//! Surface schema emitter.
//!
//! Produces the machine-readable self-description served on the meta
//! routes and embedded in the agent resources: per-table descriptors and
//! the API capabilities envelope.

use serde::Serialize;

use pgcrud_schema::{route_segment, Entity, StringFormat};

use crate::config::GatewayConfig;
use crate::validate::params;

/// Operations an entity supports. `list` and `create` are unconditional;
/// by-key operations require a primary key.
pub const OPS_ALWAYS: &[&str] = &["list", "create"];
pub const OPS_BY_KEY: &[&str] = &["read", "update", "replace", "delete"];

#[derive(Debug, Clone, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<StringFormat>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    pub has_default: bool,
    pub primary_key: bool,
    /// Not nullable and no default: a create must supply this column.
    pub insert_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForeignKeyDescriptor {
    pub constraint: String,
    pub column: String,
    pub references_namespace: String,
    pub references_table: String,
    pub references_column: String,
    /// Route segment of the referenced table, derived by the same rule as
    /// the owning table's segment.
    pub ref_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableDescriptor {
    pub name: String,
    pub namespace: String,
    /// Canonical REST path.
    pub path: String,
    pub operations: Vec<&'static str>,
    pub primary_key: Vec<String>,
    pub columns: Vec<ColumnDescriptor>,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    pub searchable_columns: Vec<String>,
}

/// Describe one entity for the meta and agent surfaces.
pub fn describe_entity(entity: &Entity) -> TableDescriptor {
    let mut operations: Vec<&'static str> = OPS_ALWAYS.to_vec();
    if entity.has_primary_key() {
        operations.extend_from_slice(OPS_BY_KEY);
    }

    let columns = entity
        .columns
        .iter()
        .map(|column| {
            let portable = column.portable_type();
            // Opaque JSON columns stay unconstrained: no nullability marker.
            let nullable = column.nullable && portable.wants_nullability_marker();
            ColumnDescriptor {
                name: column.name.clone(),
                type_name: portable.type_name(),
                format: portable.format(),
                nullable,
                has_default: column.has_default,
                primary_key: entity.primary_key.contains(&column.name),
                insert_required: column.insert_required(),
                max_length: column.max_text_length,
            }
        })
        .collect();

    let foreign_keys = entity
        .foreign_keys
        .iter()
        .map(|fk| ForeignKeyDescriptor {
            constraint: fk.constraint_name.clone(),
            column: fk.column.clone(),
            references_namespace: fk.referenced_namespace.clone(),
            references_table: fk.referenced_table.clone(),
            references_column: fk.referenced_column.clone(),
            ref_path: format!(
                "/api/{}",
                route_segment(&fk.referenced_namespace, &fk.referenced_table)
            ),
        })
        .collect();

    TableDescriptor {
        name: entity.name.clone(),
        namespace: entity.namespace.clone(),
        path: format!("/api/{}", entity.route_segment()),
        operations,
        primary_key: entity.primary_key.clone(),
        columns,
        foreign_keys,
        searchable_columns: entity.searchable_columns(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthCapabilities {
    pub enabled: bool,
    pub header: &'static str,
    pub alternate_header: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationCapabilities {
    pub page_param: &'static str,
    pub page_size_param: &'static str,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterCapabilities {
    pub param_prefix: &'static str,
    pub operators: Vec<&'static str>,
    pub max_in_values: usize,
}

/// The capabilities envelope: everything a client needs to drive the API
/// without prior knowledge.
#[derive(Debug, Clone, Serialize)]
pub struct ApiCapabilities {
    pub base_path: &'static str,
    pub auth: AuthCapabilities,
    pub pagination: PaginationCapabilities,
    pub filtering: FilterCapabilities,
    pub sort_param: &'static str,
    pub sort_order_param: &'static str,
    pub search_param: &'static str,
    pub search_columns_param: &'static str,
    pub select_param: &'static str,
    pub max_bulk_rows: usize,
}

pub fn capabilities(config: &GatewayConfig) -> ApiCapabilities {
    ApiCapabilities {
        base_path: "/api",
        auth: AuthCapabilities {
            enabled: config.auth_enabled,
            header: "Authorization",
            alternate_header: "X-API-Key",
        },
        pagination: PaginationCapabilities {
            page_param: params::PAGE,
            page_size_param: params::PAGE_SIZE,
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        },
        filtering: FilterCapabilities {
            param_prefix: params::FILTER_PREFIX,
            operators: vec![
                "eq", "neq", "gt", "gte", "lt", "lte", "like", "ilike", "is", "in",
            ],
            max_in_values: pgcrud_query::MAX_IN_VALUES,
        },
        sort_param: params::SORT_BY,
        sort_order_param: params::SORT_ORDER,
        search_param: params::SEARCH,
        search_columns_param: params::SEARCH_COLUMNS,
        select_param: params::SELECT,
        max_bulk_rows: config.max_bulk_rows,
    }
}
