//! The per-operation dispatch pipeline.
//!
//! Every operation follows the same shape: resolve the entity, check the
//! credential against the entity's namespace, validate the request, build
//! SQL, pick a pool, execute, then shape the response or classify the
//! error. Reads go to the replica pool when one is configured; writes
//! always hit the primary. The only shared state is the immutable model,
//! the pools and the configuration.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::{info, warn};
use uuid::Uuid;

use pgcrud_auth::{AccessMode, TokenClaims};
use pgcrud_query::{
    build_count, build_delete, build_insert, build_insert_bulk, build_list, build_read,
    build_update, BuilderLimits, SqlStatement, WritePayload,
};
use pgcrud_schema::{introspect, Entity, IntrospectOptions, SchemaModel};

use crate::classify::classify;
use crate::config::GatewayConfig;
use crate::describe::{capabilities, describe_entity, ApiCapabilities, TableDescriptor};
use crate::error::GatewayError;
use crate::row::row_to_json;
use crate::validate::{
    extract_list_params, parse_key_segment, resolve_entity, validate_create_body,
    validate_update_body,
};
use crate::{bind, pool, Result};

/// Pagination envelope on list responses.
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// List response: rows plus pagination.
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub data: Vec<Value>,
    pub pagination: Pagination,
}

/// Create response: the row verbatim, or the bulk envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CreateResponse {
    Single(Value),
    Bulk { data: Vec<Value>, count: usize },
}

/// Delete response; `soft_delete` reports which path the builder took.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub soft_delete: bool,
    pub record: Value,
}

/// Check a credential against an entity's namespace and access mode.
pub fn check_permission(
    claims: &TokenClaims,
    entity: &Entity,
    mode: AccessMode,
) -> Result<()> {
    if claims.permits(&entity.namespace, mode) {
        return Ok(());
    }
    let mode = match mode {
        AccessMode::Read => "read",
        AccessMode::Write => "write",
    };
    Err(GatewayError::PermissionDenied(format!(
        "No {mode} access to namespace '{}'",
        entity.namespace
    )))
}

/// Entities the credential can see at all (read or write on the
/// namespace). Drives table listings on both surfaces.
pub fn accessible_entities<'a>(
    model: &'a SchemaModel,
    claims: &'a TokenClaims,
) -> impl Iterator<Item = &'a Entity> {
    model
        .entities()
        .filter(|entity| claims.permits_any(&entity.namespace))
}

/// The dispatch core shared by the REST and agent surfaces.
#[derive(Clone)]
pub struct Gateway {
    model: Arc<SchemaModel>,
    config: Arc<GatewayConfig>,
    primary: PgPool,
    read: Option<PgPool>,
}

impl Gateway {
    /// Connect the pools, introspect the catalog and assemble the gateway.
    pub async fn connect(config: GatewayConfig) -> Result<Self> {
        let primary = pool::connect(&config.database_url, config.pool_size).await?;
        let read = match &config.read_url {
            Some(url) => Some(pool::connect(url, config.read_pool_size).await?),
            None => None,
        };

        let options = IntrospectOptions {
            include_namespaces: config.include_namespaces.clone(),
            exclude_namespaces: config.exclude_namespaces.clone(),
            exclude_tables: config.exclude_tables.clone(),
        };
        // Introspection always uses the primary pool.
        let model = introspect(&primary, &options).await.map_err(|err| match err {
            pgcrud_schema::SchemaError::ConfigurationInvalid(message) => {
                GatewayError::ConfigurationInvalid(message)
            }
            other => GatewayError::Internal(other.to_string()),
        })?;

        Ok(Self {
            model: Arc::new(model),
            config: Arc::new(config),
            primary,
            read,
        })
    }

    /// Assemble a gateway from parts; used by tests that bring their own
    /// pool and model.
    pub fn from_parts(
        model: Arc<SchemaModel>,
        config: Arc<GatewayConfig>,
        primary: PgPool,
        read: Option<PgPool>,
    ) -> Self {
        Self {
            model,
            config,
            primary,
            read,
        }
    }

    pub fn model(&self) -> &SchemaModel {
        &self.model
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn primary_pool(&self) -> &PgPool {
        &self.primary
    }

    /// Pool used for list/read operations.
    fn read_pool(&self) -> &PgPool {
        self.read.as_ref().unwrap_or(&self.primary)
    }

    /// Close both pools; the last step of shutdown.
    pub async fn close(&self) {
        self.primary.close().await;
        if let Some(read) = &self.read {
            read.close().await;
        }
    }

    fn limits(&self) -> BuilderLimits {
        BuilderLimits {
            max_page_size: self.config.max_page_size,
            max_bulk_rows: self.config.max_bulk_rows,
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// List rows with filters, search, sorting and pagination.
    pub async fn list(
        &self,
        claims: &TokenClaims,
        segment: &str,
        query_pairs: &[(String, String)],
    ) -> Result<ListResponse> {
        self.traced(segment, "list", async {
            let entity = resolve_entity(&self.model, segment)?;
            check_permission(claims, entity, AccessMode::Read)?;

            let params = extract_list_params(query_pairs, self.config.default_page_size)?;
            let page_stmt = build_list(entity, &params, self.limits())?;
            let count_stmt = build_count(entity, &params)?;

            let pool = self.read_pool();
            let data = self.fetch_rows(pool, &page_stmt).await?;
            let total = self.fetch_total(pool, &count_stmt).await?;

            let page = params.page.max(1);
            let page_size = params.page_size.clamp(1, self.config.max_page_size);
            let total_pages = if total == 0 {
                0
            } else {
                (total + page_size - 1) / page_size
            };

            Ok(ListResponse {
                data,
                pagination: Pagination {
                    page,
                    page_size,
                    total,
                    total_pages,
                },
            })
        })
        .await
    }

    /// Read one row by primary key.
    pub async fn read(
        &self,
        claims: &TokenClaims,
        segment: &str,
        key: &str,
    ) -> Result<Value> {
        self.traced(segment, "read", async {
            let entity = resolve_entity(&self.model, segment)?;
            check_permission(claims, entity, AccessMode::Read)?;

            let key_values = parse_key_segment(entity, key)?;
            let statement = build_read(entity, &key_values)?;
            self.fetch_row(self.read_pool(), &statement)
                .await?
                .ok_or_else(|| no_row(segment, key))
        })
        .await
    }

    /// Create one row or a batch.
    pub async fn create(
        &self,
        claims: &TokenClaims,
        segment: &str,
        body: Value,
    ) -> Result<CreateResponse> {
        self.traced(segment, "create", async {
            let entity = resolve_entity(&self.model, segment)?;
            check_permission(claims, entity, AccessMode::Write)?;

            match validate_create_body(body, self.config.max_bulk_rows)? {
                WritePayload::Single(payload) => {
                    let statement = build_insert(entity, &payload)?;
                    let row = self
                        .fetch_row(&self.primary, &statement)
                        .await?
                        .ok_or_else(|| {
                            GatewayError::Internal("insert returned no row".into())
                        })?;
                    Ok(CreateResponse::Single(row))
                }
                WritePayload::Bulk(rows) => {
                    let statement = build_insert_bulk(entity, &rows, self.limits())?;
                    let data = self.fetch_rows(&self.primary, &statement).await?;
                    let count = data.len();
                    Ok(CreateResponse::Bulk { data, count })
                }
            }
        })
        .await
    }

    /// Update a row by primary key; `PUT` and `PATCH` share these
    /// semantics, with key columns never modifiable.
    pub async fn update(
        &self,
        claims: &TokenClaims,
        segment: &str,
        key: &str,
        body: Value,
    ) -> Result<Value> {
        self.traced(segment, "update", async {
            let entity = resolve_entity(&self.model, segment)?;
            check_permission(claims, entity, AccessMode::Write)?;

            let key_values = parse_key_segment(entity, key)?;
            let payload = validate_update_body(body)?;
            let statement = build_update(entity, &payload, &key_values)?;
            self.fetch_row(&self.primary, &statement)
                .await?
                .ok_or_else(|| no_row(segment, key))
        })
        .await
    }

    /// Delete a row by primary key; soft when the table carries
    /// `deleted_at`.
    pub async fn delete(
        &self,
        claims: &TokenClaims,
        segment: &str,
        key: &str,
    ) -> Result<DeleteResponse> {
        self.traced(segment, "delete", async {
            let entity = resolve_entity(&self.model, segment)?;
            check_permission(claims, entity, AccessMode::Write)?;

            let key_values = parse_key_segment(entity, key)?;
            let delete = build_delete(entity, &key_values)?;
            let record = self
                .fetch_row(&self.primary, &delete.statement)
                .await?
                .ok_or_else(|| no_row(segment, key))?;

            Ok(DeleteResponse {
                deleted: true,
                soft_delete: delete.soft,
                record,
            })
        })
        .await
    }

    // =========================================================================
    // Meta surface
    // =========================================================================

    /// Descriptors for every entity the credential can see.
    pub fn list_tables(&self, claims: &TokenClaims) -> Vec<TableDescriptor> {
        accessible_entities(&self.model, claims)
            .map(describe_entity)
            .collect()
    }

    /// Descriptor for one entity; denied without any access to its
    /// namespace.
    pub fn describe_table(
        &self,
        claims: &TokenClaims,
        segment: &str,
    ) -> Result<TableDescriptor> {
        let entity = resolve_entity(&self.model, segment)?;
        if !claims.permits_any(&entity.namespace) {
            return Err(GatewayError::PermissionDenied(format!(
                "No access to namespace '{}'",
                entity.namespace
            )));
        }
        Ok(describe_entity(entity))
    }

    pub fn capabilities(&self) -> ApiCapabilities {
        capabilities(&self.config)
    }

    // =========================================================================
    // Execution
    // =========================================================================

    async fn fetch_rows(&self, pool: &PgPool, statement: &SqlStatement) -> Result<Vec<Value>> {
        let query = bind::prepare(statement)?;
        let rows = query.fetch_all(pool).await.map_err(classify)?;
        Ok(rows
            .iter()
            .map(|row| Value::Object(row_to_json(row)))
            .collect())
    }

    async fn fetch_row(
        &self,
        pool: &PgPool,
        statement: &SqlStatement,
    ) -> Result<Option<Value>> {
        let query = bind::prepare(statement)?;
        let row = query.fetch_optional(pool).await.map_err(classify)?;
        Ok(row.map(|row| Value::Object(row_to_json(&row))))
    }

    async fn fetch_total(&self, pool: &PgPool, statement: &SqlStatement) -> Result<i64> {
        let query = bind::prepare(statement)?;
        let row = query.fetch_one(pool).await.map_err(classify)?;
        row.try_get::<i64, _>("total")
            .map_err(|err| GatewayError::Internal(format!("count query returned no total: {err}")))
    }

    /// Run an operation under a request id, logging the outcome at the
    /// dispatch boundary.
    async fn traced<T>(
        &self,
        segment: &str,
        operation: &'static str,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        let request_id = Uuid::new_v4();
        match fut.await {
            Ok(value) => {
                info!(%request_id, %segment, operation, "request ok");
                Ok(value)
            }
            Err(err) => {
                warn!(
                    %request_id,
                    %segment,
                    operation,
                    kind = err.kind(),
                    status = err.status(),
                    error = %err,
                    "request failed"
                );
                Err(err)
            }
        }
    }
}

fn no_row(segment: &str, key: &str) -> GatewayError {
    GatewayError::not_found(format!("No row in '{segment}' with key '{key}'"))
}
