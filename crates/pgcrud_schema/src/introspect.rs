//! Catalog introspection.
//!
//! Four read-only queries against `information_schema` build the model:
//! namespaces first, then columns, primary keys and foreign keys for the
//! retained namespaces concurrently. Any query failure is fatal; model
//! oddities (missing PK, dangling FK) only warn.

use std::collections::BTreeMap;

use sqlx::{FromRow, PgPool};
use tracing::{info, warn};

use crate::error::SchemaError;
use crate::ident::name_breaks_routing;
use crate::model::{Column, Entity, ForeignKey, SchemaModel};

/// Namespaces that are never served, independent of configuration.
const SYSTEM_NAMESPACES: &[&str] = &["pg_catalog", "information_schema", "pg_toast"];

/// Namespace prefixes belonging to temporary objects.
const TEMP_PREFIXES: &[&str] = &["pg_temp", "pg_toast_temp"];

/// Namespace and table filters applied to the catalog output.
#[derive(Debug, Clone, Default)]
pub struct IntrospectOptions {
    /// Serve only these namespaces when non-empty.
    pub include_namespaces: Vec<String>,
    /// Never serve these namespaces.
    pub exclude_namespaces: Vec<String>,
    /// Never serve these tables, named `namespace.table`.
    pub exclude_tables: Vec<String>,
}

#[derive(Debug, FromRow)]
struct NamespaceRow {
    schema_name: String,
}

#[derive(Debug, FromRow)]
struct ColumnRow {
    table_schema: String,
    table_name: String,
    column_name: String,
    udt_name: String,
    data_type: String,
    is_nullable: bool,
    has_default: bool,
    column_default: Option<String>,
    character_maximum_length: Option<i32>,
    ordinal_position: i32,
}

#[derive(Debug, FromRow)]
struct PrimaryKeyRow {
    table_schema: String,
    table_name: String,
    column_name: String,
}

#[derive(Debug, FromRow)]
struct ForeignKeyRow {
    constraint_name: String,
    table_schema: String,
    table_name: String,
    column_name: String,
    foreign_table_schema: String,
    foreign_table_name: String,
    foreign_column_name: String,
}

const NAMESPACES_SQL: &str = "\
SELECT schema_name
FROM information_schema.schemata
WHERE schema_name NOT LIKE 'pg\\_%'
  AND schema_name <> 'information_schema'
ORDER BY schema_name";

const COLUMNS_SQL: &str = "\
SELECT c.table_schema,
       c.table_name,
       c.column_name,
       c.udt_name,
       c.data_type,
       (c.is_nullable = 'YES') AS is_nullable,
       (c.column_default IS NOT NULL) AS has_default,
       c.column_default,
       c.character_maximum_length,
       c.ordinal_position::int4 AS ordinal_position
FROM information_schema.columns c
JOIN information_schema.tables t
  ON t.table_schema = c.table_schema AND t.table_name = c.table_name
WHERE t.table_type = 'BASE TABLE'
  AND c.table_schema = ANY($1)
ORDER BY c.table_schema, c.table_name, c.ordinal_position";

const PRIMARY_KEYS_SQL: &str = "\
SELECT tc.table_schema,
       tc.table_name,
       kcu.column_name
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_name = tc.constraint_name
 AND kcu.table_schema = tc.table_schema
WHERE tc.constraint_type = 'PRIMARY KEY'
  AND tc.table_schema = ANY($1)
ORDER BY tc.table_schema, tc.table_name, kcu.ordinal_position";

const FOREIGN_KEYS_SQL: &str = "\
SELECT tc.constraint_name,
       tc.table_schema,
       tc.table_name,
       kcu.column_name,
       ccu.table_schema AS foreign_table_schema,
       ccu.table_name AS foreign_table_name,
       ccu.column_name AS foreign_column_name
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_name = tc.constraint_name
 AND kcu.table_schema = tc.table_schema
JOIN information_schema.constraint_column_usage ccu
  ON ccu.constraint_name = tc.constraint_name
 AND ccu.table_schema = tc.table_schema
WHERE tc.constraint_type = 'FOREIGN KEY'
  AND tc.table_schema = ANY($1)
ORDER BY tc.constraint_name";

/// Read the catalog and assemble the immutable [`SchemaModel`].
///
/// Runs against the primary pool. The namespace listing completes first;
/// the three detail queries then run concurrently and their results merge.
pub async fn introspect(
    pool: &PgPool,
    options: &IntrospectOptions,
) -> Result<SchemaModel, SchemaError> {
    let catalog: Vec<NamespaceRow> = sqlx::query_as(NAMESPACES_SQL).fetch_all(pool).await?;
    let catalog: Vec<String> = catalog.into_iter().map(|r| r.schema_name).collect();

    let namespaces = filter_namespaces(&catalog, options)?;

    let columns = sqlx::query_as::<_, ColumnRow>(COLUMNS_SQL).bind(&namespaces);
    let primary_keys = sqlx::query_as::<_, PrimaryKeyRow>(PRIMARY_KEYS_SQL).bind(&namespaces);
    let foreign_keys = sqlx::query_as::<_, ForeignKeyRow>(FOREIGN_KEYS_SQL).bind(&namespaces);

    let (columns, primary_keys, foreign_keys) = tokio::try_join!(
        columns.fetch_all(pool),
        primary_keys.fetch_all(pool),
        foreign_keys.fetch_all(pool),
    )?;

    let model = assemble(namespaces, columns, primary_keys, foreign_keys, options)?;
    info!(
        tables = model.len(),
        namespaces = model.namespaces().len(),
        "schema model assembled"
    );
    Ok(model)
}

/// Apply include/exclude/system filtering to the catalog namespace list.
fn filter_namespaces(
    catalog: &[String],
    options: &IntrospectOptions,
) -> Result<Vec<String>, SchemaError> {
    let retained: Vec<String> = catalog
        .iter()
        .filter(|ns| {
            options.include_namespaces.is_empty() || options.include_namespaces.contains(ns)
        })
        .filter(|ns| !SYSTEM_NAMESPACES.contains(&ns.as_str()))
        .filter(|ns| !options.exclude_namespaces.contains(ns))
        .filter(|ns| !TEMP_PREFIXES.iter().any(|p| ns.starts_with(p)))
        .cloned()
        .collect();

    if retained.is_empty() {
        return Err(SchemaError::ConfigurationInvalid(
            "no namespaces remain after include/exclude filtering".into(),
        ));
    }
    Ok(retained)
}

/// Merge the catalog rows into entities. Pure so tests can feed it rows
/// directly.
fn assemble(
    namespaces: Vec<String>,
    columns: Vec<ColumnRow>,
    primary_keys: Vec<PrimaryKeyRow>,
    foreign_keys: Vec<ForeignKeyRow>,
    options: &IntrospectOptions,
) -> Result<SchemaModel, SchemaError> {
    // (namespace, table) -> Entity, in catalog order.
    let mut entities: BTreeMap<(String, String), Entity> = BTreeMap::new();

    for row in columns {
        let full_name = format!("{}.{}", row.table_schema, row.table_name);
        if options.exclude_tables.contains(&full_name) {
            continue;
        }
        if name_breaks_routing(&row.table_schema) || name_breaks_routing(&row.table_name) {
            warn!(
                table = %full_name,
                "skipping table: name contains the route separator"
            );
            continue;
        }

        let entity = entities
            .entry((row.table_schema.clone(), row.table_name.clone()))
            .or_insert_with(|| Entity {
                namespace: row.table_schema.clone(),
                name: row.table_name.clone(),
                columns: Vec::new(),
                primary_key: Vec::new(),
                foreign_keys: Vec::new(),
            });

        entity.columns.push(Column {
            name: row.column_name,
            sql_type_tag: row.udt_name,
            declared_type: row.data_type,
            nullable: row.is_nullable,
            has_default: row.has_default,
            default_text: row.column_default,
            max_text_length: row.character_maximum_length,
            ordinal_position: row.ordinal_position,
        });
    }

    for row in primary_keys {
        if let Some(entity) = entities.get_mut(&(row.table_schema, row.table_name)) {
            entity.primary_key.push(row.column_name);
        }
    }

    for row in foreign_keys {
        if let Some(entity) = entities.get_mut(&(row.table_schema, row.table_name)) {
            entity.foreign_keys.push(ForeignKey {
                constraint_name: row.constraint_name,
                column: row.column_name,
                referenced_namespace: row.foreign_table_schema,
                referenced_table: row.foreign_table_name,
                referenced_column: row.foreign_column_name,
            });
        }
    }

    let entities: Vec<Entity> = entities.into_values().collect();
    let model = SchemaModel::new(entities, namespaces)?;

    for entity in model.entities() {
        if !entity.has_primary_key() {
            warn!(
                table = %entity.qualified_identifier(),
                "table has no primary key; by-key read, update and delete are unavailable"
            );
        }
        for fk in &entity.foreign_keys {
            let target =
                crate::ident::qualified_identifier(&fk.referenced_namespace, &fk.referenced_table);
            if model.entity_by_qualified(&target).is_none() {
                warn!(
                    constraint = %fk.constraint_name,
                    table = %entity.qualified_identifier(),
                    references = %target,
                    "foreign key references a table outside the model"
                );
            }
        }
    }

    Ok(model)
}
