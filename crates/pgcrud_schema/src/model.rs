//! The in-memory schema model.
//!
//! One [`Entity`] per base table, assembled once by the introspector and
//! shared immutably with every request handler.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::ident::{qualified_identifier, route_segment};
use crate::types::{is_textual_tag, map_type_tag, PortableType};

/// Column whose presence switches DELETE into a soft-delete UPDATE.
pub const SOFT_DELETE_COLUMN: &str = "deleted_at";

/// Column auto-filled with `NOW()` on writes when absent from the payload.
pub const TOUCH_COLUMN: &str = "updated_at";

/// A single table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Low-level Postgres tag, e.g. `int4`, `varchar`, `_int4` for arrays.
    pub sql_type_tag: String,
    /// Portable textual type from the catalog, used for documentation.
    pub declared_type: String,
    pub nullable: bool,
    pub has_default: bool,
    pub default_text: Option<String>,
    pub max_text_length: Option<i32>,
    pub ordinal_position: i32,
}

impl Column {
    /// Portable type derived from the tag.
    pub fn portable_type(&self) -> PortableType {
        map_type_tag(&self.sql_type_tag)
    }

    /// A value must be supplied on insert: not nullable and no default.
    pub fn insert_required(&self) -> bool {
        !self.nullable && !self.has_default
    }
}

/// A foreign key owned by the referencing entity.
///
/// Referenced entities are located by qualified-identifier lookup; there are
/// no back-pointers, and a reference to a table outside the model is legal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub constraint_name: String,
    pub column: String,
    pub referenced_namespace: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// One relational table with its columns, keys and derived route segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub namespace: String,
    pub name: String,
    /// Columns in declared (ordinal) order.
    pub columns: Vec<Column>,
    /// Primary key member columns in PK order; may be empty.
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Entity {
    /// The two-part quoted identifier used in generated SQL.
    pub fn qualified_identifier(&self) -> String {
        qualified_identifier(&self.namespace, &self.name)
    }

    /// The URL-safe identifier this entity is addressed by.
    pub fn route_segment(&self) -> String {
        route_segment(&self.namespace, &self.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// All column names, in declared order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Columns searched by default: those with a textual type tag.
    pub fn searchable_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| is_textual_tag(&c.sql_type_tag))
            .map(|c| c.name.clone())
            .collect()
    }

    /// Sort column when the caller names none or an unknown one: the first
    /// PK column, else the first declared column.
    pub fn default_sort_column(&self) -> Option<&str> {
        self.primary_key
            .first()
            .map(|s| s.as_str())
            .or_else(|| self.columns.first().map(|c| c.name.as_str()))
    }

    /// By-key read/update/delete are only offered when a PK exists.
    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    pub fn has_soft_delete(&self) -> bool {
        self.has_column(SOFT_DELETE_COLUMN)
    }

    pub fn has_touch_column(&self) -> bool {
        self.has_column(TOUCH_COLUMN)
    }
}

/// The immutable model of everything the gateway serves.
#[derive(Debug, Clone)]
pub struct SchemaModel {
    /// Entities keyed by qualified identifier; BTreeMap keeps iteration
    /// deterministic for the digest and the emitted documentation.
    entities: BTreeMap<String, Entity>,
    /// Sorted list of namespaces that survived filtering.
    namespaces: Vec<String>,
    /// Route segment -> qualified identifier.
    routes: HashMap<String, String>,
}

impl SchemaModel {
    /// Assemble a model, enforcing route-segment uniqueness and the
    /// namespace/column invariants.
    pub fn new(entities: Vec<Entity>, mut namespaces: Vec<String>) -> Result<Self, SchemaError> {
        namespaces.sort();
        namespaces.dedup();

        let mut by_qualified = BTreeMap::new();
        let mut routes = HashMap::new();

        for entity in entities {
            for pk in &entity.primary_key {
                if !entity.has_column(pk) {
                    return Err(SchemaError::ModelInvalid(format!(
                        "primary key column {pk} not found on {}",
                        entity.qualified_identifier()
                    )));
                }
            }
            for fk in &entity.foreign_keys {
                if !entity.has_column(&fk.column) {
                    return Err(SchemaError::ModelInvalid(format!(
                        "foreign key {} references missing column {} on {}",
                        fk.constraint_name,
                        fk.column,
                        entity.qualified_identifier()
                    )));
                }
            }

            let segment = entity.route_segment();
            let qualified = entity.qualified_identifier();
            if let Some(existing) = routes.insert(segment.clone(), qualified.clone()) {
                return Err(SchemaError::DuplicateRoute {
                    segment,
                    first: existing,
                    second: qualified,
                });
            }
            by_qualified.insert(qualified, entity);
        }

        Ok(Self {
            entities: by_qualified,
            namespaces,
            routes,
        })
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// Entities in qualified-identifier order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entity_by_qualified(&self, qualified: &str) -> Option<&Entity> {
        self.entities.get(qualified)
    }

    /// Resolve a URL route segment to its entity.
    pub fn entity_by_route(&self, segment: &str) -> Option<&Entity> {
        self.routes
            .get(segment)
            .and_then(|qualified| self.entities.get(qualified))
    }

    /// Deterministic SHA-256 digest of the model; see [`crate::digest`].
    pub fn digest(&self) -> String {
        crate::digest::model_digest(self)
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    pub fn column(name: &str, tag: &str, ordinal: i32) -> Column {
        Column {
            name: name.to_string(),
            sql_type_tag: tag.to_string(),
            declared_type: tag.to_string(),
            nullable: true,
            has_default: false,
            default_text: None,
            max_text_length: None,
            ordinal_position: ordinal,
        }
    }

    pub fn entity(namespace: &str, name: &str, cols: &[(&str, &str)], pk: &[&str]) -> Entity {
        Entity {
            namespace: namespace.to_string(),
            name: name.to_string(),
            columns: cols
                .iter()
                .enumerate()
                .map(|(i, (n, t))| column(n, t, i as i32 + 1))
                .collect(),
            primary_key: pk.iter().map(|s| s.to_string()).collect(),
            foreign_keys: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::entity;
    use super::*;

    #[test]
    fn test_route_lookup() {
        let model = SchemaModel::new(
            vec![
                entity("public", "users", &[("id", "int4"), ("name", "text")], &["id"]),
                entity("reporting", "metrics", &[("day", "date")], &["day"]),
            ],
            vec!["public".into(), "reporting".into()],
        )
        .unwrap();

        assert_eq!(model.entity_by_route("users").unwrap().name, "users");
        assert_eq!(
            model.entity_by_route("reporting__metrics").unwrap().name,
            "metrics"
        );
        assert!(model.entity_by_route("metrics").is_none());
    }

    #[test]
    fn test_duplicate_route_rejected() {
        // "a__b" in public collides with table "b" in namespace "a". The
        // introspector skips names containing the separator, but the model
        // still defends the invariant.
        let err = SchemaModel::new(
            vec![
                entity("public", "a__b", &[("id", "int4")], &[]),
                entity("a", "b", &[("id", "int4")], &[]),
            ],
            vec!["public".into(), "a".into()],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateRoute { .. }));
    }

    #[test]
    fn test_pk_must_exist() {
        let err = SchemaModel::new(
            vec![entity("public", "users", &[("id", "int4")], &["missing"])],
            vec!["public".into()],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::ModelInvalid(_)));
    }

    #[test]
    fn test_default_sort_column_falls_back() {
        let with_pk = entity("public", "t", &[("b", "text"), ("a", "int4")], &["a"]);
        assert_eq!(with_pk.default_sort_column(), Some("a"));

        let without_pk = entity("public", "t", &[("b", "text"), ("a", "int4")], &[]);
        assert_eq!(without_pk.default_sort_column(), Some("b"));
    }

    #[test]
    fn test_searchable_columns_are_textual() {
        let e = entity(
            "public",
            "posts",
            &[("id", "int4"), ("title", "varchar"), ("body", "text"), ("tags", "_text")],
            &["id"],
        );
        assert_eq!(e.searchable_columns(), vec!["title", "body"]);
    }

    #[test]
    fn test_insert_required() {
        let mut c = test_fixtures::column("id", "int4", 1);
        c.nullable = false;
        assert!(c.insert_required());
        c.has_default = true;
        assert!(!c.insert_required());
    }
}
