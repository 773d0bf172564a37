//! Deterministic digest of the schema model.
//!
//! The digest is SHA-256 over a canonical JSON serialization: namespaces
//! sorted, entities sorted by qualified identifier, columns by ordinal
//! position, primary keys lexicographically, foreign keys by constraint
//! name. Only semantic fields participate; cosmetic catalog details such as
//! default expression text are excluded so that a dump/restore cycle does
//! not read as drift.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::model::SchemaModel;

/// Compute the lowercase hex digest of the canonicalized model.
pub fn model_digest(model: &SchemaModel) -> String {
    let canonical = canonicalize(model);
    // serde_json maps are ordered, so the byte sequence is reproducible.
    let bytes = serde_json::to_vec(&canonical).expect("canonical model serializes");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}

fn canonicalize(model: &SchemaModel) -> Value {
    let entities: Vec<Value> = model
        .entities()
        .map(|entity| {
            let mut columns: Vec<_> = entity.columns.iter().collect();
            columns.sort_by_key(|c| c.ordinal_position);
            let columns: Vec<Value> = columns
                .into_iter()
                .map(|c| {
                    json!({
                        "name": c.name,
                        "type": c.sql_type_tag,
                        "nullable": c.nullable,
                        "has_default": c.has_default,
                        "max_length": c.max_text_length,
                        "position": c.ordinal_position,
                    })
                })
                .collect();

            let mut primary_key = entity.primary_key.clone();
            primary_key.sort();

            let mut foreign_keys: Vec<_> = entity.foreign_keys.iter().collect();
            foreign_keys.sort_by(|a, b| a.constraint_name.cmp(&b.constraint_name));
            let foreign_keys: Vec<Value> = foreign_keys
                .into_iter()
                .map(|fk| {
                    json!({
                        "constraint": fk.constraint_name,
                        "column": fk.column,
                        "ref_namespace": fk.referenced_namespace,
                        "ref_table": fk.referenced_table,
                        "ref_column": fk.referenced_column,
                    })
                })
                .collect();

            json!({
                "namespace": entity.namespace,
                "name": entity.name,
                "columns": columns,
                "primary_key": primary_key,
                "foreign_keys": foreign_keys,
            })
        })
        .collect();

    json!({
        "namespaces": model.namespaces(),
        "entities": entities,
    })
}

#[cfg(test)]
mod tests {
    use crate::model::test_fixtures::{column, entity};
    use crate::model::{Entity, SchemaModel};

    fn model(entities: Vec<Entity>) -> SchemaModel {
        let namespaces = entities.iter().map(|e| e.namespace.clone()).collect();
        SchemaModel::new(entities, namespaces).unwrap()
    }

    #[test]
    fn test_digest_is_64_hex_chars() {
        let m = model(vec![entity("public", "users", &[("id", "int4")], &["id"])]);
        let digest = m.digest();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, digest.to_lowercase());
    }

    #[test]
    fn test_digest_stable_across_source_ordering() {
        // Columns arrive in different source order but with the same
        // ordinals; the canonical form sorts them, so the digest agrees.
        let mut a = entity("public", "users", &[], &["id"]);
        a.columns = vec![column("id", "int4", 1), column("name", "text", 2)];
        let mut b = entity("public", "users", &[], &["id"]);
        b.columns = vec![column("name", "text", 2), column("id", "int4", 1)];

        assert_eq!(model(vec![a]).digest(), model(vec![b]).digest());
    }

    #[test]
    fn test_digest_ignores_default_text() {
        let mut a = entity("public", "users", &[("id", "int4")], &["id"]);
        let mut b = a.clone();
        a.columns[0].default_text = Some("nextval('users_id_seq')".into());
        b.columns[0].default_text = Some("nextval('public.users_id_seq')".into());
        a.columns[0].has_default = true;
        b.columns[0].has_default = true;

        assert_eq!(model(vec![a]).digest(), model(vec![b]).digest());
    }

    #[test]
    fn test_digest_tracks_semantic_change() {
        let a = entity("public", "users", &[("id", "int4")], &["id"]);
        let mut b = a.clone();
        b.columns[0].nullable = false;

        assert_ne!(model(vec![a]).digest(), model(vec![b]).digest());
    }
}
