//! Request validation.
//!
//! Everything here runs before SQL is built and never touches the
//! database: route resolution, key-segment parsing, list parameter
//! extraction, and body shape checks.

use serde_json::{Map, Value};

use pgcrud_query::{ListParams, SortOrder, WritePayload};
use pgcrud_schema::{Entity, SchemaModel};

use crate::error::GatewayError;
use crate::Result;

/// Query parameter names recognized on list requests.
pub mod params {
    pub const PAGE: &str = "page";
    pub const PAGE_SIZE: &str = "pageSize";
    pub const SORT_BY: &str = "sortBy";
    pub const SORT_ORDER: &str = "sortOrder";
    pub const SELECT: &str = "select";
    pub const SEARCH: &str = "search";
    pub const SEARCH_COLUMNS: &str = "searchColumns";
    pub const FILTER_PREFIX: &str = "filter.";
}

/// Resolve a route segment to its entity.
pub fn resolve_entity<'a>(model: &'a SchemaModel, segment: &str) -> Result<&'a Entity> {
    model
        .entity_by_route(segment)
        .ok_or_else(|| GatewayError::not_found(format!("Unknown table '{segment}'")))
}

/// Parse the key segment of a by-key request into PK values in PK order.
///
/// Composite keys arrive comma-joined; the part count must match the PK
/// arity exactly and every part must be non-empty.
pub fn parse_key_segment(entity: &Entity, raw: &str) -> Result<Vec<Value>> {
    let expected = entity.primary_key.len();
    if expected == 0 {
        return Err(GatewayError::validation(format!(
            "Table '{}' has no primary key; by-key access is unavailable",
            entity.route_segment()
        )));
    }

    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != expected || parts.iter().any(|part| part.is_empty()) {
        let message = if expected == 1 {
            format!("Primary key expects 1 value, got '{raw}'")
        } else {
            format!(
                "Composite primary key expects {expected} values, got {} in '{raw}'",
                parts.iter().filter(|p| !p.is_empty()).count()
            )
        };
        return Err(GatewayError::validation(message));
    }

    Ok(parts
        .into_iter()
        .map(|part| Value::String(part.to_string()))
        .collect())
}

/// Extract list parameters from decoded query pairs.
///
/// Any key beginning with `filter.` is a column filter; the remainder after
/// the dot is the column name. Filter order is preserved.
pub fn extract_list_params(
    pairs: &[(String, String)],
    default_page_size: i64,
) -> Result<ListParams> {
    let mut list = ListParams {
        page: 1,
        page_size: default_page_size,
        ..ListParams::default()
    };

    for (key, value) in pairs {
        match key.as_str() {
            params::PAGE => list.page = parse_number(value, params::PAGE)?,
            params::PAGE_SIZE => list.page_size = parse_number(value, params::PAGE_SIZE)?,
            params::SORT_BY => list.sort_by = Some(value.clone()),
            params::SORT_ORDER => list.sort_order = SortOrder::parse(value),
            params::SELECT => list.select = Some(split_csv(value)),
            params::SEARCH => list.search = Some(value.clone()),
            params::SEARCH_COLUMNS => list.search_columns = Some(split_csv(value)),
            _ => {
                if let Some(column) = key.strip_prefix(params::FILTER_PREFIX) {
                    list.filters.push((column.to_string(), value.clone()));
                }
                // Unrecognized parameters are ignored.
            }
        }
    }

    Ok(list)
}

fn parse_number(raw: &str, name: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| GatewayError::validation(format!("'{name}' must be an integer, got '{raw}'")))
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Check the body of a create request: one object, or a non-empty array of
/// objects bounded by the bulk row cap.
pub fn validate_create_body(body: Value, max_bulk_rows: usize) -> Result<WritePayload> {
    match body {
        Value::Object(map) => Ok(WritePayload::Single(map)),
        Value::Array(items) => {
            if items.is_empty() {
                return Err(GatewayError::validation(
                    "bulk create requires a non-empty array of objects",
                ));
            }
            if items.len() > max_bulk_rows {
                return Err(GatewayError::validation(format!(
                    "bulk create exceeds the row limit ({max_bulk_rows})"
                )));
            }
            let rows: Option<Vec<Map<String, Value>>> = items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect();
            match rows {
                Some(rows) => Ok(WritePayload::Bulk(rows)),
                None => Err(GatewayError::validation(
                    "bulk create requires every element to be an object",
                )),
            }
        }
        _ => Err(GatewayError::validation(
            "request body must be a JSON object or array of objects",
        )),
    }
}

/// Check the body of an update request: exactly one object.
pub fn validate_update_body(body: Value) -> Result<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(GatewayError::validation(
            "request body must be a JSON object",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(pk: &[&str]) -> Entity {
        Entity {
            namespace: "public".into(),
            name: "user_roles".into(),
            columns: ["user_id", "role_id", "note"]
                .iter()
                .enumerate()
                .map(|(i, name)| pgcrud_schema::Column {
                    name: name.to_string(),
                    sql_type_tag: "int4".into(),
                    declared_type: "integer".into(),
                    nullable: true,
                    has_default: false,
                    default_text: None,
                    max_text_length: None,
                    ordinal_position: i as i32 + 1,
                })
                .collect(),
            primary_key: pk.iter().map(|s| s.to_string()).collect(),
            foreign_keys: Vec::new(),
        }
    }

    #[test]
    fn test_key_segment_single() {
        let values = parse_key_segment(&entity(&["user_id"]), "42").unwrap();
        assert_eq!(values, vec![json!("42")]);
    }

    #[test]
    fn test_key_segment_composite() {
        let values = parse_key_segment(&entity(&["user_id", "role_id"]), "42,7").unwrap();
        assert_eq!(values, vec![json!("42"), json!("7")]);
    }

    #[test]
    fn test_key_arity_mismatch_message() {
        // Composite PK addressed with a single value.
        let err = parse_key_segment(&entity(&["user_id", "role_id"]), "42").unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(err
            .to_string()
            .contains("Composite primary key expects 2 values"));
    }

    #[test]
    fn test_key_empty_part_rejected() {
        let err = parse_key_segment(&entity(&["user_id", "role_id"]), "42,").unwrap_err();
        assert!(matches!(err, GatewayError::ValidationFailed { .. }));
    }

    #[test]
    fn test_key_without_pk() {
        let err = parse_key_segment(&entity(&[]), "42").unwrap_err();
        assert!(err.to_string().contains("no primary key"));
    }

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_extract_list_params() {
        let extracted = extract_list_params(
            &pairs(&[
                ("page", "2"),
                ("pageSize", "5"),
                ("sortBy", "name"),
                ("sortOrder", "desc"),
                ("select", "id,name"),
                ("search", "alice"),
                ("filter.name", "eq:Alice"),
                ("filter.age", "gte:30"),
                ("unrelated", "ignored"),
            ]),
            25,
        )
        .unwrap();

        assert_eq!(extracted.page, 2);
        assert_eq!(extracted.page_size, 5);
        assert_eq!(extracted.sort_by.as_deref(), Some("name"));
        assert_eq!(extracted.sort_order, SortOrder::Desc);
        assert_eq!(extracted.select, Some(vec!["id".into(), "name".into()]));
        assert_eq!(extracted.search.as_deref(), Some("alice"));
        assert_eq!(
            extracted.filters,
            vec![
                ("name".to_string(), "eq:Alice".to_string()),
                ("age".to_string(), "gte:30".to_string()),
            ]
        );
    }

    #[test]
    fn test_page_must_be_numeric() {
        let err = extract_list_params(&pairs(&[("page", "abc")]), 25).unwrap_err();
        assert!(matches!(err, GatewayError::ValidationFailed { .. }));
    }

    #[test]
    fn test_defaults_applied() {
        let extracted = extract_list_params(&[], 25).unwrap();
        assert_eq!(extracted.page, 1);
        assert_eq!(extracted.page_size, 25);
    }

    #[test]
    fn test_create_body_shapes() {
        assert!(matches!(
            validate_create_body(json!({"a": 1}), 10).unwrap(),
            WritePayload::Single(_)
        ));
        assert!(matches!(
            validate_create_body(json!([{"a": 1}, {"a": 2}]), 10).unwrap(),
            WritePayload::Bulk(rows) if rows.len() == 2
        ));
        assert!(validate_create_body(json!([]), 10).is_err());
        assert!(validate_create_body(json!([1, 2]), 10).is_err());
        assert!(validate_create_body(json!("nope"), 10).is_err());

        let too_many = json!([{"a": 1}, {"a": 2}, {"a": 3}]);
        assert!(validate_create_body(too_many, 2).is_err());
    }

    #[test]
    fn test_update_body_shape() {
        assert!(validate_update_body(json!({"a": 1})).is_ok());
        assert!(validate_update_body(json!([{"a": 1}])).is_err());
    }
}
