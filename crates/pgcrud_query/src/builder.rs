//! Intent to parameterized SQL.
//!
//! Builders are pure over the entity and the validated intent. Placeholders
//! are `$1, $2, …` numbered in order of appearance; the only SQL token ever
//! emitted in place of a value is the literal `NOW()` used for automatic
//! timestamps.
//!
//! Each parameter carries the type tag of the column it belongs to (when it
//! belongs to one) so the executor can coerce values to the column's type
//! before binding. The SQL text itself never embeds a cast for a value.

use serde_json::{Map, Value};

use pgcrud_schema::ident::quote_ident;
use pgcrud_schema::{Column, Entity, SOFT_DELETE_COLUMN, TOUCH_COLUMN};

use crate::error::QueryError;
use crate::filter::{parse_filter, FilterOp};
use crate::intent::ListParams;
use crate::Result;

/// Hard cap on `in` filter list length.
pub const MAX_IN_VALUES: usize = 100;

/// SQL text plus its bound values, in placeholder order.
///
/// `param_tags[i]` is the type tag of the column `params[i]` targets, or
/// `None` for parameters with no column (LIMIT, OFFSET, search patterns,
/// LIKE operands).
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub text: String,
    pub params: Vec<Value>,
    pub param_tags: Vec<Option<String>>,
}

/// Delete statement plus which path was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub statement: SqlStatement,
    /// True when the table has a `deleted_at` column and the delete became
    /// an UPDATE.
    pub soft: bool,
}

/// Caps the builder enforces; both come from the gateway configuration.
#[derive(Debug, Clone, Copy)]
pub struct BuilderLimits {
    pub max_page_size: i64,
    pub max_bulk_rows: usize,
}

/// Accumulates parameters and their column tags in placeholder order.
#[derive(Debug, Default)]
struct Params {
    values: Vec<Value>,
    tags: Vec<Option<String>>,
}

impl Params {
    /// Push a value and return its 1-based placeholder number.
    fn push(&mut self, value: Value, tag: Option<&str>) -> usize {
        self.values.push(value);
        self.tags.push(tag.map(str::to_string));
        self.values.len()
    }

    fn into_statement(self, text: String) -> SqlStatement {
        SqlStatement {
            text,
            params: self.values,
            param_tags: self.tags,
        }
    }
}

// =============================================================================
// List / count
// =============================================================================

/// Build the page query for a list operation.
pub fn build_list(
    entity: &Entity,
    params: &ListParams,
    limits: BuilderLimits,
) -> Result<SqlStatement> {
    let mut bound = Params::default();

    let projection = build_projection(entity, params.select.as_deref())?;
    let where_sql = build_where(entity, params, &mut bound)?;
    let order_sql = build_order_by(entity, params);

    let page = params.page.max(1);
    let page_size = params.page_size.clamp(1, limits.max_page_size);
    let offset = (page - 1) * page_size;

    let limit_ph = bound.push(Value::from(page_size), None);
    let offset_ph = bound.push(Value::from(offset), None);

    let text = format!(
        "SELECT {projection} FROM {}{where_sql}{order_sql} LIMIT ${limit_ph} OFFSET ${offset_ph}",
        entity.qualified_identifier(),
    );
    Ok(bound.into_statement(text))
}

/// Build the companion count query. The WHERE clause and its values are
/// identical to the list query's.
pub fn build_count(entity: &Entity, params: &ListParams) -> Result<SqlStatement> {
    let mut bound = Params::default();
    let where_sql = build_where(entity, params, &mut bound)?;
    let text = format!(
        "SELECT COUNT(*) AS total FROM {}{where_sql}",
        entity.qualified_identifier(),
    );
    Ok(bound.into_statement(text))
}

fn build_projection(entity: &Entity, select: Option<&[String]>) -> Result<String> {
    let Some(requested) = select else {
        return Ok("*".to_string());
    };
    let kept: Vec<String> = requested
        .iter()
        .filter(|c| entity.has_column(c))
        .map(|c| quote_ident(c))
        .collect();
    if kept.is_empty() {
        return Err(QueryError::EmptySelection {
            known: entity.column_names(),
        });
    }
    Ok(kept.join(", "))
}

fn build_where(entity: &Entity, params: &ListParams, bound: &mut Params) -> Result<String> {
    let mut clauses = Vec::new();

    for (column, raw) in &params.filters {
        clauses.push(filter_clause(entity, column, raw, bound)?);
    }
    if let Some(term) = params.search.as_deref() {
        if let Some(clause) = search_clause(entity, term, params.search_columns.as_deref(), bound) {
            clauses.push(clause);
        }
    }

    if clauses.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", clauses.join(" AND ")))
    }
}

fn filter_clause(
    entity: &Entity,
    column: &str,
    raw: &str,
    bound: &mut Params,
) -> Result<String> {
    let Some(col) = entity.column(column) else {
        return Err(QueryError::UnknownColumn {
            column: column.to_string(),
            known: entity.column_names(),
        });
    };
    let quoted = quote_ident(column);
    let (op, operand) = parse_filter(raw);

    match op {
        FilterOp::Is => match operand.to_ascii_lowercase().as_str() {
            "null" => Ok(format!("{quoted} IS NULL")),
            "notnull" => Ok(format!("{quoted} IS NOT NULL")),
            _ => Err(QueryError::InvalidIsOperand {
                column: column.to_string(),
                value: operand.to_string(),
            }),
        },
        FilterOp::In => {
            let items: Vec<&str> = operand.split(',').collect();
            if items.len() > MAX_IN_VALUES {
                return Err(QueryError::TooManyInValues {
                    column: column.to_string(),
                });
            }
            let placeholders: Vec<String> = items
                .iter()
                .map(|item| {
                    let ph = bound.push(Value::String(item.to_string()), Some(&col.sql_type_tag));
                    format!("${ph}")
                })
                .collect();
            Ok(format!("{quoted} IN ({})", placeholders.join(", ")))
        }
        // Pattern operators compare text; the operand stays a string.
        FilterOp::Like | FilterOp::Ilike => {
            let ph = bound.push(Value::String(operand.to_string()), None);
            Ok(format!("{quoted} {} ${ph}", op.sql()))
        }
        _ => {
            let ph = bound.push(Value::String(operand.to_string()), Some(&col.sql_type_tag));
            Ok(format!("{quoted} {} ${ph}", op.sql()))
        }
    }
}

/// Build the search disjunction, or `None` when no searchable column
/// remains. The pattern is bound once and the placeholder reused.
fn search_clause(
    entity: &Entity,
    term: &str,
    search_columns: Option<&[String]>,
    bound: &mut Params,
) -> Option<String> {
    let columns: Vec<String> = match search_columns {
        // Explicit list: keep what exists, silently skip the rest.
        Some(requested) => requested
            .iter()
            .filter(|c| entity.has_column(c))
            .cloned()
            .collect(),
        None => entity.searchable_columns(),
    };
    if columns.is_empty() {
        return None;
    }

    let placeholder = bound.push(Value::String(format!("%{}%", escape_like(term))), None);
    let parts: Vec<String> = columns
        .iter()
        .map(|c| format!("{}::text ILIKE ${placeholder}", quote_ident(c)))
        .collect();
    Some(format!("({})", parts.join(" OR ")))
}

/// Escape LIKE metacharacters so a search term matches itself literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn build_order_by(entity: &Entity, params: &ListParams) -> String {
    let requested = params.sort_by.as_deref().filter(|c| entity.has_column(c));
    let column = requested.or_else(|| entity.default_sort_column());
    match column {
        Some(column) => format!(
            " ORDER BY {} {}",
            quote_ident(column),
            params.sort_order.sql()
        ),
        None => String::new(),
    }
}

// =============================================================================
// Read by key
// =============================================================================

/// Build the by-key read. `key_values` must already be in PK order.
pub fn build_read(entity: &Entity, key_values: &[Value]) -> Result<SqlStatement> {
    let mut bound = Params::default();
    let where_sql = key_where(entity, key_values, &mut bound)?;
    let text = format!(
        "SELECT * FROM {} WHERE {where_sql} LIMIT 1",
        entity.qualified_identifier(),
    );
    Ok(bound.into_statement(text))
}

fn key_where(entity: &Entity, key_values: &[Value], bound: &mut Params) -> Result<String> {
    if entity.primary_key.is_empty() {
        return Err(QueryError::NoPrimaryKey {
            table: entity.qualified_identifier(),
        });
    }
    if key_values.len() != entity.primary_key.len() {
        return Err(QueryError::KeyArityMismatch {
            expected: entity.primary_key.len(),
            got: key_values.len(),
        });
    }
    let clauses: Vec<String> = entity
        .primary_key
        .iter()
        .zip(key_values)
        .map(|(column, value)| {
            let tag = entity.column(column).map(|c| c.sql_type_tag.as_str());
            let ph = bound.push(value.clone(), tag);
            format!("{} = ${ph}", quote_ident(column))
        })
        .collect();
    Ok(clauses.join(" AND "))
}

// =============================================================================
// Insert
// =============================================================================

/// Build a single-row insert. Unknown payload keys are dropped; a missing
/// `updated_at` is filled with the `NOW()` literal when the column exists.
pub fn build_insert(entity: &Entity, payload: &Map<String, Value>) -> Result<SqlStatement> {
    let columns: Vec<&Column> = entity
        .columns
        .iter()
        .filter(|c| payload.contains_key(&c.name))
        .collect();
    if columns.is_empty() {
        return Err(QueryError::EmptyColumnSet);
    }

    let touch = entity.has_touch_column() && !payload.contains_key(TOUCH_COLUMN);

    let mut bound = Params::default();
    let mut names: Vec<String> = columns.iter().map(|c| quote_ident(&c.name)).collect();
    let mut slots: Vec<String> = columns
        .iter()
        .map(|c| {
            let ph = bound.push(payload[&c.name].clone(), Some(&c.sql_type_tag));
            format!("${ph}")
        })
        .collect();

    if touch {
        names.push(quote_ident(TOUCH_COLUMN));
        slots.push("NOW()".to_string());
    }

    let text = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        entity.qualified_identifier(),
        names.join(", "),
        slots.join(", "),
    );
    Ok(bound.into_statement(text))
}

/// Build a multi-row insert over the union of the rows' known columns.
///
/// A row that omits a column binds NULL for that position, except
/// `updated_at`, which becomes the `NOW()` literal.
pub fn build_insert_bulk(
    entity: &Entity,
    rows: &[Map<String, Value>],
    limits: BuilderLimits,
) -> Result<SqlStatement> {
    if rows.is_empty() {
        return Err(QueryError::EmptyRows);
    }
    if rows.len() > limits.max_bulk_rows {
        return Err(QueryError::TooManyRows {
            max: limits.max_bulk_rows,
        });
    }

    let mut columns: Vec<&Column> = entity
        .columns
        .iter()
        .filter(|c| rows.iter().any(|row| row.contains_key(&c.name)))
        .collect();
    if columns.is_empty() {
        return Err(QueryError::EmptyColumnSet);
    }
    // Auto-filled timestamp joins the column list even when no row names it.
    if entity.has_touch_column() && !columns.iter().any(|c| c.name == TOUCH_COLUMN) {
        if let Some(column) = entity.column(TOUCH_COLUMN) {
            columns.push(column);
        }
    }

    let names: Vec<String> = columns.iter().map(|c| quote_ident(&c.name)).collect();
    let mut bound = Params::default();
    let mut row_groups = Vec::with_capacity(rows.len());

    for row in rows {
        let slots: Vec<String> = columns
            .iter()
            .map(|column| match row.get(&column.name) {
                Some(value) => {
                    let ph = bound.push(value.clone(), Some(&column.sql_type_tag));
                    format!("${ph}")
                }
                None if column.name == TOUCH_COLUMN => "NOW()".to_string(),
                None => {
                    let ph = bound.push(Value::Null, Some(&column.sql_type_tag));
                    format!("${ph}")
                }
            })
            .collect();
        row_groups.push(format!("({})", slots.join(", ")));
    }

    let text = format!(
        "INSERT INTO {} ({}) VALUES {} RETURNING *",
        entity.qualified_identifier(),
        names.join(", "),
        row_groups.join(", "),
    );
    Ok(bound.into_statement(text))
}

// =============================================================================
// Update
// =============================================================================

/// Build a partial or full update by key. Primary key columns in the
/// payload are silently dropped; they cannot be modified.
pub fn build_update(
    entity: &Entity,
    payload: &Map<String, Value>,
    key_values: &[Value],
) -> Result<SqlStatement> {
    let set_columns: Vec<&Column> = entity
        .columns
        .iter()
        .filter(|c| payload.contains_key(&c.name) && !entity.primary_key.contains(&c.name))
        .collect();
    if set_columns.is_empty() {
        return Err(QueryError::EmptyColumnSet);
    }

    let mut bound = Params::default();
    let mut assignments: Vec<String> = set_columns
        .iter()
        .map(|c| {
            let ph = bound.push(payload[&c.name].clone(), Some(&c.sql_type_tag));
            format!("{} = ${ph}", quote_ident(&c.name))
        })
        .collect();

    if entity.has_touch_column() && !payload.contains_key(TOUCH_COLUMN) {
        assignments.push(format!("{} = NOW()", quote_ident(TOUCH_COLUMN)));
    }

    let where_sql = key_where(entity, key_values, &mut bound)?;
    let text = format!(
        "UPDATE {} SET {} WHERE {where_sql} RETURNING *",
        entity.qualified_identifier(),
        assignments.join(", "),
    );
    Ok(bound.into_statement(text))
}

// =============================================================================
// Delete
// =============================================================================

/// Build a delete by key: a soft-delete UPDATE when the table carries
/// `deleted_at`, a plain DELETE otherwise.
pub fn build_delete(entity: &Entity, key_values: &[Value]) -> Result<DeleteStatement> {
    let mut bound = Params::default();

    if entity.has_soft_delete() {
        let mut assignments = vec![format!("{} = NOW()", quote_ident(SOFT_DELETE_COLUMN))];
        if entity.has_touch_column() {
            assignments.push(format!("{} = NOW()", quote_ident(TOUCH_COLUMN)));
        }
        let where_sql = key_where(entity, key_values, &mut bound)?;
        let text = format!(
            "UPDATE {} SET {} WHERE {where_sql} RETURNING *",
            entity.qualified_identifier(),
            assignments.join(", "),
        );
        return Ok(DeleteStatement {
            statement: bound.into_statement(text),
            soft: true,
        });
    }

    let where_sql = key_where(entity, key_values, &mut bound)?;
    let text = format!(
        "DELETE FROM {} WHERE {where_sql} RETURNING *",
        entity.qualified_identifier(),
    );
    Ok(DeleteStatement {
        statement: bound.into_statement(text),
        soft: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::SortOrder;
    use serde_json::json;

    fn limits() -> BuilderLimits {
        BuilderLimits {
            max_page_size: 100,
            max_bulk_rows: 500,
        }
    }

    fn column(name: &str, tag: &str, ordinal: i32) -> Column {
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

    fn entity(namespace: &str, name: &str, cols: &[(&str, &str)], pk: &[&str]) -> Entity {
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

    fn users() -> Entity {
        entity(
            "public",
            "users",
            &[("id", "int4"), ("name", "text"), ("email", "text")],
            &["id"],
        )
    }

    fn list(filters: &[(&str, &str)]) -> ListParams {
        ListParams {
            filters: filters
                .iter()
                .map(|(c, v)| (c.to_string(), v.to_string()))
                .collect(),
            page: 1,
            page_size: 25,
            ..ListParams::default()
        }
    }

    #[test]
    fn test_list_with_filter_and_pagination() {
        // Second page of five, one equality filter.
        let mut params = list(&[("name", "eq:Alice")]);
        params.page = 2;
        params.page_size = 5;

        let stmt = build_list(&users(), &params, limits()).unwrap();
        assert_eq!(
            stmt.text,
            "SELECT * FROM \"public\".\"users\" WHERE \"name\" = $1 \
             ORDER BY \"id\" ASC LIMIT $2 OFFSET $3"
        );
        assert_eq!(stmt.params, vec![json!("Alice"), json!(5), json!(5)]);
        assert_eq!(stmt.param_tags, vec![Some("text".to_string()), None, None]);
    }

    #[test]
    fn test_bare_value_is_equality() {
        let stmt = build_list(&users(), &list(&[("name", "Alice")]), limits()).unwrap();
        assert!(stmt.text.contains("\"name\" = $1"));
        assert_eq!(stmt.params[0], json!("Alice"));
    }

    #[test]
    fn test_unknown_filter_column_lists_known() {
        let err = build_list(&users(), &list(&[("nope", "eq:x")]), limits()).unwrap_err();
        match err {
            QueryError::UnknownColumn { column, known } => {
                assert_eq!(column, "nope");
                assert_eq!(known, vec!["id", "name", "email"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_in_filter_at_cap() {
        let operand = (0..100).map(|i| i.to_string()).collect::<Vec<_>>().join(",");
        let stmt = build_list(
            &users(),
            &list(&[("name", &format!("in:{operand}"))]),
            limits(),
        )
        .unwrap();
        assert!(stmt.text.contains("\"name\" IN ($1"));
        assert!(stmt.text.contains("$100)"));
        // 100 list values + limit + offset.
        assert_eq!(stmt.params.len(), 102);
    }

    #[test]
    fn test_in_filter_over_cap() {
        let operand = (0..101).map(|i| i.to_string()).collect::<Vec<_>>().join(",");
        let err = build_list(
            &users(),
            &list(&[("name", &format!("in:{operand}"))]),
            limits(),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::TooManyInValues { .. }));
    }

    #[test]
    fn test_is_filter() {
        let stmt = build_list(&users(), &list(&[("email", "is:null")]), limits()).unwrap();
        assert!(stmt.text.contains("\"email\" IS NULL"));

        let stmt = build_list(&users(), &list(&[("email", "is:NotNull")]), limits()).unwrap();
        assert!(stmt.text.contains("\"email\" IS NOT NULL"));

        let err = build_list(&users(), &list(&[("email", "is:maybe")]), limits()).unwrap_err();
        assert!(matches!(err, QueryError::InvalidIsOperand { .. }));
    }

    #[test]
    fn test_pagination_clamps() {
        let mut params = list(&[]);
        params.page = 0;
        params.page_size = 10_000;
        let stmt = build_list(&users(), &params, limits()).unwrap();
        // page < 1 => offset 0; page_size > max => limit max.
        assert_eq!(stmt.params, vec![json!(100), json!(0)]);

        params.page = 3;
        params.page_size = 0;
        let stmt = build_list(&users(), &params, limits()).unwrap();
        // page_size < 1 => limit 1; offset (3-1)*1.
        assert_eq!(stmt.params, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_sort_fallbacks() {
        let mut params = list(&[]);
        params.sort_by = Some("email".into());
        params.sort_order = SortOrder::Desc;
        let stmt = build_list(&users(), &params, limits()).unwrap();
        assert!(stmt.text.contains("ORDER BY \"email\" DESC"));

        // Unknown sort column falls back to the first PK column.
        params.sort_by = Some("ghost".into());
        let stmt = build_list(&users(), &params, limits()).unwrap();
        assert!(stmt.text.contains("ORDER BY \"id\" DESC"));

        // No PK: first declared column.
        let no_pk = entity(
            "public",
            "log",
            &[("line", "text"), ("at", "timestamptz")],
            &[],
        );
        let stmt = build_list(&no_pk, &list(&[]), limits()).unwrap();
        assert!(stmt.text.contains("ORDER BY \"line\" ASC"));
    }

    #[test]
    fn test_projection() {
        let mut params = list(&[]);
        params.select = Some(vec!["name".into(), "ghost".into()]);
        let stmt = build_list(&users(), &params, limits()).unwrap();
        assert!(stmt.text.starts_with("SELECT \"name\" FROM"));

        params.select = Some(vec!["ghost".into()]);
        let err = build_list(&users(), &params, limits()).unwrap_err();
        assert!(matches!(err, QueryError::EmptySelection { .. }));
    }

    #[test]
    fn test_search_escapes_metacharacters() {
        let mut params = list(&[]);
        params.search = Some("50%_of\\users".into());
        let stmt = build_list(&users(), &params, limits()).unwrap();
        assert!(stmt
            .text
            .contains("(\"name\"::text ILIKE $1 OR \"email\"::text ILIKE $1)"));
        assert_eq!(stmt.params[0], json!("%50\\%\\_of\\\\users%"));
    }

    #[test]
    fn test_search_columns_restrict_and_drop() {
        let mut params = list(&[]);
        params.search = Some("x".into());
        params.search_columns = Some(vec!["email".into(), "ghost".into()]);
        let stmt = build_list(&users(), &params, limits()).unwrap();
        assert!(stmt.text.contains("(\"email\"::text ILIKE $1)"));
        assert!(!stmt.text.contains("\"name\"::text"));

        // Nothing left to search: the clause disappears.
        params.search_columns = Some(vec!["ghost".into()]);
        let stmt = build_list(&users(), &params, limits()).unwrap();
        assert!(!stmt.text.contains("ILIKE"));
    }

    #[test]
    fn test_count_where_parity() {
        let mut params = list(&[("name", "eq:Alice"), ("email", "ilike:%a%")]);
        params.search = Some("bob".into());
        params.page = 4;

        let page = build_list(&users(), &params, limits()).unwrap();
        let count = build_count(&users(), &params).unwrap();

        let where_of = |text: &str| {
            let start = text.find(" WHERE ").unwrap();
            let end = text.find(" ORDER BY ").unwrap_or(text.len());
            text[start..end].to_string()
        };
        assert_eq!(where_of(&page.text), where_of(&count.text));
        // Count binds exactly the WHERE values; list adds limit and offset.
        assert_eq!(&page.params[..count.params.len()], &count.params[..]);
        assert_eq!(page.params.len(), count.params.len() + 2);
        assert!(count.text.starts_with("SELECT COUNT(*) AS total FROM"));
    }

    #[test]
    fn test_read_by_key() {
        let stmt = build_read(&users(), &[json!("7")]).unwrap();
        assert_eq!(
            stmt.text,
            "SELECT * FROM \"public\".\"users\" WHERE \"id\" = $1 LIMIT 1"
        );
        assert_eq!(stmt.params, vec![json!("7")]);
        assert_eq!(stmt.param_tags, vec![Some("int4".to_string())]);
    }

    #[test]
    fn test_read_composite_key_order() {
        let e = entity(
            "public",
            "user_roles",
            &[("user_id", "int4"), ("role_id", "int4")],
            &["user_id", "role_id"],
        );
        let stmt = build_read(&e, &[json!("1"), json!("2")]).unwrap();
        assert!(stmt.text.contains("\"user_id\" = $1 AND \"role_id\" = $2"));

        let err = build_read(&e, &[json!("1")]).unwrap_err();
        assert!(matches!(
            err,
            QueryError::KeyArityMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn test_insert_drops_unknown_keys() {
        let payload = json!({"name": "Alice", "shoe_size": 41})
            .as_object()
            .cloned()
            .unwrap();
        let stmt = build_insert(&users(), &payload).unwrap();
        assert_eq!(
            stmt.text,
            "INSERT INTO \"public\".\"users\" (\"name\") VALUES ($1) RETURNING *"
        );
        assert_eq!(stmt.params, vec![json!("Alice")]);
    }

    #[test]
    fn test_insert_empty_column_set() {
        let payload = json!({"shoe_size": 41}).as_object().cloned().unwrap();
        let err = build_insert(&users(), &payload).unwrap_err();
        assert!(matches!(err, QueryError::EmptyColumnSet));
    }

    fn posts() -> Entity {
        entity(
            "public",
            "posts",
            &[
                ("id", "int4"),
                ("title", "text"),
                ("updated_at", "timestamptz"),
                ("deleted_at", "timestamptz"),
            ],
            &["id"],
        )
    }

    #[test]
    fn test_insert_auto_updated_at() {
        let payload = json!({"title": "hello"}).as_object().cloned().unwrap();
        let stmt = build_insert(&posts(), &payload).unwrap();
        assert_eq!(
            stmt.text,
            "INSERT INTO \"public\".\"posts\" (\"title\", \"updated_at\") \
             VALUES ($1, NOW()) RETURNING *"
        );
        assert_eq!(stmt.params, vec![json!("hello")]);
    }

    #[test]
    fn test_insert_provided_updated_at_binds() {
        let payload = json!({"title": "hello", "updated_at": "2024-01-01T00:00:00Z"})
            .as_object()
            .cloned()
            .unwrap();
        let stmt = build_insert(&posts(), &payload).unwrap();
        assert!(!stmt.text.contains("NOW()"));
        assert_eq!(stmt.params.len(), 2);
    }

    #[test]
    fn test_bulk_insert_null_fill_and_touch() {
        let rows = vec![
            json!({"title": "a"}).as_object().cloned().unwrap(),
            json!({"title": "b", "id": 2, "updated_at": "2024-06-01T00:00:00Z"})
                .as_object()
                .cloned()
                .unwrap(),
        ];
        let stmt = build_insert_bulk(&posts(), &rows, limits()).unwrap();
        // Union of keys in declared order: id, title, updated_at.
        assert_eq!(
            stmt.text,
            "INSERT INTO \"public\".\"posts\" (\"id\", \"title\", \"updated_at\") VALUES \
             ($1, $2, NOW()), ($3, $4, $5) RETURNING *"
        );
        // Row 1 omits id -> NULL param; omits updated_at -> literal.
        assert_eq!(
            stmt.params,
            vec![
                Value::Null,
                json!("a"),
                json!(2),
                json!("b"),
                json!("2024-06-01T00:00:00Z"),
            ]
        );
    }

    #[test]
    fn test_bulk_insert_caps() {
        let row = json!({"title": "x"}).as_object().cloned().unwrap();
        assert!(matches!(
            build_insert_bulk(&posts(), &[], limits()).unwrap_err(),
            QueryError::EmptyRows
        ));
        let too_many = vec![row; 501];
        assert!(matches!(
            build_insert_bulk(&posts(), &too_many, limits()).unwrap_err(),
            QueryError::TooManyRows { max: 500 }
        ));
    }

    #[test]
    fn test_update_drops_pk_and_touches() {
        let payload = json!({"id": 9, "title": "new"}).as_object().cloned().unwrap();
        let stmt = build_update(&posts(), &payload, &[json!("5")]).unwrap();
        assert_eq!(
            stmt.text,
            "UPDATE \"public\".\"posts\" SET \"title\" = $1, \"updated_at\" = NOW() \
             WHERE \"id\" = $2 RETURNING *"
        );
        assert_eq!(stmt.params, vec![json!("new"), json!("5")]);
    }

    #[test]
    fn test_update_only_pk_is_empty_set() {
        let payload = json!({"id": 9}).as_object().cloned().unwrap();
        let err = build_update(&posts(), &payload, &[json!("5")]).unwrap_err();
        assert!(matches!(err, QueryError::EmptyColumnSet));
    }

    #[test]
    fn test_soft_delete() {
        // Both timestamp columns present: soft delete touches each.
        let del = build_delete(&posts(), &[json!("5")]).unwrap();
        assert!(del.soft);
        assert_eq!(
            del.statement.text,
            "UPDATE \"public\".\"posts\" SET \"deleted_at\" = NOW(), \"updated_at\" = NOW() \
             WHERE \"id\" = $1 RETURNING *"
        );
        assert_eq!(del.statement.params, vec![json!("5")]);
    }

    #[test]
    fn test_hard_delete() {
        let del = build_delete(&users(), &[json!("5")]).unwrap();
        assert!(!del.soft);
        assert_eq!(
            del.statement.text,
            "DELETE FROM \"public\".\"users\" WHERE \"id\" = $1 RETURNING *"
        );
    }

    #[test]
    fn test_injection_inputs_never_reach_text() {
        let nasty = [
            "Robert'); DROP TABLE users;--",
            "\" OR 1=1 --",
            "a;b",
            "50%_\\",
            "x\"y'z",
        ];
        for input in nasty {
            let mut params = list(&[("name", &format!("eq:{input}"))]);
            params.search = Some(input.to_string());
            let stmt = build_list(&users(), &params, limits()).unwrap();
            assert!(
                !stmt.text.contains(input),
                "input {input:?} leaked into SQL text: {}",
                stmt.text
            );
            assert!(stmt.params.iter().any(|v| v
                .as_str()
                .map(|s| s.contains(input) || s.contains(&escape_like(input)))
                .unwrap_or(false)));

            let payload = json!({"name": input}).as_object().cloned().unwrap();
            let ins = build_insert(&users(), &payload).unwrap();
            assert!(!ins.text.contains(input));
        }
    }
}
