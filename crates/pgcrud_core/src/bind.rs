//! Parameter coercion and binding.
//!
//! The builder emits JSON values tagged with the type of the column each
//! parameter targets. Postgres's extended protocol is typed, so values are
//! coerced to the column's native type here before binding; a value that
//! cannot be coerced fails validation without reaching the database.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::types::BigDecimal;
use sqlx::Postgres;
use uuid::Uuid;

use pgcrud_query::SqlStatement;

use crate::error::GatewayError;
use crate::Result;

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// A value coerced to the native type it will bind as.
#[derive(Debug, Clone)]
pub enum BindValue {
    NullText,
    NullI64,
    NullF64,
    NullDecimal,
    NullBool,
    NullUuid,
    NullDate,
    NullTime,
    NullTimestamp,
    NullTimestampTz,
    NullBytes,
    NullJson,
    I64(i64),
    F64(f64),
    Decimal(BigDecimal),
    Bool(bool),
    Text(String),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Bytes(Vec<u8>),
    Json(Value),
    I64Array(Vec<i64>),
    F64Array(Vec<f64>),
    BoolArray(Vec<bool>),
    TextArray(Vec<String>),
}

/// Prepare a statement's query with every parameter coerced and bound.
pub fn prepare<'q>(statement: &'q SqlStatement) -> Result<PgQuery<'q>> {
    let mut query = sqlx::query(&statement.text);
    for (value, tag) in statement.params.iter().zip(&statement.param_tags) {
        let coerced = coerce(value, tag.as_deref())?;
        query = bind(query, coerced);
    }
    Ok(query)
}

fn bind(query: PgQuery<'_>, value: BindValue) -> PgQuery<'_> {
    match value {
        BindValue::NullText => query.bind(None::<String>),
        BindValue::NullI64 => query.bind(None::<i64>),
        BindValue::NullF64 => query.bind(None::<f64>),
        BindValue::NullDecimal => query.bind(None::<BigDecimal>),
        BindValue::NullBool => query.bind(None::<bool>),
        BindValue::NullUuid => query.bind(None::<Uuid>),
        BindValue::NullDate => query.bind(None::<NaiveDate>),
        BindValue::NullTime => query.bind(None::<NaiveTime>),
        BindValue::NullTimestamp => query.bind(None::<NaiveDateTime>),
        BindValue::NullTimestampTz => query.bind(None::<DateTime<Utc>>),
        BindValue::NullBytes => query.bind(None::<Vec<u8>>),
        BindValue::NullJson => query.bind(None::<Value>),
        BindValue::I64(v) => query.bind(v),
        BindValue::F64(v) => query.bind(v),
        BindValue::Decimal(v) => query.bind(v),
        BindValue::Bool(v) => query.bind(v),
        BindValue::Text(v) => query.bind(v),
        BindValue::Uuid(v) => query.bind(v),
        BindValue::Date(v) => query.bind(v),
        BindValue::Time(v) => query.bind(v),
        BindValue::Timestamp(v) => query.bind(v),
        BindValue::TimestampTz(v) => query.bind(v),
        BindValue::Bytes(v) => query.bind(v),
        BindValue::Json(v) => query.bind(v),
        BindValue::I64Array(v) => query.bind(v),
        BindValue::F64Array(v) => query.bind(v),
        BindValue::BoolArray(v) => query.bind(v),
        BindValue::TextArray(v) => query.bind(v),
    }
}

/// Coerce one JSON value to the bind type of the tagged column.
///
/// Untagged parameters (LIMIT, OFFSET, search patterns) bind by their JSON
/// type.
pub fn coerce(value: &Value, tag: Option<&str>) -> Result<BindValue> {
    let Some(tag) = tag else {
        return coerce_untagged(value);
    };

    if value.is_null() {
        return Ok(null_for(tag));
    }

    match tag {
        "int2" | "int4" | "int8" | "smallint" | "integer" | "bigint" | "oid" => {
            match value {
                Value::Number(n) if n.is_i64() => Ok(BindValue::I64(n.as_i64().unwrap_or(0))),
                Value::String(s) => s
                    .trim()
                    .parse()
                    .map(BindValue::I64)
                    .map_err(|_| bad_value(tag, value)),
                _ => Err(bad_value(tag, value)),
            }
        }
        "float4" | "float8" | "real" => match value {
            Value::Number(n) => n
                .as_f64()
                .map(BindValue::F64)
                .ok_or_else(|| bad_value(tag, value)),
            Value::String(s) => s
                .trim()
                .parse()
                .map(BindValue::F64)
                .map_err(|_| bad_value(tag, value)),
            _ => Err(bad_value(tag, value)),
        },
        "numeric" | "decimal" | "money" => {
            let text = match value {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.trim().to_string(),
                _ => return Err(bad_value(tag, value)),
            };
            text.parse()
                .map(BindValue::Decimal)
                .map_err(|_| bad_value(tag, value))
        }
        "bool" | "boolean" => match value {
            Value::Bool(b) => Ok(BindValue::Bool(*b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Ok(BindValue::Bool(true)),
                "false" | "f" | "0" => Ok(BindValue::Bool(false)),
                _ => Err(bad_value(tag, value)),
            },
            _ => Err(bad_value(tag, value)),
        },
        "uuid" => match value {
            Value::String(s) => Uuid::parse_str(s.trim())
                .map(BindValue::Uuid)
                .map_err(|_| bad_value(tag, value)),
            _ => Err(bad_value(tag, value)),
        },
        "date" => match value {
            Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(BindValue::Date)
                .map_err(|_| bad_value(tag, value)),
            _ => Err(bad_value(tag, value)),
        },
        "time" | "timetz" => match value {
            Value::String(s) => parse_time(s.trim())
                .map(BindValue::Time)
                .ok_or_else(|| bad_value(tag, value)),
            _ => Err(bad_value(tag, value)),
        },
        "timestamp" => match value {
            Value::String(s) => parse_timestamp(s.trim())
                .map(BindValue::Timestamp)
                .ok_or_else(|| bad_value(tag, value)),
            _ => Err(bad_value(tag, value)),
        },
        "timestamptz" => match value {
            Value::String(s) => parse_timestamptz(s.trim())
                .map(BindValue::TimestampTz)
                .ok_or_else(|| bad_value(tag, value)),
            _ => Err(bad_value(tag, value)),
        },
        "bytea" => match value {
            Value::String(s) => BASE64
                .decode(s.trim())
                .map(BindValue::Bytes)
                .map_err(|_| bad_value(tag, value)),
            _ => Err(bad_value(tag, value)),
        },
        "json" | "jsonb" => Ok(BindValue::Json(value.clone())),
        _ if tag.starts_with('_') => coerce_array(&tag[1..], value),
        // Text and every unrecognized scalar tag binds as text.
        _ => Ok(BindValue::Text(stringify(value))),
    }
}

fn coerce_untagged(value: &Value) -> Result<BindValue> {
    match value {
        Value::Null => Ok(BindValue::NullText),
        Value::Bool(b) => Ok(BindValue::Bool(*b)),
        Value::Number(n) if n.is_i64() => Ok(BindValue::I64(n.as_i64().unwrap_or(0))),
        Value::Number(n) => n
            .as_f64()
            .map(BindValue::F64)
            .ok_or_else(|| bad_value("number", value)),
        Value::String(s) => Ok(BindValue::Text(s.clone())),
        other => Ok(BindValue::Json(other.clone())),
    }
}

fn coerce_array(base_tag: &str, value: &Value) -> Result<BindValue> {
    let Value::Array(items) = value else {
        return Err(bad_value(base_tag, value));
    };
    match base_tag {
        "int2" | "int4" | "int8" => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match coerce(item, Some("int8"))? {
                    BindValue::I64(v) => out.push(v),
                    _ => return Err(bad_value(base_tag, item)),
                }
            }
            Ok(BindValue::I64Array(out))
        }
        "float4" | "float8" | "numeric" => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match coerce(item, Some("float8"))? {
                    BindValue::F64(v) => out.push(v),
                    _ => return Err(bad_value(base_tag, item)),
                }
            }
            Ok(BindValue::F64Array(out))
        }
        "bool" => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match coerce(item, Some("bool"))? {
                    BindValue::Bool(v) => out.push(v),
                    _ => return Err(bad_value(base_tag, item)),
                }
            }
            Ok(BindValue::BoolArray(out))
        }
        _ => Ok(BindValue::TextArray(
            items.iter().map(stringify).collect(),
        )),
    }
}

fn null_for(tag: &str) -> BindValue {
    match tag {
        "int2" | "int4" | "int8" | "smallint" | "integer" | "bigint" | "oid" => BindValue::NullI64,
        "float4" | "float8" | "real" => BindValue::NullF64,
        "numeric" | "decimal" | "money" => BindValue::NullDecimal,
        "bool" | "boolean" => BindValue::NullBool,
        "uuid" => BindValue::NullUuid,
        "date" => BindValue::NullDate,
        "time" | "timetz" => BindValue::NullTime,
        "timestamp" => BindValue::NullTimestamp,
        "timestamptz" => BindValue::NullTimestampTz,
        "bytea" => BindValue::NullBytes,
        "json" | "jsonb" => BindValue::NullJson,
        _ => BindValue::NullText,
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| parse_timestamptz(raw).map(|dt| dt.naive_utc()))
}

fn parse_timestamptz(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn bad_value(tag: &str, value: &Value) -> GatewayError {
    GatewayError::validation(format!("value {value} is not valid for a {tag} column"))
}
