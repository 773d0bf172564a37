//! Row decoding: one `PgRow` into a JSON object, driven by each column's
//! reported type. Values the decoder does not understand become JSON null
//! rather than failing the whole response.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Number, Value};
use sqlx::postgres::PgRow;
use sqlx::types::BigDecimal;
use sqlx::{Column, Row, TypeInfo};
use tracing::debug;
use uuid::Uuid;

/// Decode a row into a JSON object keyed by column name.
pub fn row_to_json(row: &PgRow) -> Map<String, Value> {
    let mut out = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let name = column.name();
        let value = decode_column(row, column.ordinal(), column.type_info().name());
        out.insert(name.to_string(), value);
    }
    out
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "INT2" => opt_num(row.try_get::<Option<i16>, _>(index).map(|v| v.map(i64::from))),
        "INT4" => opt_num(row.try_get::<Option<i32>, _>(index).map(|v| v.map(i64::from))),
        "INT8" | "OID" => opt_num(row.try_get::<Option<i64>, _>(index)),
        "FLOAT4" => float(row.try_get::<Option<f32>, _>(index).map(|v| v.map(f64::from))),
        "FLOAT8" => float(row.try_get::<Option<f64>, _>(index)),
        "NUMERIC" => numeric(row.try_get::<Option<BigDecimal>, _>(index)),
        "BOOL" => match row.try_get::<Option<bool>, _>(index) {
            Ok(Some(v)) => Value::Bool(v),
            _ => Value::Null,
        },
        "UUID" => text(row.try_get::<Option<Uuid>, _>(index).map(|v| v.map(|u| u.to_string()))),
        "DATE" => text(
            row.try_get::<Option<NaiveDate>, _>(index)
                .map(|v| v.map(|d| d.format("%Y-%m-%d").to_string())),
        ),
        "TIME" => text(
            row.try_get::<Option<NaiveTime>, _>(index)
                .map(|v| v.map(|t| t.format("%H:%M:%S%.f").to_string())),
        ),
        "TIMESTAMP" => text(
            row.try_get::<Option<NaiveDateTime>, _>(index)
                .map(|v| v.map(|ts| ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        ),
        "TIMESTAMPTZ" => text(
            row.try_get::<Option<DateTime<Utc>>, _>(index)
                .map(|v| v.map(|ts| ts.to_rfc3339())),
        ),
        "JSON" | "JSONB" => match row.try_get::<Option<Value>, _>(index) {
            Ok(Some(v)) => v,
            _ => Value::Null,
        },
        "BYTEA" => text(
            row.try_get::<Option<Vec<u8>>, _>(index)
                .map(|v| v.map(|bytes| BASE64.encode(bytes))),
        ),
        "INT2[]" => int_array(row.try_get::<Option<Vec<i16>>, _>(index).map(to_i64s)),
        "INT4[]" => int_array(row.try_get::<Option<Vec<i32>>, _>(index).map(to_i64s)),
        "INT8[]" => int_array(row.try_get::<Option<Vec<i64>>, _>(index)),
        "FLOAT8[]" => match row.try_get::<Option<Vec<f64>>, _>(index) {
            Ok(Some(items)) => Value::Array(items.into_iter().map(float_value).collect()),
            _ => Value::Null,
        },
        "BOOL[]" => match row.try_get::<Option<Vec<bool>>, _>(index) {
            Ok(Some(items)) => Value::Array(items.into_iter().map(Value::Bool).collect()),
            _ => Value::Null,
        },
        "TEXT[]" | "VARCHAR[]" | "NAME[]" => match row.try_get::<Option<Vec<String>>, _>(index) {
            Ok(Some(items)) => Value::Array(items.into_iter().map(Value::String).collect()),
            _ => Value::Null,
        },
        // Text family and everything else that decodes as text.
        _ => match row.try_get::<Option<String>, _>(index) {
            Ok(value) => value.map(Value::String).unwrap_or(Value::Null),
            Err(err) => {
                debug!(%type_name, %err, "column type not decodable; emitting null");
                Value::Null
            }
        },
    }
}

fn opt_num(value: Result<Option<i64>, sqlx::Error>) -> Value {
    match value {
        Ok(Some(v)) => Value::Number(v.into()),
        _ => Value::Null,
    }
}

fn float(value: Result<Option<f64>, sqlx::Error>) -> Value {
    match value {
        Ok(Some(v)) => float_value(v),
        _ => Value::Null,
    }
}

fn text(value: Result<Option<String>, sqlx::Error>) -> Value {
    match value {
        Ok(Some(v)) => Value::String(v),
        _ => Value::Null,
    }
}

fn float_value(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

/// Render NUMERIC as a JSON number when the round-trip is lossless, as a
/// string otherwise.
fn numeric(value: Result<Option<BigDecimal>, sqlx::Error>) -> Value {
    match value {
        Ok(Some(decimal)) => {
            let text = decimal.to_string();
            match text.parse::<f64>() {
                Ok(float) if format_matches(&text, float) => float_value(float),
                _ => Value::String(text),
            }
        }
        _ => Value::Null,
    }
}

fn format_matches(text: &str, float: f64) -> bool {
    text.parse::<BigDecimal>()
        .ok()
        .zip(BigDecimal::try_from(float).ok())
        .map(|(a, b)| a == b)
        .unwrap_or(false)
}

fn to_i64s<T: Into<i64>>(value: Option<Vec<T>>) -> Option<Vec<i64>> {
    value.map(|items| items.into_iter().map(Into::into).collect())
}

fn int_array(value: Result<Option<Vec<i64>>, sqlx::Error>) -> Value {
    match value {
        Ok(Some(items)) => Value::Array(items.into_iter().map(|v| Value::Number(v.into())).collect()),
        _ => Value::Null,
    }
}
