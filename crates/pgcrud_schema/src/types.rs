//! Mapping from Postgres type tags to portable JSON-compatible types.
//!
//! The gateway never interprets column values itself; the portable type is
//! what the documentation and tool schemas advertise, and what the dispatch
//! layer uses to coerce inbound values before binding.

use serde::{Deserialize, Serialize};

/// Format refinement for string-typed columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringFormat {
    Uuid,
    Date,
    DateTime,
    Time,
    /// Base64-encoded binary (`bytea`).
    Binary,
}

/// Portable value type derived from a Postgres type tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortableType {
    /// Signed integer with inclusive range bounds.
    Integer { min: i64, max: i64 },
    /// 64-bit floating point.
    Number,
    /// Arbitrary-precision decimal.
    Decimal,
    Boolean,
    /// Opaque structured value (`json` / `jsonb`); unconstrained.
    Json,
    String { format: Option<StringFormat> },
    Array(Box<PortableType>),
}

impl PortableType {
    /// JSON schema type name for this portable type.
    pub fn type_name(&self) -> &'static str {
        match self {
            PortableType::Integer { .. } => "integer",
            PortableType::Number | PortableType::Decimal => "number",
            PortableType::Boolean => "boolean",
            PortableType::Json => "object",
            PortableType::String { .. } => "string",
            PortableType::Array(_) => "array",
        }
    }

    /// Format tag advertised in emitted schemas, if any.
    pub fn format(&self) -> Option<StringFormat> {
        match self {
            PortableType::String { format } => *format,
            _ => None,
        }
    }

    /// Whether emitted document schemas should carry a nullability marker
    /// for a nullable column of this type. Opaque JSON values are already
    /// unconstrained.
    pub fn wants_nullability_marker(&self) -> bool {
        !matches!(self, PortableType::Json)
    }
}

/// Map a Postgres type tag (`udt_name`) to its portable type.
///
/// Total: tags beginning with `_` are arrays of the mapped base tag, and
/// anything unrecognized maps to plain string.
pub fn map_type_tag(tag: &str) -> PortableType {
    if let Some(base) = tag.strip_prefix('_') {
        return PortableType::Array(Box::new(map_type_tag(base)));
    }
    match tag {
        "int2" | "smallint" => PortableType::Integer {
            min: i16::MIN as i64,
            max: i16::MAX as i64,
        },
        "int4" | "integer" | "serial" => PortableType::Integer {
            min: i32::MIN as i64,
            max: i32::MAX as i64,
        },
        "int8" | "bigint" | "bigserial" | "oid" => PortableType::Integer {
            min: i64::MIN,
            max: i64::MAX,
        },
        "float4" | "float8" | "real" => PortableType::Number,
        "numeric" | "decimal" | "money" => PortableType::Decimal,
        "bool" | "boolean" => PortableType::Boolean,
        "json" | "jsonb" => PortableType::Json,
        "uuid" => PortableType::String {
            format: Some(StringFormat::Uuid),
        },
        "date" => PortableType::String {
            format: Some(StringFormat::Date),
        },
        "timestamp" | "timestamptz" => PortableType::String {
            format: Some(StringFormat::DateTime),
        },
        "time" | "timetz" => PortableType::String {
            format: Some(StringFormat::Time),
        },
        "bytea" => PortableType::String {
            format: Some(StringFormat::Binary),
        },
        _ => PortableType::String { format: None },
    }
}

/// Tags whose columns participate in full-text search by default.
pub fn is_textual_tag(tag: &str) -> bool {
    matches!(tag, "text" | "varchar" | "bpchar" | "char" | "name" | "citext")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_bounds() {
        assert_eq!(
            map_type_tag("int2"),
            PortableType::Integer {
                min: -32768,
                max: 32767
            }
        );
        assert_eq!(
            map_type_tag("int4"),
            PortableType::Integer {
                min: i32::MIN as i64,
                max: i32::MAX as i64
            }
        );
        assert_eq!(
            map_type_tag("int8"),
            PortableType::Integer {
                min: i64::MIN,
                max: i64::MAX
            }
        );
    }

    #[test]
    fn test_array_tags() {
        assert_eq!(
            map_type_tag("_int4"),
            PortableType::Array(Box::new(PortableType::Integer {
                min: i32::MIN as i64,
                max: i32::MAX as i64
            }))
        );
        assert_eq!(
            map_type_tag("_text"),
            PortableType::Array(Box::new(PortableType::String { format: None }))
        );
    }

    #[test]
    fn test_string_formats() {
        assert_eq!(map_type_tag("uuid").format(), Some(StringFormat::Uuid));
        assert_eq!(
            map_type_tag("timestamptz").format(),
            Some(StringFormat::DateTime)
        );
        assert_eq!(map_type_tag("bytea").format(), Some(StringFormat::Binary));
        assert_eq!(map_type_tag("text").format(), None);
    }

    #[test]
    fn test_unknown_tag_maps_to_string() {
        assert_eq!(
            map_type_tag("tsvector"),
            PortableType::String { format: None }
        );
        assert_eq!(
            map_type_tag("some_enum_type"),
            PortableType::String { format: None }
        );
    }

    #[test]
    fn test_json_skips_nullability_marker() {
        assert!(!map_type_tag("jsonb").wants_nullability_marker());
        assert!(map_type_tag("int4").wants_nullability_marker());
    }

    #[test]
    fn test_textual_tags() {
        assert!(is_textual_tag("text"));
        assert!(is_textual_tag("varchar"));
        assert!(!is_textual_tag("int4"));
        assert!(!is_textual_tag("uuid"));
    }
}
