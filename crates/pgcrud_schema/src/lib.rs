//! Schema model for the pgcrud gateway.
//!
//! This crate owns everything the gateway knows about the database: the
//! in-memory model of tables, columns, keys and foreign keys, the mapping
//! from Postgres type tags to portable JSON types, and the catalog
//! introspection that builds the model at startup.
//!
//! The model is built exactly once (see [`introspect::introspect`]) and is
//! immutable for the life of the process. Request handlers receive it by
//! shared reference and never rebuild it.

mod digest;
mod error;
pub mod ident;
mod introspect;
mod model;
mod types;

pub use error::SchemaError;
pub use ident::{quote_ident, route_segment, ROUTE_SEPARATOR};
pub use introspect::{introspect, IntrospectOptions};
pub use model::{Column, Entity, ForeignKey, SchemaModel, SOFT_DELETE_COLUMN, TOUCH_COLUMN};
pub use types::{map_type_tag, PortableType, StringFormat};

/// Schema operation result type.
pub type Result<T> = std::result::Result<T, SchemaError>;
