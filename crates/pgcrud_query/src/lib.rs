//! SQL generation for the pgcrud gateway.
//!
//! Pure functions from the schema model and a validated request intent to
//! parameterized SQL. Nothing in this crate performs I/O, and no value of
//! request origin is ever concatenated into SQL text: identifiers are
//! quoted through `pgcrud_schema::ident` and every untrusted value becomes
//! a positional parameter.

mod builder;
mod error;
mod filter;
mod intent;

pub use builder::{
    build_count, build_delete, build_insert, build_insert_bulk, build_list, build_read,
    build_update, BuilderLimits, DeleteStatement, SqlStatement, MAX_IN_VALUES,
};
pub use error::QueryError;
pub use filter::{parse_filter, FilterOp};
pub use intent::{ListParams, SortOrder, WritePayload};

/// Query-builder result type.
pub type Result<T> = std::result::Result<T, QueryError>;
