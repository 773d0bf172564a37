//! Builder failures.
//!
//! Every variant here is a request-shape problem; the dispatch layer maps
//! them all to the validation-failed protocol status.

use thiserror::Error;

use crate::builder::MAX_IN_VALUES;

/// Errors raised while turning an intent into SQL.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// A filter, sort or search referenced a column the table does not have.
    #[error("unknown column '{column}'; known columns: {}", known.join(", "))]
    UnknownColumn { column: String, known: Vec<String> },

    /// An explicit column selection matched nothing.
    #[error("no requested column exists; known columns: {}", known.join(", "))]
    EmptySelection { known: Vec<String> },

    /// An `in` filter exceeded the list cap.
    #[error("'in' filter on '{column}' has too many values (limit {MAX_IN_VALUES})")]
    TooManyInValues { column: String },

    /// An `is` filter operand other than `null` / `notnull`.
    #[error("'is' filter on '{column}' expects null or notnull, got '{value}'")]
    InvalidIsOperand { column: String, value: String },

    /// A write payload contained no usable columns.
    #[error("payload contains no known columns")]
    EmptyColumnSet,

    /// Bulk create with an empty row list.
    #[error("bulk payload contains no rows")]
    EmptyRows,

    /// Bulk create above the configured row cap.
    #[error("bulk payload exceeds the row limit ({max})")]
    TooManyRows { max: usize },

    /// A by-key operation against a table without a primary key.
    #[error("table {table} has no primary key")]
    NoPrimaryKey { table: String },

    /// Wrong number of key values for the primary key.
    #[error("primary key expects {expected} value(s), got {got}")]
    KeyArityMismatch { expected: usize, got: usize },
}
