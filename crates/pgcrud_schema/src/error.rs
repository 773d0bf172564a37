//! Error types for schema introspection and model assembly.

use thiserror::Error;

/// Schema-layer errors. All of these are fatal at startup; once the model
/// is assembled it never fails.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A catalog query failed.
    #[error("catalog query failed: {0}")]
    Catalog(#[from] sqlx::Error),

    /// Configuration left nothing to serve (e.g. every namespace filtered).
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),

    /// Two entities derived the same route segment.
    #[error("route segment '{segment}' is claimed by both {first} and {second}")]
    DuplicateRoute {
        segment: String,
        first: String,
        second: String,
    },

    /// The assembled model violated a structural invariant.
    #[error("schema model invalid: {0}")]
    ModelInvalid(String),
}
