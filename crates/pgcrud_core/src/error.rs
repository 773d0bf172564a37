//! The gateway error taxonomy.
//!
//! Errors are taxonomic kinds with a fixed protocol status, not transport
//! objects. The single transport mapping happens at the dispatch boundary;
//! everything below it propagates `GatewayError` with `?`.

use serde_json::{json, Value};
use thiserror::Error;

use pgcrud_query::QueryError;

/// Classification of a native database error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbViolation {
    Unique,
    ForeignKey,
    NotNull,
    InvalidValue,
    Unknown,
}

/// Request-time errors, each with a fixed protocol status.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Fatal at startup: bad URL, unreachable database, or a filtered-away
    /// model. Never produced once the gateway is serving.
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),

    /// Missing or invalid credential on a non-public path.
    #[error("{0}")]
    Unauthenticated(String),

    /// Credential valid but lacks the access mode on the namespace.
    #[error("{0}")]
    PermissionDenied(String),

    /// Unknown route segment, or no row matched the key.
    #[error("{0}")]
    NotFound(String),

    /// Request-shape or SQL-build failure.
    #[error("{message}")]
    ValidationFailed {
        message: String,
        /// Supporting context, e.g. the known column list.
        details: Vec<String>,
    },

    /// A native database error, classified by SQLSTATE.
    #[error("{message}")]
    Database {
        violation: DbViolation,
        message: String,
        detail: Option<String>,
        constraint: Option<String>,
    },

    /// Anything unexpected.
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::ValidationFailed {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        GatewayError::NotFound(message.into())
    }

    /// Short kind label carried in the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::ConfigurationInvalid(_) => "configuration_invalid",
            GatewayError::Unauthenticated(_) => "unauthenticated",
            GatewayError::PermissionDenied(_) => "permission_denied",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::ValidationFailed { .. } => "validation_failed",
            GatewayError::Database { violation, .. } => match violation {
                DbViolation::Unique => "unique_violation",
                DbViolation::ForeignKey => "foreign_key_violation",
                DbViolation::NotNull => "null_violation",
                DbViolation::InvalidValue => "invalid_value",
                DbViolation::Unknown => "database_error",
            },
            GatewayError::Internal(_) => "internal_error",
        }
    }

    /// Fixed protocol status for the kind.
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::ConfigurationInvalid(_) => 500,
            GatewayError::Unauthenticated(_) => 401,
            GatewayError::PermissionDenied(_) => 403,
            GatewayError::NotFound(_) => 404,
            GatewayError::ValidationFailed { .. } => 400,
            GatewayError::Database { violation, .. } => match violation {
                DbViolation::Unique => 409,
                DbViolation::ForeignKey | DbViolation::NotNull | DbViolation::InvalidValue => 400,
                DbViolation::Unknown => 500,
            },
            GatewayError::Internal(_) => 500,
        }
    }

    /// The serialized error envelope.
    ///
    /// Native detail and constraint are only exposed when the configuration
    /// opts in.
    pub fn body(&self, expose_db_errors: bool) -> Value {
        let mut body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        if let GatewayError::ValidationFailed { details, .. } = self {
            if !details.is_empty() {
                body["details"] = json!(details);
            }
        }
        if expose_db_errors {
            if let GatewayError::Database {
                detail, constraint, ..
            } = self
            {
                if let Some(detail) = detail {
                    body["detail"] = json!(detail);
                }
                if let Some(constraint) = constraint {
                    body["constraint"] = json!(constraint);
                }
            }
        }
        body
    }
}

impl From<QueryError> for GatewayError {
    fn from(err: QueryError) -> Self {
        let details = match &err {
            QueryError::UnknownColumn { known, .. } | QueryError::EmptySelection { known } => {
                known.clone()
            }
            _ => Vec::new(),
        };
        GatewayError::ValidationFailed {
            message: err.to_string(),
            details,
        }
    }
}
