//! Native database error classification.
//!
//! SQLSTATE class 23 covers integrity violations, class 22 covers data
//! exceptions; everything else is unknown and surfaces as an internal
//! error.

use sqlx::postgres::PgDatabaseError;

use crate::error::{DbViolation, GatewayError};

/// Classify an execution-time `sqlx` error into the gateway taxonomy.
pub fn classify(err: sqlx::Error) -> GatewayError {
    match err {
        sqlx::Error::Database(db) => match db.try_downcast_ref::<PgDatabaseError>() {
            Some(pg) => classify_database(pg),
            None => GatewayError::Internal(format!("database request failed: {}", db.message())),
        },
        other => GatewayError::Internal(format!("database request failed: {other}")),
    }
}

fn classify_database(err: &PgDatabaseError) -> GatewayError {
    let code = err.code();
    let violation = match code {
        "23505" => DbViolation::Unique,
        "23503" => DbViolation::ForeignKey,
        "23502" => DbViolation::NotNull,
        _ if code.starts_with("22") => DbViolation::InvalidValue,
        _ => DbViolation::Unknown,
    };

    GatewayError::Database {
        violation,
        message: err.message().to_string(),
        detail: err.detail().map(str::to_string),
        constraint: err.constraint().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_internal() {
        let err = classify(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, GatewayError::Internal(_)));
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn test_violation_statuses() {
        // The SQLSTATE table drives the protocol status.
        let cases = [
            (DbViolation::Unique, 409),
            (DbViolation::ForeignKey, 400),
            (DbViolation::NotNull, 400),
            (DbViolation::InvalidValue, 400),
            (DbViolation::Unknown, 500),
        ];
        for (violation, status) in cases {
            let err = GatewayError::Database {
                violation,
                message: "x".into(),
                detail: None,
                constraint: None,
            };
            assert_eq!(err.status(), status, "{violation:?}");
        }
    }
}
