//! Connection pool construction.
//!
//! Both pools carry a mandatory 30 second statement timeout; a statement
//! that outlives a cancelled request runs at most to that timeout.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use crate::error::GatewayError;
use crate::Result;

/// Server-side statement timeout applied to every pooled connection.
const STATEMENT_TIMEOUT_MS: u64 = 30_000;

/// Time to wait for a pooled connection before giving up.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Open a pool against `url` with at most `size` connections.
///
/// A URL that does not parse or a database that cannot be reached is a
/// configuration problem, fatal at startup.
pub async fn connect(url: &str, size: u32) -> Result<PgPool> {
    let options = PgConnectOptions::from_str(url)
        .map_err(|err| GatewayError::ConfigurationInvalid(format!("invalid database URL: {err}")))?
        .options([("statement_timeout", STATEMENT_TIMEOUT_MS.to_string().as_str())]);

    let pool = PgPoolOptions::new()
        .max_connections(size)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await
        .map_err(|err| {
            GatewayError::ConfigurationInvalid(format!("database unreachable: {err}"))
        })?;

    info!(max_connections = size, "connection pool ready");
    Ok(pool)
}
