//! Health probe and report.

use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;
use tracing::warn;

use crate::dispatch::Gateway;

/// Probe budget; a pool that cannot answer in time is unhealthy.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// The health endpoint body. Database details only appear for callers
/// holding a valid credential (or when auth is off).
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub build_git_hash: &'static str,
    pub build_timestamp: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Vec<String>>,
}

/// Probe the primary pool and build the report. Returns `false` when the
/// probe failed or timed out; the caller maps that to 503.
pub async fn check(gateway: &Gateway, include_details: bool) -> (bool, HealthReport) {
    let probe = timeout(
        PROBE_TIMEOUT,
        sqlx::query("SELECT 1").execute(gateway.primary_pool()),
    )
    .await;

    let healthy = match probe {
        Ok(Ok(_)) => true,
        Ok(Err(err)) => {
            warn!(%err, "health probe query failed");
            false
        }
        Err(_) => {
            warn!("health probe timed out");
            false
        }
    };

    let mut report = HealthReport {
        status: if healthy { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        build_git_hash: option_env!("PGCRUD_BUILD_GIT_HASH").unwrap_or("unknown"),
        build_timestamp: option_env!("PGCRUD_BUILD_TIMESTAMP").unwrap_or("unknown"),
        database_hash: None,
        tables: None,
        namespaces: None,
    };

    if include_details {
        let model = gateway.model();
        report.database_hash = Some(model.digest());
        report.tables = Some(model.len());
        report.namespaces = Some(model.namespaces().to_vec());
    }

    (healthy, report)
}
