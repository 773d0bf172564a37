//! Gateway configuration.
//!
//! One immutable record assembled from the environment at startup. All
//! components receive only the fields they need via explicit parameters;
//! there is no global mutable configuration.

use thiserror::Error;

/// Environment variable prefix for gateway options.
const ENV_PREFIX: &str = "PGCRUD_";

/// Cross-origin policy for the HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    Disabled,
    AllowAny,
    Origins(Vec<String>),
}

/// Startup configuration errors; all fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration invalid: {0} is required")]
    Missing(&'static str),

    #[error("configuration invalid: {name} has unusable value '{value}'")]
    Invalid { name: String, value: String },

    #[error("configuration invalid: {0}")]
    Inconsistent(String),
}

/// The immutable gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Writable database URL (primary pool).
    pub database_url: String,
    /// Optional read-only replica URL.
    pub read_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub include_namespaces: Vec<String>,
    pub exclude_namespaces: Vec<String>,
    /// Excluded tables as `namespace.table`.
    pub exclude_tables: Vec<String>,
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub max_bulk_rows: usize,
    pub max_body_bytes: usize,
    pub docs_enabled: bool,
    /// Master secret for token derivation; required when auth is enabled.
    pub master_secret: Option<String>,
    pub auth_enabled: bool,
    pub cors: CorsPolicy,
    pub expose_db_errors: bool,
    pub pool_size: u32,
    pub read_pool_size: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            read_url: None,
            host: "0.0.0.0".to_string(),
            port: 3000,
            include_namespaces: Vec::new(),
            exclude_namespaces: Vec::new(),
            exclude_tables: Vec::new(),
            default_page_size: 25,
            max_page_size: 100,
            max_bulk_rows: 500,
            max_body_bytes: 1024 * 1024,
            docs_enabled: true,
            master_secret: None,
            auth_enabled: false,
            cors: CorsPolicy::Disabled,
            expose_db_errors: false,
            pool_size: 10,
            read_pool_size: 10,
        }
    }
}

impl GatewayConfig {
    /// Assemble the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Assemble from an arbitrary lookup; `from_env` in tests without
    /// touching process state.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        config.database_url = strip_jdbc(&database_url);
        config.read_url = get("DATABASE_READ_URL").map(|url| strip_jdbc(&url));

        if let Some(host) = get_opt(&get, "HOST") {
            config.host = host;
        }
        if let Some(port) = get_opt(&get, "PORT") {
            config.port = parse(&port, "PORT")?;
        }

        config.include_namespaces = csv(get_opt(&get, "SCHEMA_INCLUDE"));
        config.exclude_namespaces = csv(get_opt(&get, "SCHEMA_EXCLUDE"));
        config.exclude_tables = csv(get_opt(&get, "TABLE_EXCLUDE"));

        if let Some(raw) = get_opt(&get, "DEFAULT_PAGE_SIZE") {
            config.default_page_size = parse(&raw, "DEFAULT_PAGE_SIZE")?;
        }
        if let Some(raw) = get_opt(&get, "MAX_PAGE_SIZE") {
            config.max_page_size = parse(&raw, "MAX_PAGE_SIZE")?;
        }
        if let Some(raw) = get_opt(&get, "MAX_BULK_ROWS") {
            config.max_bulk_rows = parse(&raw, "MAX_BULK_ROWS")?;
        }
        if let Some(raw) = get_opt(&get, "MAX_BODY_BYTES") {
            config.max_body_bytes = parse(&raw, "MAX_BODY_BYTES")?;
        }
        if let Some(raw) = get_opt(&get, "DOCS_ENABLED") {
            config.docs_enabled = parse_bool(&raw, "DOCS_ENABLED")?;
        }
        if let Some(raw) = get_opt(&get, "AUTH_ENABLED") {
            config.auth_enabled = parse_bool(&raw, "AUTH_ENABLED")?;
        }
        config.master_secret = get_opt(&get, "MASTER_SECRET").filter(|s| !s.is_empty());
        if let Some(raw) = get_opt(&get, "CORS_ORIGINS") {
            config.cors = parse_cors(&raw);
        }
        if let Some(raw) = get_opt(&get, "EXPOSE_DB_ERRORS") {
            config.expose_db_errors = parse_bool(&raw, "EXPOSE_DB_ERRORS")?;
        }
        if let Some(raw) = get_opt(&get, "POOL_SIZE") {
            config.pool_size = parse(&raw, "POOL_SIZE")?;
        }
        if let Some(raw) = get_opt(&get, "READ_POOL_SIZE") {
            config.read_pool_size = parse(&raw, "READ_POOL_SIZE")?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_enabled && self.master_secret.is_none() {
            return Err(ConfigError::Inconsistent(
                "PGCRUD_AUTH_ENABLED is set but PGCRUD_MASTER_SECRET is missing".into(),
            ));
        }
        if self.default_page_size < 1 || self.max_page_size < 1 {
            return Err(ConfigError::Inconsistent(
                "page sizes must be at least 1".into(),
            ));
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::Inconsistent(
                "PGCRUD_DEFAULT_PAGE_SIZE exceeds PGCRUD_MAX_PAGE_SIZE".into(),
            ));
        }
        Ok(())
    }
}

/// Read a prefixed gateway option.
fn get_opt(get: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    get(&format!("{ENV_PREFIX}{name}"))
}

/// JDBC-style URLs arrive with a `jdbc:` prefix that Postgres clients do
/// not understand; strip it.
fn strip_jdbc(url: &str) -> String {
    url.strip_prefix("jdbc:").unwrap_or(url).to_string()
}

fn csv(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

fn parse<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name: format!("{ENV_PREFIX}{name}"),
        value: raw.to_string(),
    })
}

fn parse_bool(raw: &str, name: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name: format!("{ENV_PREFIX}{name}"),
            value: raw.to_string(),
        }),
    }
}

fn parse_cors(raw: &str) -> CorsPolicy {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "off" => CorsPolicy::Disabled,
        "true" | "1" | "*" => CorsPolicy::AllowAny,
        _ => CorsPolicy::Origins(
            raw.split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_minimal_config() {
        let config =
            GatewayConfig::from_lookup(env(&[("DATABASE_URL", "postgres://localhost/app")]))
                .unwrap();
        assert_eq!(config.database_url, "postgres://localhost/app");
        assert_eq!(config.port, 3000);
        assert!(!config.auth_enabled);
    }

    #[test]
    fn test_database_url_required() {
        let err = GatewayConfig::from_lookup(env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_jdbc_prefix_stripped() {
        let config = GatewayConfig::from_lookup(env(&[
            ("DATABASE_URL", "jdbc:postgresql://db:5432/app"),
            ("DATABASE_READ_URL", "jdbc:postgresql://replica:5432/app"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "postgresql://db:5432/app");
        assert_eq!(
            config.read_url.as_deref(),
            Some("postgresql://replica:5432/app")
        );
    }

    #[test]
    fn test_auth_requires_secret() {
        let err = GatewayConfig::from_lookup(env(&[
            ("DATABASE_URL", "postgres://localhost/app"),
            ("PGCRUD_AUTH_ENABLED", "true"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Inconsistent(_)));

        let ok = GatewayConfig::from_lookup(env(&[
            ("DATABASE_URL", "postgres://localhost/app"),
            ("PGCRUD_AUTH_ENABLED", "true"),
            ("PGCRUD_MASTER_SECRET", "s3cret"),
        ]))
        .unwrap();
        assert!(ok.auth_enabled);
    }

    #[test]
    fn test_csv_lists() {
        let config = GatewayConfig::from_lookup(env(&[
            ("DATABASE_URL", "postgres://localhost/app"),
            ("PGCRUD_SCHEMA_INCLUDE", "public, reporting"),
            ("PGCRUD_TABLE_EXCLUDE", "public.migrations,"),
        ]))
        .unwrap();
        assert_eq!(config.include_namespaces, vec!["public", "reporting"]);
        assert_eq!(config.exclude_tables, vec!["public.migrations"]);
    }

    #[test]
    fn test_cors_parsing() {
        assert_eq!(parse_cors("true"), CorsPolicy::AllowAny);
        assert_eq!(parse_cors("false"), CorsPolicy::Disabled);
        assert_eq!(
            parse_cors("https://a.example, https://b.example"),
            CorsPolicy::Origins(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ])
        );
    }

    #[test]
    fn test_page_size_consistency() {
        let err = GatewayConfig::from_lookup(env(&[
            ("DATABASE_URL", "postgres://localhost/app"),
            ("PGCRUD_DEFAULT_PAGE_SIZE", "200"),
            ("PGCRUD_MAX_PAGE_SIZE", "100"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Inconsistent(_)));
    }
}
