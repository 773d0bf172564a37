//! Command-line interface: `serve` and `generate-key`.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pgcrud_auth::{mint_token, Access};
use pgcrud_core::{Gateway, GatewayConfig};

const DEFAULT_LOG_FILTER: &str = "pgcrud=info,pgcrud_core=info,pgcrud_schema=info,pgcrud_mcp=info";

/// Initialize tracing on stderr; `RUST_LOG` overrides the default filter.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug, Parser)]
#[command(name = "pgcrud", version, about = "Expose a Postgres database as REST and MCP")]
pub struct Cli {
    /// Verbose logging (debug level).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Introspect the database and serve the gateway.
    Serve,

    /// Mint an API token signed by the master secret.
    GenerateKey {
        /// Token label, `[A-Za-z0-9_-]+`.
        #[arg(long)]
        label: String,

        /// Scoped claims as `namespace=access` pairs (access: r, w, rw),
        /// comma-separated. Use `*` as the namespace for a fallback entry.
        /// Omit entirely for a full-access token.
        #[arg(long)]
        claims: Option<String>,

        /// Master secret; defaults to PGCRUD_MASTER_SECRET.
        #[arg(long, env = "PGCRUD_MASTER_SECRET", hide_env_values = true)]
        secret: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Serve => serve().await,
            Command::GenerateKey {
                label,
                claims,
                secret,
            } => generate_key(&label, claims.as_deref(), &secret),
        }
    }
}

async fn serve() -> Result<()> {
    let config = GatewayConfig::from_env().context("configuration")?;
    let gateway = Gateway::connect(config)
        .await
        .context("startup introspection")?;
    pgcrud_server::serve(gateway).await.context("server")?;
    Ok(())
}

fn generate_key(label: &str, claims: Option<&str>, secret: &str) -> Result<()> {
    let parsed = claims.map(parse_claims).transpose()?;
    let token = mint_token(secret, label, parsed.as_ref()).context("minting token")?;
    println!("{token}");
    Ok(())
}

/// Parse `public=rw,reporting=r,*=r` into a claims map.
fn parse_claims(raw: &str) -> Result<BTreeMap<String, Access>> {
    let mut grants = BTreeMap::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let Some((namespace, access)) = entry.split_once('=') else {
            bail!("claim '{entry}' is not namespace=access");
        };
        let Some(access) = Access::parse(access.trim()) else {
            bail!("claim '{entry}' has unknown access '{access}' (use r, w or rw)");
        };
        grants.insert(namespace.trim().to_string(), access);
    }
    if grants.is_empty() {
        bail!("--claims was given but contained no entries");
    }
    Ok(grants)
}
