//! pgcrud: zero-configuration Postgres CRUD and agent gateway.

mod cli;

use anyhow::Result;
use clap::Parser;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);
    cli.run().await
}
