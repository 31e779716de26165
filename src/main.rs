use anyhow::Result;
use clap::Parser;

mod audit;
mod auth;
mod cli;
mod config;
mod error;
mod flash;
mod handlers;
mod helpers;
mod logging;
mod router;
mod schemas;
mod templates;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init_logging(config::log_to_file());

    let cli = Cli::parse();
    cli.run().await?;

    Ok(())
}
