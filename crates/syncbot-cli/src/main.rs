mod bootstrap_helpers;
mod cli_args;
mod startup_config;

use anyhow::Result;
use clap::Parser;

use crate::bootstrap_helpers::{init_tracing, report_dotenv};
use crate::cli_args::Cli;
use crate::startup_config::build_runtime_config;

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    init_tracing();
    report_dotenv(dotenv);
    let cli = Cli::parse();
    let config = build_runtime_config(&cli)?;
    syncbot_runtime::run_sync_bot(config).await
}
