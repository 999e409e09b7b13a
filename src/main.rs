mod auth;
mod cli;
mod config;
mod error;
mod git;
mod gitlab;
mod render;
mod report;
mod status;
mod watch;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::init();

    let cli = Cli::parse();
    Ok(cli.execute().await?)
}
