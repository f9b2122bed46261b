mod app;
mod cli;
mod config;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    sweep_logging::initialize(cli.log_destination(), cli.log_level());
    app::run(cli).await
}
