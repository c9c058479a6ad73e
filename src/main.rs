mod cli;

use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::app::init_tracing();
    cli::app::run(Cli::parse()).await
}
