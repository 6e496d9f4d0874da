use clap::Parser;
use freshcve::Cli;
use freshcve::server::run_from_cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run_from_cli(Cli::parse()).await?;
    Ok(())
}
