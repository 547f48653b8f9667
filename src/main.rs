use clap::Parser;
use tainha::{cli::Cli, run};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    run(Cli::parse()).await
}
