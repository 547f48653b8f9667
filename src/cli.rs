use std::path::PathBuf;

use clap::Parser;

use crate::constants::defaults;

#[derive(Debug, Parser)]
#[command(name = "tainha", about = "API gateway with response enrichment", version)]
pub struct Cli {
    /// Path to the gateway configuration file
    #[arg(long, default_value = defaults::CONFIG_PATH)]
    pub config: PathBuf,

    /// Address to listen on; defaults to 0.0.0.0:<port> from the configuration
    #[arg(long)]
    pub addr: Option<String>,
}
