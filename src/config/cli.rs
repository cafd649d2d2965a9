use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "counts-api")]
#[command(about = "Query records by creation date and total count")]
pub struct CliArgs {
    #[arg(long, short, help = "Path to the TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Listen port (overrides configuration and PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}
