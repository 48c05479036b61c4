use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "edms",
    about = "EDMS: revision-tracked engineering data store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Parse a server configuration file and print the effective settings
    CheckConfig(CheckConfigArgs),
    /// Run an in-process finite-state scenario and print what the store derived
    Demo(DemoArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override the configured bind address
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    pub config: PathBuf,
}

#[derive(Args)]
pub struct DemoArgs {
    /// Possible states in the first list
    #[arg(long, default_value = "2")]
    pub states: usize,
    /// Possible states in a second list, combined with the first
    #[arg(long)]
    pub second: Option<usize>,
}
