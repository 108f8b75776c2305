use std::io::Write;

use clap::{Parser, Subcommand};

use crate::config_cmd::{CheckConfigArgs, PrintConfigArgs, run_check_config, run_print_config};
use crate::error::Result;
use crate::logging::{self, LogFormat};
use crate::session::{RunArgs, run_session};

#[derive(Debug, Parser)]
#[command(
    name = "skylens",
    about = "Headless runner for the skylens adaptive field engine",
    version
)]
pub struct Cli {
    /// Write log events to stderr as JSON.
    #[arg(long = "log-json", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a session for a fixed number of ticks and print JSON.
    Run(RunArgs),

    /// Print the default configuration.
    #[command(name = "print-config")]
    PrintConfig(PrintConfigArgs),

    /// Load a config file and print the sanitized values.
    #[command(name = "check-config")]
    CheckConfig(CheckConfigArgs),
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    logging::init(if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    })?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(cli, &mut out)
}

pub fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run_session(&args, out).map(|_| ()),
        Commands::PrintConfig(args) => run_print_config(&args, out),
        Commands::CheckConfig(args) => run_check_config(&args, out).map(|_| ()),
    }
}
