use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use crate::args::Args;
use crate::commands::Command;
use crate::commands::TplcCommand;

/// Compile templates into cached artifacts.
#[derive(Parser, Debug)]
#[command(name = "tplc")]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: TplcCommand,

    #[command(flatten)]
    pub args: Args,
}

/// Parse CLI arguments and execute the chosen command
pub fn run(args: Vec<String>) -> Result<ExitCode> {
    let cli = Cli::try_parse_from(args).unwrap_or_else(|e| {
        e.exit();
    });

    crate::logging::init(&cli.args.global)?;

    let exit = cli.command.execute(&cli.args)?;
    Ok(exit.report())
}
