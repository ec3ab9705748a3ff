mod compile;

use anyhow::Result;
use clap::Subcommand;

use crate::args::Args;
use crate::exit::Exit;

pub trait Command {
    fn execute(&self, args: &Args) -> Result<Exit>;
}

#[derive(Debug, Subcommand)]
pub enum TplcCommand {
    /// Compile templates into the artifact cache
    Compile(self::compile::Compile),
}

impl Command for TplcCommand {
    fn execute(&self, args: &Args) -> Result<Exit> {
        match self {
            TplcCommand::Compile(cmd) => cmd.execute(args),
        }
    }
}
