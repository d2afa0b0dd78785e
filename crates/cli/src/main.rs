use std::process::ExitCode;

use clap::Parser;

mod commands;

use commands::Command;
use logship_runtime::logging;

#[derive(Debug, Parser)]
#[command(
    name = "logship",
    version,
    about = "Batch log lines and ship them to an object store",
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let installed = match &cli.command {
        Command::Ship(args) if args.debug => logging::init_with_level(log::Level::Debug),
        _ => logging::init(),
    };
    installed.ok();

    match cli.command {
        Command::Ship(args) => commands::ship::run(args),
        Command::Cat(args) => commands::cat::run(args),
    }
}
