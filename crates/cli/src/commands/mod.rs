pub mod cat;
pub mod ship;

use clap::Subcommand;
pub use cat::CatArgs;
pub use ship::ShipArgs;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read log lines from stdin and ship them in batches.
    ///
    /// Stops at end of input or on SIGINT/SIGTERM, after the last batch is
    /// uploaded.
    ///
    /// Example:
    ///   tail -F app.log | logship ship --bucket app-logs --gzip
    ///   logship ship --bucket audit --flush-size 500 --flush-interval PT30S < audit.log
    Ship(ShipArgs),

    /// Print the records inside a shipped object.
    ///
    /// Example:
    ///   logship cat ~/.local/share/logship/app-logs/logs/2024-05-01/120000.000-0
    ///   logship cat --format binary --pattern '%d{%H:%M:%S} %p %m' batch.bin
    Cat(CatArgs),
}
