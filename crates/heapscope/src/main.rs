mod cli;
mod commands;

use anyhow::Result;

use crate::cli::{Commands, HeapscopeCli};

fn main() -> Result<()> {
    let cli = HeapscopeCli::parse_args();

    match cli.command {
        Commands::Index {
            dump_path,
            batch_size,
            verbose,
        } => {
            logging::init(verbose)?;
            commands::index::run(dump_path, batch_size)
        }
        Commands::Filter {
            source,
            destination,
            since,
            verbose,
        } => {
            logging::init(verbose)?;
            commands::filter::run(source, destination, since)
        }
        Commands::Address { address } => commands::address::run(&address),
        Commands::Diff {
            report_directory,
            verbose,
        } => {
            logging::init(verbose)?;
            commands::diff::run(report_directory)
        }
    }
}
