use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "heapscope",
    // Use the default attributes feature of clap to set the proper version at compile time
    version,
    about = "Ruby heap dump decoder and analysis CLI",
    long_about = "Decodes newline-delimited heap dumps into queryable indices and incremental diffs."
)]
pub struct HeapscopeCli {
    #[command(subcommand)]
    pub command: Commands,
}

impl HeapscopeCli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the class and string indices for a dump
    Index {
        /// Path to the heap dump file
        dump_path: PathBuf,

        /// Parse window budget in bytes
        #[arg(long, default_value_t = heap_dump::parser::DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Copy one generation onward of a dump into a smaller dump
    Filter {
        /// Dump to filter
        source: PathBuf,

        /// Where to write the filtered copy
        destination: PathBuf,

        /// Generation cutoff; untagged lines and lines below it are dropped
        #[arg(long)]
        since: u64,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Parse a heap address and print its integer value
    Address {
        /// Address string, e.g. 0x7f921e8b8190
        address: String,
    },
    /// Derive allocated/retained diffs for a profiling report directory
    Diff {
        /// Directory holding the dumps and generation.info
        report_directory: PathBuf,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}
