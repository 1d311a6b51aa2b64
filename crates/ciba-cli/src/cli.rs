use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Cibascreen CLI - Drives an automated quantum-chemistry screening campaign: structure generation, per-structure pipeline jobs, and dataset extraction.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to the campaign configuration file in TOML format
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Enumerate every substituted structure into the structure store.
    Generate,
    /// Run the full calculation pipeline for one stored structure.
    ///
    /// Exits without doing any work when the structure's success archive
    /// already exists, so re-submitting a finished index is harmless.
    Run {
        /// Index of the structure to screen
        #[arg(value_name = "INDEX")]
        index: u32,
    },
    /// Extract computed properties from the accumulated success archives.
    Extract,
}
