//! Command-line interface definition using clap.
//!
//! [`Args`] holds the global flags and one [`Command`]. Everything the
//! commands do lives in the library; the binary only wires arguments to it.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::format::OutputFormat;

/// Extract entities, correlation and categories from decoded messages, and
/// map spreadsheet columns onto configured templates.
#[derive(Parser, Debug, Clone)]
#[command(name = "mailsift")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    mailsift analyze inbox/message.json
    mailsift analyze inbox/*.json --jsonl -o analyses.jsonl
    mailsift patterns inbox/
    mailsift entities \"Call 555-123-4567 about the $10,000 invoice\"
    mailsift ingest data/group1.csv --config config/ -o out/group1.csv
    mailsift batch data/ --config config/ --report batch.json
    mailsift route data/a.csv data/special.csv --config config/
    mailsift templates --config config/")]
pub struct Args {
    /// Increase log detail on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Analyze message files (one message object or an array per file)
    Analyze {
        /// Message JSON files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// One analysis per line
        #[arg(long)]
        jsonl: bool,
    },

    /// Aggregate category, sender and entity statistics over a folder
    Patterns {
        /// Directory of message JSON files
        dir: PathBuf,
    },

    /// Extract entities from a piece of text
    Entities {
        text: String,

        /// Also print the patterns in use
        #[arg(long)]
        show_patterns: bool,
    },

    /// Map a CSV file onto a template
    Ingest {
        /// Input CSV file
        input: PathBuf,

        /// Directory holding templates_config.json and file_mappings.json
        #[arg(short, long, value_name = "DIR")]
        config: PathBuf,

        /// Use this template instead of routing
        #[arg(short, long, value_name = "ID")]
        template: Option<String>,

        /// Output file (default: <output folder>/<stem><suffix>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (default: from the output extension, else csv)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Write the mapping report as JSON
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// Route and map every CSV file given, or found under given directories
    Batch {
        /// CSV files or directories to scan
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory holding templates_config.json and file_mappings.json
        #[arg(short, long, value_name = "DIR")]
        config: PathBuf,

        /// Output format for every mapped table (default: csv)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Write the per-file summary as JSON
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// Show which template each path routes to
    Route {
        #[arg(required = true)]
        paths: Vec<String>,

        #[arg(short, long, value_name = "DIR")]
        config: PathBuf,
    },

    /// Validate the configuration and list templates
    Templates {
        #[arg(short, long, value_name = "DIR")]
        config: PathBuf,
    },
}

impl Args {
    /// Default log filter for the verbosity count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
