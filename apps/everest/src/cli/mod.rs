//! # EVEREST CLI Module
//!
//! This module implements the command line interface for EVEREST.
//!
//! ## Available Commands
//!
//! - `info` - Show version, data directory and cadences
//! - `index validate` - Check a search index for integrity violations
//! - `index search` - Ranked search over a search index
//! - `index stats` - Table sizes and checksums of a search index
//! - `index convert` - Convert a search index between formats
//! - `index build` - Build a search index from a JSON manifest
//! - `dvs` - Render a data validation summary page
//! - `detrend` - De-trend a target from a raw data file, optionally saving its products

mod commands;

use clap::{Parser, Subcommand};
use everest_core::{Config, EverestError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// EVEREST - EPIC Variability Extraction and Removal for Exoplanet Science Targets
///
/// Light curve containers, data validation summaries and the documentation
/// search index of the everest3 package.
#[derive(Parser, Debug)]
#[command(name = "everest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version, data directory and cadences
    Info,

    /// Work with documentation search indexes
    Index {
        #[command(subcommand)]
        action: IndexCommand,
    },

    /// Render a data validation summary page
    Dvs {
        /// Output SVG file
        #[arg(short, long)]
        output: PathBuf,

        /// Layout file (22x12 whitespace-separated cell numbers)
        #[arg(short, long)]
        layout: Option<PathBuf>,

        /// Label each cell with its number
        #[arg(long)]
        labels: bool,

        /// Raw data file of a target whose light curves fill the page
        #[arg(short, long)]
        target: Option<PathBuf>,

        /// Mission the target belongs to
        #[arg(short, long, default_value = "k2")]
        mission: String,
    },

    /// De-trend a target from a raw data file
    Detrend {
        /// Raw data file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Mission the target belongs to
        #[arg(short, long, default_value = "k2")]
        mission: String,

        /// Write the DVS page and a run log into the target directory
        #[arg(long)]
        save: bool,
    },
}

/// Search index subcommands.
#[derive(Subcommand, Debug)]
pub enum IndexCommand {
    /// Check structural integrity; fails when a fatal violation is found
    Validate {
        /// Index file (.js, .json or .evx)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Ranked search
    Search {
        /// Index file (.js, .json or .evx)
        #[arg(short, long)]
        input: PathBuf,

        /// Maximum number of results
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Search words; prefix a word with '-' to exclude it
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        query: Vec<String>,
    },

    /// Show table sizes and checksums
    Stats {
        /// Index file (.js, .json or .evx)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Convert between formats
    Convert {
        /// Input index file
        #[arg(short, long)]
        input: PathBuf,

        /// Output index file
        #[arg(short, long)]
        output: PathBuf,

        /// Output format (js, json, binary); defaults to the output extension
        #[arg(short = 't', long)]
        format: Option<String>,
    },

    /// Build an index from a JSON manifest of documents and objects
    Build {
        /// Manifest file
        #[arg(short, long)]
        manifest: PathBuf,

        /// Output index file
        #[arg(short, long)]
        output: PathBuf,

        /// Output format (js, json, binary); defaults to the output extension
        #[arg(short = 't', long)]
        format: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli, config: &Config) -> Result<(), EverestError> {
    let json_mode = cli.json_mode;
    let verbose = cli.verbose;

    match cli.command {
        Some(Commands::Info) | None => cmd_info(config, json_mode),
        Some(Commands::Index { action }) => match action {
            IndexCommand::Validate { input } => cmd_index_validate(&input, json_mode, verbose),
            IndexCommand::Search {
                input,
                limit,
                query,
            } => cmd_index_search(&input, &query.join(" "), limit, json_mode, verbose),
            IndexCommand::Stats { input } => cmd_index_stats(&input, json_mode),
            IndexCommand::Convert {
                input,
                output,
                format,
            } => cmd_index_convert(&input, &output, format.as_deref()),
            IndexCommand::Build {
                manifest,
                output,
                format,
            } => cmd_index_build(&manifest, &output, format.as_deref(), json_mode),
        },
        Some(Commands::Dvs {
            output,
            layout,
            labels,
            target,
            mission,
        }) => cmd_dvs(
            config,
            &output,
            layout.as_deref(),
            labels,
            target.as_deref(),
            &mission,
        ),
        Some(Commands::Detrend {
            input,
            mission,
            save,
        }) => cmd_detrend(config, &input, &mission, save, json_mode),
    }
}
