//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Live dashboard arguments.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Use simulated data even if an adapter is configured
    #[arg(short, long)]
    pub simulate: bool,

    /// Race against a recorded run log
    #[arg(short, long, value_name = "FILE")]
    pub ghost: Option<PathBuf>,

    /// Do not write a run log for this session
    #[arg(long)]
    pub no_record: bool,

    /// Stop after this many seconds
    #[arg(short, long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Write the fuel heat map as a PGM image when the session ends
    #[arg(long, value_name = "FILE")]
    pub heatmap: Option<PathBuf>,

    /// Emit events as JSON lines instead of the text dashboard
    #[arg(short, long)]
    pub json: bool,
}

/// Replay arguments.
#[derive(Debug, Args)]
pub struct ReplayCommand {
    /// Run log to play back
    pub file: PathBuf,

    /// Playback speed multiplier
    #[arg(short, long, default_value = "1.0")]
    pub speed: f64,

    /// Emit events as JSON lines instead of the text dashboard
    #[arg(short, long)]
    pub json: bool,
}

/// Vehicle catalog and calibration commands.
#[derive(Debug, Subcommand)]
pub enum VehicleCommand {
    /// Search the catalog by model name
    Search {
        /// Part of the model name, case-insensitive
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the active vehicle, or a catalog entry
    Show {
        /// Model to show instead of the active vehicle
        model: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// List every model in the catalog
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Make a catalog model the active vehicle
    Select {
        /// Model name, case-insensitive
        model: String,
    },

    /// Override the engine displacement of the active vehicle
    SetCc {
        /// Displacement in cc
        cc: String,
    },

    /// Merge a catalog JSON file into the database
    Import {
        /// JSON array of {model, cc, fuel, weight, drag}
        file: PathBuf,
    },
}

/// Leaderboard arguments.
#[derive(Debug, Args)]
pub struct LeaderboardCommand {
    /// Number of runs to show
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Only runs made with this vehicle
    #[arg(long)]
    pub vehicle: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
