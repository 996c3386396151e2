//! Command-line interface for revline.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, LeaderboardCommand, OutputFormat, ReplayCommand, RunCommand, StatusCommand,
    VehicleCommand,
};

/// revline - Engine telemetry from an ELM327 OBD-II adapter
///
/// Shows live power, torque, volumetric efficiency and fuel figures, times
/// 0-100 km/h runs, records run logs and replays them.
#[derive(Debug, Parser)]
#[command(name = "revline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the live dashboard
    Run(RunCommand),

    /// Play back a recorded run log
    Replay(ReplayCommand),

    /// Search the catalog and calibrate the active vehicle
    #[command(subcommand)]
    Vehicle(VehicleCommand),

    /// Show the fastest stored 0-100 km/h runs
    Leaderboard(LeaderboardCommand),

    /// Show adapter, vehicle and database status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn status_cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Status(StatusCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "revline");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;
        assert_eq!(status_cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(status_cli(3, true).verbosity(), Verbosity::Quiet);
        assert_eq!(status_cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(status_cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(status_cli(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "revline",
            "run",
            "--simulate",
            "--ghost",
            "best.csv",
            "--no-record",
            "--duration",
            "60",
            "--heatmap",
            "map.pgm",
        ])
        .unwrap();
        let Command::Run(run) = cli.command else {
            panic!("expected run command");
        };
        assert!(run.simulate);
        assert!(run.no_record);
        assert_eq!(run.ghost, Some(PathBuf::from("best.csv")));
        assert_eq!(run.duration, Some(60));
        assert_eq!(run.heatmap, Some(PathBuf::from("map.pgm")));
        assert!(!run.json);
    }

    #[test]
    fn test_parse_replay_speed() {
        let cli = Cli::try_parse_from(["revline", "replay", "run_log_1.csv", "--speed", "4"]).unwrap();
        let Command::Replay(replay) = cli.command else {
            panic!("expected replay command");
        };
        assert_eq!(replay.file, PathBuf::from("run_log_1.csv"));
        assert!((replay.speed - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_vehicle_set_cc() {
        let cli = Cli::try_parse_from(["revline", "vehicle", "set-cc", "1998"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Vehicle(VehicleCommand::SetCc { ref cc }) if cc == "1998"
        ));
    }

    #[test]
    fn test_parse_vehicle_search_format() {
        let cli =
            Cli::try_parse_from(["revline", "vehicle", "search", "subaru", "-f", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Vehicle(VehicleCommand::Search {
                format: OutputFormat::Json,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_leaderboard_defaults() {
        let cli = Cli::try_parse_from(["revline", "leaderboard"]).unwrap();
        let Command::Leaderboard(board) = cli.command else {
            panic!("expected leaderboard command");
        };
        assert_eq!(board.limit, 10);
        assert!(board.vehicle.is_none());
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["revline", "status", "-vv", "-c", "/tmp/r.toml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/r.toml")));
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = Cli::try_parse_from(["revline", "config", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: None })
        ));
    }
}
