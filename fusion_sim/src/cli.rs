use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// fusion_sim: replays and simulates CTRV tracking with the fusion_core UKF.
///
/// This struct defines the command-line arguments of the `fusion_sim` binary.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log at DEBUG level, including every NIS value.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the filter over recorded measurement logs.
    Replay(ReplayArgs),
    /// Generate synthetic runs from a scenario and evaluate the filter on them.
    Simulate(SimulateArgs),
    /// Print the fully resolved scenario configuration as TOML.
    PrintConfig {
        /// Scenario TOML layered over the defaults.
        #[arg(short, long)]
        scenario: Option<PathBuf>,
    },
}

/// Sensor switches shared by both run modes.
#[derive(Args, Debug, Clone, Default)]
pub struct SensorToggles {
    /// Ignore position (lidar-like) measurements.
    #[arg(long, default_value_t = false)]
    pub no_position: bool,

    /// Ignore range/bearing (radar-like) measurements.
    #[arg(long, default_value_t = false)]
    pub no_range_bearing: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// A log file, or a directory searched recursively for `*.txt` logs.
    pub input: PathBuf,

    /// Where to write estimates. A file for a single log, a directory otherwise.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Scenario TOML whose `[filter]` table tunes the filter.
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    #[command(flatten)]
    pub sensors: SensorToggles,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Scenario TOML layered over the defaults.
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Override `simulation.runs`.
    #[arg(short, long)]
    pub runs: Option<usize>,

    /// Override `simulation.seed`.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory for one estimate file per run.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also save the generated measurement logs next to the estimates.
    #[arg(long, default_value_t = false, requires = "output")]
    pub save_logs: bool,

    /// Leading NIS values per run left out of the consistency statistics.
    #[arg(long, default_value_t = 20)]
    pub warm_up: usize,

    #[command(flatten)]
    pub sensors: SensorToggles,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_simulate_overrides() {
        let cli = Cli::try_parse_from([
            "fusion_sim",
            "simulate",
            "--runs",
            "5",
            "--seed",
            "7",
            "--no-position",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Simulate(args) => {
                assert_eq!(args.runs, Some(5));
                assert_eq!(args.seed, Some(7));
                assert!(args.sensors.no_position);
                assert!(!args.sensors.no_range_bearing);
                assert_eq!(args.warm_up, 20);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_save_logs_needs_an_output_directory() {
        assert!(Cli::try_parse_from(["fusion_sim", "simulate", "--save-logs"]).is_err());
    }
}
