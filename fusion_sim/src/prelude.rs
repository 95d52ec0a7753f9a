// fusion_sim/src/prelude.rs

// Re-export the entire fusion_core prelude so binaries and tests can reach the
// filter, its configuration and its message types from one place.
pub use fusion_core::prelude::*;

// Re-export common simulation-specific types.
pub use crate::simulation::config::structs::*;
pub use crate::simulation::config::{discover_logs, load_scenario, scenario_from_str, scenario_to_toml};
pub use crate::simulation::core::prng::SimulationRng;
pub use crate::simulation::core::records::{GroundTruth, LogRecord};
pub use crate::simulation::error::{LogParseError, ScenarioError};
pub use crate::simulation::evaluation::{summarize_nis, NisSummary, Rmse, RmseAccumulator};
pub use crate::simulation::log_reader::{load_log_file, read_log, write_log};
pub use crate::simulation::output::{write_estimates, write_estimates_file};
pub use crate::simulation::replay::{replay, EstimateRow, ReplayReport};
pub use crate::simulation::scenario::{generate_run, simulate, BatchSummary, RunResult};
