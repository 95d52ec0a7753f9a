// fusion_sim/src/simulation/scenario.rs

//! Synthetic Monte Carlo runs: generate ground truth, synthesize
//! measurements along it, replay them through a fresh filter.

use tracing::{debug, info};

use fusion_core::estimation::sink::{NisRecord, TracingNisSink};

use crate::simulation::config::ScenarioConfig;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::core::records::LogRecord;
use crate::simulation::error::ScenarioError;
use crate::simulation::evaluation::{summarize_nis, NisSummary, Rmse, RmseAccumulator};
use crate::simulation::replay::{replay, ReplayReport};
use crate::simulation::sensors::synthesize_measurements;
use crate::simulation::trajectory::generate_trajectory;

/// The measurement log of one synthetic run.
pub fn generate_run(
    config: &ScenarioConfig,
    rng: &mut SimulationRng,
) -> Result<Vec<LogRecord>, ScenarioError> {
    let truth = generate_trajectory(&config.trajectory, rng)?;
    synthesize_measurements(
        &truth,
        &config.sensors,
        config.trajectory.step_seconds,
        config.simulation.start_timestamp,
        rng,
    )
}

/// One finished run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run: usize,
    pub records: Vec<LogRecord>,
    pub report: ReplayReport,
}

/// Generates and replays `config.simulation.runs` independent runs. With a
/// seed the whole batch is reproducible.
pub fn simulate(config: &ScenarioConfig) -> Result<Vec<RunResult>, ScenarioError> {
    let seed = config.simulation.seed;
    info!(
        runs = config.simulation.runs,
        seed = ?seed,
        "Starting synthetic runs"
    );

    (0..config.simulation.runs)
        .map(|run| {
            let mut rng = SimulationRng::for_run(seed, run);
            let records = generate_run(config, &mut rng)?;
            let report = replay(&records, &config.filter, TracingNisSink)?;
            debug!(run, measurements = records.len(), errors = report.errors, "Run finished");
            Ok(RunResult {
                run,
                records,
                report,
            })
        })
        .collect()
}

/// Metrics pooled over several runs.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub runs: usize,
    pub updates: usize,
    pub errors: usize,
    pub rmse: Option<Rmse>,
    pub nis: Vec<NisSummary>,
}

impl BatchSummary {
    /// `warm_up` leading NIS values of each run are left out of the NIS
    /// statistics, while the filter is still converging from its prior.
    pub fn from_reports<'a>(
        reports: impl IntoIterator<Item = &'a ReplayReport>,
        warm_up: usize,
    ) -> Self {
        let mut runs = 0;
        let mut updates = 0;
        let mut errors = 0;
        let mut rmse = RmseAccumulator::default();
        let mut nis: Vec<NisRecord> = Vec::new();

        for report in reports {
            runs += 1;
            errors += report.errors;
            rmse.merge(&report.rmse_accumulator());
            let records = report.nis_records();
            updates += records.len();
            nis.extend(records.into_iter().skip(warm_up));
        }

        Self {
            runs,
            updates,
            errors,
            rmse: rmse.finish(),
            nis: summarize_nis(&nis),
        }
    }
}
