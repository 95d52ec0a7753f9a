// fusion_sim/src/simulation/replay.rs

use nalgebra::Vector2;
use tracing::{debug, warn};

use fusion_core::config::UkfConfig;
use fusion_core::error::FilterError;
use fusion_core::estimation::filters::ukf::UnscentedKalmanFilter;
use fusion_core::estimation::sink::{NisRecord, NisSink};
use fusion_core::messages::SensorKind;
use fusion_core::types::Timestamp;

use crate::simulation::core::records::{GroundTruth, LogRecord};
use crate::simulation::evaluation::{summarize_nis, NisSummary, Rmse, RmseAccumulator};

/// The filter's estimate right after it consumed one measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateRow {
    pub timestamp: Timestamp,
    pub sensor: SensorKind,
    /// `[px, py, v, yaw, yaw_rate]`.
    pub state: [f64; 5],
    /// `None` for the measurement that initialized the filter.
    pub nis: Option<f64>,
    /// The measured position, converted to Cartesian coordinates.
    pub measured: Vector2<f64>,
    pub ground_truth: Option<GroundTruth>,
}

impl EstimateRow {
    pub fn estimated_position(&self) -> Vector2<f64> {
        Vector2::new(self.state[0], self.state[1])
    }

    pub fn estimated_velocity(&self) -> Vector2<f64> {
        let [_, _, v, yaw, _] = self.state;
        Vector2::new(v * yaw.cos(), v * yaw.sin())
    }
}

/// Everything a replay produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayReport {
    pub rows: Vec<EstimateRow>,
    /// Measurements from sensors switched off in the configuration.
    pub ignored: usize,
    /// Measurements the filter rejected. The estimate is unchanged by them.
    pub errors: usize,
}

impl ReplayReport {
    pub fn rmse_accumulator(&self) -> RmseAccumulator {
        let mut acc = RmseAccumulator::default();
        for row in &self.rows {
            if let Some(truth) = &row.ground_truth {
                acc.add(row.estimated_position(), row.estimated_velocity(), truth);
            }
        }
        acc
    }

    /// `None` if no row carries ground truth.
    pub fn rmse(&self) -> Option<Rmse> {
        self.rmse_accumulator().finish()
    }

    pub fn nis_records(&self) -> Vec<NisRecord> {
        self.rows
            .iter()
            .filter_map(|row| {
                row.nis.map(|nis| NisRecord {
                    sensor: row.sensor,
                    timestamp: row.timestamp,
                    nis,
                })
            })
            .collect()
    }

    pub fn nis_summaries(&self) -> Vec<NisSummary> {
        summarize_nis(&self.nis_records())
    }
}

/// Runs a fresh filter over `records` in order.
///
/// A rejected measurement is logged and counted, and the replay carries on
/// with the next one. Only an unusable configuration fails the whole replay.
pub fn replay<S: NisSink>(
    records: &[LogRecord],
    config: &UkfConfig,
    sink: S,
) -> Result<ReplayReport, FilterError> {
    let mut filter = UnscentedKalmanFilter::with_sink(config.clone(), sink)?;
    let mut report = ReplayReport::default();

    for (index, record) in records.iter().enumerate() {
        let message = &record.message;
        match filter.process_measurement(message) {
            Ok(Some(outcome)) => {
                let x = &filter.get_state().vector;
                report.rows.push(EstimateRow {
                    timestamp: outcome.timestamp(),
                    sensor: message.kind(),
                    state: [x[0], x[1], x[2], x[3], x[4]],
                    nis: outcome.nis(),
                    measured: message.data.cartesian_position(),
                    ground_truth: record.ground_truth,
                });
            }
            Ok(None) => report.ignored += 1,
            Err(err) => {
                warn!(
                    record = index,
                    timestamp = message.timestamp,
                    sensor = %message.kind(),
                    "Measurement rejected: {}",
                    err
                );
                report.errors += 1;
            }
        }
    }

    debug!(
        rows = report.rows.len(),
        ignored = report.ignored,
        errors = report.errors,
        "Replay finished"
    );
    Ok(report)
}
