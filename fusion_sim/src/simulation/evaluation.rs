// fusion_sim/src/simulation/evaluation.rs

//! Accuracy and consistency metrics computed against ground truth.

use nalgebra::Vector2;

use fusion_core::estimation::sink::{chi_square_95, NisRecord};
use fusion_core::messages::SensorKind;

use crate::simulation::core::records::GroundTruth;

/// Root-mean-square error of the Cartesian position and velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rmse {
    pub px: f64,
    pub py: f64,
    pub vx: f64,
    pub vy: f64,
}

/// Running sums for an RMSE. Accumulators of several runs can be merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RmseAccumulator {
    sum_sq: [f64; 4],
    count: usize,
}

impl RmseAccumulator {
    pub fn add(&mut self, position: Vector2<f64>, velocity: Vector2<f64>, truth: &GroundTruth) {
        let position_error = position - truth.position();
        let velocity_error = velocity - truth.velocity();
        let errors = [
            position_error.x,
            position_error.y,
            velocity_error.x,
            velocity_error.y,
        ];
        for (sum, e) in self.sum_sq.iter_mut().zip(errors) {
            *sum += e * e;
        }
        self.count += 1;
    }

    pub fn merge(&mut self, other: &RmseAccumulator) {
        for (sum, other_sum) in self.sum_sq.iter_mut().zip(other.sum_sq) {
            *sum += other_sum;
        }
        self.count += other.count;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// `None` until at least one sample has been added.
    pub fn finish(&self) -> Option<Rmse> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let [px, py, vx, vy] = self.sum_sq.map(|s| (s / n).sqrt());
        Some(Rmse { px, py, vx, vy })
    }
}

/// How well the NIS of one sensor matches its chi-square distribution. For a
/// consistent filter `mean` is close to the measurement dimension and
/// `fraction_above_95` close to 0.05.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NisSummary {
    pub sensor: SensorKind,
    pub count: usize,
    pub mean: f64,
    pub threshold_95: f64,
    pub fraction_above_95: f64,
}

impl NisSummary {
    pub fn from_values(sensor: SensorKind, values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let threshold_95 = chi_square_95(sensor.measurement_dim())?;
        let (mut count, mut sum, mut above) = (0usize, 0.0, 0usize);
        for nis in values {
            count += 1;
            sum += nis;
            if nis > threshold_95 {
                above += 1;
            }
        }
        if count == 0 {
            return None;
        }
        Some(Self {
            sensor,
            count,
            mean: sum / count as f64,
            threshold_95,
            fraction_above_95: above as f64 / count as f64,
        })
    }
}

/// One summary per sensor kind present in `records`.
pub fn summarize_nis<'a>(records: impl IntoIterator<Item = &'a NisRecord> + Clone) -> Vec<NisSummary> {
    SensorKind::ALL
        .iter()
        .filter_map(|&sensor| {
            NisSummary::from_values(
                sensor,
                records
                    .clone()
                    .into_iter()
                    .filter(|r| r.sensor == sensor)
                    .map(|r| r.nis),
            )
        })
        .collect()
}
