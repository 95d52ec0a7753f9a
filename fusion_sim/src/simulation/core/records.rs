// fusion_sim/src/simulation/core/records.rs

use fusion_core::messages::MeasurementMessage;
use nalgebra::Vector2;

/// The true kinematic state attached to a measurement, as far as the source
/// knows it. Logs always carry position and Cartesian velocity; heading and
/// turn rate are optional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundTruth {
    pub px: f64,
    pub py: f64,
    pub vx: f64,
    pub vy: f64,
    pub yaw: Option<f64>,
    pub yaw_rate: Option<f64>,
}

impl GroundTruth {
    /// Ground truth of a CTRV state `[px, py, v, yaw, yaw_rate]`.
    pub fn from_ctrv(state: &[f64; 5]) -> Self {
        let [px, py, v, yaw, yaw_rate] = *state;
        Self {
            px,
            py,
            vx: v * yaw.cos(),
            vy: v * yaw.sin(),
            yaw: Some(yaw),
            yaw_rate: Some(yaw_rate),
        }
    }

    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.px, self.py)
    }

    pub fn velocity(&self) -> Vector2<f64> {
        Vector2::new(self.vx, self.vy)
    }
}

/// One line of a measurement log: the measurement itself and, optionally,
/// what the object was really doing at that instant.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub message: MeasurementMessage,
    pub ground_truth: Option<GroundTruth>,
}
