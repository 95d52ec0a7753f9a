// fusion_core/src/config.rs

//! Tunable parameters of the unscented filter. Every constant the filter
//! relies on lives here as a named default so it can be overridden from a
//! scenario file instead of being edited in the algorithm.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::FilterError;
use crate::messages::SensorKind;
use crate::state::layout::CTRV_STATE_DIM;
use crate::types::Covariance;

/// Below this magnitude on both axes, an initial position is pushed out to
/// this value so the first sigma spread has a usable direction.
pub const DEFAULT_MIN_INITIAL_POSITION: f64 = 0.001;
/// Turn rates with a smaller magnitude use the straight-line CTRV branch.
/// Tuned, not derived: it only has to sit well above the round-off of `v / yaw_rate`.
pub const DEFAULT_YAW_RATE_THRESHOLD: f64 = 0.001;
/// Lower clamp on the range used as the range-rate denominator.
pub const DEFAULT_MIN_RANGE: f64 = 1e-4;
/// Largest accepted condition number of the innovation covariance `S`.
pub const DEFAULT_MAX_INNOVATION_CONDITION: f64 = 1e12;
/// Measurement logs carry microsecond timestamps.
pub const MICROSECONDS_PER_SECOND: f64 = 1.0e6;

// =========================================================================
// == Top-Level Filter Configuration ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UkfConfig {
    /// If false, position measurements are ignored entirely (including for initialization).
    pub use_position_sensor: bool,
    /// If false, range/bearing measurements are ignored entirely (including for initialization).
    pub use_range_bearing_sensor: bool,
    /// Diagonal of the prior covariance set on initialization, in state order
    /// `[px, py, v, yaw, yaw_rate]`.
    pub initial_covariance_diagonal: [f64; CTRV_STATE_DIM],
    pub min_initial_position: f64,
    pub yaw_rate_threshold: f64,
    pub min_range: f64,
    pub max_innovation_condition: f64,
    pub timestamp_units_per_second: f64,
    // Tables go last so the struct serializes to valid TOML.
    pub process_noise: ProcessNoiseConfig,
    pub position_sensor: PositionSensorConfig,
    pub range_bearing_sensor: RangeBearingSensorConfig,
}

impl Default for UkfConfig {
    fn default() -> Self {
        Self {
            use_position_sensor: true,
            use_range_bearing_sensor: true,
            initial_covariance_diagonal: [0.15, 0.15, 1.0, 1.0, 1.0],
            min_initial_position: DEFAULT_MIN_INITIAL_POSITION,
            yaw_rate_threshold: DEFAULT_YAW_RATE_THRESHOLD,
            min_range: DEFAULT_MIN_RANGE,
            max_innovation_condition: DEFAULT_MAX_INNOVATION_CONDITION,
            timestamp_units_per_second: MICROSECONDS_PER_SECOND,
            process_noise: ProcessNoiseConfig::default(),
            position_sensor: PositionSensorConfig::default(),
            range_bearing_sensor: RangeBearingSensorConfig::default(),
        }
    }
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

/// Standard deviations of the two CTRV process-noise inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessNoiseConfig {
    /// Longitudinal acceleration noise in m/s^2.
    pub accel_stddev: f64,
    /// Yaw acceleration noise in rad/s^2.
    pub yaw_accel_stddev: f64,
}

impl Default for ProcessNoiseConfig {
    fn default() -> Self {
        Self {
            accel_stddev: 2.0,
            yaw_accel_stddev: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PositionSensorConfig {
    pub px_stddev: f64,
    pub py_stddev: f64,
}

impl Default for PositionSensorConfig {
    fn default() -> Self {
        Self {
            px_stddev: 0.15,
            py_stddev: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RangeBearingSensorConfig {
    pub range_stddev: f64,
    pub bearing_stddev: f64,
    pub range_rate_stddev: f64,
}

impl Default for RangeBearingSensorConfig {
    fn default() -> Self {
        Self {
            range_stddev: 0.3,
            bearing_stddev: 0.03,
            range_rate_stddev: 0.3,
        }
    }
}

impl PositionSensorConfig {
    pub fn noise_covariance(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&DVector::from_vec(vec![
            self.px_stddev.powi(2),
            self.py_stddev.powi(2),
        ]))
    }
}

impl RangeBearingSensorConfig {
    pub fn noise_covariance(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&DVector::from_vec(vec![
            self.range_stddev.powi(2),
            self.bearing_stddev.powi(2),
            self.range_rate_stddev.powi(2),
        ]))
    }
}

impl UkfConfig {
    pub fn is_enabled(&self, kind: SensorKind) -> bool {
        match kind {
            SensorKind::Position => self.use_position_sensor,
            SensorKind::RangeBearing => self.use_range_bearing_sensor,
        }
    }

    pub fn initial_covariance(&self) -> Covariance {
        DMatrix::from_diagonal(&DVector::from_column_slice(&self.initial_covariance_diagonal))
    }

    /// Rejects parameters that would make the very first Cholesky factorization,
    /// or the time conversion, meaningless.
    pub fn validate(&self) -> Result<(), FilterError> {
        let positive = [
            ("process_noise.accel_stddev", self.process_noise.accel_stddev),
            ("process_noise.yaw_accel_stddev", self.process_noise.yaw_accel_stddev),
            ("position_sensor.px_stddev", self.position_sensor.px_stddev),
            ("position_sensor.py_stddev", self.position_sensor.py_stddev),
            ("range_bearing_sensor.range_stddev", self.range_bearing_sensor.range_stddev),
            ("range_bearing_sensor.bearing_stddev", self.range_bearing_sensor.bearing_stddev),
            (
                "range_bearing_sensor.range_rate_stddev",
                self.range_bearing_sensor.range_rate_stddev,
            ),
            ("min_range", self.min_range),
            ("max_innovation_condition", self.max_innovation_condition),
            ("timestamp_units_per_second", self.timestamp_units_per_second),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(FilterError::InvalidConfig(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }

        for (name, value) in [
            ("min_initial_position", self.min_initial_position),
            ("yaw_rate_threshold", self.yaw_rate_threshold),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(FilterError::InvalidConfig(format!(
                    "{name} must be a non-negative finite number, got {value}"
                )));
            }
        }

        if let Some(bad) = self
            .initial_covariance_diagonal
            .iter()
            .find(|v| !(v.is_finite() && **v > 0.0))
        {
            return Err(FilterError::InvalidConfig(format!(
                "initial_covariance_diagonal entries must be positive, got {bad}"
            )));
        }
        Ok(())
    }
}
