// fusion_sim/src/simulation/config/structs.rs

use fusion_core::config::UkfConfig;
use serde::{Deserialize, Serialize};

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # ScenarioConfig
/// The root of the data parsed from a `scenario.toml` file. Every section is
/// optional; missing sections and fields fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    pub simulation: Simulation,
    pub trajectory: TrajectoryConfig,
    pub sensors: SensorSimConfig,
    /// Handed to the filter unchanged.
    pub filter: UkfConfig,
}

// =========================================================================
// == Configuration Sub-Structs ==
// These map directly to the sections in a scenario.toml file.
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Simulation {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// Number of independent synthetic runs.
    pub runs: usize,
    /// Timestamp of the first ground-truth sample, in microseconds.
    pub start_timestamp: i64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            seed: None,
            runs: 1,
            start_timestamp: 0,
        }
    }
}

/// Ground truth is CTRV motion driven by random, piecewise-constant
/// longitudinal and yaw accelerations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrajectoryConfig {
    /// `[px, py, v, yaw, yaw_rate]` at the start.
    pub initial: [f64; 5],
    pub duration_seconds: f64,
    /// Interval between ground-truth samples. Sensors fire on these samples.
    pub step_seconds: f64,
    pub accel_noise_stddev: f64,
    pub yaw_accel_noise_stddev: f64,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            initial: [4.0, 2.0, 4.0, 0.5, 0.1],
            duration_seconds: 25.0,
            step_seconds: 0.05,
            accel_noise_stddev: 2.0,
            yaw_accel_noise_stddev: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorSimConfig {
    pub position: PositionSimConfig,
    pub range_bearing: RangeBearingSimConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PositionSimConfig {
    pub enabled: bool,
    pub rate_hz: f64,
    pub px_stddev: f64,
    pub py_stddev: f64,
}

impl Default for PositionSimConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_hz: 10.0,
            px_stddev: 0.15,
            py_stddev: 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RangeBearingSimConfig {
    pub enabled: bool,
    pub rate_hz: f64,
    pub range_stddev: f64,
    pub bearing_stddev: f64,
    pub range_rate_stddev: f64,
}

impl Default for RangeBearingSimConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_hz: 10.0,
            range_stddev: 0.3,
            bearing_stddev: 0.03,
            range_rate_stddev: 0.3,
        }
    }
}
